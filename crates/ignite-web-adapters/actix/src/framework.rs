//! actix-web adapter (C7): bridges the façade to `actix_web::HttpServer`.
//!
//! actix-web builds a fresh `App` per worker thread from a factory closure,
//! so routes can't be registered into a live router the way axum's
//! `Router::route` works. Instead registrations accumulate into a shared
//! [`RouteTable`] and [`start`](ActixFramework::start) hands the factory a
//! clone of that table to rebuild the same routes on every worker.

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use actix_web::{App, HttpRequest, HttpResponse, HttpServer, web};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock as SyncRwLock};
use regex_lite::Regex;

use ignite_web::facade::{Handler, HttpMethod, Middleware, RequestContext, RequestContextExt, build_chain};
use ignite_web::{ServerConfig, ServiceContainer, WebError, WebFramework, WebResult};

use crate::context::ActixContext;

type MiddlewareList = Arc<SyncRwLock<Vec<Arc<dyn Middleware>>>>;

#[derive(Clone)]
struct RouteEntry {
    method: HttpMethod,
    path: String,
    handler: Arc<dyn Handler>,
    group_mw: Vec<Arc<dyn Middleware>>,
}

type RouteTable = Arc<Mutex<Vec<RouteEntry>>>;

pub struct ActixFramework {
    config: ServerConfig,
    services: ServiceContainer,
    routes: RouteTable,
    framework_middlewares: MiddlewareList,
    server_handle: Option<actix_web::dev::ServerHandle>,
    join: Option<tokio::task::JoinHandle<std::io::Result<()>>>,
}

impl ActixFramework {
    pub fn new(config: ServerConfig, services: ServiceContainer) -> Self {
        let builtins = ignite_web::middleware::builtins_from_config(&config);
        Self {
            config,
            services,
            routes: Arc::new(Mutex::new(Vec::new())),
            framework_middlewares: Arc::new(SyncRwLock::new(builtins)),
            server_handle: None,
            join: None,
        }
    }
}

#[async_trait]
impl WebFramework for ActixFramework {
    fn register_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        self.routes.lock().push(RouteEntry {
            method,
            path: path.to_string(),
            handler,
            group_mw: Vec::new(),
        });
        Ok(())
    }

    fn register_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.framework_middlewares.write().push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(ActixRouteGroup {
            prefix: normalize_prefix(prefix),
            middlewares: Vec::new(),
            framework_middlewares: Arc::clone(&self.framework_middlewares),
            routes: Arc::clone(&self.routes),
        })
    }

    fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn native_engine(&self) -> &dyn Any {
        // actix-web builds one `App` per worker thread from a factory closure;
        // there is no single long-lived router object to hand back.
        &()
    }

    async fn start(&mut self) -> WebResult<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|err| WebError::ConfigInvalid(format!("invalid listen address: {err}")))?;

        if self.config.tls.enabled {
            tracing::warn!(
                "TLS requested in server config but the actix-web adapter does not terminate TLS itself; \
                 terminate TLS upstream (e.g. a reverse proxy) or layer a TLS-capable listener"
            );
        }

        let routes = Arc::clone(&self.routes);
        let framework_mw = Arc::clone(&self.framework_middlewares);
        let services = self.services.clone();

        let server = HttpServer::new(move || {
            let routes = Arc::clone(&routes);
            let framework_mw = Arc::clone(&framework_mw);
            let services = services.clone();
            build_app(routes, framework_mw, services)
        })
            .bind(addr)
            .map_err(|err| WebError::ConfigInvalid(format!("failed to bind {addr}: {err}")))?
            .run();

        self.server_handle = Some(server.handle());
        self.join = Some(tokio::spawn(server));
        tracing::info!(%addr, "actix-web adapter listening");
        Ok(())
    }

    async fn stop(&mut self) -> WebResult<()> {
        let Some(handle) = self.server_handle.take() else {
            return Ok(());
        };
        handle.stop(true).await;
        if let Some(join) = self.join.take() {
            match join.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => return Err(WebError::Handler(format!("actix server task failed: {err}"))),
                Err(err) => return Err(WebError::Handler(format!("actix server task panicked: {err}"))),
            }
        }
        Ok(())
    }
}

pub struct ActixRouteGroup {
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    framework_middlewares: MiddlewareList,
    routes: RouteTable,
}

impl ActixRouteGroup {
    fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, normalize_prefix(path))
    }
}

impl ignite_web::RouteGroup for ActixRouteGroup {
    fn route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        self.routes.lock().push(RouteEntry {
            method,
            path: self.full_path(path),
            handler,
            group_mw: self.middlewares.clone(),
        });
        Ok(())
    }

    fn middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(ActixRouteGroup {
            prefix: self.full_path(prefix),
            middlewares: self.middlewares.clone(),
            framework_middlewares: Arc::clone(&self.framework_middlewares),
            routes: Arc::clone(&self.routes),
        })
    }
}

fn normalize_prefix(segment: &str) -> String {
    let trimmed = segment.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Converts the façade's `:name` path-parameter syntax into actix-web's
/// `{name}` syntax.
fn to_actix_pattern(path: &str) -> String {
    let re = Regex::new(r":([A-Za-z0-9_]+)").expect("static pattern is valid");
    re.replace_all(path, "{$1}").into_owned()
}

/// Builds one worker's `App`: groups the shared route table by (converted)
/// path so each pattern becomes a single `web::resource` carrying every
/// method registered against it, matching actix's routing model (§4.7).
fn build_app(
    routes: RouteTable,
    framework_mw: MiddlewareList,
    services: ServiceContainer,
) -> App<
    impl actix_web::dev::ServiceFactory<
        actix_web::dev::ServiceRequest,
        Config = (),
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    let entries = routes.lock().clone();
    let mut by_path: HashMap<String, Vec<RouteEntry>> = HashMap::new();
    for entry in entries {
        by_path.entry(to_actix_pattern(&entry.path)).or_default().push(entry);
    }

    let mut app = App::new();
    for (pattern, group) in by_path {
        let mut resource = web::resource(pattern.clone());
        for entry in group {
            let handler = Arc::clone(&entry.handler);
            let group_mw = entry.group_mw.clone();
            let framework_mw = Arc::clone(&framework_mw);
            let route_pattern = pattern.clone();
            let guard_method = actix_http_method(entry.method);
            let services = services.clone();
            resource = resource.route(web::method(guard_method).to(
                move |req: HttpRequest, body: web::Bytes| {
                    let handler = Arc::clone(&handler);
                    let group_mw = group_mw.clone();
                    let framework_mw = Arc::clone(&framework_mw);
                    let route_pattern = route_pattern.clone();
                    let services = services.clone();
                    async move {
                        dispatch(handler, framework_mw, group_mw, route_pattern, req, body, services).await
                    }
                },
            ));
        }
        app = app.service(resource);
    }
    app
}

fn actix_http_method(method: HttpMethod) -> actix_web::http::Method {
    match method {
        HttpMethod::Get => actix_web::http::Method::GET,
        HttpMethod::Post => actix_web::http::Method::POST,
        HttpMethod::Put => actix_web::http::Method::PUT,
        HttpMethod::Patch => actix_web::http::Method::PATCH,
        HttpMethod::Delete => actix_web::http::Method::DELETE,
        HttpMethod::Head => actix_web::http::Method::HEAD,
        HttpMethod::Options => actix_web::http::Method::OPTIONS,
    }
}

async fn dispatch(
    handler: Arc<dyn Handler>,
    framework_mw: MiddlewareList,
    group_mw: Vec<Arc<dyn Middleware>>,
    route_pattern: String,
    req: HttpRequest,
    body: web::Bytes,
    services: ServiceContainer,
) -> HttpResponse {
    let ctx: Arc<dyn RequestContext> = match ActixContext::from_request(&req, route_pattern, body) {
        Ok(ctx) => Arc::new(ctx),
        Err(_) => return HttpResponse::MethodNotAllowed().finish(),
    };

    let framework_snapshot: Vec<Arc<dyn Middleware>> = framework_mw.read().clone();
    let chain = build_chain(&framework_snapshot, &group_mw, handler);

    if let Err(err) = chain.call(Arc::clone(&ctx)).await {
        log_handler_error(&services, &ctx, &err);
        if ctx.staged_response().status == 200 {
            ctx.write_internal_error(&err.to_string());
        }
    }

    response_from_ctx(&ctx)
}

/// §4.7 "Handler/middleware bridging": an uncaught handler error is logged
/// through the service container's logger, with the error reporter's stack
/// trace attached, rather than the SDK's own internal `tracing` bookkeeping.
fn log_handler_error(services: &ServiceContainer, ctx: &Arc<dyn RequestContext>, err: &WebError) {
    let stack = services.error_reporter.stack_trace(err);
    services.logger.with_name("http.adapter").errorw(
        "handler returned error",
        &[
            ("path", ignite_log::Field::from(ctx.path().to_string())),
            ("error", ignite_log::Field::from(err.to_string())),
            ("errorVerbose", ignite_log::Field::from(stack)),
        ],
    );
}

fn response_from_ctx(ctx: &Arc<dyn RequestContext>) -> HttpResponse {
    let staged = ctx.staged_response();
    let status = actix_web::http::StatusCode::from_u16(staged.status)
        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = HttpResponse::build(status);
    builder.content_type(staged.content_type);
    for (name, value) in &staged.headers {
        builder.insert_header((name.as_str(), value.as_str()));
    }
    builder.body(staged.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test as actix_test;

    #[test]
    fn path_params_become_actix_braces() {
        assert_eq!(to_actix_pattern("/users/:id/posts/:post_id"), "/users/{id}/posts/{post_id}");
    }

    #[test]
    fn path_without_params_is_unchanged() {
        assert_eq!(to_actix_pattern("/health"), "/health");
    }

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn handle(&self, ctx: Arc<dyn RequestContext>) -> WebResult<()> {
            ctx.write_text(200, format!("id={}", ctx.param("id").unwrap_or("?")));
            Ok(())
        }
    }

    #[actix_web::test]
    async fn dispatches_registered_route_with_params() {
        let routes: RouteTable = Arc::new(Mutex::new(vec![RouteEntry {
            method: HttpMethod::Get,
            path: "/users/:id".to_string(),
            handler: Arc::new(Echo),
            group_mw: Vec::new(),
        }]));
        let framework_mw: MiddlewareList = Arc::new(SyncRwLock::new(Vec::new()));
        let app = actix_test::init_service(build_app(
            routes,
            framework_mw,
            ServiceContainer::default(),
        ))
        .await;

        let req = actix_test::TestRequest::get().uri("/users/42").to_request();
        let resp = actix_test::call_service(&app, req).await;
        assert_eq!(resp.status(), actix_web::http::StatusCode::OK);
        let body = actix_test::read_body(resp).await;
        assert_eq!(body, "id=42");
    }

    #[actix_web::test]
    async fn one_resource_per_path_dispatches_by_method() {
        let routes: RouteTable = Arc::new(Mutex::new(vec![
            RouteEntry {
                method: HttpMethod::Get,
                path: "/widgets".to_string(),
                handler: Arc::new(Echo),
                group_mw: Vec::new(),
            },
            RouteEntry {
                method: HttpMethod::Post,
                path: "/widgets".to_string(),
                handler: Arc::new(Echo),
                group_mw: Vec::new(),
            },
        ]));
        let framework_mw: MiddlewareList = Arc::new(SyncRwLock::new(Vec::new()));
        let app = actix_test::init_service(build_app(
            routes,
            framework_mw,
            ServiceContainer::default(),
        ))
        .await;

        let get_resp =
            actix_test::call_service(&app, actix_test::TestRequest::get().uri("/widgets").to_request())
                .await;
        assert_eq!(get_resp.status(), actix_web::http::StatusCode::OK);

        let post_resp = actix_test::call_service(
            &app,
            actix_test::TestRequest::post().uri("/widgets").to_request(),
        )
        .await;
        assert_eq!(post_resp.status(), actix_web::http::StatusCode::OK);
    }
}
