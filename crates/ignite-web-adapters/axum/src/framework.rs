//! axum adapter (C7): bridges the façade to `axum::Router` + hyper via
//! `axum::serve`.
//!
//! Route registration is accumulated into a per-path [`axum::routing::MethodRouter`]
//! table rather than pushed straight into an `axum::Router`, because axum
//! panics if the same path is registered twice — and a caller is free to
//! register `GET /x` and `POST /x` as two separate [`WebFramework::register_route`]
//! calls. The table is flattened into one `axum::Router` in [`start`](AxumFramework::start).
//! The table lives behind an `Arc<Mutex<_>>` shared with every [`AxumRouteGroup`]
//! spawned off this framework, so nested groups can register routes without
//! borrowing back into the framework.

use std::any::Any;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{ConnectInfo, Path, Query};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{MethodRouter, delete, get, head, options, patch, post, put};
use parking_lot::{Mutex, RwLock as SyncRwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use ignite_web::facade::{Handler, HttpMethod, Middleware, RequestContext, RequestContextExt, build_chain};
use ignite_web::{ServerConfig, ServiceContainer, WebError, WebFramework, WebResult};

use crate::context::{AxumContext, headers_to_map, resolve_client_ip};

type MiddlewareList = Arc<SyncRwLock<Vec<Arc<dyn Middleware>>>>;
type RouteTable = Arc<Mutex<HashMap<String, MethodRouter>>>;

struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<std::io::Result<()>>,
}

pub struct AxumFramework {
    config: ServerConfig,
    services: ServiceContainer,
    routes: RouteTable,
    framework_middlewares: MiddlewareList,
    built_router: Option<Router>,
    server: Option<ServerHandle>,
}

impl AxumFramework {
    pub fn new(config: ServerConfig, services: ServiceContainer) -> Self {
        let builtins = ignite_web::middleware::builtins_from_config(&config);
        Self {
            config,
            services,
            routes: Arc::new(Mutex::new(HashMap::new())),
            framework_middlewares: Arc::new(SyncRwLock::new(builtins)),
            built_router: None,
            server: None,
        }
    }

    fn build_router(&self) -> Router {
        let mut router = Router::new();
        for (path, method_router) in self.routes.lock().iter() {
            router = router.route(&to_axum_path(path), method_router.clone());
        }
        router
    }
}

/// Translates the façade's `:name`-style path params (shared across all three
/// adapters) into axum 0.8's `{name}` syntax — axum 0.7 accepted `:name` but
/// 0.8 rejects it at router-build time, so this table still stores the
/// façade's own convention and only the native registration step translates.
fn to_axum_path(path: &str) -> String {
    path.split('/')
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) => format!("{{{name}}}"),
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn insert_route(routes: &RouteTable, path: &str, method_router: MethodRouter) {
    let mut table = routes.lock();
    let existing = table.remove(path).unwrap_or_default();
    table.insert(path.to_string(), existing.merge(method_router));
}

#[async_trait]
impl WebFramework for AxumFramework {
    fn register_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        let route = build_route(
            method,
            handler,
            Vec::new(),
            Arc::clone(&self.framework_middlewares),
            path.to_string(),
            self.services.clone(),
        );
        insert_route(&self.routes, path, route);
        Ok(())
    }

    fn register_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.framework_middlewares.write().push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(AxumRouteGroup {
            prefix: normalize_prefix(prefix),
            middlewares: Vec::new(),
            framework_middlewares: Arc::clone(&self.framework_middlewares),
            routes: Arc::clone(&self.routes),
            services: self.services.clone(),
        })
    }

    fn config(&self) -> &ServerConfig {
        &self.config
    }

    fn native_engine(&self) -> &dyn Any {
        match &self.built_router {
            Some(router) => router,
            None => &(),
        }
    }

    async fn start(&mut self) -> WebResult<()> {
        let router = self.build_router();
        self.built_router = Some(router.clone());

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|err| WebError::ConfigInvalid(format!("invalid listen address: {err}")))?;

        if self.config.tls.enabled {
            tracing::warn!(
                "TLS requested in server config but the axum adapter does not terminate TLS itself; \
                 terminate TLS upstream (e.g. a reverse proxy) or layer a TLS-capable listener"
            );
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| WebError::ConfigInvalid(format!("failed to bind {addr}: {err}")))?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let make_service = router.into_make_service_with_connect_info::<SocketAddr>();

        let join = tokio::spawn(async move {
            axum::serve(listener, make_service)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        self.server = Some(ServerHandle { shutdown_tx, join });
        tracing::info!(%addr, "axum adapter listening");
        Ok(())
    }

    async fn stop(&mut self) -> WebResult<()> {
        let Some(handle) = self.server.take() else {
            return Ok(());
        };
        let _ = handle.shutdown_tx.send(());
        match handle.join.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(WebError::Handler(format!("axum server task failed: {err}"))),
            Err(err) => Err(WebError::Handler(format!("axum server task panicked: {err}"))),
        }
    }
}

pub struct AxumRouteGroup {
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    framework_middlewares: MiddlewareList,
    routes: RouteTable,
    services: ServiceContainer,
}

impl AxumRouteGroup {
    fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, normalize_prefix(path))
    }
}

impl ignite_web::RouteGroup for AxumRouteGroup {
    fn route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        let full_path = self.full_path(path);
        let route = build_route(
            method,
            handler,
            self.middlewares.clone(),
            Arc::clone(&self.framework_middlewares),
            full_path.clone(),
            self.services.clone(),
        );
        insert_route(&self.routes, &full_path, route);
        Ok(())
    }

    fn middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(AxumRouteGroup {
            prefix: self.full_path(prefix),
            middlewares: self.middlewares.clone(),
            framework_middlewares: Arc::clone(&self.framework_middlewares),
            routes: Arc::clone(&self.routes),
            services: self.services.clone(),
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

/// Builds the `MethodRouter` entry for one façade route: extracts everything
/// axum hands us up front, runs the façade's composed middleware chain plus
/// the route's handler, then translates the resulting [`ignite_web::StagedResponse`]
/// into an axum `Response` (§4.7 "Handler/middleware bridging").
fn build_route(
    method: HttpMethod,
    handler: Arc<dyn Handler>,
    group_mw: Vec<Arc<dyn Middleware>>,
    framework_mw: MiddlewareList,
    route_pattern: String,
    services: ServiceContainer,
) -> MethodRouter {
    let handler_fn = move |axum_method: Method,
                            Path(params): Path<HashMap<String, String>>,
                            Query(query): Query<HashMap<String, String>>,
                            headers: HeaderMap,
                            ConnectInfo(peer): ConnectInfo<SocketAddr>,
                            uri: Uri,
                            body: Bytes| {
        let handler = Arc::clone(&handler);
        let group_mw = group_mw.clone();
        let framework_mw = Arc::clone(&framework_mw);
        let route_pattern = route_pattern.clone();
        let services = services.clone();
        async move {
            dispatch(
                handler,
                framework_mw,
                group_mw,
                route_pattern,
                axum_method,
                params,
                query,
                headers,
                peer,
                uri,
                body,
                services,
            )
            .await
        }
    };

    match method {
        HttpMethod::Get => get(handler_fn),
        HttpMethod::Post => post(handler_fn),
        HttpMethod::Put => put(handler_fn),
        HttpMethod::Patch => patch(handler_fn),
        HttpMethod::Delete => delete(handler_fn),
        HttpMethod::Head => head(handler_fn),
        HttpMethod::Options => options(handler_fn),
    }
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    handler: Arc<dyn Handler>,
    framework_mw: MiddlewareList,
    group_mw: Vec<Arc<dyn Middleware>>,
    route_pattern: String,
    method: Method,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HeaderMap,
    peer: SocketAddr,
    uri: Uri,
    body: Bytes,
    services: ServiceContainer,
) -> Response {
    let facade_method = match HttpMethod::parse(method.as_str()) {
        Ok(m) => m,
        Err(_) => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    let header_map = headers_to_map(&headers);
    let client_ip = resolve_client_ip(&header_map, peer.ip());

    let ctx: Arc<dyn RequestContext> = Arc::new(AxumContext::new(
        facade_method,
        uri.path().to_string(),
        route_pattern,
        params,
        query,
        header_map,
        body.to_vec(),
        client_ip,
    ));

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
/// through the service container's logger, not the SDK's own internal
/// `tracing` bookkeeping, with the error reporter's stack trace attached.
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

fn response_from_ctx(ctx: &Arc<dyn RequestContext>) -> Response {
    let staged = ctx.staged_response();
    let mut builder = Response::builder()
        .status(staged.status)
        .header(axum::http::header::CONTENT_TYPE, staged.content_type);
    for (name, value) in &staged.headers {
        builder = builder.header(name, value);
    }
    builder
        .body(axum::body::Body::from(staged.body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
