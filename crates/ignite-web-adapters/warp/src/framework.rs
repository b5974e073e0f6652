//! warp adapter (C7): bridges the façade to a single composed `warp::Filter`.
//!
//! Warp's combinators describe routes at compile time; there is no live
//! router object to register into at runtime the way axum's `Router` or
//! actix's `App` allow. Instead every request flows through one filter chain
//! that extracts method/path/headers/query/body once, and the adapter
//! matches that request by hand against a snapshot of the registered route
//! table (see [`context::match_path`]).

use std::any::Any;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock as SyncRwLock};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use warp::Filter;
use warp::http::{Response, StatusCode};

use ignite_web::facade::{Handler, HttpMethod, Middleware, RequestContext, RequestContextExt, build_chain};
use ignite_web::{ServerConfig, ServiceContainer, WebError, WebFramework, WebResult};

use crate::context::{WarpContext, match_path, parse_query_string, resolve_client_ip};

type MiddlewareList = Arc<SyncRwLock<Vec<Arc<dyn Middleware>>>>;

#[derive(Clone)]
struct RouteEntry {
    method: HttpMethod,
    pattern: String,
    handler: Arc<dyn Handler>,
    group_mw: Vec<Arc<dyn Middleware>>,
}

type RouteTable = Arc<Mutex<Vec<RouteEntry>>>;

struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

pub struct WarpFramework {
    config: ServerConfig,
    services: ServiceContainer,
    routes: RouteTable,
    framework_middlewares: MiddlewareList,
    server: Option<ServerHandle>,
}

impl WarpFramework {
    pub fn new(config: ServerConfig, services: ServiceContainer) -> Self {
        let builtins = ignite_web::middleware::builtins_from_config(&config);
        Self {
            config,
            services,
            routes: Arc::new(Mutex::new(Vec::new())),
            framework_middlewares: Arc::new(SyncRwLock::new(builtins)),
            server: None,
        }
    }
}

#[async_trait]
impl WebFramework for WarpFramework {
    fn register_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        self.routes.lock().push(RouteEntry {
            method,
            pattern: path.to_string(),
            handler,
            group_mw: Vec::new(),
        });
        Ok(())
    }

    fn register_middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.framework_middlewares.write().push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(WarpRouteGroup {
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
        // warp has no standing router object outside the composed filter
        // handed to `warp::serve` inside `start`.
        &()
    }

    async fn start(&mut self) -> WebResult<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|err| WebError::ConfigInvalid(format!("invalid listen address: {err}")))?;

        if self.config.tls.enabled {
            tracing::warn!(
                "TLS requested in server config but the warp adapter does not terminate TLS itself; \
                 terminate TLS upstream (e.g. a reverse proxy) or layer a TLS-capable listener"
            );
        }

        let routes = Arc::clone(&self.routes);
        let framework_mw = Arc::clone(&self.framework_middlewares);
        let filter = build_filter(routes, framework_mw, self.services.clone());

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (_, server_future) = warp::serve(filter).bind_with_graceful_shutdown(addr, async {
            let _ = shutdown_rx.await;
        });

        let join = tokio::spawn(server_future);
        self.server = Some(ServerHandle { shutdown_tx, join });
        tracing::info!(%addr, "warp adapter listening");
        Ok(())
    }

    async fn stop(&mut self) -> WebResult<()> {
        let Some(handle) = self.server.take() else {
            return Ok(());
        };
        let _ = handle.shutdown_tx.send(());
        handle
            .join
            .await
            .map_err(|err| WebError::Handler(format!("warp server task panicked: {err}")))
    }
}

pub struct WarpRouteGroup {
    prefix: String,
    middlewares: Vec<Arc<dyn Middleware>>,
    framework_middlewares: MiddlewareList,
    routes: RouteTable,
}

impl WarpRouteGroup {
    fn full_path(&self, path: &str) -> String {
        format!("{}{}", self.prefix, normalize_prefix(path))
    }
}

impl ignite_web::RouteGroup for WarpRouteGroup {
    fn route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()> {
        self.routes.lock().push(RouteEntry {
            method,
            pattern: self.full_path(path),
            handler,
            group_mw: self.middlewares.clone(),
        });
        Ok(())
    }

    fn middleware(&mut self, mw: Arc<dyn Middleware>) {
        self.middlewares.push(mw);
    }

    fn group(&mut self, prefix: &str) -> Box<dyn ignite_web::RouteGroup> {
        Box::new(WarpRouteGroup {
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

/// A `warp::query::raw()` that tolerates a missing query string instead of
/// rejecting the request, via the standard `.or(...).unify()` trick.
fn optional_raw_query() -> impl Filter<Extract = (String,), Error = Infallible> + Clone {
    warp::query::raw()
        .or(warp::any().map(String::new))
        .unify()
}

fn build_filter(
    routes: RouteTable,
    framework_mw: MiddlewareList,
    services: ServiceContainer,
) -> impl Filter<Extract = (Response<Vec<u8>>,), Error = Infallible> + Clone {
    warp::method()
        .and(warp::path::full())
        .and(optional_raw_query())
        .and(warp::header::headers_cloned())
        .and(warp::addr::remote())
        .and(warp::body::bytes())
        .and_then(move |method, path, query, headers, remote, body| {
            let routes = Arc::clone(&routes);
            let framework_mw = Arc::clone(&framework_mw);
            let services = services.clone();
            async move {
                Ok::<_, Infallible>(
                    dispatch(routes, framework_mw, method, path, query, headers, remote, body, services).await,
                )
            }
        })
}

#[allow(clippy::too_many_arguments)]
async fn dispatch(
    routes: RouteTable,
    framework_mw: MiddlewareList,
    method: warp::http::Method,
    path: warp::path::FullPath,
    raw_query: String,
    headers: warp::http::HeaderMap,
    remote: Option<SocketAddr>,
    body: warp::hyper::body::Bytes,
    services: ServiceContainer,
) -> Response<Vec<u8>> {
    let facade_method = match HttpMethod::parse(method.as_str()) {
        Ok(m) => m,
        Err(_) => return plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed"),
    };

    let header_map: HashMap<String, String> = headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect();

    let entries = routes.lock().clone();
    let mut path_matched = false;
    let matched = entries.iter().find_map(|entry| {
        let params = match_path(&entry.pattern, path.as_str())?;
        path_matched = true;
        if entry.method == facade_method { Some((entry.clone(), params)) } else { None }
    });

    let Some((entry, params)) = matched else {
        return if path_matched {
            plain_response(StatusCode::METHOD_NOT_ALLOWED, "method not allowed")
        } else {
            plain_response(StatusCode::NOT_FOUND, "not found")
        };
    };

    let client_ip = resolve_client_ip(&header_map, remote.map(|addr| addr.ip()));
    let query = parse_query_string(&raw_query);

    let ctx: Arc<dyn RequestContext> = Arc::new(WarpContext::new(
        facade_method,
        path.as_str().to_string(),
        entry.pattern.clone(),
        params,
        query,
        header_map,
        body.to_vec(),
        client_ip,
    ));

    let framework_snapshot: Vec<Arc<dyn Middleware>> = framework_mw.read().clone();
    let chain = build_chain(&framework_snapshot, &entry.group_mw, Arc::clone(&entry.handler));

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

fn plain_response(status: StatusCode, message: &str) -> Response<Vec<u8>> {
    Response::builder()
        .status(status)
        .header("content-type", "text/plain; charset=utf-8")
        .body(message.as_bytes().to_vec())
        .unwrap_or_else(|_| Response::new(Vec::new()))
}

fn response_from_ctx(ctx: &Arc<dyn RequestContext>) -> Response<Vec<u8>> {
    let staged = ctx.staged_response();
    let status = StatusCode::from_u16(staged.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder()
        .status(status)
        .header("content-type", staged.content_type);
    for (name, value) in &staged.headers {
        builder = builder.header(name, value);
    }
    builder.body(staged.body).unwrap_or_else(|_| Response::new(Vec::new()))
}
