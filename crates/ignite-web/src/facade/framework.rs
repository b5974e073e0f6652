//! The C5 trait contracts: `WebFramework`, `Handler`, `Middleware`,
//! `RouteGroup`. Adapters (axum/actix/warp) implement these; application code
//! only ever sees them through the façade.

use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::ServerConfig;
use crate::error::WebResult;
use crate::facade::context::{HttpMethod, RequestContext};

#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: Arc<dyn RequestContext>) -> WebResult<()>;
}

/// Blanket impl so a plain async closure can be registered directly, the way
/// handlers are written in practice.
#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Arc<dyn RequestContext>) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = WebResult<()>> + Send,
{
    async fn handle(&self, ctx: Arc<dyn RequestContext>) -> WebResult<()> {
        (self)(ctx).await
    }
}

/// The continuation a [`Middleware`] calls to hand control to the next link
/// in the chain. Owning `self` by value in [`Next::call`] means a second call
/// is a move-after-use compile error rather than a runtime invariant to
/// police (§3 "middleware `next()` called at most once").
#[derive(Clone)]
pub struct Next {
    chain: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    handler: Arc<dyn Handler>,
}

impl Next {
    pub fn new(chain: Arc<[Arc<dyn Middleware>]>, handler: Arc<dyn Handler>) -> Self {
        Self { chain, index: 0, handler }
    }

    pub async fn call(mut self, ctx: Arc<dyn RequestContext>) -> WebResult<()> {
        match self.chain.get(self.index).cloned() {
            Some(mw) => {
                self.index += 1;
                mw.process(ctx, self).await
            }
            None => self.handler.handle(ctx).await,
        }
    }
}

#[async_trait]
pub trait Middleware: Send + Sync {
    async fn process(&self, ctx: Arc<dyn RequestContext>, next: Next) -> WebResult<()>;
}

/// Builds the per-request chain for one route: framework-level middlewares
/// first, then the route's group-level middlewares outermost-to-innermost,
/// then the handler (§4.8 "Chain semantics"). Shared by every adapter so the
/// dispatch order is identical regardless of the native engine underneath.
pub fn build_chain(
    framework_mw: &[Arc<dyn Middleware>],
    group_mw: &[Arc<dyn Middleware>],
    handler: Arc<dyn Handler>,
) -> Next {
    let mut chain = Vec::with_capacity(framework_mw.len() + group_mw.len());
    chain.extend_from_slice(framework_mw);
    chain.extend_from_slice(group_mw);
    Next::new(chain.into(), handler)
}

/// A scoped set of routes sharing a path prefix and a middleware stack
/// (§3 `RouteGroup`). `group` nests a further prefix/middleware scope.
pub trait RouteGroup: Send + Sync {
    fn route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()>;

    fn middleware(&mut self, mw: Arc<dyn Middleware>);

    fn group(&mut self, prefix: &str) -> Box<dyn RouteGroup>;
}

/// The native-engine-agnostic server contract every adapter implements (C5).
#[async_trait]
pub trait WebFramework: Send + Sync {
    fn register_route(
        &mut self,
        method: HttpMethod,
        path: &str,
        handler: Arc<dyn Handler>,
    ) -> WebResult<()>;

    fn register_middleware(&mut self, mw: Arc<dyn Middleware>);

    fn group(&mut self, prefix: &str) -> Box<dyn RouteGroup>;

    fn config(&self) -> &ServerConfig;

    /// Escape hatch to the concrete `axum::Router` / `actix_web::App` /
    /// `warp::Filter` underneath, downcast by callers that need it.
    fn native_engine(&self) -> &dyn Any;

    async fn start(&mut self) -> WebResult<()>;
    async fn stop(&mut self) -> WebResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WebError;
    use crate::facade::context::{HttpMethod, LocalStore, StagedResponse};
    use std::net::IpAddr;
    use std::sync::Mutex;

    struct StubContext {
        response: Mutex<StagedResponse>,
        locals: LocalStore,
    }

    impl StubContext {
        fn new() -> Self {
            Self { response: Mutex::new(StagedResponse::default()), locals: LocalStore::new() }
        }
    }

    impl RequestContext for StubContext {
        fn method(&self) -> HttpMethod {
            HttpMethod::Get
        }
        fn path(&self) -> &str {
            "/widgets"
        }
        fn route_pattern(&self) -> &str {
            "/widgets"
        }
        fn param(&self, _name: &str) -> Option<&str> {
            None
        }
        fn query(&self, _name: &str) -> Option<&str> {
            None
        }
        fn header(&self, _name: &str) -> Option<&str> {
            None
        }
        fn body(&self) -> &[u8] {
            &[]
        }
        fn client_ip(&self) -> Option<IpAddr> {
            None
        }
        fn locals(&self) -> &LocalStore {
            &self.locals
        }
        fn write_status(&self, status: u16) {
            self.response.lock().unwrap().status = status;
        }
        fn write_bytes(&self, status: u16, content_type: &str, body: Vec<u8>) {
            let mut r = self.response.lock().unwrap();
            r.status = status;
            r.content_type = content_type.to_string();
            r.body = body;
        }
        fn write_header(&self, name: &str, value: &str) {
            self.response.lock().unwrap().headers.push((name.to_string(), value.to_string()));
        }
        fn staged_response(&self) -> StagedResponse {
            self.response.lock().unwrap().clone()
        }
    }

    struct RecordingMiddleware {
        tag: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Middleware for RecordingMiddleware {
        async fn process(&self, ctx: Arc<dyn RequestContext>, next: Next) -> WebResult<()> {
            self.order.lock().unwrap().push(self.tag);
            next.call(ctx).await
        }
    }

    struct RecordingHandler {
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Handler for RecordingHandler {
        async fn handle(&self, _ctx: Arc<dyn RequestContext>) -> WebResult<()> {
            self.order.lock().unwrap().push("handler");
            Ok(())
        }
    }

    /// §8 invariant 8: framework-level middlewares run before group-level
    /// ones, observed order is M1→M2→…→Mn→H.
    #[tokio::test]
    async fn chain_runs_framework_then_group_then_handler() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let framework_mw: Vec<Arc<dyn Middleware>> = vec![Arc::new(RecordingMiddleware {
            tag: "framework",
            order: Arc::clone(&order),
        })];
        let group_mw: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(RecordingMiddleware { tag: "group-outer", order: Arc::clone(&order) }),
            Arc::new(RecordingMiddleware { tag: "group-inner", order: Arc::clone(&order) }),
        ];
        let handler = Arc::new(RecordingHandler { order: Arc::clone(&order) });

        let chain = build_chain(&framework_mw, &group_mw, handler);
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new());
        chain.call(ctx).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["framework", "group-outer", "group-inner", "handler"]);
    }

    struct ShortCircuitMiddleware;

    #[async_trait]
    impl Middleware for ShortCircuitMiddleware {
        async fn process(&self, ctx: Arc<dyn RequestContext>, _next: Next) -> WebResult<()> {
            ctx.write_status(403);
            Ok(())
        }
    }

    /// Not calling `next()` terminates the chain: a downstream middleware
    /// and the handler never run.
    #[tokio::test]
    async fn skipping_next_short_circuits_the_chain() {
        let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
        let framework_mw: Vec<Arc<dyn Middleware>> = vec![Arc::new(ShortCircuitMiddleware)];
        let group_mw: Vec<Arc<dyn Middleware>> = vec![Arc::new(RecordingMiddleware {
            tag: "never-reached",
            order: Arc::clone(&order),
        })];
        let handler = Arc::new(RecordingHandler { order: Arc::clone(&order) });

        let chain = build_chain(&framework_mw, &group_mw, handler);
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new());
        chain.call(Arc::clone(&ctx)).await.unwrap();

        assert!(order.lock().unwrap().is_empty());
        assert_eq!(ctx.staged_response().status, 403);
    }

    /// Errors propagate outward exactly once (§8 invariant 8): a failing
    /// handler's error reaches the outermost caller unchanged.
    #[tokio::test]
    async fn handler_error_propagates_to_the_caller() {
        struct FailingHandler;
        #[async_trait]
        impl Handler for FailingHandler {
            async fn handle(&self, _ctx: Arc<dyn RequestContext>) -> WebResult<()> {
                Err(WebError::Handler("boom".into()))
            }
        }

        let chain = build_chain(&[], &[], Arc::new(FailingHandler));
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new());
        let err = chain.call(ctx).await.unwrap_err();
        assert!(matches!(err, WebError::Handler(msg) if msg == "boom"));
    }
}
