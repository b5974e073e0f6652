//! Built-in CORS middleware (§4.8).
//!
//! §9 flags two native-adapter CORS designs as inconsistent: one adapter
//! short-circuits preflights itself, another delegates to the underlying
//! framework's own CORS layer. Here that's unified by never touching a
//! native CORS layer at all — this middleware always decides and answers
//! preflights itself, at the façade level, so behaviour is identical no
//! matter which adapter is underneath.
//!
//! Also folds in the `Access-Control-Max-Age` fix: the header value is
//! always written as a plain decimal string, never as a single character
//! produced by casting the integer to a Unicode code point.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::CorsConfig;
use crate::error::WebResult;
use crate::facade::context::RequestContext;
use crate::facade::framework::{Middleware, Next};

pub struct Cors {
    config: CorsConfig,
}

impl Cors {
    pub fn new(config: CorsConfig) -> Self {
        Self { config }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        if self.config.allow_origins.is_empty() {
            return true;
        }
        self.config
            .allow_origins
            .iter()
            .any(|allowed| allowed == "*" || allowed == origin)
    }

    /// The value to echo back in `Access-Control-Allow-Origin`. Wildcard
    /// origins collapse to `*` unless credentials are allowed, in which case
    /// the concrete origin must be echoed (the fetch spec forbids pairing a
    /// wildcard origin with `Allow-Credentials: true`).
    fn allow_origin_value(&self, origin: &str) -> String {
        let wildcard = self.config.allow_origins.is_empty()
            || self.config.allow_origins.iter().any(|o| o == "*");
        if wildcard && !self.config.allow_credentials {
            "*".to_string()
        } else {
            origin.to_string()
        }
    }

    fn is_preflight(&self, ctx: &Arc<dyn RequestContext>) -> bool {
        ctx.method() == crate::facade::context::HttpMethod::Options
            && ctx.header("access-control-request-method").is_some()
    }

    fn apply_response_headers(&self, ctx: &Arc<dyn RequestContext>, origin: &str) {
        ctx.write_header("Access-Control-Allow-Origin", &self.allow_origin_value(origin));
        if self.config.allow_credentials {
            ctx.write_header("Access-Control-Allow-Credentials", "true");
        }
        if !self.config.expose_headers.is_empty() {
            ctx.write_header(
                "Access-Control-Expose-Headers",
                &self.config.expose_headers.join(", "),
            );
        }
        ctx.write_header("Vary", "Origin");
    }
}

#[async_trait]
impl Middleware for Cors {
    async fn process(&self, ctx: Arc<dyn RequestContext>, next: Next) -> WebResult<()> {
        if !self.config.enabled {
            return next.call(ctx).await;
        }

        let origin = match ctx.header("origin") {
            Some(origin) => origin.to_string(),
            None => return next.call(ctx).await,
        };

        if self.is_preflight(&ctx) {
            if !self.origin_allowed(&origin) {
                ctx.write_status(403);
                return Ok(());
            }

            self.apply_response_headers(&ctx, &origin);

            let methods = if self.config.allow_methods.is_empty() {
                "GET, POST, PUT, PATCH, DELETE, OPTIONS".to_string()
            } else {
                self.config.allow_methods.join(", ")
            };
            ctx.write_header("Access-Control-Allow-Methods", &methods);

            let headers = if !self.config.allow_headers.is_empty() {
                self.config.allow_headers.join(", ")
            } else {
                ctx.header("access-control-request-headers")
                    .unwrap_or_default()
                    .to_string()
            };
            if !headers.is_empty() {
                ctx.write_header("Access-Control-Allow-Headers", &headers);
            }

            if self.config.max_age > Duration::ZERO {
                ctx.write_header(
                    "Access-Control-Max-Age",
                    &self.config.max_age.as_secs().to_string(),
                );
            }

            ctx.write_status(204);
            return Ok(());
        }

        if !self.origin_allowed(&origin) {
            ctx.write_status(403);
            return Ok(());
        }

        self.apply_response_headers(&ctx, &origin);
        next.call(ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::context::{HttpMethod, LocalStore, StagedResponse};
    use crate::facade::framework::{Handler, build_chain};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct StubContext {
        method: HttpMethod,
        headers: HashMap<String, String>,
        response: Mutex<StagedResponse>,
        locals: LocalStore,
    }

    impl StubContext {
        fn new(method: HttpMethod, headers: &[(&str, &str)]) -> Self {
            Self {
                method,
                headers: headers.iter().map(|(k, v)| (k.to_lowercase(), v.to_string())).collect(),
                response: Mutex::new(StagedResponse::default()),
                locals: LocalStore::new(),
            }
        }
    }

    impl RequestContext for StubContext {
        fn method(&self) -> HttpMethod {
            self.method
        }
        fn path(&self) -> &str {
            "/x"
        }
        fn route_pattern(&self) -> &str {
            "/x"
        }
        fn param(&self, _name: &str) -> Option<&str> {
            None
        }
        fn query(&self, _name: &str) -> Option<&str> {
            None
        }
        fn header(&self, name: &str) -> Option<&str> {
            self.headers.get(&name.to_lowercase()).map(String::as_str)
        }
        fn body(&self) -> &[u8] {
            &[]
        }
        fn client_ip(&self) -> Option<std::net::IpAddr> {
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

    struct OkHandler;

    #[async_trait]
    impl Handler for OkHandler {
        async fn handle(&self, _ctx: Arc<dyn RequestContext>) -> WebResult<()> {
            Ok(())
        }
    }

    async fn run(cors: Cors, ctx: Arc<dyn RequestContext>) -> WebResult<()> {
        let chain = build_chain(&[], &[], Arc::new(OkHandler));
        cors.process(ctx, chain).await
    }

    fn header(response: &StagedResponse, name: &str) -> Option<String> {
        response.headers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v.clone())
    }

    /// §8 concrete scenario 5: an allowed preflight returns 204 with the
    /// echoed origin and the configured methods.
    #[tokio::test]
    async fn allowed_preflight_replies_204_with_headers() {
        let config = CorsConfig {
            enabled: true,
            allow_origins: vec!["https://a.example".into()],
            allow_methods: vec!["POST".into()],
            ..CorsConfig::default()
        };
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new(
            HttpMethod::Options,
            &[("Origin", "https://a.example"), ("Access-Control-Request-Method", "POST")],
        ));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();

        let response = ctx.staged_response();
        assert_eq!(response.status, 204);
        assert_eq!(header(&response, "Access-Control-Allow-Origin").as_deref(), Some("https://a.example"));
        assert!(header(&response, "Access-Control-Allow-Methods").unwrap().contains("POST"));
    }

    #[tokio::test]
    async fn disallowed_preflight_origin_is_rejected() {
        let config = CorsConfig {
            enabled: true,
            allow_origins: vec!["https://a.example".into()],
            ..CorsConfig::default()
        };
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new(
            HttpMethod::Options,
            &[("Origin", "https://evil.example"), ("Access-Control-Request-Method", "POST")],
        ));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();
        assert_eq!(ctx.staged_response().status, 403);
    }

    /// §8 boundary behaviour: OPTIONS without `Access-Control-Request-Method`
    /// is an ordinary request, not a preflight.
    #[tokio::test]
    async fn options_without_acrm_header_is_not_a_preflight() {
        let config = CorsConfig { enabled: true, ..CorsConfig::default() };
        let ctx: Arc<dyn RequestContext> =
            Arc::new(StubContext::new(HttpMethod::Options, &[("Origin", "https://a.example")]));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();
        assert_ne!(ctx.staged_response().status, 204);
    }

    /// An ordinary request from a disallowed origin gets 403 and the chain
    /// never reaches the handler.
    #[tokio::test]
    async fn ordinary_request_from_disallowed_origin_is_rejected() {
        let config = CorsConfig {
            enabled: true,
            allow_origins: vec!["https://a.example".into()],
            ..CorsConfig::default()
        };
        let ctx: Arc<dyn RequestContext> =
            Arc::new(StubContext::new(HttpMethod::Get, &[("Origin", "https://evil.example")]));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();
        assert_eq!(ctx.staged_response().status, 403);
    }

    #[tokio::test]
    async fn max_age_is_written_as_plain_decimal_string() {
        let config = CorsConfig {
            enabled: true,
            allow_origins: vec!["*".into()],
            max_age: Duration::from_secs(600),
            ..CorsConfig::default()
        };
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new(
            HttpMethod::Options,
            &[("Origin", "https://a.example"), ("Access-Control-Request-Method", "GET")],
        ));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();
        assert_eq!(header(&ctx.staged_response(), "Access-Control-Max-Age").as_deref(), Some("600"));
    }

    #[tokio::test]
    async fn disabled_cors_passes_through_without_headers() {
        let config = CorsConfig { enabled: false, ..CorsConfig::default() };
        let ctx: Arc<dyn RequestContext> =
            Arc::new(StubContext::new(HttpMethod::Get, &[("Origin", "https://a.example")]));
        run(Cors::new(config), Arc::clone(&ctx)).await.unwrap();
        assert!(header(&ctx.staged_response(), "Access-Control-Allow-Origin").is_none());
    }
}
