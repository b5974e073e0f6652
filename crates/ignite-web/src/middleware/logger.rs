//! Built-in request logger middleware (§4.8): one structured record per
//! request, level chosen from the response status (or a handler error).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::WebResult;
use crate::facade::context::RequestContext;
use crate::facade::framework::{Middleware, Next};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestLoggerConfig {
    #[serde(default)]
    pub skip_paths: Vec<String>,
    #[serde(default)]
    pub log_request_body: bool,
    #[serde(default = "default_max_body_log_bytes")]
    pub max_body_log_bytes: usize,
}

fn default_max_body_log_bytes() -> usize {
    2048
}

impl Default for RequestLoggerConfig {
    fn default() -> Self {
        Self {
            skip_paths: Vec::new(),
            log_request_body: false,
            max_body_log_bytes: default_max_body_log_bytes(),
        }
    }
}

pub struct RequestLogger {
    config: RequestLoggerConfig,
}

impl RequestLogger {
    pub fn new(config: RequestLoggerConfig) -> Self {
        Self { config }
    }

    /// Builds a logger from a [`crate::config::MiddlewareToggle`] policy bag,
    /// falling back to defaults on an empty or malformed policy.
    pub fn from_policy(policy: &serde_json::Value) -> Self {
        let config = serde_json::from_value(policy.clone()).unwrap_or_default();
        Self::new(config)
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new(RequestLoggerConfig::default())
    }
}

#[async_trait]
impl Middleware for RequestLogger {
    async fn process(&self, ctx: Arc<dyn RequestContext>, next: Next) -> WebResult<()> {
        if self.config.skip_paths.iter().any(|p| p == ctx.path()) {
            return next.call(ctx).await;
        }

        let method = ctx.method().to_string();
        let path = ctx.path().to_string();
        let route_pattern = ctx.route_pattern().to_string();
        let client_ip = ctx.client_ip().map(|ip| ip.to_string()).unwrap_or_default();
        let user_agent = ctx.header("user-agent").unwrap_or_default().to_string();
        let body_snippet = if self.config.log_request_body {
            let body = ctx.body();
            let truncated = &body[..body.len().min(self.config.max_body_log_bytes)];
            String::from_utf8_lossy(truncated).into_owned()
        } else {
            String::new()
        };

        let start = Instant::now();
        let result = next.call(ctx.clone()).await;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        let status = ctx.staged_response().status;

        let log = ignite_log::global().with_name("http");
        let mut fields: Vec<(&str, ignite_log::Field)> = vec![
            ("method", method.into()),
            ("path", path.into()),
            ("route", route_pattern.into()),
            ("status", (status as i64).into()),
            ("latency_ms", latency_ms.into()),
            ("client_ip", client_ip.into()),
            ("user_agent", user_agent.into()),
        ];
        if self.config.log_request_body {
            fields.push(("body", body_snippet.into()));
        }

        match &result {
            Err(err) => log.errorw(&format!("request failed: {err}"), &fields),
            Ok(()) if status >= 500 => log.errorw("request completed", &fields),
            Ok(()) if status >= 400 => log.warnw("request completed", &fields),
            Ok(()) if status >= 300 => log.infow("request completed", &fields),
            Ok(()) => log.debugw("request completed", &fields),
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facade::context::{HttpMethod, LocalStore, StagedResponse};
    use crate::facade::framework::{Handler, build_chain};
    use std::sync::Mutex;

    struct StubContext {
        path: String,
        response: Mutex<StagedResponse>,
        locals: LocalStore,
    }

    impl StubContext {
        fn new(path: &str) -> Self {
            Self { path: path.to_string(), response: Mutex::new(StagedResponse::default()), locals: LocalStore::new() }
        }
    }

    impl RequestContext for StubContext {
        fn method(&self) -> HttpMethod {
            HttpMethod::Get
        }
        fn path(&self) -> &str {
            &self.path
        }
        fn route_pattern(&self) -> &str {
            &self.path
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
        async fn handle(&self, ctx: Arc<dyn RequestContext>) -> WebResult<()> {
            ctx.write_status(201);
            Ok(())
        }
    }

    #[test]
    fn default_config_has_a_2kb_body_cap() {
        let config = RequestLoggerConfig::default();
        assert_eq!(config.max_body_log_bytes, 2048);
        assert!(!config.log_request_body);
        assert!(config.skip_paths.is_empty());
    }

    #[test]
    fn from_policy_falls_back_to_defaults_on_malformed_json() {
        let logger = RequestLogger::from_policy(&serde_json::json!("not an object"));
        assert_eq!(logger.config.max_body_log_bytes, 2048);
    }

    #[test]
    fn from_policy_reads_skip_paths() {
        let logger =
            RequestLogger::from_policy(&serde_json::json!({ "skip_paths": ["/healthz"] }));
        assert_eq!(logger.config.skip_paths, vec!["/healthz".to_string()]);
    }

    #[tokio::test]
    async fn skipped_path_still_reaches_the_handler() {
        let logger = RequestLogger::new(RequestLoggerConfig {
            skip_paths: vec!["/healthz".into()],
            ..RequestLoggerConfig::default()
        });
        let chain = build_chain(&[], &[], Arc::new(OkHandler));
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new("/healthz"));
        logger.process(Arc::clone(&ctx), chain).await.unwrap();
        assert_eq!(ctx.staged_response().status, 201);
    }

    #[tokio::test]
    async fn non_skipped_path_still_reaches_the_handler_and_logs() {
        let logger = RequestLogger::default();
        let chain = build_chain(&[], &[], Arc::new(OkHandler));
        let ctx: Arc<dyn RequestContext> = Arc::new(StubContext::new("/widgets"));
        logger.process(Arc::clone(&ctx), chain).await.unwrap();
        assert_eq!(ctx.staged_response().status, 201);
    }
}
