//! Built-in panic-recovery middleware (§4.8): a barrier that turns a handler
//! panic into a logged `L=error` record plus a JSON 500, instead of taking
//! the whole worker down.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};

use crate::error::WebResult;
use crate::facade::context::{RequestContext, RequestContextExt};
use crate::facade::framework::{Middleware, Next};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    #[serde(default = "default_true")]
    pub print_stack: bool,
    #[serde(default)]
    pub disable_stack_all: bool,
}

fn default_true() -> bool {
    true
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self { print_stack: true, disable_stack_all: false }
    }
}

pub struct Recovery {
    config: RecoveryConfig,
}

impl Recovery {
    pub fn new(config: RecoveryConfig) -> Self {
        Self { config }
    }

    pub fn from_policy(policy: &serde_json::Value) -> Self {
        let config = serde_json::from_value(policy.clone()).unwrap_or_default();
        Self::new(config)
    }
}

impl Default for Recovery {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

#[async_trait]
impl Middleware for Recovery {
    async fn process(&self, ctx: Arc<dyn RequestContext>, next: Next) -> WebResult<()> {
        let caught = AssertUnwindSafe(next.call(ctx.clone())).catch_unwind().await;

        match caught {
            Ok(result) => result,
            Err(panic) => {
                let message = panic_message(&panic);
                let log = ignite_log::global().with_name("http.recovery");
                let mut fields = vec![("panic", ignite_log::Field::from(message.clone()))];
                if self.config.print_stack && !self.config.disable_stack_all {
                    let trace = std::backtrace::Backtrace::force_capture().to_string();
                    fields.push(("stack", ignite_log::Field::from(trace)));
                }
                log.errorw("handler panicked", &fields);

                if ctx.staged_response().status == 200 {
                    ctx.write_internal_error(&message);
                }
                Ok(())
            }
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
