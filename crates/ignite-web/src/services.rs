//! Service container (§3, §6): the bundle of cross-cutting collaborators —
//! a [`Logger`](ignite_log::Logger) and an [`ErrorReporter`] — handed to a
//! plugin's [`FrameworkPlugin::build`](crate::registry::FrameworkPlugin)
//! alongside a [`ServerConfig`](crate::config::ServerConfig), and threaded
//! through to every adapter's handler-bridging code so uncaught handler
//! errors are logged through the same collaborator the application supplied
//! rather than the SDK's own internal `tracing` bookkeeping.

use std::sync::Arc;

use ignite_log::Logger;

/// `GetStackTrace(error) -> string` from §6. Kept as a trait rather than a
/// concrete type so an application can plug in whatever error-reporting
/// service it already runs (Sentry, a custom tracer, ...).
pub trait ErrorReporter: Send + Sync {
    fn stack_trace(&self, err: &(dyn std::error::Error + 'static)) -> String;
}

/// The identity reporter: `GetStackTrace` just renders `Display`. Used when
/// an application hasn't wired up anything richer — see
/// [`ServiceContainer::default`].
pub struct IdentityErrorReporter;

impl ErrorReporter for IdentityErrorReporter {
    fn stack_trace(&self, err: &(dyn std::error::Error + 'static)) -> String {
        err.to_string()
    }
}

/// Bundle handed from application code to [`crate::registry::FrameworkRegistry::create_server`]
/// and on into the chosen adapter's constructor.
#[derive(Clone)]
pub struct ServiceContainer {
    pub logger: Logger,
    pub error_reporter: Arc<dyn ErrorReporter>,
}

impl ServiceContainer {
    pub fn new(logger: Logger, error_reporter: Arc<dyn ErrorReporter>) -> Self {
        Self { logger, error_reporter }
    }
}

/// §4.6 step 4: "if `services` is nil, substitute a default container
/// (stdout logger + identity error reporter)". `ignite_log::global()` is
/// itself stdout-backed until the application calls `ignite_log::init`, so
/// this is exactly that default without constructing a second logger.
impl Default for ServiceContainer {
    fn default() -> Self {
        Self {
            logger: ignite_log::global(),
            error_reporter: Arc::new(IdentityErrorReporter),
        }
    }
}
