//! Built-in middleware (§4.8): request logging, panic recovery, CORS.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::facade::framework::Middleware;

pub mod cors;
pub mod logger;
pub mod recovery;

pub use cors::Cors;
pub use logger::{RequestLogger, RequestLoggerConfig};
pub use recovery::{Recovery, RecoveryConfig};

/// Builds the framework-level built-ins enabled by `config.middleware`/
/// `config.cors` (§4.7 "Built-in logger/recovery/CORS middleware wiring"),
/// in the fixed order every adapter wires them in: request logging
/// outermost, so it still observes a request that panicked (Recovery turns
/// that into a normal 500 before logging ever sees it) or that a CORS
/// rejection short-circuited; recovery next, so a handler panic never
/// reaches CORS's own header-writing code mid-unwind; CORS innermost,
/// nearest the handler.
pub fn builtins_from_config(config: &ServerConfig) -> Vec<Arc<dyn Middleware>> {
    let mut mws: Vec<Arc<dyn Middleware>> = Vec::new();
    if config.middleware.logger.enabled {
        mws.push(Arc::new(RequestLogger::from_policy(&config.middleware.logger.policy)));
    }
    if config.middleware.recovery.enabled {
        mws.push(Arc::new(Recovery::from_policy(&config.middleware.recovery.policy)));
    }
    if config.cors.enabled {
        mws.push(Arc::new(Cors::new(config.cors.clone())));
    }
    mws
}
