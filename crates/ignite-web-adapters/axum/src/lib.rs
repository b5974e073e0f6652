//! axum adapter for the `ignite-web` façade (C7).
//!
//! ```no_run
//! ignite_web_axum::install();
//! let mut config = ignite_web::ServerConfig::default();
//! config.framework = "axum".to_string();
//! let server = ignite_web::create_server(config, None).unwrap();
//! ```

mod context;
mod framework;
mod plugin;

pub use context::AxumContext;
pub use framework::{AxumFramework, AxumRouteGroup};
pub use plugin::{NAME, plugin};

/// Registers this adapter with the process-wide [`ignite_web::registry`].
/// Idempotent only in the sense that a second call returns
/// `Err(WebError::PluginExists)`, matching every other plugin registration.
pub fn install() -> ignite_web::WebResult<()> {
    ignite_web::register(plugin::plugin())
}
