//! # ignite
//!
//! Typed configuration, structured logging, and a pluggable web server
//! façade for Rust services, unified behind one crate.
//!
//! ## Overview
//!
//! ignite is split into three cooperating layers:
//!
//! - [`ignite_config`] — tag-driven config defaults, layered file/env
//!   loading via `figment`, and a filesystem-watching hot-reload manager.
//! - [`ignite_log`] — a level-filtered structured logger with pluggable
//!   encodings (JSON/text/key-value) and rotating file sinks.
//! - [`ignite_web`] — a framework-agnostic web server façade: request
//!   context, middleware chain, plugin registry, and lifecycle manager. The
//!   concrete HTTP engine is selected at build time through this crate's
//!   `axum` / `actix` / `warp` features.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use ignite::prelude::*;
//!
//! #[derive(serde::Deserialize, serde::Serialize, ignite_config::Defaults, Clone, Debug)]
//! struct AppConfig {
//!     #[ignite(nested)]
//!     server: ServerConfig,
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config: AppConfig = ignite::config::load_config(LoadOptions::default().file("app.yaml"))?;
//!     ignite_log::init(LogOptions::default())?;
//!
//! #    #[cfg(feature = "axum")]
//!     ignite_web_axum::install()?;
//!
//!     let mut server = ignite::web::create_server(config.server, None)?;
//!     server.start().await?;
//!     Ok(())
//! }
//! ```

pub use ignite_config as config;
pub use ignite_log as log;
pub use ignite_web as web;

#[cfg(feature = "axum")]
pub use ignite_web_axum as axum_adapter;
#[cfg(feature = "actix")]
pub use ignite_web_actix as actix_adapter;
#[cfg(feature = "warp")]
pub use ignite_web_warp as warp_adapter;

/// Convenience imports for building a service on top of ignite.
pub mod prelude {
    pub use ignite_config::{ConfigError, LoadOptions, ReloadManager, load_config};
    pub use ignite_log::{Field, Level, LogOptions, Logger};
    pub use ignite_web::{
        ErrorReporter, Handler, HttpMethod, MiddlewareTrait, RequestContext, RequestContextExt,
        RouteGroup, ServerConfig, ServerManager, ServiceContainer, WebError, WebFramework,
    };

    #[cfg(feature = "axum")]
    pub use ignite_web_axum;
    #[cfg(feature = "actix")]
    pub use ignite_web_actix;
    #[cfg(feature = "warp")]
    pub use ignite_web_warp;
}
