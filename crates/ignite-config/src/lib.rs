//! Typed configuration loading for ignite applications.
//!
//! Three cooperating pieces, mirroring §2's C1–C3:
//!
//! - [`defaults`] — tag-driven default injection, realised as generated code
//!   behind `#[derive(ignite_macros::Defaults)]` rather than runtime
//!   reflection (see §9's design note on static-language ports).
//! - [`loader`] — [`loader::load_config`] composes defaults, file decode,
//!   and environment overlay into one `figment::Figment` extraction.
//! - [`watch`] — [`watch::ReloadManager`] re-runs the loader on filesystem
//!   events and dispatches the result to registered callbacks in order.

pub mod defaults;
pub mod error;
pub mod loader;
pub mod watch;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, LoadOptions, load_config};
pub use watch::ReloadManager;

#[cfg(feature = "derive")]
pub use ignite_macros::Defaults;
