//! Level-filtered structured logging (C4): multi-sink encoding, context
//! extraction, reconfiguration behind a single atomically-swapped pointer.
//!
//! ```rust,ignore
//! ignite_log::init(ignite_log::LogOptions {
//!     level: ignite_log::Level::Info,
//!     format: ignite_log::Format::Json,
//!     ..Default::default()
//! })?;
//!
//! let log = ignite_log::global().with_name("server");
//! log.infow("listening", &[("addr", "0.0.0.0:8080".into())]);
//! ```

pub mod context;
pub mod encode;
pub mod error;
pub mod field;
pub mod level;
pub mod logger;
pub mod options;
pub mod reload;
pub mod record;
pub mod sink;

pub use context::Context;
pub use encode::Format;
pub use error::LogError;
pub use field::Field;
pub use level::Level;
pub use logger::{Logger, global, init};
pub use options::{LogOptions, RotationOptions};
pub use record::LogRecord;
pub use sink::Sink;
