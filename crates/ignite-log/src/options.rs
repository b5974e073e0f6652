use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::encode::Format;
use crate::level::Level;

/// Rotation policy for a file sink: size, backup count, max age, compression.
/// `stdout`/`stderr` sinks ignore this entirely (§4.4 "special sentinel
/// sinks with no rotation").
#[derive(Debug, Clone, ignite_config::Defaults, Serialize, Deserialize)]
pub struct RotationOptions {
    #[ignite(default = "100")]
    pub max_size_mb: u64,
    #[ignite(default = "5")]
    pub max_backups: usize,
    #[ignite(default = "720h")]
    pub max_age: Duration,
    #[ignite(default = "true")]
    pub compress: bool,
}

impl Default for RotationOptions {
    fn default() -> Self {
        Self {
            max_size_mb: 0,
            max_backups: 0,
            max_age: Duration::ZERO,
            compress: false,
        }
    }
}

/// Construction parameters for the logger core (C4), mirroring §3's
/// `LogOptions`.
#[derive(Debug, Clone, ignite_config::Defaults, Serialize, Deserialize)]
pub struct LogOptions {
    /// Not tag-defaulted: enums fall outside the scalar/sequence/duration
    /// forms §4.1 parses, so the concrete default lives in `impl Default`.
    pub level: Level,
    pub format: Format,
    /// Output paths: `"stdout"`, `"stderr"`, or a filesystem path.
    #[ignite(default = "stdout")]
    pub outputs: Vec<String>,
    /// Separate sink list for error-and-above records; empty reuses `outputs`.
    pub error_outputs: Vec<String>,
    pub caller: bool,
    pub stacktrace: bool,
    pub stacktrace_level: Level,
    pub color: bool,
    #[ignite(nested)]
    pub rotation: RotationOptions,
    pub name: Option<String>,
    /// Descriptors for the custom context keys the logger auto-extracts on
    /// every `Ctx*` call (§3 `LogOptions`, §4.4 "every custom key descriptor
    /// configured at init"). A key attached at a call site via
    /// [`crate::context::Context::with_custom`] only reaches the emitted
    /// record if its name appears here; this is what makes `LogOptions`
    /// round-trip through config instead of leaving the extraction set as
    /// ambient call-site state.
    pub context_keys: Vec<String>,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            level: Level::default(),
            format: Format::default(),
            // Mirrors the `default = "stdout"` tag: a bare `LogOptions::default()`
            // (used for the bootstrap global logger, before any `init` call)
            // should behave sensibly without going through the config loader.
            outputs: vec!["stdout".to_string()],
            error_outputs: Vec::new(),
            caller: false,
            stacktrace: false,
            stacktrace_level: Level::Error,
            color: false,
            rotation: RotationOptions::default(),
            name: None,
            context_keys: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ignite_config::LoadOptions;

    #[test]
    fn tag_defaults_apply_through_the_config_loader() {
        let opts = LoadOptions::new();
        let loaded: LogOptions = ignite_config::load_config(&opts).unwrap();
        assert_eq!(loaded.outputs, vec!["stdout".to_string()]);
        assert_eq!(loaded.rotation.max_size_mb, 100);
        assert_eq!(loaded.rotation.max_backups, 5);
        assert!(loaded.rotation.compress);
        assert_eq!(loaded.rotation.max_age, Duration::from_secs(720 * 3600));
    }

    #[test]
    fn builtin_default_picks_info_and_error_threshold() {
        let opts = LogOptions::default();
        assert_eq!(opts.level, Level::Info);
        assert_eq!(opts.stacktrace_level, Level::Error);
    }
}
