//! `ServerConfig` and its sub-sections (§3).

use std::collections::HashMap;
use std::time::Duration;

use ignite_config::Defaults;
use serde::{Deserialize, Serialize};

use crate::error::{WebError, WebResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Debug,
    Release,
    Test,
}

impl Default for ServerMode {
    fn default() -> Self {
        ServerMode::Debug
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct TlsConfig {
    pub enabled: bool,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
    pub auto_domains: Vec<String>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            cert_path: None,
            key_path: None,
            auto_domains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct CorsConfig {
    pub enabled: bool,
    /// Empty or containing `*` (without credentials) means wildcard.
    pub allow_origins: Vec<String>,
    #[ignite(default = "GET,POST,PUT,PATCH,DELETE,OPTIONS")]
    pub allow_methods: Vec<String>,
    pub allow_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub allow_credentials: bool,
    #[ignite(default = "12h")]
    pub max_age: Duration,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allow_origins: Vec::new(),
            allow_methods: Vec::new(),
            allow_headers: Vec::new(),
            expose_headers: Vec::new(),
            allow_credentials: false,
            max_age: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct MiddlewareToggle {
    pub enabled: bool,
    /// Free-form policy bag (rate limits, auth scheme, skip-paths, ...),
    /// interpreted by the middleware that owns this toggle.
    pub policy: serde_json::Value,
}

impl Default for MiddlewareToggle {
    fn default() -> Self {
        Self {
            enabled: false,
            policy: serde_json::Value::Null,
        }
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct MiddlewareConfig {
    #[ignite(nested)]
    pub logger: MiddlewareToggle,
    #[ignite(nested)]
    pub recovery: MiddlewareToggle,
    #[ignite(nested)]
    pub rate_limit: MiddlewareToggle,
    #[ignite(nested)]
    pub auth: MiddlewareToggle,
}

impl Default for MiddlewareConfig {
    fn default() -> Self {
        Self {
            logger: MiddlewareToggle {
                enabled: true,
                policy: serde_json::Value::Null,
            },
            recovery: MiddlewareToggle {
                enabled: true,
                policy: serde_json::Value::Null,
            },
            rate_limit: MiddlewareToggle::default(),
            auth: MiddlewareToggle::default(),
        }
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct GracefulShutdownConfig {
    #[ignite(default = "true")]
    pub enabled: bool,
    #[ignite(default = "10s")]
    pub timeout: Duration,
    pub pre_stop_wait: Duration,
}

impl Default for GracefulShutdownConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            timeout: Duration::ZERO,
            pre_stop_wait: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Defaults, Serialize, Deserialize)]
pub struct ServerConfig {
    pub framework: String,
    #[ignite(default = "0.0.0.0")]
    pub host: String,
    #[ignite(default = "8080")]
    pub port: u16,
    pub mode: ServerMode,
    #[ignite(default = "15s")]
    pub read_timeout: Duration,
    #[ignite(default = "15s")]
    pub write_timeout: Duration,
    #[ignite(default = "60s")]
    pub idle_timeout: Duration,
    #[ignite(default = "1048576")]
    pub max_header_bytes: u32,
    #[ignite(nested)]
    pub tls: TlsConfig,
    #[ignite(nested)]
    pub cors: CorsConfig,
    #[ignite(nested)]
    pub middleware: MiddlewareConfig,
    #[ignite(nested)]
    pub graceful_shutdown: GracefulShutdownConfig,
    /// Plugin-specific tuning, keyed by plugin name.
    pub plugin_config: HashMap<String, serde_json::Value>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            framework: String::new(),
            host: String::new(),
            port: 0,
            mode: ServerMode::default(),
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            idle_timeout: Duration::ZERO,
            max_header_bytes: 0,
            tls: TlsConfig::default(),
            cors: CorsConfig::default(),
            middleware: MiddlewareConfig::default(),
            graceful_shutdown: GracefulShutdownConfig::default(),
            plugin_config: HashMap::new(),
        }
    }
}

impl ServerConfig {
    /// Validates post-load invariants (§8 boundary behaviours).
    pub fn validate(&self) -> WebResult<()> {
        if self.framework.trim().is_empty() {
            return Err(WebError::ConfigInvalid("framework name must not be empty".into()));
        }
        if self.port == 0 {
            return Err(WebError::ConfigInvalid(format!(
                "port {} out of range (1-65535)",
                self.port
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServerConfig {
        ServerConfig {
            framework: "axum".into(),
            port: 8080,
            ..ServerConfig::default()
        }
    }

    /// §8 boundary behaviour: port 0 -> `ErrConfigInvalid`.
    #[test]
    fn zero_port_is_invalid() {
        let cfg = ServerConfig { port: 0, ..valid() };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, WebError::ConfigInvalid(_)));
    }

    /// §8 boundary behaviour: empty framework name -> `ErrConfigInvalid`.
    #[test]
    fn empty_framework_name_is_invalid() {
        let cfg = ServerConfig { framework: "   ".into(), ..valid() };
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, WebError::ConfigInvalid(_)));
    }

    #[test]
    fn fully_populated_config_validates() {
        assert!(valid().validate().is_ok());
    }

    /// `port: u16` already rejects anything above 65535 at the type level;
    /// the widest representable value must still pass validation.
    #[test]
    fn max_u16_port_is_valid() {
        let cfg = ServerConfig { port: 65535, ..valid() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn tag_defaults_apply_through_the_config_loader() {
        let loaded: ServerConfig =
            ignite_config::load_config(&ignite_config::LoadOptions::new()).unwrap();
        assert_eq!(loaded.host, "0.0.0.0");
        assert_eq!(loaded.port, 8080);
        assert_eq!(loaded.read_timeout, Duration::from_secs(15));
        assert_eq!(loaded.idle_timeout, Duration::from_secs(60));
        assert!(loaded.graceful_shutdown.enabled);
        assert_eq!(loaded.graceful_shutdown.timeout, Duration::from_secs(10));
        assert_eq!(
            loaded.cors.allow_methods,
            vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"]
        );
    }
}
