//! The axum [`FrameworkPlugin`] descriptor (C6/C7): lets application code
//! pick this adapter by name (`"axum"`) through the registry instead of
//! constructing [`AxumFramework`] directly.

use ignite_config::defaults::ApplyDefaults;
use ignite_web::{FrameworkPlugin, ServerConfig, ServiceContainer, WebFramework, WebResult};

use crate::framework::AxumFramework;

pub const NAME: &str = "axum";

fn default_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config
        .apply_defaults()
        .expect("ServerConfig's #[ignite(default = ...)] literals are all well-formed");
    config.framework = NAME.to_string();
    config
}

fn validate_config(config: &ServerConfig) -> WebResult<()> {
    if config.framework != NAME {
        return Err(ignite_web::WebError::FrameworkMismatch {
            plugin: NAME.to_string(),
            requested: config.framework.clone(),
        });
    }
    Ok(())
}

fn build(config: ServerConfig, services: ServiceContainer) -> WebResult<Box<dyn WebFramework>> {
    Ok(Box::new(AxumFramework::new(config, services)))
}

/// The descriptor to hand to [`ignite_web::register`].
pub fn plugin() -> FrameworkPlugin {
    FrameworkPlugin {
        name: NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "axum-backed HTTP server adapter".to_string(),
        default_config,
        validate_config,
        build,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_names_itself() {
        let config = default_config();
        assert_eq!(config.framework, NAME);
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn validate_rejects_foreign_framework_name() {
        let mut config = default_config();
        config.framework = "actix".to_string();
        assert!(validate_config(&config).is_err());
    }
}
