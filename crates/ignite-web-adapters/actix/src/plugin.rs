//! The actix-web [`FrameworkPlugin`] descriptor (C6/C7): registers this
//! adapter under the name `"actix"`.

use ignite_config::defaults::ApplyDefaults;
use ignite_web::{FrameworkPlugin, ServerConfig, ServiceContainer, WebFramework, WebResult};

use crate::framework::ActixFramework;

pub const NAME: &str = "actix";

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
    Ok(Box::new(ActixFramework::new(config, services)))
}

pub fn plugin() -> FrameworkPlugin {
    FrameworkPlugin {
        name: NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        description: "actix-web-backed HTTP server adapter".to_string(),
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
}
