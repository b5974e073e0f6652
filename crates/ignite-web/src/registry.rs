//! Framework plugin registry (C6).
//!
//! Unlike the bot framework's [`PluginManager`](crate) this registry has no
//! inter-plugin dependency graph to resolve — §4.6 plugins are mutually
//! independent adapters selected by name, so there is no Kahn's-algorithm
//! layering here, just a name-keyed map behind a reader-writer lock.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use parking_lot::RwLock;

use crate::config::ServerConfig;
use crate::error::{WebError, WebResult};
use crate::facade::framework::WebFramework;
use crate::services::ServiceContainer;

/// A registered framework adapter: enough to validate a [`ServerConfig`]
/// against it and build a live [`WebFramework`] from one plus a
/// [`ServiceContainer`] (§4.6, §6).
pub struct FrameworkPlugin {
    pub name: String,
    pub version: String,
    pub description: String,
    pub default_config: fn() -> ServerConfig,
    pub validate_config: fn(&ServerConfig) -> WebResult<()>,
    pub build: fn(ServerConfig, ServiceContainer) -> WebResult<Box<dyn WebFramework>>,
}

impl std::fmt::Debug for FrameworkPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameworkPlugin")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

/// Register / unregister / create-server over a set of [`FrameworkPlugin`]s
/// (§3 `FrameworkRegistry`, invariant: no two plugins share a name).
pub struct FrameworkRegistry {
    plugins: RwLock<HashMap<String, Arc<FrameworkPlugin>>>,
    default: RwLock<Option<String>>,
}

impl FrameworkRegistry {
    pub fn new() -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            default: RwLock::new(None),
        }
    }

    /// Registers a plugin. The first plugin ever registered becomes the
    /// default; this is a convenience, not a correctness property (§9) — call
    /// [`set_default`](Self::set_default) to pick deliberately.
    pub fn register(&self, plugin: FrameworkPlugin) -> WebResult<()> {
        let name = plugin.name.clone();
        let default_framework = (plugin.default_config)().framework;
        if !default_framework.is_empty() && default_framework != name {
            return Err(WebError::FrameworkMismatch {
                plugin: name,
                requested: default_framework,
            });
        }

        let mut plugins = self.plugins.write();
        if plugins.contains_key(&name) {
            return Err(WebError::PluginExists(name));
        }
        plugins.insert(name.clone(), Arc::new(plugin));
        drop(plugins);

        let mut default = self.default.write();
        if default.is_none() {
            *default = Some(name);
        }
        Ok(())
    }

    /// Unregisters a plugin. If it was the default, the default falls back to
    /// the lexicographically-first remaining plugin name, or `None`.
    pub fn unregister(&self, name: &str) -> WebResult<()> {
        let mut plugins = self.plugins.write();
        if plugins.remove(name).is_none() {
            return Err(WebError::PluginMissing(name.to_string()));
        }
        let mut next_default: Option<String> = None;
        if plugins.len() > 0 {
            next_default = plugins.keys().min().cloned();
        }
        drop(plugins);

        let mut default = self.default.write();
        if default.as_deref() == Some(name) {
            *default = next_default;
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> WebResult<Arc<FrameworkPlugin>> {
        self.plugins
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| WebError::PluginMissing(name.to_string()))
    }

    pub fn get_default(&self) -> WebResult<Arc<FrameworkPlugin>> {
        let name = self
            .default
            .read()
            .clone()
            .ok_or_else(|| WebError::PluginMissing("<default>".to_string()))?;
        self.get(&name)
    }

    pub fn set_default(&self, name: &str) -> WebResult<()> {
        if !self.plugins.read().contains_key(name) {
            return Err(WebError::PluginMissing(name.to_string()));
        }
        *self.default.write() = Some(name.to_string());
        Ok(())
    }

    /// All registered plugin names, sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.plugins.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn clear(&self) {
        self.plugins.write().clear();
        *self.default.write() = None;
    }

    /// Resolves a plugin, validates `config`, and builds the framework (§4.6):
    ///
    /// 1. Resolve the plugin — `config.framework` names one, or (if empty)
    ///    the registry's default is used and stamped back into `config`.
    /// 2. If `config` is the zero value, nothing special happens here — a
    ///    caller wanting `plugin.DefaultConfig()` should ask the plugin for
    ///    it directly; `config` is always concrete by this point.
    /// 3. Run the plugin's own config validator, then the generic
    ///    [`ServerConfig::validate`].
    /// 4. If `services` is `None`, substitute a default container (stdout
    ///    logger + identity error reporter).
    /// 5. Build the framework via the plugin's factory.
    pub fn create_server(
        &self,
        mut config: ServerConfig,
        services: Option<ServiceContainer>,
    ) -> WebResult<Box<dyn WebFramework>> {
        let plugin = if config.framework.trim().is_empty() {
            let plugin = self.get_default()?;
            config.framework = plugin.name.clone();
            plugin
        } else {
            self.get(&config.framework)?
        };

        (plugin.validate_config)(&config)?;
        config.validate()?;
        let services = services.unwrap_or_default();
        (plugin.build)(config, services)
    }
}

impl Default for FrameworkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: LazyLock<FrameworkRegistry> = LazyLock::new(FrameworkRegistry::new);

pub fn register(plugin: FrameworkPlugin) -> WebResult<()> {
    GLOBAL.register(plugin)
}

pub fn unregister(name: &str) -> WebResult<()> {
    GLOBAL.unregister(name)
}

pub fn get(name: &str) -> WebResult<Arc<FrameworkPlugin>> {
    GLOBAL.get(name)
}

pub fn get_default() -> WebResult<Arc<FrameworkPlugin>> {
    GLOBAL.get_default()
}

pub fn set_default(name: &str) -> WebResult<()> {
    GLOBAL.set_default(name)
}

pub fn list() -> Vec<String> {
    GLOBAL.list()
}

pub fn clear() {
    GLOBAL.clear()
}

pub fn create_server(
    config: ServerConfig,
    services: Option<ServiceContainer>,
) -> WebResult<Box<dyn WebFramework>> {
    GLOBAL.create_server(config, services)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_plugin(name: &str) -> FrameworkPlugin {
        FrameworkPlugin {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            description: "test plugin".to_string(),
            default_config: ServerConfig::default,
            validate_config: |_cfg| Ok(()),
            build: |_cfg, _services| Err(WebError::Handler("no native engine in tests".into())),
        }
    }

    #[test]
    fn register_rejects_duplicate_names() {
        let registry = FrameworkRegistry::new();
        registry.register(dummy_plugin("axum")).unwrap();
        let err = registry.register(dummy_plugin("axum")).unwrap_err();
        assert!(matches!(err, WebError::PluginExists(_)));
    }

    #[test]
    fn first_registration_becomes_default() {
        let registry = FrameworkRegistry::new();
        registry.register(dummy_plugin("axum")).unwrap();
        assert_eq!(registry.get_default().unwrap().name, "axum");
    }

    #[test]
    fn unregistering_default_reassigns_deterministically() {
        let registry = FrameworkRegistry::new();
        registry.register(dummy_plugin("warp")).unwrap();
        registry.register(dummy_plugin("actix")).unwrap();
        registry.set_default("warp").unwrap();

        registry.unregister("warp").unwrap();
        assert_eq!(registry.get_default().unwrap().name, "actix");
    }

    #[test]
    fn list_is_sorted() {
        let registry = FrameworkRegistry::new();
        registry.register(dummy_plugin("warp")).unwrap();
        registry.register(dummy_plugin("actix")).unwrap();
        registry.register(dummy_plugin("axum")).unwrap();
        assert_eq!(registry.list(), vec!["actix", "axum", "warp"]);
    }
}
