//! Source loader (C2): file decode + environment overlay on top of C1 defaults.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format as _, Json, Serialized, Toml, Yaml};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::defaults::ApplyDefaults;
use crate::error::{ConfigError, ConfigResult};

/// Explicit file format hint. When absent, [`LoadOptions`] infers the format
/// from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

impl ConfigFormat {
    fn infer(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => Ok(Self::Yaml),
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::UnknownFormat(path.to_path_buf())),
        }
    }
}

/// Options accepted by [`load_config`].
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub file: Option<PathBuf>,
    pub format: Option<ConfigFormat>,
    pub env_prefix: Option<String>,
    pub env_overlay: bool,
    /// When the file is absent, fall back to defaults+env instead of failing.
    /// The spec reserves this for hot-reload-enabled callers; a plain
    /// `load_config` caller should leave it `false`.
    pub permissive: bool,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    pub fn format(mut self, format: ConfigFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self.env_overlay = true;
        self
    }

    pub fn permissive(mut self, permissive: bool) -> Self {
        self.permissive = permissive;
        self
    }
}

/// Loads a `TypedConfig` per §4.2: (1) tag defaults, (2) file decode, (3) env
/// overlay. Each step strictly overrides the previous for the same key.
pub fn load_config<T>(options: &LoadOptions) -> ConfigResult<T>
where
    T: Default + ApplyDefaults + Serialize + DeserializeOwned,
{
    let mut defaulted = T::default();
    defaulted.apply_defaults()?;

    let mut figment = Figment::from(Serialized::defaults(defaulted));

    match &options.file {
        Some(path) => {
            if !path.exists() {
                if options.permissive {
                    tracing::warn!(path = %path.display(), "config file missing, falling back to defaults+env");
                } else {
                    return Err(ConfigError::SourceMissing(path.clone()));
                }
            } else {
                let format = match options.format {
                    Some(f) => f,
                    None => ConfigFormat::infer(path)?,
                };
                figment = merge_file(figment, path, format)?;
            }
        }
        None => {}
    }

    if options.env_overlay {
        let prefix = options.env_prefix.as_deref().unwrap_or("");
        figment = figment.merge(Env::prefixed(&format!("{prefix}_")).split("_"));
    }

    figment.extract().map_err(|source| ConfigError::Source {
        path: options.file.clone().unwrap_or_default(),
        source: Box::new(source),
    })
}

fn merge_file(figment: Figment, path: &Path, format: ConfigFormat) -> ConfigResult<Figment> {
    Ok(match format {
        ConfigFormat::Yaml => figment.merge(Yaml::file(path)),
        ConfigFormat::Json => figment.merge(Json::file(path)),
        ConfigFormat::Toml => figment.merge(Toml::file(path)),
    })
}
