use std::path::PathBuf;

/// Error taxonomy for the configuration engine (C1–C3).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config source unreadable or undecodable: {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: Box<figment::Error>,
    },

    #[error("config source not found: {0}")]
    SourceMissing(PathBuf),

    #[error("cannot infer config format for `{0}`; pass an explicit format hint")]
    UnknownFormat(PathBuf),

    #[error("unparseable default tag `{tag}` for field `{field}`")]
    DefaultParse { field: String, tag: String },

    #[error("config validation failed: {0}")]
    Invalid(String),

    #[error("config reload failed, previous value retained: {0}")]
    Reload(Box<figment::Error>),

    #[error("config watcher error: {0}")]
    Watch(#[from] notify::Error),
}

impl ConfigError {
    pub fn default_parse(field: impl Into<String>, tag: impl Into<String>) -> Self {
        Self::DefaultParse {
            field: field.into(),
            tag: tag.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::Invalid(msg.into())
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
