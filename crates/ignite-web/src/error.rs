/// Error taxonomy for the server façade, plugin registry, and manager
/// (the C5/C6/C8/C9 slice of §7).
#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("plugin `{0}` is already registered")]
    PluginExists(String),

    #[error("plugin `{0}` is not registered")]
    PluginMissing(String),

    #[error("plugin `{plugin}` cannot build a config for framework `{requested}`")]
    FrameworkMismatch { plugin: String, requested: String },

    #[error("server config invalid: {0}")]
    ConfigInvalid(String),

    #[error("server is already running")]
    ServerAlreadyRunning,

    #[error("server is not running")]
    ServerNotRunning,

    #[error("unsupported HTTP method `{0}`")]
    RouteMethod(String),

    #[error("request body could not be deserialised: {0}")]
    RequestBodyBind(String),

    #[error("handler error: {0}")]
    Handler(String),

    #[error("middleware error: {0}")]
    Middleware(String),
}

pub type WebResult<T> = Result<T, WebError>;
