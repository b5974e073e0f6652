//! Framework-agnostic web server abstraction (C5–C9): a façade any HTTP
//! framework can sit behind, a plugin registry that builds a concrete server
//! from a [`ServerConfig`], a built-in middleware chain, and a lifecycle
//! manager that owns graceful shutdown.

pub mod config;
pub mod error;
pub mod facade;
pub mod manager;
pub mod middleware;
pub mod registry;
pub mod services;

pub use config::{CorsConfig, GracefulShutdownConfig, MiddlewareConfig, ServerConfig, ServerMode, TlsConfig};
pub use error::{WebError, WebResult};
pub use facade::{HttpMethod, Handler, LocalStore, Middleware as MiddlewareTrait, Next, RequestContext, RequestContextExt, RouteGroup, StagedResponse, WebFramework, build_chain};
pub use manager::{ManagerState, ServerManager};
pub use registry::{FrameworkPlugin, FrameworkRegistry, create_server, get, get_default, list, register, set_default, unregister};
pub use services::{ErrorReporter, IdentityErrorReporter, ServiceContainer};
