//! The framework-agnostic façade (C5): request context, handler/middleware
//! contracts, route groups.

pub mod context;
pub mod framework;

pub use context::{HttpMethod, LocalStore, RequestContext, RequestContextExt, StagedResponse};
pub use framework::{Handler, Middleware, Next, RouteGroup, WebFramework, build_chain};
