//! actix-web adapter for the `ignite-web` façade (C7).

mod context;
mod framework;
mod plugin;

pub use context::ActixContext;
pub use framework::{ActixFramework, ActixRouteGroup};
pub use plugin::{NAME, plugin};

/// Registers this adapter with the process-wide [`ignite_web::registry`].
pub fn install() -> ignite_web::WebResult<()> {
    ignite_web::register(plugin::plugin())
}
