//! warp adapter for the `ignite-web` façade (C7).

mod context;
mod framework;
mod plugin;

pub use context::WarpContext;
pub use framework::{WarpFramework, WarpRouteGroup};
pub use plugin::{NAME, plugin};

/// Registers this adapter with the process-wide [`ignite_web::registry`].
pub fn install() -> ignite_web::WebResult<()> {
    ignite_web::register(plugin::plugin())
}
