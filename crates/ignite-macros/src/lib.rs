//! Procedural macros for the ignite configuration engine.
//!
//! This crate provides:
//!
//! - `#[derive(Defaults)]` — generates the tag-driven default injector (C1)
//!   that `ignite-config`'s loader runs before decoding the config file.
//!
//! The Go original fills zero-valued struct fields by walking the type with
//! reflection at runtime. A static language has no such walk, so the
//! contract ("fill zero-valued fields with parsed tag values") is instead
//! realised as a code-generation step: this derive macro expands to a plain
//! `apply_defaults` method body, one `if`-statement per tagged field.

mod defaults;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derives [`ignite_config::defaults::ApplyDefaults`] for a configuration struct.
///
/// ```rust,ignore
/// use ignite_macros::Defaults;
///
/// #[derive(Default, Defaults, serde::Deserialize)]
/// struct ServerSection {
///     #[ignite(default = "8080")]
///     port: u16,
///     #[ignite(default = "30s")]
///     read_timeout: std::time::Duration,
///     #[ignite(nested)]
///     tls: TlsSection,
/// }
/// ```
///
/// Field attributes, under `#[ignite(...)]`:
/// - `default = "literal"` — apply this tag when the field is at its zero
///   value. Parsed per the field's type: bool, integer, float, duration,
///   `String`, or `Vec<T>` (comma-separated).
/// - `nested` — the field is itself a `Defaults`-deriving sub-section;
///   recurse into it unconditionally (value sub-sections are always
///   materialised, never skipped).
/// - no attribute — the field is left untouched (this is how pointer-like
///   `Option<Box<_>>` sub-sections stay `None` per the known limitation).
#[proc_macro_derive(Defaults, attributes(ignite))]
pub fn derive_defaults(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match defaults::derive(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
