//! The framework-agnostic request context (C5, §3 `RequestContext`).
//!
//! Adapters hand handlers and middleware an `Arc<dyn RequestContext>` rather
//! than a `&mut`: the response side is built up through interior mutability,
//! the same shape the typed local store already needs. This mirrors how
//! `AlloyContext` stays behind a plain `&self` and pushes mutability down into
//! an `RwLock`-guarded map.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{WebError, WebResult};

/// HTTP methods the façade understands; anything else is `ErrRouteMethod`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    pub fn parse(raw: &str) -> WebResult<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "PATCH" => Ok(HttpMethod::Patch),
            "DELETE" => Ok(HttpMethod::Delete),
            "HEAD" => Ok(HttpMethod::Head),
            "OPTIONS" => Ok(HttpMethod::Options),
            other => Err(WebError::RouteMethod(other.to_string())),
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Type-keyed storage for values handlers and middleware pass down the chain.
///
/// Lifted straight from the bot framework's context state map: one value per
/// type, last write wins.
#[derive(Default)]
pub struct LocalStore {
    values: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set<T: Send + Sync + 'static>(&self, value: T) {
        let mut map = self.values.write().unwrap();
        map.insert(TypeId::of::<T>(), Box::new(value));
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        let map = self.values.read().unwrap();
        map.get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
            .cloned()
    }

    pub fn take<T: Send + Sync + 'static>(&self) -> Option<T> {
        let mut map = self.values.write().unwrap();
        map.remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast::<T>().ok())
            .map(|v| *v)
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.values.read().unwrap().contains_key(&TypeId::of::<T>())
    }
}

/// An outgoing response staged by a handler or middleware. Adapters translate
/// this into their own response type once the chain completes.
#[derive(Debug, Clone)]
pub struct StagedResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl Default for StagedResponse {
    fn default() -> Self {
        Self {
            status: 200,
            content_type: "text/plain; charset=utf-8".to_string(),
            body: Vec::new(),
            headers: Vec::new(),
        }
    }
}

/// The framework-agnostic request/response handle (§3 `RequestContext`).
///
/// The core trait is kept object-safe (no generic methods) so it can be
/// passed around as `Arc<dyn RequestContext>`; [`RequestContextExt`] layers
/// typed JSON sugar on top via a blanket impl.
pub trait RequestContext: Send + Sync {
    fn method(&self) -> HttpMethod;
    fn path(&self) -> &str;
    /// The route pattern the router matched against (e.g. `/users/:id`), as
    /// opposed to [`path`](Self::path)'s concrete request path.
    fn route_pattern(&self) -> &str;
    fn param(&self, name: &str) -> Option<&str>;
    fn query(&self, name: &str) -> Option<&str>;
    fn header(&self, name: &str) -> Option<&str>;
    fn body(&self) -> &[u8];
    /// Resolved client address: `X-Forwarded-For` (first hop) then
    /// `X-Real-IP`, falling back to the adapter's socket peer address.
    fn client_ip(&self) -> Option<IpAddr>;
    fn locals(&self) -> &LocalStore;

    fn write_status(&self, status: u16);
    fn write_bytes(&self, status: u16, content_type: &str, body: Vec<u8>);
    fn write_header(&self, name: &str, value: &str);
    fn staged_response(&self) -> StagedResponse;
}

/// Typed sugar over the object-safe [`RequestContext`] core.
pub trait RequestContextExt: RequestContext {
    fn bind_json<T: DeserializeOwned>(&self) -> WebResult<T> {
        serde_json::from_slice(self.body()).map_err(|e| WebError::RequestBodyBind(e.to_string()))
    }

    fn write_json<T: Serialize + Sync>(&self, status: u16, value: &T) -> WebResult<()> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| WebError::Handler(e.to_string()))?;
        self.write_bytes(status, "application/json", bytes);
        Ok(())
    }

    fn write_text(&self, status: u16, body: impl Into<String> + Send) {
        self.write_bytes(status, "text/plain; charset=utf-8", body.into().into_bytes());
    }

    /// The uncaught-handler-error / panic response body (§4.7, §7): HTTP 500
    /// with `{"error": "Internal Server Error", "message": <sanitised>}`.
    /// Shared by the recovery middleware and every adapter's handler wrapper
    /// so the wire format is identical no matter which layer catches the
    /// failure.
    fn write_internal_error(&self, message: &str) {
        let _ = self.write_json(
            500,
            &serde_json::json!({ "error": "Internal Server Error", "message": message }),
        );
    }
}

impl<T: RequestContext + ?Sized> RequestContextExt for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_canonical_verbs_case_insensitively() {
        assert_eq!(HttpMethod::parse("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::parse("POST").unwrap(), HttpMethod::Post);
        assert_eq!(HttpMethod::parse("Delete").unwrap(), HttpMethod::Delete);
    }

    /// §4.5: unknown methods fail with `ErrRouteMethod`.
    #[test]
    fn unknown_method_is_route_method_error() {
        let err = HttpMethod::parse("TRACE").unwrap_err();
        assert!(matches!(err, WebError::RouteMethod(m) if m == "TRACE"));
    }

    #[test]
    fn local_store_roundtrips_by_type() {
        let store = LocalStore::new();
        assert!(!store.contains::<u32>());

        store.set(42u32);
        assert_eq!(store.get::<u32>(), Some(42));
        assert!(store.contains::<u32>());

        store.set(7u32);
        assert_eq!(store.get::<u32>(), Some(7));

        assert_eq!(store.get::<String>(), None);
    }

    #[test]
    fn local_store_take_removes_the_value() {
        let store = LocalStore::new();
        store.set("hello".to_string());
        assert_eq!(store.take::<String>(), Some("hello".to_string()));
        assert_eq!(store.take::<String>(), None);
        assert!(!store.contains::<String>());
    }

    #[test]
    fn staged_response_defaults_to_200_text_plain() {
        let response = StagedResponse::default();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type, "text/plain; charset=utf-8");
        assert!(response.body.is_empty());
    }
}
