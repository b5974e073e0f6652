//! Bridges an incoming axum request to the façade's [`RequestContext`].
//!
//! Extraction happens once, eagerly, in `dispatch` (see `framework.rs`) —
//! everything a handler or middleware might read is copied into plain owned
//! fields here, so the trait's accessors can stay synchronous `&self`
//! methods instead of threading a `Request` reference through the chain.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use ignite_web::facade::{HttpMethod, LocalStore, RequestContext, StagedResponse};

pub struct AxumContext {
    method: HttpMethod,
    path: String,
    route_pattern: String,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    headers: HashMap<String, String>,
    body: Vec<u8>,
    client_ip: Option<IpAddr>,
    locals: LocalStore,
    response: RwLock<StagedResponse>,
}

impl AxumContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        method: HttpMethod,
        path: String,
        route_pattern: String,
        params: HashMap<String, String>,
        query: HashMap<String, String>,
        headers: HashMap<String, String>,
        body: Vec<u8>,
        client_ip: Option<IpAddr>,
    ) -> Self {
        Self {
            method,
            path,
            route_pattern,
            params,
            query,
            headers,
            body,
            client_ip,
            locals: LocalStore::new(),
            response: RwLock::new(StagedResponse::default()),
        }
    }
}

impl RequestContext for AxumContext {
    fn method(&self) -> HttpMethod {
        self.method
    }

    fn path(&self) -> &str {
        &self.path
    }

    fn route_pattern(&self) -> &str {
        &self.route_pattern
    }

    fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    fn client_ip(&self) -> Option<IpAddr> {
        self.client_ip
    }

    fn locals(&self) -> &LocalStore {
        &self.locals
    }

    fn write_status(&self, status: u16) {
        self.response.write().unwrap().status = status;
    }

    fn write_bytes(&self, status: u16, content_type: &str, body: Vec<u8>) {
        let mut response = self.response.write().unwrap();
        response.status = status;
        response.content_type = content_type.to_string();
        response.body = body;
    }

    fn write_header(&self, name: &str, value: &str) {
        let mut response = self.response.write().unwrap();
        response.headers.push((name.to_string(), value.to_string()));
    }

    fn staged_response(&self) -> StagedResponse {
        self.response.read().unwrap().clone()
    }
}

/// First hop of `X-Forwarded-For`, then `X-Real-IP`, then the socket peer.
pub fn resolve_client_ip(headers: &HashMap<String, String>, peer: IpAddr) -> Option<IpAddr> {
    if let Some(forwarded) = headers.get("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next() {
            if let Ok(ip) = first.trim().parse() {
                return Some(ip);
            }
        }
    }
    if let Some(real_ip) = headers.get("x-real-ip") {
        if let Ok(ip) = real_ip.trim().parse() {
            return Some(ip);
        }
    }
    Some(peer)
}

pub fn headers_to_map(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
        })
        .collect()
}
