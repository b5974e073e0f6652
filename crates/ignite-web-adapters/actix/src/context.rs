//! Bridges an incoming actix-web request to the façade's [`RequestContext`].
//!
//! Mirrors the axum adapter's context: everything a handler or middleware
//! might read is extracted once, up front, into owned fields so the trait's
//! accessors stay synchronous `&self` methods.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use actix_web::{HttpRequest, web};

use ignite_web::facade::{HttpMethod, LocalStore, RequestContext, StagedResponse};

pub struct ActixContext {
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

impl ActixContext {
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

    /// Builds a context straight from an `actix_web::HttpRequest` + body.
    pub fn from_request(req: &HttpRequest, route_pattern: String, body: web::Bytes) -> ignite_web::WebResult<Self> {
        let method = HttpMethod::parse(req.method().as_str())?;

        let params = req
            .match_info()
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();

        let query = parse_query_string(req.query_string());

        let headers = req
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();

        let client_ip = resolve_client_ip(&headers, req.peer_addr().map(|addr| addr.ip()));

        Ok(Self::new(
            method,
            req.path().to_string(),
            route_pattern,
            params,
            query,
            headers,
            body.to_vec(),
            client_ip,
        ))
    }
}

impl RequestContext for ActixContext {
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
pub fn resolve_client_ip(headers: &HashMap<String, String>, peer: Option<IpAddr>) -> Option<IpAddr> {
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
    peer
}

/// Minimal `application/x-www-form-urlencoded` query-string decoder: actix's
/// own `web::Query` extractor needs a concrete `Deserialize` target, which
/// doesn't fit the façade's untyped `HashMap` accessor, so this decodes the
/// raw string directly instead of pulling in a second crate for it.
fn parse_query_string(raw: &str) -> HashMap<String, String> {
    raw.split('&')
        .filter(|pair| !pair.is_empty())
        .filter_map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = percent_decode(parts.next()?);
            let value = percent_decode(parts.next().unwrap_or(""));
            Some((key, value))
        })
        .collect()
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b'%' if i + 2 < bytes.len() => {
                if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
