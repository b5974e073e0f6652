//! Bridges a matched warp request to the façade's [`RequestContext`].

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::RwLock;

use ignite_web::facade::{HttpMethod, LocalStore, RequestContext, StagedResponse};

pub struct WarpContext {
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

impl WarpContext {
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

impl RequestContext for WarpContext {
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

/// Matches `request_path` against a `:name`-style route pattern, returning the
/// captured params on success. Warp has no built-in notion of a runtime path
/// template (its combinators are built at compile time), so the adapter
/// matches patterns by hand against a snapshot of the route table.
pub fn match_path(pattern: &str, request_path: &str) -> Option<HashMap<String, String>> {
    let pattern_segments: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let request_segments: Vec<&str> = request_path.split('/').filter(|s| !s.is_empty()).collect();
    if pattern_segments.len() != request_segments.len() {
        return None;
    }

    let mut params = HashMap::new();
    for (pat, actual) in pattern_segments.iter().zip(request_segments.iter()) {
        if let Some(name) = pat.strip_prefix(':') {
            params.insert(name.to_string(), (*actual).to_string());
        } else if pat != actual {
            return None;
        }
    }
    Some(params)
}

pub fn parse_query_string(raw: &str) -> HashMap<String, String> {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_and_captures_params() {
        let params = match_path("/users/:id/posts/:post_id", "/users/7/posts/42").unwrap();
        assert_eq!(params.get("id").unwrap(), "7");
        assert_eq!(params.get("post_id").unwrap(), "42");
    }

    #[test]
    fn rejects_mismatched_segment_count() {
        assert!(match_path("/users/:id", "/users/7/extra").is_none());
    }

    #[test]
    fn rejects_mismatched_literal_segment() {
        assert!(match_path("/users/:id", "/accounts/7").is_none());
    }
}
