//! HTTP request/response data recorded on a segment.
//!
//! # Responsibilities
//! - Capture method, URL, client address, user agent from the inbound request
//! - Capture the response status once the handler chain completes
//!
//! # Design Decisions
//! - Client IP prefers `X-Forwarded-For` (first entry) and marks the segment
//!   accordingly, since the peer address is the proxy's in that case

use axum::extract::ConnectInfo;
use axum::http::Request;
use serde::Serialize;
use std::net::SocketAddr;

/// The `http` block on a segment.
#[derive(Debug, Clone, Default, Serialize)]
pub struct HttpData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequestData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponseData>,
}

/// Inbound request fields.
#[derive(Debug, Clone, Serialize)]
pub struct HttpRequestData {
    pub method: String,
    pub url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<String>,

    /// True when `client_ip` came from X-Forwarded-For rather than the peer
    /// address, i.e. it is caller-supplied and unverified.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub x_forwarded_for: bool,
}

impl HttpRequestData {
    /// Extract request data from an inbound request.
    pub fn from_request<B>(request: &Request<B>) -> Self {
        let headers = request.headers();

        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let (client_ip, x_forwarded_for) = match forwarded {
            Some(ip) => (Some(ip), true),
            None => (
                request
                    .extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|info| info.0.ip().to_string()),
                false,
            ),
        };

        Self {
            method: request.method().to_string(),
            url: request.uri().to_string(),
            user_agent,
            client_ip,
            x_forwarded_for,
        }
    }
}

/// Response fields, filled in at completion.
#[derive(Debug, Clone, Serialize)]
pub struct HttpResponseData {
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_from_request_basic_fields() {
        let request = Request::builder()
            .method("GET")
            .uri("/widgets?page=2")
            .header("User-Agent", "curl/8.0")
            .body(Body::empty())
            .unwrap();

        let data = HttpRequestData::from_request(&request);
        assert_eq!(data.method, "GET");
        assert_eq!(data.url, "/widgets?page=2");
        assert_eq!(data.user_agent.as_deref(), Some("curl/8.0"));
        assert!(data.client_ip.is_none());
        assert!(!data.x_forwarded_for);
    }

    #[test]
    fn test_forwarded_for_preferred() {
        let mut request = Request::builder()
            .uri("/")
            .header("X-Forwarded-For", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("10.0.0.1:443".parse().unwrap()));

        let data = HttpRequestData::from_request(&request);
        assert_eq!(data.client_ip.as_deref(), Some("203.0.113.9"));
        assert!(data.x_forwarded_for);
    }

    #[test]
    fn test_peer_address_fallback() {
        let mut request = Request::builder().uri("/").body(Body::empty()).unwrap();
        request
            .extensions_mut()
            .insert(ConnectInfo::<SocketAddr>("192.0.2.7:51000".parse().unwrap()));

        let data = HttpRequestData::from_request(&request);
        assert_eq!(data.client_ip.as_deref(), Some("192.0.2.7"));
        assert!(!data.x_forwarded_for);
    }
}
