//! Client key resolution for incoming requests.

use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Request};
use std::net::SocketAddr;

/// Header carrying an explicit client key.
pub const API_KEY_HEADER: &str = "x-api-key";
/// Cookie carrying a session token.
pub const SESSION_COOKIE: &str = "session";
/// Key used when nothing identifies the client.
pub const ANONYMOUS_KEY: &str = "anonymous";

/// Resolve the opaque client key for a request.
///
/// Sources are tried in order: the `x-api-key` header, the `session` cookie,
/// the first `x-forwarded-for` hop, the peer address, then [`ANONYMOUS_KEY`].
pub fn resolve_client_key<B>(request: &Request<B>) -> String {
    let headers = request.headers();

    if let Some(key) = header_value(headers, API_KEY_HEADER) {
        return format!("key:{}", key);
    }

    if let Some(session) = session_cookie(headers) {
        return format!("session:{}", session);
    }

    if let Some(addr) = forwarded_for(headers) {
        return format!("ip:{}", addr);
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        return format!("ip:{}", addr.ip());
    }

    ANONYMOUS_KEY.to_string()
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value)
}

fn forwarded_for(headers: &HeaderMap) -> Option<&str> {
    header_value(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}
