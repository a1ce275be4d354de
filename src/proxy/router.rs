//! Relay router.
//!
//! A catch-all under the prefix, wrapped in a permissive CORS layer so a
//! browser front-end on another origin can call it.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use tower_http::cors::CorsLayer;

use super::{ProxyConfig, ProxyError};
use crate::config::{CONNECT_TIMEOUT, REQUEST_TIMEOUT};

/// Response header naming the backend that served a relayed request.
pub const PROXIED_FROM: &str = "x-proxied-from";

fn default_content_type() -> HeaderValue {
    HeaderValue::from_static("application/json")
}

#[derive(Clone)]
struct RelayState {
    backend_url: Arc<str>,
    prefix: Arc<str>,
    http: reqwest::Client,
}

/// Build the relay router for `config`.
pub fn proxy_router(config: ProxyConfig) -> Result<Router, ProxyError> {
    let prefix = config.normalized_prefix()?;
    let http = reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| ProxyError::Client(e.to_string()))?;

    let state = RelayState {
        backend_url: Arc::from(config.backend_url.trim_end_matches('/')),
        prefix: Arc::from(prefix.as_str()),
        http,
    };

    // NOTE: wildcard syntax is `/*rest` (matchit 0.7 / axum 0.7).
    Ok(Router::new()
        .route(&prefix, any(relay))
        .route(&format!("{prefix}/*rest"), any(relay))
        .with_state(state)
        .layer(CorsLayer::permissive()))
}

/// Upstream URL for an incoming request: prefix stripped, query kept.
fn upstream_url(backend_url: &str, prefix: &str, uri: &Uri) -> String {
    let rest = uri.path().strip_prefix(prefix).unwrap_or(uri.path());
    let rest = if rest.is_empty() { "/" } else { rest };
    match uri.query() {
        Some(query) => format!("{backend_url}{rest}?{query}"),
        None => format!("{backend_url}{rest}"),
    }
}

fn carries_body(method: &Method, body: &Bytes) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH) || !body.is_empty()
}

async fn relay(
    State(state): State<RelayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ProxyError> {
    let target = upstream_url(&state.backend_url, &state.prefix, &uri);
    let content_type = headers
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(default_content_type);

    tracing::debug!(%method, upstream = %target, "relaying request");

    let mut request = state
        .http
        .request(method.clone(), &target)
        .header(CONTENT_TYPE, content_type);
    if let Some(auth) = headers.get(AUTHORIZATION) {
        request = request.header(AUTHORIZATION, auth.clone());
    }
    if carries_body(&method, &body) {
        request = request.body(body);
    }

    let unreachable = |e: reqwest::Error| ProxyError::BackendUnreachable {
        backend_url: state.backend_url.to_string(),
        message: e.to_string(),
    };

    let upstream = request.send().await.map_err(unreachable)?;
    let status = upstream.status();
    let content_type = upstream
        .headers()
        .get(CONTENT_TYPE)
        .cloned()
        .unwrap_or_else(default_content_type);
    let bytes = upstream.bytes().await.map_err(unreachable)?;

    let mut response = (status, bytes).into_response();
    let response_headers = response.headers_mut();
    response_headers.insert(CONTENT_TYPE, content_type);
    if let Ok(origin) = HeaderValue::from_str(&state.backend_url) {
        response_headers.insert(HeaderName::from_static(PROXIED_FROM), origin);
    }
    Ok(response)
}
