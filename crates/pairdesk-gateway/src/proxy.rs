use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{OriginalUri, State},
    http::{Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use tracing::{error, info, warn};

use crate::config::GatewayConfig;
use crate::error::GatewayError;

pub type GatewayState = Arc<GatewayStateInner>;

pub struct GatewayStateInner {
    pub config: GatewayConfig,
    pub http: reqwest::Client,
}

impl GatewayStateInner {
    pub fn new(config: GatewayConfig) -> Result<GatewayState, GatewayError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(GatewayError::ClientBuild)?;
        Ok(Arc::new(Self { config, http }))
    }
}

/// Maps a gateway URI onto the upstream: strips the prefix and keeps the
/// remaining path and query string. Returns `None` for paths outside the prefix.
pub fn upstream_url(config: &GatewayConfig, uri: &Uri) -> Option<String> {
    let rest = uri.path().strip_prefix(config.prefix.as_str())?;
    if !rest.is_empty() && !rest.starts_with('/') {
        // `/apiary` shares text with `/api` but is not under it
        return None;
    }
    let rest = if rest.is_empty() { "/" } else { rest };

    let mut url = format!("{}{}", config.upstream_url, rest);
    if let Some(query) = uri.query() {
        url.push('?');
        url.push_str(query);
    }
    Some(url)
}

/// Fallback handler: forwards anything under the prefix to the bot service.
pub async fn forward(
    State(state): State<GatewayState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Response {
    let Some(url) = upstream_url(&state.config, &uri) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    info!("[proxy] {} {} -> {}", method, uri, url);

    match relay(&state, method, &url, &body).await {
        Ok((status, value)) => {
            let status = if state.config.relay_status {
                status
            } else {
                StatusCode::OK
            };
            (status, Json(value)).into_response()
        }
        Err(e) => {
            error!("[proxy] {} failed: {}", uri, e);
            e.into_response()
        }
    }
}

async fn relay(
    state: &GatewayState,
    method: Method,
    url: &str,
    body: &[u8],
) -> Result<(StatusCode, Value), GatewayError> {
    let has_body = method != Method::GET && method != Method::HEAD;

    let mut req = state
        .http
        .request(method, url)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json");
    if has_body {
        req = req.json(&forwarded_body(body));
    }

    let resp = req.send().await?;
    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let bytes = resp.bytes().await?;
    let value: Value = serde_json::from_slice(&bytes)?;

    Ok((status, value))
}

/// JSON body sent upstream. A missing or unparseable body becomes `{}`.
fn forwarded_body(body: &[u8]) -> Value {
    if body.iter().all(u8::is_ascii_whitespace) {
        return json!({});
    }
    serde_json::from_slice(body).unwrap_or_else(|e| {
        warn!("[proxy] request body is not JSON, forwarding {{}}: {}", e);
        json!({})
    })
}
