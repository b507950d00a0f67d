use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use pairdesk_types::api::ProxyErrorBody;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("failed to build upstream client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("upstream returned a non-JSON body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ProxyErrorBody::new(self.to_string());
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}
