use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use pairdesk_types::api::{ApiResponse, BlocklistResponse, PairResponse, SessionsResponse};

use crate::phone::{InputError, clean_number};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: unable to connect to API server ({0})")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Input(#[from] InputError),
}

/// Client for the gateway's `/api` surface.
///
/// Every operation is a GET; the admin actions take the number as a query
/// parameter, cleaned down to digits before it is sent.
#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    /// `base_url` is the gateway prefix, e.g. `http://localhost:5000/api`.
    pub fn new(base_url: &str) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, http: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn pair_number(&self, phone_number: &str) -> Result<PairResponse, ClientError> {
        let number = clean_number(phone_number);
        let value = self.get_value("/pair", Some(&number)).await?;
        decode(value)
    }

    pub async fn sessions(&self) -> Result<SessionsResponse, ClientError> {
        let value = self.get_value("/sessions", None).await?;
        decode(value)
    }

    pub async fn blocklist(&self) -> Result<BlocklistResponse, ClientError> {
        let value = self.get_value("/blocklist", None).await?;
        decode(value)
    }

    pub async fn block_user(&self, phone_number: &str) -> Result<ApiResponse, ClientError> {
        self.action("/block", phone_number).await
    }

    pub async fn unblock_user(&self, phone_number: &str) -> Result<ApiResponse, ClientError> {
        self.action("/unblock", phone_number).await
    }

    pub async fn delete_session(&self, phone_number: &str) -> Result<ApiResponse, ClientError> {
        self.action("/delete", phone_number).await
    }

    async fn action(&self, endpoint: &str, phone_number: &str) -> Result<ApiResponse, ClientError> {
        let number = clean_number(phone_number);
        let value = self.get_value(endpoint, Some(&number)).await?;
        if is_empty(&value) {
            warn!("Received empty response from {}, treating as success", endpoint);
            return Ok(ApiResponse::ok());
        }
        decode(value)
    }

    async fn get_value(&self, endpoint: &str, number: Option<&str>) -> Result<Value, ClientError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(number) = number {
            req = req.query(&[("number", number)]);
        }

        debug!("GET {}", url);
        let resp = req.send().await.map_err(|e| {
            error!("API request failed: {}: {}", url, e);
            ClientError::Network(e)
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            let message = error_message(status, &bytes);
            error!("API request failed: {}: HTTP {} {}", url, status.as_u16(), message);
            return Err(ClientError::Http {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ClientError> {
    Ok(serde_json::from_value(value)?)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Prefers the body's `message`, then its `error`, then the reason phrase.
fn error_message(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<ApiResponse>(body)
        .ok()
        .and_then(|b| b.message.or(b.error))
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}
