use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// -- Pairing --

/// Response of `GET /pair?number=N`.
///
/// The bot service reuses one shape for three outcomes: a fresh `code`,
/// an `error` (ban or otherwise), or a `status` of `"already paired"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PairResponse {
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// -- Sessions --

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStatus {
    #[serde(default)]
    pub connected: bool,
    #[serde(default)]
    pub user: String,
}

/// Response of `GET /sessions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionsResponse {
    #[serde(default)]
    pub active: Vec<String>,
    #[serde(default)]
    pub status: BTreeMap<String, SessionStatus>,
}

// -- Blocklist --

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockEntry {
    #[serde(default)]
    pub blocked: bool,
}

/// Response of `GET /blocklist`: number -> entry.
pub type BlocklistResponse = BTreeMap<String, BlockEntry>;

// -- Admin actions --

/// Response of `/block`, `/unblock` and `/delete`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ApiResponse {
    pub fn ok() -> Self {
        Self {
            success: Some(true),
            ..Self::default()
        }
    }
}

// -- Gateway --

/// Body of the gateway's 500 response when the upstream call fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyErrorBody {
    pub error: String,
    pub message: String,
    #[serde(rename = "originalError")]
    pub original_error: String,
}

impl ProxyErrorBody {
    pub fn new(original_error: impl Into<String>) -> Self {
        Self {
            error: "Proxy request failed".into(),
            message: "Unable to connect to WhatsApp bot API".into(),
            original_error: original_error.into(),
        }
    }
}
