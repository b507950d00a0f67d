use std::future::Future;

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::api::{ApiClient, ClientError};

/// Number used for the pairing check. The bot service treats it like any other request.
pub const TEST_NUMBER: &str = "1234567890";

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeOutcome {
    Success(Value),
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeResult {
    pub name: &'static str,
    pub outcome: ProbeOutcome,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeReport {
    pub results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub fn failures(&self) -> usize {
        self.results
            .iter()
            .filter(|r| matches!(r.outcome, ProbeOutcome::Failed(_)))
            .count()
    }

    pub fn all_ok(&self) -> bool {
        self.failures() == 0
    }

    pub fn summary(&self) -> Vec<String> {
        self.results
            .iter()
            .map(|r| match &r.outcome {
                ProbeOutcome::Success(_) => format!("[ok]   {}: Working", r.name),
                ProbeOutcome::Failed(e) => format!("[fail] {}: {}", r.name, e),
            })
            .collect()
    }
}

/// Checks the sessions, blocklist and pair endpoints one after another.
pub async fn run(client: &ApiClient) -> ProbeReport {
    info!("Testing backend API connection via {}", client.base_url());

    let results = vec![
        check("Sessions endpoint", client.sessions()).await,
        check("Blocklist endpoint", client.blocklist()).await,
        check("Pair endpoint (test number)", client.pair_number(TEST_NUMBER)).await,
    ];

    ProbeReport { results }
}

async fn check<T, F>(name: &'static str, request: F) -> ProbeResult
where
    T: Serialize,
    F: Future<Output = Result<T, ClientError>>,
{
    info!("Testing {}...", name);
    let outcome = match request.await {
        Ok(data) => match serde_json::to_value(&data) {
            Ok(value) => {
                info!("{} - success", name);
                ProbeOutcome::Success(value)
            }
            Err(e) => {
                warn!("{} - unreadable response: {}", name, e);
                ProbeOutcome::Failed(format!("Failed to encode response: {e}"))
            }
        },
        Err(e) => {
            warn!("{} - failed: {}", name, e);
            ProbeOutcome::Failed(e.to_string())
        }
    };
    ProbeResult { name, outcome }
}
