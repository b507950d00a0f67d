//! Connectivity check against a running gateway.
//!
//! Usage: `pairdesk-probe [API_URL]`, defaulting to `$PAIRDESK_API_URL`
//! or `http://127.0.0.1:5000/api`.

use pairdesk_client::{ApiClient, probe};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pairdesk_client=info".into()),
        )
        .init();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PAIRDESK_API_URL").ok())
        .unwrap_or_else(|| "http://127.0.0.1:5000/api".into());

    let client = ApiClient::new(&base_url);
    let report = probe::run(&client).await;

    println!("Test results for {}:", client.base_url());
    for line in report.summary() {
        println!("{line}");
    }

    if !report.all_ok() {
        anyhow::bail!("{} of {} checks failed", report.failures(), report.results.len());
    }
    Ok(())
}
