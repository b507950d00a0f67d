use std::net::SocketAddr;
use std::time::Duration;

const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:24084";
const DEFAULT_PREFIX: &str = "/api";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Gateway settings, read once at startup.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL of the bot service, without a trailing slash.
    pub upstream_url: String,
    /// Path prefix that is stripped before forwarding. Starts with `/`, never ends with one.
    pub prefix: String,
    pub host: String,
    pub port: u16,
    /// Relay the upstream status code. When false every parsed reply is sent as 200.
    pub relay_status: bool,
    /// `None` waits on the upstream indefinitely.
    pub upstream_timeout: Option<Duration>,
}

impl GatewayConfig {
    pub fn new(upstream_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            upstream_url: normalize_upstream(upstream_url)?,
            prefix: DEFAULT_PREFIX.into(),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            relay_status: true,
            upstream_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        })
    }

    /// Reads `PAIRDESK_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let upstream = lookup("PAIRDESK_UPSTREAM_URL").unwrap_or_else(|| DEFAULT_UPSTREAM_URL.into());
        let mut config = Self::new(&upstream)?;

        if let Some(prefix) = lookup("PAIRDESK_API_PREFIX") {
            config.prefix = normalize_prefix(&prefix)?;
        }
        if let Some(host) = lookup("PAIRDESK_HOST") {
            config.host = host;
        }
        if let Some(port) = lookup("PAIRDESK_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PAIRDESK_PORT",
                value: port.clone(),
            })?;
        }
        if let Some(relay) = lookup("PAIRDESK_RELAY_STATUS") {
            config.relay_status = parse_bool("PAIRDESK_RELAY_STATUS", &relay)?;
        }
        if let Some(secs) = lookup("PAIRDESK_UPSTREAM_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "PAIRDESK_UPSTREAM_TIMEOUT_SECS",
                value: secs.clone(),
            })?;
            config.upstream_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|_| ConfigError::Invalid {
                key: "PAIRDESK_HOST",
                value: self.host.clone(),
            })
    }
}

fn normalize_upstream(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::Invalid {
            key: "PAIRDESK_UPSTREAM_URL",
            value: raw.into(),
        });
    }
    Ok(trimmed.into())
}

fn normalize_prefix(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid {
            key: "PAIRDESK_API_PREFIX",
            value: raw.into(),
        });
    }
    Ok(format!("/{trimmed}"))
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.into(),
        }),
    }
}
