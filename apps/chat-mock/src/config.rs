use std::{
    env,
    net::{AddrParseError, SocketAddr},
};

use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:4567";
pub const DEFAULT_SERVICE_NAME: &str = "chat-mock";
pub const DEFAULT_SDK_HOST: &str = "localhost:4567";

#[derive(Clone, Debug)]
pub struct Config {
    pub service_name: String,
    pub bind_addr: SocketAddr,
    /// Host the served chat SDK script points its API calls at.
    pub sdk_host: String,
    pub id_seed: Option<u64>,
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: DEFAULT_SERVICE_NAME.to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 4567)),
            sdk_host: DEFAULT_SDK_HOST.to_string(),
            id_seed: None,
            log_json: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid CHAT_MOCK_BIND_ADDR: {0}")]
    BindAddrParse(#[from] AddrParseError),
    #[error("invalid CHAT_MOCK_SDK_HOST: {0}")]
    InvalidSdkHost(String),
    #[error("invalid CHAT_MOCK_ID_SEED: {0}")]
    InvalidIdSeed(String),
    #[error("invalid CHAT_MOCK_LOG_JSON: {0}")]
    InvalidLogJson(String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("CHAT_MOCK_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .trim()
            .parse()?;
        let service_name = lookup("CHAT_MOCK_SERVICE_NAME")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());
        let sdk_host = match lookup("CHAT_MOCK_SDK_HOST") {
            Some(raw) => normalize_sdk_host(&raw)?,
            None => DEFAULT_SDK_HOST.to_string(),
        };
        let id_seed = lookup("CHAT_MOCK_ID_SEED")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(|value| {
                value
                    .parse::<u64>()
                    .map_err(|error| ConfigError::InvalidIdSeed(format!("{value}: {error}")))
            })
            .transpose()?;
        let log_json = parse_bool(lookup("CHAT_MOCK_LOG_JSON").as_deref(), false)
            .map_err(ConfigError::InvalidLogJson)?;

        Ok(Self {
            service_name,
            bind_addr,
            sdk_host,
            id_seed,
            log_json,
        })
    }
}

/// Accepts `host[:port]`; the script template adds its own scheme.
pub fn normalize_sdk_host(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .unwrap_or(trimmed);
    if host.is_empty() || host.contains(['/', '"', ' ']) {
        return Err(ConfigError::InvalidSdkHost(raw.to_string()));
    }
    Ok(host.to_string())
}

fn parse_bool(raw: Option<&str>, default: bool) -> Result<bool, String> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(other.to_string()),
    }
}
