//! Client configuration from the environment

use std::path::PathBuf;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://alezoo-back.vercel.app/api";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid VETCHAT_API_URL {value:?}: {source}")]
    InvalidUrl {
        value: String,
        source: url::ParseError,
    },
    #[error("VETCHAT_API_URL must be http or https, got {0}")]
    UnsupportedScheme(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base of every endpoint path; always ends with `/`
    pub api_url: Url,
    pub store_path: PathBuf,
    pub log_json: bool,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = parse_api_url(
            &lookup("VETCHAT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
        )?;

        let store_path = lookup("VETCHAT_STORE_PATH").map_or_else(
            || {
                let home = lookup("HOME").unwrap_or_else(|| "/tmp".to_string());
                PathBuf::from(home).join(".vetchat").join("credentials.db")
            },
            PathBuf::from,
        );

        let log_json = lookup("VETCHAT_LOG_JSON").is_some_and(|v| v == "1" || v == "true");

        Ok(Self {
            api_url,
            store_path,
            log_json,
        })
    }
}

/// Parse the API base, adding the trailing slash `Url::join` needs to keep
/// the last path segment.
fn parse_api_url(raw: &str) -> Result<Url, ConfigError> {
    let trimmed = raw.trim();
    let normalized = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };

    let url = Url::parse(&normalized).map_err(|source| ConfigError::InvalidUrl {
        value: raw.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConfigError::UnsupportedScheme(other.to_string())),
    }
}
