use std::time::Duration;

use config::{Config, ConfigError, Environment};
use dotenv::dotenv;
use serde::Deserialize;

use super::asset_url::AssetUrlConfig;

const DEFAULT_JSON_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_MULTIPART_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Settings for the admin client pipeline.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Explicitly configured API origin; `None` means same-origin.
    pub api_origin: Option<String>,
    /// Origin the admin pages are served from.
    pub page_origin: String,
    pub is_development: bool,
    pub json_timeout: Duration,
    pub multipart_timeout: Duration,
    pub cache_ttl: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct RawClientConfig {
    api_origin: Option<String>,
    page_origin: Option<String>,
    development: Option<bool>,
    json_timeout: Option<String>,
    multipart_timeout: Option<String>,
    cache_ttl: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            api_origin: None,
            page_origin: "http://localhost:5000".into(),
            is_development: false,
            json_timeout: DEFAULT_JSON_TIMEOUT,
            multipart_timeout: DEFAULT_MULTIPART_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }
}

impl ClientConfig {
    /// Loads `CLIENT__*` variables, e.g. `CLIENT__API_ORIGIN` or
    /// `CLIENT__MULTIPART_TIMEOUT=2m`.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw: RawClientConfig = Config::builder()
            .add_source(Environment::with_prefix("CLIENT").separator("__").ignore_empty(true))
            .build()?
            .try_deserialize()?;

        Self::from_raw(raw)
    }

    fn from_raw(raw: RawClientConfig) -> Result<Self, ConfigError> {
        let defaults = ClientConfig::default();

        Ok(ClientConfig {
            api_origin: raw.api_origin.filter(|o| !o.trim().is_empty()),
            page_origin: raw.page_origin.unwrap_or(defaults.page_origin),
            is_development: raw.development.unwrap_or(defaults.is_development),
            json_timeout: parse_duration("json_timeout", raw.json_timeout, defaults.json_timeout)?,
            multipart_timeout: parse_duration(
                "multipart_timeout",
                raw.multipart_timeout,
                defaults.multipart_timeout,
            )?,
            cache_ttl: parse_duration("cache_ttl", raw.cache_ttl, defaults.cache_ttl)?,
        })
    }

    /// Where API calls are sent: the explicit origin when configured, the
    /// page's own origin otherwise.
    pub fn api_base(&self) -> &str {
        self.api_origin.as_deref().unwrap_or(&self.page_origin)
    }

    pub fn asset_config(&self) -> AssetUrlConfig {
        AssetUrlConfig {
            explicit_api_origin: self.api_origin.clone(),
            is_development: self.is_development,
            page_origin: self.page_origin.clone(),
        }
    }
}

fn parse_duration(key: &str, raw: Option<String>, default: Duration) -> Result<Duration, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => humantime::parse_duration(value.trim())
            .map_err(|e| ConfigError::Message(format!("Invalid {} '{}': {}", key, value, e))),
    }
}
