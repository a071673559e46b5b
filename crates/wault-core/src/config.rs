//! Client configuration.
//!
//! A `ClientConfig` names the three services the client talks to (the sign-in
//! authority, the resource API and the document portal) plus the identifiers
//! passed to the sign-in frame. Base URLs are normalized on construction so
//! paths can be appended with a single `/`.
//!
//! Configuration can be built directly, read from `WAULT_*` environment
//! variables, or persisted at `~/.config/wault/config.json`.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "wault";

/// Config file name
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub authority_base_url: String,
    pub api_base_url: String,
    pub portal_base_url: String,
    pub client_id: String,
    pub wault_id: String,
    pub user_email_hint: String,
    /// How long a sign-in frame may stay open, in milliseconds. `None`
    /// waits forever.
    #[serde(default)]
    pub handshake_timeout_ms: Option<u64>,
    /// Per-request HTTP timeout in milliseconds. `None` leaves requests
    /// unbounded.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

impl ClientConfig {
    pub fn new(
        client_id: impl Into<String>,
        user_email_hint: impl Into<String>,
        wault_id: impl Into<String>,
        authority_base_url: &str,
        api_base_url: &str,
        portal_base_url: &str,
    ) -> Self {
        Self {
            authority_base_url: strip_trailing_slash(authority_base_url),
            api_base_url: strip_trailing_slash(api_base_url),
            portal_base_url: strip_trailing_slash(portal_base_url),
            client_id: client_id.into(),
            wault_id: wault_id.into(),
            user_email_hint: user_email_hint.into(),
            handshake_timeout_ms: None,
            request_timeout_ms: None,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout_ms = Some(duration_millis(timeout));
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(duration_millis(timeout));
        self
    }

    pub fn handshake_timeout(&self) -> Option<Duration> {
        self.handshake_timeout_ms.map(Duration::from_millis)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    /// Serialized origin (`scheme://host[:port]`) of the authority. Messages
    /// are only accepted from this origin.
    pub fn authority_origin(&self) -> Result<String, url::ParseError> {
        let url = Url::parse(&self.authority_base_url)?;
        Ok(url.origin().ascii_serialization())
    }

    /// Build configuration from `WAULT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let var = |name: &str| {
            std::env::var(name).with_context(|| format!("Missing environment variable {}", name))
        };
        let secs_as_millis = |name: &str| -> Result<Option<u64>> {
            match std::env::var(name) {
                Ok(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map(|secs| Some(secs.saturating_mul(1000)))
                    .with_context(|| format!("{} must be a whole number of seconds", name)),
                Err(_) => Ok(None),
            }
        };

        let mut config = Self::new(
            var("WAULT_CLIENT_ID")?,
            std::env::var("WAULT_USER_EMAIL").unwrap_or_default(),
            var("WAULT_ID")?,
            &var("WAULT_AUTHORITY_URL")?,
            &var("WAULT_API_URL")?,
            &var("WAULT_PORTAL_URL")?,
        );
        config.handshake_timeout_ms = secs_as_millis("WAULT_HANDSHAKE_TIMEOUT_SECS")?;
        config.request_timeout_ms = secs_as_millis("WAULT_REQUEST_TIMEOUT_SECS")?;
        Ok(config)
    }

    /// Load the saved configuration, if one exists.
    pub fn load() -> Result<Option<Self>> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(Some(config.normalized()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn normalized(mut self) -> Self {
        self.authority_base_url = strip_trailing_slash(&self.authority_base_url);
        self.api_base_url = strip_trailing_slash(&self.api_base_url);
        self.portal_base_url = strip_trailing_slash(&self.portal_base_url);
        self
    }
}

/// Cache directory for session files and logs.
pub fn cache_dir() -> Result<PathBuf> {
    let cache_dir =
        dirs::cache_dir().ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
    Ok(cache_dir.join(APP_NAME))
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn strip_trailing_slash(url: &str) -> String {
    url.strip_suffix('/').unwrap_or(url).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ClientConfig {
        ClientConfig::new(
            "client-1",
            "user@example.com",
            "wault-9",
            "https://auth.example.com/",
            "https://api.example.com",
            "https://portal.example.com/",
        )
    }

    #[test]
    fn test_trailing_slash_is_stripped() {
        let c = config();
        assert_eq!(c.authority_base_url, "https://auth.example.com");
        assert_eq!(c.api_base_url, "https://api.example.com");
        assert_eq!(c.portal_base_url, "https://portal.example.com");
    }

    #[test]
    fn test_only_one_trailing_slash_is_stripped() {
        assert_eq!(strip_trailing_slash("https://a.example.com//"), "https://a.example.com/");
    }

    #[test]
    fn test_authority_origin_drops_path() {
        let c = ClientConfig::new("c", "", "w", "https://auth.example.com:8443/sso/", "x", "y");
        assert_eq!(c.authority_origin().unwrap(), "https://auth.example.com:8443");
    }

    #[test]
    fn test_timeouts_default_to_none() {
        let c = config();
        assert_eq!(c.handshake_timeout(), None);
        assert_eq!(c.request_timeout(), None);

        let c = c
            .with_handshake_timeout(Duration::from_secs(120))
            .with_request_timeout(Duration::from_secs(30));
        assert_eq!(c.handshake_timeout(), Some(Duration::from_secs(120)));
        assert_eq!(c.request_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_sub_second_timeouts_are_kept() {
        let c = config()
            .with_handshake_timeout(Duration::from_millis(250))
            .with_request_timeout(Duration::from_millis(1500));
        assert_eq!(c.handshake_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(c.request_timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(c.handshake_timeout_ms, Some(250));
    }

    #[test]
    fn test_deserialized_config_is_normalized() {
        let json = r#"{
            "authority_base_url": "https://auth.example.com/",
            "api_base_url": "https://api.example.com/",
            "portal_base_url": "https://portal.example.com",
            "client_id": "c",
            "wault_id": "w",
            "user_email_hint": ""
        }"#;
        let c: ClientConfig = serde_json::from_str(json).unwrap();
        let c = c.normalized();
        assert_eq!(c.authority_base_url, "https://auth.example.com");
        assert_eq!(c.api_base_url, "https://api.example.com");
        assert_eq!(c.handshake_timeout_ms, None);
    }
}
