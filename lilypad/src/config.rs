//! Client configuration.
//!
//! Static settings shared by every request a [`LilypadClient`](crate::LilypadClient)
//! makes, plus the environment variables they can be read from.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default Lilypad API base URL.
pub const LILYPAD_API_BASE_URL: &str = "https://anura-testnet.lilypad.tech/api/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "LILYPAD_API_KEY";

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "LILYPAD_BASE_URL";

/// Environment variable setting a request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "LILYPAD_TIMEOUT_SECS";

/// HTTP transport configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Whole-request timeout in seconds. `None` disables it.
    pub timeout_secs: Option<u64>,
    /// User agent string.
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: Some(concat!("lilypad-rs/", env!("CARGO_PKG_VERSION")).to_string()),
        }
    }
}

impl ClientConfig {
    /// Read the optional timeout from [`TIMEOUT_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the variable is set but is not a number.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
            config.timeout_secs = Some(parse_timeout(&raw)?);
        }
        Ok(config)
    }

    /// Build a reqwest client with this configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Http`] if the TLS backend cannot be initialized.
    pub fn build_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();

        if let Some(timeout) = self.timeout_secs {
            builder = builder.timeout(Duration::from_secs(timeout));
        }

        if let Some(ref user_agent) = self.user_agent {
            builder = builder.user_agent(user_agent);
        }

        Ok(builder.build()?)
    }
}

fn parse_timeout(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|e| Error::config(format!("invalid {TIMEOUT_ENV} value {raw:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.timeout_secs, None);
        assert!(config.user_agent.as_deref().is_some_and(|ua| ua.starts_with("lilypad-rs/")));
    }

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout("30").unwrap(), 30);
        assert_eq!(parse_timeout(" 5 ").unwrap(), 5);
        assert!(matches!(parse_timeout("soon"), Err(Error::Config(_))));
        assert!(matches!(parse_timeout("-1"), Err(Error::Config(_))));
    }

    #[test]
    fn test_build_client() {
        let config = ClientConfig {
            timeout_secs: Some(10),
            user_agent: None,
        };
        assert!(config.build_client().is_ok());
    }
}
