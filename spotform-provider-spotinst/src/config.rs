//! Provider configuration
//!
//! Settings come from three places, highest priority first: explicit values
//! (CLI flags), the `provider` block of the configuration file, and the
//! `SPOTINST_*` environment variables. Each source is a `ConfigSource`; they
//! are merged field by field with [`ConfigSource::or`] and then validated by
//! [`ConfigSource::build`].

use std::time::Duration;

use serde::Deserialize;
use spotform_core::retry::RetryPolicy;

pub const DEFAULT_BASE_URL: &str = "https://api.spotinst.io";

pub const ENV_TOKEN: &str = "SPOTINST_TOKEN";
pub const ENV_ACCOUNT: &str = "SPOTINST_ACCOUNT";
pub const ENV_BASE_URL: &str = "SPOTINST_BASE_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no API token configured; set `token` in the provider block or {ENV_TOKEN}")]
    MissingToken,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// One source of provider settings; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSource {
    pub token: Option<String>,
    pub account: Option<String>,
    pub base_url: Option<String>,
    /// Time budget for retried create calls, in seconds
    pub create_timeout_secs: Option<u64>,
}

impl ConfigSource {
    /// Read settings through a variable lookup function
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        Self {
            token: var(ENV_TOKEN),
            account: var(ENV_ACCOUNT),
            base_url: var(ENV_BASE_URL),
            create_timeout_secs: None,
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Fill unset fields from `fallback`
    pub fn or(self, fallback: ConfigSource) -> Self {
        Self {
            token: self.token.or(fallback.token),
            account: self.account.or(fallback.account),
            base_url: self.base_url.or(fallback.base_url),
            create_timeout_secs: self.create_timeout_secs.or(fallback.create_timeout_secs),
        }
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        let token = self
            .token
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let parsed = reqwest::Url::parse(&base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidBaseUrl {
                url: base_url,
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }

        let retry = match self.create_timeout_secs {
            Some(secs) => RetryPolicy::with_timeout(Duration::from_secs(secs)),
            None => RetryPolicy::default(),
        };

        Ok(Config {
            token,
            account: self.account.filter(|a| !a.is_empty()),
            base_url: base_url.trim_end_matches('/').to_string(),
            retry,
        })
    }
}

/// Validated provider configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub token: String,
    pub account: Option<String>,
    pub base_url: String,
    /// Retry policy for create calls
    pub retry: RetryPolicy,
}

impl Config {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            account: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> ConfigSource {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigSource::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = ConfigSource::default().build().unwrap_err();
        assert!(matches!(err, ConfigError::MissingToken));
    }

    #[test]
    fn defaults_apply() {
        let config = env(&[(ENV_TOKEN, "secret")]).build().unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.account, None);
        assert_eq!(config.retry.timeout, RetryPolicy::DEFAULT_TIMEOUT);
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let explicit = ConfigSource {
            account: Some("act-explicit".to_string()),
            ..Default::default()
        };
        let config = explicit
            .or(env(&[(ENV_TOKEN, "secret"), (ENV_ACCOUNT, "act-env")]))
            .build()
            .unwrap();

        assert_eq!(config.token, "secret");
        assert_eq!(config.account.as_deref(), Some("act-explicit"));
    }

    #[test]
    fn empty_environment_values_are_ignored() {
        let source = env(&[(ENV_TOKEN, ""), (ENV_ACCOUNT, "")]);
        assert_eq!(source, ConfigSource::default());
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let source = ConfigSource {
            token: Some("secret".to_string()),
            base_url: Some("ftp://api.spotinst.io".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            source.build(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn create_timeout_sets_retry_budget() {
        let source = ConfigSource {
            token: Some("secret".to_string()),
            base_url: Some("http://localhost:8080/".to_string()),
            create_timeout_secs: Some(5),
            ..Default::default()
        };
        let config = source.build().unwrap();
        assert_eq!(config.retry.timeout, Duration::from_secs(5));
        assert_eq!(config.base_url, "http://localhost:8080");
    }
}
