//! Provider configuration loaded from environment variables.

use std::time::Duration;

use crate::error::ProviderError;

/// Default timeout for a single request to the AI service.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Which implementation backs the provider traits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Live,
    Simulated,
}

impl std::str::FromStr for ProviderMode {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "live" => Ok(ProviderMode::Live),
            "simulated" => Ok(ProviderMode::Simulated),
            other => Err(ProviderError::NotConfigured(format!(
                "AI_PROVIDER_MODE must be 'live' or 'simulated', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub mode: ProviderMode,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            mode: ProviderMode::Simulated,
            base_url: None,
            api_key: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ProviderConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env var                   | Default |
    /// |---------------------------|---------|
    /// | `AI_PROVIDER_MODE`        | `live`  |
    /// | `AI_API_BASE_URL`         | -       |
    /// | `AI_API_KEY`              | -       |
    /// | `AI_REQUEST_TIMEOUT_SECS` | `120`   |
    ///
    /// Live mode without a base URL or key is an error.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Result<Self, ProviderError> {
        let mode = match var("AI_PROVIDER_MODE") {
            Some(value) => value.parse()?,
            None => ProviderMode::Live,
        };
        let non_empty = |key: &str| var(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            mode,
            base_url: non_empty("AI_API_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
            api_key: non_empty("AI_API_KEY"),
            timeout: Duration::from_secs(
                var("AI_REQUEST_TIMEOUT_SECS")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ),
        };

        if config.mode == ProviderMode::Live {
            if config.base_url.is_none() {
                return Err(ProviderError::NotConfigured(
                    "AI_API_BASE_URL is required in live mode".into(),
                ));
            }
            if config.api_key.is_none() {
                return Err(ProviderError::NotConfigured(
                    "AI_API_KEY is required in live mode".into(),
                ));
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn live_mode_is_the_default_and_requires_credentials() {
        assert_matches!(
            ProviderConfig::from_vars(vars(&[])),
            Err(ProviderError::NotConfigured(_))
        );
        assert_matches!(
            ProviderConfig::from_vars(vars(&[("AI_API_BASE_URL", "https://ai.test")])),
            Err(ProviderError::NotConfigured(_))
        );
    }

    #[test]
    fn live_mode_with_credentials() {
        let config = ProviderConfig::from_vars(vars(&[
            ("AI_API_BASE_URL", "https://ai.test/"),
            ("AI_API_KEY", "secret"),
            ("AI_REQUEST_TIMEOUT_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.mode, ProviderMode::Live);
        assert_eq!(config.base_url.as_deref(), Some("https://ai.test"));
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn simulated_mode_needs_nothing_else() {
        let config = ProviderConfig::from_vars(vars(&[("AI_PROVIDER_MODE", "Simulated")])).unwrap();
        assert_eq!(config.mode, ProviderMode::Simulated);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn unknown_mode_is_rejected() {
        assert_matches!(
            ProviderConfig::from_vars(vars(&[("AI_PROVIDER_MODE", "mock")])),
            Err(ProviderError::NotConfigured(_))
        );
    }
}
