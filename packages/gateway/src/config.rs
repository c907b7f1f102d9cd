//! Gateway connection settings.
//!
//! Read from the environment at startup, optionally seeded from a TOML
//! file named by `KARTLAG_CONFIG`:
//!
//! ```toml
//! [supabase]
//! url = "https://example.supabase.co"
//! api_key = "..."
//! timeout_secs = 30
//! ```
//!
//! `SUPABASE_URL`, `SUPABASE_API_KEY` and `GATEWAY_TIMEOUT_SECS` override
//! the file.

use std::time::Duration;

use serde::Deserialize;

use crate::GatewayError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for the upstream gateway.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL, without the `/rest/v1` suffix.
    pub base_url: String,
    /// API key, sent both as `apikey` and as the bearer token.
    pub api_key: String,
    /// Total timeout for each request.
    pub timeout: Duration,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(default)]
    supabase: SupabaseSection,
}

#[derive(Debug, Default, Deserialize)]
struct SupabaseSection {
    url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
}

impl GatewayConfig {
    /// Reads the configuration from `KARTLAG_CONFIG` (if set) and the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the config file cannot be
    /// read or parsed, or the base URL or API key is missing.
    pub fn from_env() -> Result<Self, GatewayError> {
        let file = match std::env::var("KARTLAG_CONFIG") {
            Ok(path) => Some(std::fs::read_to_string(&path).map_err(|e| {
                GatewayError::configuration(format!("failed to read {path}: {e}"))
            })?),
            Err(_) => None,
        };

        Self::resolve(file.as_deref(), |key| std::env::var(key).ok())
    }

    /// Merges an optional TOML document with values from `env`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Configuration`] if the document does not
    /// parse, the timeout is not a positive number, or the base URL or API key is
    /// missing or empty.
    pub fn resolve<F>(toml_document: Option<&str>, env: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file: FileConfig = match toml_document {
            Some(text) => toml::from_str(text)
                .map_err(|e| GatewayError::configuration(format!("invalid config file: {e}")))?,
            None => FileConfig::default(),
        };

        let base_url = env("SUPABASE_URL")
            .or(file.supabase.url)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GatewayError::configuration("SUPABASE_URL is not set"))?;

        let api_key = env("SUPABASE_API_KEY")
            .or(file.supabase.api_key)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| GatewayError::configuration("SUPABASE_API_KEY is not set"))?;

        let timeout = match env("GATEWAY_TIMEOUT_SECS") {
            Some(secs) => Duration::from_secs(secs.trim().parse().map_err(|_| {
                GatewayError::configuration(format!("GATEWAY_TIMEOUT_SECS is not a number: {secs}"))
            })?),
            None => file
                .supabase
                .timeout_secs
                .map_or(DEFAULT_TIMEOUT, Duration::from_secs),
        };
        if timeout.is_zero() {
            return Err(GatewayError::configuration(
                "gateway timeout must be at least one second",
            ));
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn reads_environment() {
        let config = GatewayConfig::resolve(
            None,
            env_of(&[
                ("SUPABASE_URL", "https://example.supabase.co/"),
                ("SUPABASE_API_KEY", "secret"),
            ]),
        )
        .unwrap();
        assert_eq!(config.base_url, "https://example.supabase.co");
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.timeout, DEFAULT_TIMEOUT);
    }

    #[test]
    fn environment_overrides_file() {
        let file = r#"
            [supabase]
            url = "https://file.supabase.co"
            api_key = "from-file"
            timeout_secs = 5
        "#;
        let config =
            GatewayConfig::resolve(Some(file), env_of(&[("SUPABASE_API_KEY", "from-env")]))
                .unwrap();
        assert_eq!(config.base_url, "https://file.supabase.co");
        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn missing_key_is_a_configuration_error() {
        let err = GatewayConfig::resolve(None, env_of(&[("SUPABASE_URL", "https://x")]))
            .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn blank_url_is_a_configuration_error() {
        let err = GatewayConfig::resolve(
            None,
            env_of(&[("SUPABASE_URL", "  "), ("SUPABASE_API_KEY", "k")]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn timeout_must_be_numeric() {
        let err = GatewayConfig::resolve(
            None,
            env_of(&[
                ("SUPABASE_URL", "https://x"),
                ("SUPABASE_API_KEY", "k"),
                ("GATEWAY_TIMEOUT_SECS", "soon"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = GatewayConfig::resolve(
            None,
            env_of(&[
                ("SUPABASE_URL", "https://x"),
                ("SUPABASE_API_KEY", "k"),
                ("GATEWAY_TIMEOUT_SECS", "0"),
            ]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));

        let file = "[supabase]\ntimeout_secs = 0\n";
        let err = GatewayConfig::resolve(
            Some(file),
            env_of(&[("SUPABASE_URL", "https://x"), ("SUPABASE_API_KEY", "k")]),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Configuration { .. }));
    }
}
