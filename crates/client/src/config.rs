use std::time::Duration;

/// Default service endpoint for a locally running identification service.
pub const DEFAULT_API_URL: &str = "http://localhost:5000";

/// Connection settings for [`ApiClient`](crate::ApiClient).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base HTTP URL without the `/api/v1` prefix.
    pub api_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                | Default                 |
    /// |------------------------|-------------------------|
    /// | `WILDID_API_URL`       | `http://localhost:5000` |
    /// | `REQUEST_TIMEOUT_SECS` | unset (no timeout)      |
    ///
    /// A `REQUEST_TIMEOUT_SECS` that is not a positive integer is ignored
    /// with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("WILDID_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS").and_then(|raw| {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Some(Duration::from_secs(secs)),
                _ => {
                    tracing::warn!(value = %raw, "Ignoring invalid REQUEST_TIMEOUT_SECS");
                    None
                }
            }
        });

        Self {
            api_url,
            request_timeout,
        }
    }
}
