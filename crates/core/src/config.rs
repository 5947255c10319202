//! Review workflow configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::annotation::validate_confidence;
use crate::error::CoreError;

/// Confidence below which an unreviewed annotation is flagged for review.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.89;

/// Seconds between retraining status polls.
pub const DEFAULT_RETRAIN_POLL_INTERVAL_SECS: u64 = 5;

/// Settings for the review controller and retraining monitor.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewConfig {
    /// Annotations below this confidence are surfaced as needing review.
    pub confidence_threshold: f64,
    /// Interval between retraining job polls.
    pub retrain_poll_interval: Duration,
    /// Directory for the on-disk annotation cache. `None` keeps the cache in
    /// memory only.
    pub cache_dir: Option<PathBuf>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            retrain_poll_interval: Duration::from_secs(DEFAULT_RETRAIN_POLL_INTERVAL_SECS),
            cache_dir: None,
        }
    }
}

impl ReviewConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default |
    /// |-------------------------------|---------|
    /// | `REVIEW_CONFIDENCE_THRESHOLD` | `0.89`  |
    /// | `RETRAIN_POLL_INTERVAL_SECS`  | `5`     |
    /// | `ANNOTATION_CACHE_DIR`        | unset   |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("REVIEW_CONFIDENCE_THRESHOLD") {
            let threshold: f64 = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "REVIEW_CONFIDENCE_THRESHOLD must be a number, got '{raw}'"
                ))
            })?;
            validate_confidence(threshold)
                .map_err(|e| CoreError::Config(format!("REVIEW_CONFIDENCE_THRESHOLD: {e}")))?;
            config.confidence_threshold = threshold;
        }

        if let Some(raw) = lookup("RETRAIN_POLL_INTERVAL_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "RETRAIN_POLL_INTERVAL_SECS must be a whole number, got '{raw}'"
                ))
            })?;
            if secs == 0 {
                return Err(CoreError::Config(
                    "RETRAIN_POLL_INTERVAL_SECS must be greater than zero".to_string(),
                ));
            }
            config.retrain_poll_interval = Duration::from_secs(secs);
        }

        config.cache_dir = lookup("ANNOTATION_CACHE_DIR")
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = ReviewConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ReviewConfig::default());
        assert_eq!(config.confidence_threshold, 0.89);
        assert_eq!(config.retrain_poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn overrides_are_applied() {
        let config = ReviewConfig::from_lookup(lookup(&[
            ("REVIEW_CONFIDENCE_THRESHOLD", "0.75"),
            ("RETRAIN_POLL_INTERVAL_SECS", "10"),
            ("ANNOTATION_CACHE_DIR", "/tmp/wildid"),
        ]))
        .unwrap();
        assert_eq!(config.confidence_threshold, 0.75);
        assert_eq!(config.retrain_poll_interval, Duration::from_secs(10));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/wildid")));
    }

    #[test]
    fn threshold_out_of_range_rejected() {
        let result = ReviewConfig::from_lookup(lookup(&[("REVIEW_CONFIDENCE_THRESHOLD", "2")]));
        assert_matches!(result, Err(CoreError::Config(_)));
    }

    #[test]
    fn non_numeric_interval_rejected() {
        let result = ReviewConfig::from_lookup(lookup(&[("RETRAIN_POLL_INTERVAL_SECS", "soon")]));
        assert_matches!(result, Err(CoreError::Config(_)));
    }

    #[test]
    fn zero_interval_rejected() {
        let result = ReviewConfig::from_lookup(lookup(&[("RETRAIN_POLL_INTERVAL_SECS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn blank_cache_dir_ignored() {
        let config = ReviewConfig::from_lookup(lookup(&[("ANNOTATION_CACHE_DIR", "  ")])).unwrap();
        assert!(config.cache_dir.is_none());
    }
}
