//! Engine settings → core engine config

use anyhow::anyhow;
use resourceflow_config::EngineSettings;
use resourceflow_core::{EngineConfig, ErrorClassifier, ErrorKind, RetryConfig};
use std::time::Duration;

pub fn engine_config(settings: &EngineSettings) -> anyhow::Result<EngineConfig> {
    let mut classifier = ErrorClassifier::new();
    for (code, kind) in &settings.error_codes {
        let kind: ErrorKind = kind
            .parse()
            .map_err(|e| anyhow!("error_codes.{}: {}", code, e))?;
        classifier = classifier.with_override(code, kind);
    }

    Ok(EngineConfig::new()
        .with_max_attempts(settings.max_attempts)
        .with_poll_interval(Duration::from_secs(settings.poll_interval_secs))
        .with_retry(RetryConfig {
            initial_delay: Duration::from_secs(settings.backoff.initial_secs),
            max_delay: Duration::from_secs(settings.backoff.max_secs),
            backoff_multiplier: settings.backoff.multiplier,
        })
        .with_classifier(classifier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_reach_classifier() {
        let mut settings = EngineSettings::default();
        settings
            .error_codes
            .insert("QuotaExceeded".to_string(), "throttled".to_string());

        let config = engine_config(&settings).unwrap();
        assert_eq!(config.max_attempts, 30);
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.classifier.kind_for("quota_exceeded"), ErrorKind::Throttled);
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let mut settings = EngineSettings::default();
        settings
            .error_codes
            .insert("Odd".to_string(), "SOMETIMES".to_string());

        assert!(engine_config(&settings).is_err());
    }
}
