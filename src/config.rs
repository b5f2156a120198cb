//! # Orchestration Configuration
//!
//! Configuration surface consumed by the orchestration core: heartbeat
//! duration, the three inter-poll delay tiers, the fan-out concurrency cap
//! and the pagination page size. Defaults mirror the values observed in
//! production deployments; every field can be overridden from the
//! environment.

use crate::error::{OrchestrationError, OrchestrationResult};
use std::time::Duration;

/// Tunables for a single orchestration pipeline
#[derive(Debug, Clone)]
pub struct OrchestrationConfig {
    /// Liveness deadline for statement-execution callbacks. Absence of a
    /// callback within this window is a fatal timeout; the statement is
    /// never resubmitted because it may already be running remotely.
    pub heartbeat: Duration,
    /// Delay between statement-level status polls (medium tier)
    pub status_poll_delay: Duration,
    /// Delay between describe polls inside the result-count fetch (short tier)
    pub describe_poll_delay: Duration,
    /// Delay between result-count accumulation polls (long tier)
    pub result_poll_delay: Duration,
    /// Maximum number of concurrently in-flight queue publishes per fan-out round
    pub fan_out_concurrency: usize,
    /// Number of IDs fetched per pagination round
    pub page_size: i64,
    /// Optional upper bound on status polls before the run fails with
    /// `DeadlineExceeded`. `None` polls until the executor reports a
    /// terminal status, which matches the original operating assumption of a
    /// trusted, always-terminating executor.
    pub max_status_polls: Option<u32>,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            heartbeat: Duration::from_secs(300),
            status_poll_delay: Duration::from_secs(10),
            describe_poll_delay: Duration::from_secs(1),
            result_poll_delay: Duration::from_secs(120),
            fan_out_concurrency: 40,
            page_size: 10_000,
            max_status_polls: None,
        }
    }
}

impl OrchestrationConfig {
    /// Build configuration from environment variables, falling back to
    /// defaults for anything unset
    pub fn from_env() -> OrchestrationResult<Self> {
        let mut config = Self::default();

        if let Ok(heartbeat) = std::env::var("DOCKFLOW_HEARTBEAT_SECS") {
            config.heartbeat = Duration::from_secs(parse_env("heartbeat", &heartbeat)?);
        }

        if let Ok(delay) = std::env::var("DOCKFLOW_STATUS_POLL_DELAY_SECS") {
            config.status_poll_delay = Duration::from_secs(parse_env("status_poll_delay", &delay)?);
        }

        if let Ok(delay) = std::env::var("DOCKFLOW_DESCRIBE_POLL_DELAY_SECS") {
            config.describe_poll_delay =
                Duration::from_secs(parse_env("describe_poll_delay", &delay)?);
        }

        if let Ok(delay) = std::env::var("DOCKFLOW_RESULT_POLL_DELAY_SECS") {
            config.result_poll_delay = Duration::from_secs(parse_env("result_poll_delay", &delay)?);
        }

        if let Ok(concurrency) = std::env::var("DOCKFLOW_FAN_OUT_CONCURRENCY") {
            config.fan_out_concurrency = parse_env("fan_out_concurrency", &concurrency)?;
        }

        if let Ok(page_size) = std::env::var("DOCKFLOW_PAGE_SIZE") {
            config.page_size = parse_env("page_size", &page_size)?;
        }

        if let Ok(max_polls) = std::env::var("DOCKFLOW_MAX_STATUS_POLLS") {
            config.max_status_polls = Some(parse_env("max_status_polls", &max_polls)?);
        }

        config.validate()
    }

    /// Reject values that would stall the pipeline: a zero fan-out cap never
    /// publishes and a non-positive page size never advances the offset
    pub fn validate(self) -> OrchestrationResult<Self> {
        if self.fan_out_concurrency == 0 {
            return Err(OrchestrationError::configuration(
                "fan_out_concurrency must be at least 1",
            ));
        }
        if self.page_size <= 0 {
            return Err(OrchestrationError::configuration(
                "page_size must be at least 1",
            ));
        }
        Ok(self)
    }

    /// Configuration with millisecond delays for tests that exercise real
    /// poll loops under a paused clock
    pub fn for_testing() -> Self {
        Self {
            heartbeat: Duration::from_millis(200),
            status_poll_delay: Duration::from_millis(10),
            describe_poll_delay: Duration::from_millis(1),
            result_poll_delay: Duration::from_millis(50),
            fan_out_concurrency: 4,
            page_size: 5,
            max_status_polls: None,
        }
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, raw: &str) -> OrchestrationResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| OrchestrationError::configuration(format!("Invalid {field}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_observed_deployment_values() {
        let config = OrchestrationConfig::default();
        assert_eq!(config.heartbeat, Duration::from_secs(300));
        assert_eq!(config.status_poll_delay, Duration::from_secs(10));
        assert_eq!(config.describe_poll_delay, Duration::from_secs(1));
        assert_eq!(config.result_poll_delay, Duration::from_secs(120));
        assert_eq!(config.fan_out_concurrency, 40);
        assert_eq!(config.page_size, 10_000);
        assert!(config.max_status_polls.is_none());
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        let parsed: OrchestrationResult<u64> = parse_env("heartbeat", "not-a-number");
        assert!(matches!(
            parsed,
            Err(OrchestrationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_fan_out_cap() {
        let config = OrchestrationConfig {
            fan_out_concurrency: 0,
            ..OrchestrationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OrchestrationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_non_positive_page_size() {
        let config = OrchestrationConfig {
            page_size: 0,
            ..OrchestrationConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(OrchestrationError::Configuration { .. })
        ));
    }

    #[test]
    fn test_defaults_pass_validation() {
        assert!(OrchestrationConfig::default().validate().is_ok());
        assert!(OrchestrationConfig::for_testing().validate().is_ok());
    }
}
