//! Resolver and executor configuration
//!
//! Polling parameters are configurable so that tests and small farms can
//! poll aggressively while large farms keep the query load down.

use serde_json::{Map, Value};
use std::time::Duration;

/// Resolver configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Query aggregate job status first and fetch per-item detail only for
    /// jobs that have finished
    pub two_stage_polling: bool,

    /// Delay used right after a wake or a resolution
    pub min_delay: Duration,

    /// Upper bound for the poll delay
    pub max_delay: Duration,

    /// Growth of the delay per idle poll cycle
    pub backoff_factor: f64,
}

impl ResolverConfig {
    pub fn new(two_stage_polling: bool) -> Self {
        Self {
            two_stage_polling,
            min_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            // A doubling delay reaches long waits too quickly for a farm
            // where jobs take minutes.
            backoff_factor: 1.15,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - FARMFUTURE_TWO_STAGE_POLLING (optional, "1"/"true", default: false)
    /// - FARMFUTURE_MIN_DELAY_MS (optional, default: 100)
    /// - FARMFUTURE_MAX_DELAY_MS (optional, default: 2000)
    /// - FARMFUTURE_BACKOFF_FACTOR (optional, default: 1.15)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let two_stage_polling = var("FARMFUTURE_TWO_STAGE_POLLING")
            .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(defaults.two_stage_polling);

        let min_delay = var("FARMFUTURE_MIN_DELAY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.min_delay);

        let max_delay = var("FARMFUTURE_MAX_DELAY_MS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.max_delay);

        let backoff_factor = var("FARMFUTURE_BACKOFF_FACTOR")
            .and_then(|s| s.parse::<f64>().ok())
            .unwrap_or(defaults.backoff_factor);

        let config = Self {
            two_stage_polling,
            min_delay,
            max_delay,
            backoff_factor,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_delays(mut self, min_delay: Duration, max_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self.max_delay = max_delay;
        self
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.min_delay.is_zero() {
            anyhow::bail!("min_delay must be greater than 0");
        }

        if self.min_delay > self.max_delay {
            anyhow::bail!("min_delay must not exceed max_delay");
        }

        if self.backoff_factor.is_nan() || self.backoff_factor <= 1.0 {
            anyhow::bail!("backoff_factor must be greater than 1");
        }

        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Defaults applied to jobs created by an [`crate::Executor`]
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    /// Job name; the first callable's name when unset
    pub job_name: Option<String>,

    /// Extra job-level attributes passed through to the farm
    pub attributes: Map<String, Value>,
}

impl ExecutorConfig {
    pub fn with_job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }
}
