//! Pipeline configuration

use std::time::Duration;

use crate::error::{ConfigError, PipelineResult};

const DEFAULT_SLOW_REQUEST_MS: u64 = 500;

/// Runtime settings shared by every pipeline a broker routes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Requests taking longer than this are logged at warn level
    /// (default: 500ms)
    pub slow_request_threshold: Duration,

    /// Whether each request is logged at debug level (default: true)
    pub trace_requests: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slow_request_threshold: Duration::from_millis(DEFAULT_SLOW_REQUEST_MS),
            trace_requests: true,
        }
    }
}

impl PipelineConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CONDUIT_SLOW_REQUEST_MS`: Slow request threshold in milliseconds (default: 500)
    /// - `CONDUIT_TRACE_REQUESTS`: Whether to log each request (default: true)
    pub fn from_env() -> Self {
        let slow_request_threshold = Duration::from_millis(
            std::env::var("CONDUIT_SLOW_REQUEST_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SLOW_REQUEST_MS),
        );

        let trace_requests = std::env::var("CONDUIT_TRACE_REQUESTS")
            .ok()
            .map(|s| s.to_lowercase() != "false")
            .unwrap_or(true);

        Self {
            slow_request_threshold,
            trace_requests,
        }
    }

    pub fn with_slow_request_threshold(mut self, threshold: Duration) -> Self {
        self.slow_request_threshold = threshold;
        self
    }

    pub fn with_trace_requests(mut self, trace: bool) -> Self {
        self.trace_requests = trace;
        self
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.slow_request_threshold.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "slow_request_threshold".to_string(),
                value: format!("{:?}", self.slow_request_threshold),
                reason: "slow_request_threshold must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
