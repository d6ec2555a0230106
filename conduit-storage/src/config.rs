//! In-memory store configuration

use std::time::Duration;

const DEFAULT_IDENTITY_SEED: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InMemoryStoreConfig {
    /// First key handed out to store-keyed records (default: 1)
    pub identity_seed: i64,

    /// Simulated I/O latency per store call (default: none)
    pub latency: Option<Duration>,
}

impl Default for InMemoryStoreConfig {
    fn default() -> Self {
        Self {
            identity_seed: DEFAULT_IDENTITY_SEED,
            latency: None,
        }
    }
}

impl InMemoryStoreConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `CONDUIT_STORE_IDENTITY_SEED`: First store-assigned key (default: 1)
    /// - `CONDUIT_STORE_LATENCY_MS`: Simulated latency per call in milliseconds (default: unset)
    pub fn from_env() -> Self {
        let identity_seed = std::env::var("CONDUIT_STORE_IDENTITY_SEED")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_IDENTITY_SEED);

        let latency = std::env::var("CONDUIT_STORE_LATENCY_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self {
            identity_seed,
            latency,
        }
    }

    pub fn with_identity_seed(mut self, seed: i64) -> Self {
        self.identity_seed = seed;
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}
