//! Configuration types.

use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Deadline for a single outbound API call. The interpreter itself
    /// enforces no timeout; executors performing I/O own their deadline.
    pub api_timeout: Duration,
    /// Validity window for view-and-confirm tokens.
    pub confirmation_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_timeout: Duration::from_secs(30),
            confirmation_ttl: Duration::from_secs(15 * 60), // 15 minutes
        }
    }
}
