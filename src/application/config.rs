use std::time::Duration;

/// Tunables for [`LedgerService`](super::LedgerService).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Deadline for a whole mutating operation, commit included.
    pub operation_timeout: Duration,
}

impl LedgerConfig {
    pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            operation_timeout: Self::DEFAULT_OPERATION_TIMEOUT,
        }
    }
}
