//! Import statistics tracking.

use serde::Serialize;

/// Counters for a single import session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    /// Rows accepted by `add_row`
    pub rows_submitted: u64,
    /// Rows the server reported as copied, summed over all flushes
    pub rows_copied: u64,
    /// Values replaced by NULL because they matched the sentinel
    pub null_values: u64,
    /// COPY round trips, including the final end-of-data flush
    pub flushes: u64,
}

impl ImportStats {
    pub fn record_flush(&mut self, copied: u64) {
        self.flushes += 1;
        self.rows_copied += copied;
    }
}
