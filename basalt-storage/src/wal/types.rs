use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the write-ahead log.
#[derive(Debug, Clone)]
pub struct WalConfig {
    /// How often the flusher retires the active table and writes it to
    /// the object store.
    pub flush_interval: Duration,

    /// Rotate early once the active table's accumulated key+value bytes
    /// cross this threshold.
    pub max_table_bytes: u64,

    /// Attempts per table before a flush is parked until the next tick.
    pub flush_retries: u32,
}

impl Default for WalConfig {
    fn default() -> Self {
        Self {
            flush_interval: Duration::from_millis(200),
            max_table_bytes: 4 * 1024 * 1024, // 4MB
            flush_retries: 3,
        }
    }
}

/// Per-call options for [`crate::wal::Wal::put`] and
/// [`crate::wal::Wal::delete`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PutOptions {
    /// Block until the write's table has been durably flushed.
    pub await_flush: bool,
}
