//! # Metrics
//!
//! Lightweight atomic counters for monitoring the storage engine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Metrics collector
#[derive(Clone, Default)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    // Write metrics
    wal_puts: AtomicU64,
    wal_deletes: AtomicU64,
    wal_flushes: AtomicU64,
    wal_flush_bytes: AtomicU64,
    wal_flush_failures: AtomicU64,

    // Table metrics
    tables_built: AtomicU64,
    blocks_built: AtomicU64,
}

impl Metrics {
    /// Create new metrics collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a WAL put
    pub fn record_put(&self) {
        self.inner.wal_puts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a WAL delete
    pub fn record_delete(&self) {
        self.inner.wal_deletes.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a durable WAL flush
    pub fn record_flush(&self, bytes: u64) {
        self.inner.wal_flushes.fetch_add(1, Ordering::Relaxed);
        self.inner.wal_flush_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Record a failed flush attempt
    pub fn record_flush_failure(&self) {
        self.inner.wal_flush_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a finished SSTable build
    pub fn record_table_build(&self, blocks: u64) {
        self.inner.tables_built.fetch_add(1, Ordering::Relaxed);
        self.inner.blocks_built.fetch_add(blocks, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            wal_puts: self.inner.wal_puts.load(Ordering::Relaxed),
            wal_deletes: self.inner.wal_deletes.load(Ordering::Relaxed),
            wal_flushes: self.inner.wal_flushes.load(Ordering::Relaxed),
            wal_flush_bytes: self.inner.wal_flush_bytes.load(Ordering::Relaxed),
            wal_flush_failures: self.inner.wal_flush_failures.load(Ordering::Relaxed),
            tables_built: self.inner.tables_built.load(Ordering::Relaxed),
            blocks_built: self.inner.blocks_built.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub wal_puts: u64,
    pub wal_deletes: u64,
    pub wal_flushes: u64,
    pub wal_flush_bytes: u64,
    pub wal_flush_failures: u64,
    pub tables_built: u64,
    pub blocks_built: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start new timer
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time
    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Stop timer and log duration
    pub fn stop(self) {
        let duration = self.elapsed();
        tracing::debug!(
            name = %self.name,
            duration_ms = duration.as_millis(),
            "operation completed"
        );
    }
}
