//! Write-ahead log: an in-memory sorted buffer of recent writes with a
//! periodic flusher that makes them durable through an object store.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         Write Path                              │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  put/delete ──► active KvTable (writer lock)                    │
//! │                      │ rotate: timer tick or size threshold     │
//! │                      ▼                                          │
//! │              immutable queue ──► flusher ──► ObjectStore.write  │
//! │                      │                          + sync          │
//! │                      ▼                                          │
//! │          durability signal fulfilled, table dequeued            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A table moves through `Active → Immutable → Durable`; transitions
//! are one-way. Reads see the active table first, then immutable
//! tables newest to oldest, so an un-flushed table keeps shadowing
//! older writes for as long as it is queued. Durability waiters block
//! outside the writer lock on the table's one-shot broadcast signal.

mod table;
mod types;

pub use table::KvTable;
pub use types::{PutOptions, WalConfig};

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use basalt_core::error::{Error, Result};
use basalt_core::metrics::Metrics;
use basalt_core::traits::ObjectStore;
use basalt_core::types::{Value, MAX_KEY_LEN};

struct WalState {
    active: Arc<KvTable>,
    immutable: VecDeque<Arc<KvTable>>,
}

/// The write-ahead log. Keys and values handed in are copied; the WAL
/// owns its in-memory bytes.
pub struct Wal {
    store: Arc<dyn ObjectStore>,
    state: Arc<RwLock<WalState>>,
    config: WalConfig,
    metrics: Metrics,
    flush_notify: Arc<Notify>,
    /// Serializes flush cycles: one party owns the serialization side
    /// of the immutable queue at a time.
    flush_lock: Arc<tokio::sync::Mutex<()>>,
    shutdown_tx: watch::Sender<bool>,
    flusher: Mutex<Option<JoinHandle<()>>>,
}

impl Wal {
    /// Create a WAL flushing to `store` and start its background
    /// flusher. Must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn ObjectStore>, config: WalConfig) -> Self {
        let state = Arc::new(RwLock::new(WalState {
            active: Arc::new(KvTable::new()),
            immutable: VecDeque::new(),
        }));
        let metrics = Metrics::new();
        let flush_notify = Arc::new(Notify::new());
        let flush_lock = Arc::new(tokio::sync::Mutex::new(()));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(run_flusher(
            Arc::clone(&state),
            Arc::clone(&store),
            config.clone(),
            metrics.clone(),
            Arc::clone(&flush_notify),
            Arc::clone(&flush_lock),
            shutdown_rx,
        ));

        Self {
            store,
            state,
            config,
            metrics,
            flush_notify,
            flush_lock,
            shutdown_tx,
            flusher: Mutex::new(Some(handle)),
        }
    }

    /// Record a write. With `opts.await_flush`, returns only after the
    /// table the write landed in has been durably flushed.
    pub async fn put(&self, key: &[u8], value: &[u8], opts: PutOptions) -> Result<()> {
        self.metrics.record_put();
        self.write_entry(key, Value::Present(Bytes::copy_from_slice(value)), opts)
            .await
    }

    /// Record a deletion. Honors `opts.await_flush` exactly like
    /// [`Wal::put`].
    pub async fn delete(&self, key: &[u8], opts: PutOptions) -> Result<()> {
        self.metrics.record_delete();
        self.write_entry(key, Value::Tombstone, opts).await
    }

    async fn write_entry(&self, key: &[u8], value: Value, opts: PutOptions) -> Result<()> {
        assert!(!key.is_empty(), "key must not be empty");
        assert!(key.len() <= MAX_KEY_LEN, "key exceeds u16 length prefix");

        let (signal, over_threshold) = {
            let state = self.state.write();
            state.active.insert(Bytes::copy_from_slice(key), value);
            let over = state.active.size() as u64 >= self.config.max_table_bytes;
            let signal = opts.await_flush.then(|| state.active.durable_signal());
            (signal, over)
        };

        if over_threshold {
            self.flush_notify.notify_one();
        }

        // The writer lock is released; block on durability only here.
        if let Some(mut signal) = signal {
            signal
                .wait_for(|durable| *durable)
                .await
                .map_err(|_| Error::Internal {
                    message: "wal closed before the write became durable".to_string(),
                })?;
        }
        Ok(())
    }

    /// Point lookup over the active table and then the immutable queue,
    /// newest first. A tombstone shadows older values and reads as
    /// [`Error::KeyNotFound`].
    pub async fn get(&self, key: &[u8]) -> Result<Bytes> {
        let state = self.state.read();

        let found = state
            .active
            .get(key)
            .or_else(|| state.immutable.iter().rev().find_map(|table| table.get(key)));

        match found {
            Some(Value::Present(value)) => Ok(value),
            Some(Value::Tombstone) | None => Err(Error::KeyNotFound),
        }
    }

    /// Rotate the active table and drain the immutable queue now,
    /// independent of the flusher's timer.
    pub async fn flush(&self) -> Result<()> {
        let _serialize = self.flush_lock.lock().await;
        flush_tick(&self.state, self.store.as_ref(), &self.config, &self.metrics).await
    }

    /// Number of immutable tables still awaiting durability.
    pub fn pending_tables(&self) -> usize {
        self.state.read().immutable.len()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Stop the flusher after one final rotate-and-drain so pending
    /// `await_flush` waiters are released.
    pub async fn close(&self) -> Result<()> {
        self.shutdown_tx.send_replace(true);
        let handle = self.flusher.lock().take();
        if let Some(handle) = handle {
            handle.await.map_err(|e| Error::Internal {
                message: format!("wal flusher panicked: {}", e),
            })?;
        }
        Ok(())
    }
}

async fn run_flusher(
    state: Arc<RwLock<WalState>>,
    store: Arc<dyn ObjectStore>,
    config: WalConfig,
    metrics: Metrics,
    flush_notify: Arc<Notify>,
    flush_lock: Arc<tokio::sync::Mutex<()>>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(config.flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick completes immediately

    info!(
        interval_ms = config.flush_interval.as_millis() as u64,
        "wal flusher started"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = flush_notify.notified() => {}
            _ = shutdown_rx.changed() => {
                let _serialize = flush_lock.lock().await;
                if let Err(e) = flush_tick(&state, store.as_ref(), &config, &metrics).await {
                    error!(error = %e, "final wal flush failed; pending waiters are stranded");
                }
                info!("wal flusher stopped");
                return;
            }
        }

        let _serialize = flush_lock.lock().await;
        if let Err(e) = flush_tick(&state, store.as_ref(), &config, &metrics).await {
            // The failed table stays queued and readable; the next tick
            // retries it before anything newer.
            error!(error = %e, "wal flush failed");
        }
    }
}

/// One flush cycle: rotate the active table, then drain the immutable
/// queue oldest-first. The lock is never held across store IO, and a
/// table leaves the queue only after it is durable.
async fn flush_tick(
    state: &RwLock<WalState>,
    store: &dyn ObjectStore,
    config: &WalConfig,
    metrics: &Metrics,
) -> Result<()> {
    {
        let mut guard = state.write();
        if !guard.active.is_empty() {
            let retired = std::mem::replace(&mut guard.active, Arc::new(KvTable::new()));
            guard.immutable.push_back(retired);
        }
    }

    loop {
        let table = state.read().immutable.front().cloned();
        let Some(table) = table else {
            return Ok(());
        };

        let payload = table.encode()?;
        write_with_retry(store, &payload, config.flush_retries, metrics).await?;

        table.mark_durable();
        metrics.record_flush(payload.len() as u64);
        state.write().immutable.pop_front();
        debug!(
            bytes = payload.len(),
            entries = table.len(),
            "flushed wal table"
        );
    }
}

async fn write_with_retry(
    store: &dyn ObjectStore,
    payload: &[u8],
    retries: u32,
    metrics: &Metrics,
) -> Result<()> {
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = match store.write(payload).await {
            Ok(()) => store.sync().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => return Ok(()),
            Err(e) if attempt < retries => {
                metrics.record_flush_failure();
                warn!(attempt, error = %e, "wal store write failed, backing off");
                tokio::time::sleep(Duration::from_millis(10 * (1u64 << attempt))).await;
            }
            Err(e) => {
                metrics.record_flush_failure();
                return Err(e);
            }
        }
    }
}
