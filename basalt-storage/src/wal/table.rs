//! One WAL segment: an ordered in-memory mapping with a durability
//! signal.

use std::sync::atomic::{AtomicI64, Ordering};

use bytes::Bytes;
use crossbeam_skiplist::SkipMap;
use serde_bytes::ByteBuf;
use tokio::sync::watch;

use basalt_core::error::{Error, Result};
use basalt_core::types::Value;

/// An ordered key → value mapping backing one WAL segment.
///
/// A table is mutated only while it is the WAL's active table, always
/// under the writer lock; after rotation it is read-only. The size
/// counter may be read without any lock. The durability signal is a
/// one-shot broadcast: fulfilled exactly once when the segment has been
/// durably written, after which all current and future waiters proceed
/// without blocking.
pub struct KvTable {
    map: SkipMap<Bytes, Value>,
    size: AtomicI64,
    durable_tx: watch::Sender<bool>,
}

impl Default for KvTable {
    fn default() -> Self {
        Self::new()
    }
}

impl KvTable {
    pub fn new() -> Self {
        let (durable_tx, _) = watch::channel(false);
        Self {
            map: SkipMap::new(),
            size: AtomicI64::new(0),
            durable_tx,
        }
    }

    /// Point lookup. A tombstone is returned as `Value::Tombstone`, not
    /// as a miss; shadowing older tables is the caller's concern.
    pub fn get(&self, key: &[u8]) -> Option<Value> {
        self.map.get(key).map(|entry| entry.value().clone())
    }

    /// Insert or overwrite, adjusting the size counter by the delta
    /// between the new and prior entry. A missing prior entry
    /// contributes nothing to the old size.
    pub(crate) fn insert(&self, key: Bytes, value: Value) {
        let old_size = match self.map.get(&key[..]) {
            Some(entry) => (key.len() + entry.value().len()) as i64,
            None => 0,
        };
        let new_size = (key.len() + value.len()) as i64;
        self.map.insert(key, value);
        self.size.fetch_add(new_size - old_size, Ordering::Relaxed);
    }

    /// Accumulated key+value bytes. Safe to read without the WAL lock.
    pub fn size(&self) -> i64 {
        self.size.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Subscribe to the durability signal. The receiver can be awaited
    /// after the WAL lock is released.
    pub fn durable_signal(&self) -> watch::Receiver<bool> {
        self.durable_tx.subscribe()
    }

    /// Fulfill the durability signal. Idempotent.
    pub(crate) fn mark_durable(&self) {
        self.durable_tx.send_replace(true);
    }

    /// Serialize the table to its flush payload: a msgpack sequence of
    /// `(key, value)` pairs in key order, tombstones encoded as `None`.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let entries: Vec<(ByteBuf, Option<ByteBuf>)> = self
            .map
            .iter()
            .map(|entry| {
                let key = ByteBuf::from(entry.key().to_vec());
                let value = match entry.value() {
                    Value::Present(v) => Some(ByteBuf::from(v.to_vec())),
                    Value::Tombstone => None,
                };
                (key, value)
            })
            .collect();

        rmp_serde::to_vec(&entries).map_err(|e| Error::Internal {
            message: format!("wal payload serialization failed: {}", e),
        })
    }

    /// Decode a flush payload produced by [`KvTable::encode`].
    pub fn decode(buf: &[u8]) -> Result<KvTable> {
        let entries: Vec<(ByteBuf, Option<ByteBuf>)> =
            rmp_serde::from_slice(buf).map_err(|e| Error::CorruptBlock {
                reason: format!("wal payload decode failed: {}", e),
            })?;

        let table = KvTable::new();
        for (key, value) in entries {
            let value = match value {
                Some(v) => Value::Present(Bytes::from(v.into_vec())),
                None => Value::Tombstone,
            };
            table.insert(Bytes::from(key.into_vec()), value);
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_get_overwrite() {
        let table = KvTable::new();
        table.insert(Bytes::from_static(b"k"), Value::Present(Bytes::from_static(b"v1")));
        assert_eq!(
            table.get(b"k"),
            Some(Value::Present(Bytes::from_static(b"v1")))
        );

        table.insert(Bytes::from_static(b"k"), Value::Present(Bytes::from_static(b"v2")));
        assert_eq!(
            table.get(b"k"),
            Some(Value::Present(Bytes::from_static(b"v2")))
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_size_accounting() {
        let table = KvTable::new();
        table.insert(Bytes::from_static(b"key"), Value::Present(Bytes::from_static(b"value")));
        assert_eq!(table.size(), 8);

        // overwrite with a shorter value shrinks the counter
        table.insert(Bytes::from_static(b"key"), Value::Present(Bytes::from_static(b"v")));
        assert_eq!(table.size(), 4);

        // a tombstone keeps only the key bytes
        table.insert(Bytes::from_static(b"key"), Value::Tombstone);
        assert_eq!(table.size(), 3);

        // deleting a key that was never written still costs its key bytes
        table.insert(Bytes::from_static(b"gone"), Value::Tombstone);
        assert_eq!(table.size(), 7);
    }

    #[test]
    fn test_payload_round_trip() {
        let table = KvTable::new();
        table.insert(Bytes::from_static(b"alpha"), Value::Present(Bytes::from_static(b"1")));
        table.insert(Bytes::from_static(b"beta"), Value::Tombstone);
        table.insert(Bytes::from_static(b"gamma"), Value::Present(Bytes::from_static(b"3")));

        let decoded = KvTable::decode(&table.encode().unwrap()).unwrap();
        assert_eq!(decoded.len(), 3);
        assert_eq!(
            decoded.get(b"alpha"),
            Some(Value::Present(Bytes::from_static(b"1")))
        );
        assert_eq!(decoded.get(b"beta"), Some(Value::Tombstone));
    }

    #[tokio::test]
    async fn test_durability_signal_broadcasts() {
        let table = KvTable::new();
        let mut before = table.durable_signal();
        assert!(!*before.borrow());

        table.mark_durable();
        before.wait_for(|durable| *durable).await.unwrap();

        // late subscribers observe fulfillment immediately
        let late = table.durable_signal();
        assert!(*late.borrow());
    }
}
