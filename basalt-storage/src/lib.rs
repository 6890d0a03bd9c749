//! # BasaltDB Storage
//!
//! The storage engine core: immutable sorted-string tables and the
//! write-ahead log that feeds them.
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                 basalt-storage                  │
//! ├─────────────────────────────────────────────────┤
//! │  • sstable    - Block / bloom / table codecs   │
//! │  • wal        - In-memory buffered write log   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Data flows application → [`wal`] → flusher → [`sstable`] builder →
//! object store; reads go trailer → info → bloom → index → blocks.

pub mod sstable;
pub mod wal;
