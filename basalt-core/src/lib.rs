//! # BasaltDB Core
//!
//! This crate provides the fundamental building blocks for BasaltDB:
//! - Core data structures (keys, values, tombstones, ranges)
//! - Error types
//! - Capability traits for blob and object-store access
//! - Metrics collection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   basalt-core                   │
//! ├─────────────────────────────────────────────────┤
//! │  • types      - Keys, values, tombstones       │
//! │  • traits     - Blob / object-store access     │
//! │  • error      - Error handling                 │
//! │  • metrics    - Counters for monitoring        │
//! └─────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod metrics;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use error::{Error, Result};
pub use traits::{ObjectStore, ReadOnlyBlob};
pub use types::{Kv, KeyValue, Range, Value, MAX_KEY_LEN, TOMBSTONE};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
