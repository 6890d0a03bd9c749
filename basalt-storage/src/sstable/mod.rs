//! SSTables are immutable, sorted key-value files addressed through a
//! range-readable blob. A 4-byte trailer at the very end locates the
//! info record, which in turn locates every other region.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SSTable Layout                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │                    Blocks                           │    │
//! │  │  ┌──────────────────────────────────────────────┐   │    │
//! │  │  │ Block 0                                      │   │    │
//! │  │  │ ┌──────────────────────────────────────────┐ │   │    │
//! │  │  │ │ Entry: [key_len u16][key][val_len u32]   │ │   │    │
//! │  │  │ │        [value]   (len 0xFFFFFFFF = del)  │ │   │    │
//! │  │  │ │ ...                                      │ │   │    │
//! │  │  │ ├──────────────────────────────────────────┤ │   │    │
//! │  │  │ │ Offsets: n × u16                         │ │   │    │
//! │  │  │ │ Offset count: u16                        │ │   │    │
//! │  │  │ ├──── everything above compressed as one ──┤ │   │    │
//! │  │  │ │ CRC32 (IEEE) over compressed payload     │ │   │    │
//! │  │  │ └──────────────────────────────────────────┘ │   │    │
//! │  │  │ Block 1...                                   │   │    │
//! │  │  └──────────────────────────────────────────────┘   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Bloom filter: [num_probes u16][bit array]           │    │
//! │  │ (present iff key_count >= min_filter_keys)          │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Index: per block (offset-past-end u64, first_key)   │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Info: first_key, index/filter offsets+lengths,      │    │
//! │  │       compression codec                             │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! │                                                             │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │ Trailer: offset of Info (u32, big-endian)           │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! All integers in the block format and the trailer are big-endian.

mod block;
mod bloom;
mod builder;
mod compression;
mod iterator;
pub mod reader;
mod types;

pub use block::{Block, BlockBuilder};
pub use bloom::{BloomFilter, FilterBuilder};
pub use builder::TableBuilder;
pub use compression::{compress, decompress, CompressionCodec};
pub use iterator::BlockIterator;
pub use types::{BlockMeta, Config, Table, TableIndex, TableInfo};
