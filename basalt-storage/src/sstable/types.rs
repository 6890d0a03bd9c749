//! Table-level types: configuration, the info record, and the index.
//!
//! Info and index records are msgpack-encoded structured payloads; the
//! fields below are round-trip stable and new fields may only be
//! appended. Their byte lengths are recorded in the info record, which
//! is what lets the reader slice the blob without a self-delimiting
//! encoding.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use basalt_core::error::{Error, Result};

use super::bloom::BloomFilter;
use super::compression::CompressionCodec;

pub const DEFAULT_BLOCK_SIZE: usize = 4096;
pub const DEFAULT_FILTER_BITS_PER_KEY: u32 = 10;

/// Build-time parameters for one table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Target size of each block in bytes. A single entry may exceed it.
    pub block_size: usize,

    /// Minimum number of keys before a bloom filter is emitted. Reads
    /// on tables with very few entries are faster without one.
    pub min_filter_keys: u32,

    pub filter_bits_per_key: u32,

    /// Codec used to compress new tables. The codec of an existing
    /// table is encoded in its info record and is used when reading it
    /// back, whatever this is set to.
    pub compression: CompressionCodec,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            min_filter_keys: 0,
            filter_bits_per_key: DEFAULT_FILTER_BITS_PER_KEY,
            compression: CompressionCodec::None,
        }
    }
}

/// Location of one block inside the table's block region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockMeta {
    /// Byte offset just past the end of this encoded block.
    pub offset: u64,
    /// Key of the first entry in the block.
    pub first_key: Bytes,
}

/// Per-table directory of blocks, ordered by first key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIndex {
    pub block_meta: Vec<BlockMeta>,
}

impl TableIndex {
    pub fn block_count(&self) -> usize {
        self.block_meta.len()
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| Error::Internal {
            message: format!("index serialization failed: {}", e),
        })
    }

    pub fn decode(buf: &[u8]) -> Result<TableIndex> {
        rmp_serde::from_slice(buf).map_err(|e| Error::CorruptTable {
            id: String::new(),
            reason: format!("index decode failed: {}", e),
        })
    }
}

/// Trailer descriptor: everything a reader needs to slice the blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableInfo {
    /// First key of the whole table. Empty for an empty table.
    pub first_key: Bytes,

    /// Offset at which the encoded index starts.
    pub index_offset: u64,
    pub index_len: u64,

    /// Offset at which the bloom filter starts. `filter_len == 0` means
    /// no filter was emitted.
    pub filter_offset: u64,
    pub filter_len: u64,

    /// Codec the blocks of this table were compressed with.
    pub compression: CompressionCodec,
}

impl TableInfo {
    pub fn encode(&self) -> Result<Vec<u8>> {
        rmp_serde::to_vec(self).map_err(|e| Error::Internal {
            message: format!("info serialization failed: {}", e),
        })
    }

    pub fn decode(buf: &[u8]) -> Result<TableInfo> {
        rmp_serde::from_slice(buf).map_err(|e| Error::CorruptTable {
            id: String::new(),
            reason: format!("info decode failed: {}", e),
        })
    }
}

/// The in-memory result of building a table: its descriptor, its
/// filter, and the encoded bytes ready for an object store.
#[derive(Debug, Clone)]
pub struct Table {
    pub info: TableInfo,
    pub bloom: Option<BloomFilter>,
    pub data: Bytes,
}
