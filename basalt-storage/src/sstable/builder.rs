//! Assembles sorted entries into one encoded, self-describing table.

use byteorder::{BigEndian, WriteBytesExt};
use bytes::Bytes;
use tracing::debug;

use basalt_core::error::{Error, Result};
use basalt_core::metrics::Metrics;

use super::block::{Block, BlockBuilder};
use super::bloom::FilterBuilder;
use super::types::{BlockMeta, Config, Table, TableIndex, TableInfo};

/// Builds an SSTable from entries added in ascending key order.
///
/// Key ordering is not checked here; the WAL hands over entries already
/// sorted, and a caller that violates ordering gets a table whose seeks
/// fail at read time.
pub struct TableBuilder {
    config: Config,
    block_builder: BlockBuilder,
    blocks: Vec<Block>,
    filter_builder: FilterBuilder,
    first_key: Option<Bytes>,
    key_count: u32,
    metrics: Metrics,
}

impl TableBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            block_builder: BlockBuilder::new(config.block_size),
            filter_builder: FilterBuilder::new(config.filter_bits_per_key),
            config,
            blocks: Vec::new(),
            first_key: None,
            key_count: 0,
            metrics: Metrics::new(),
        }
    }

    pub fn with_metrics(config: Config, metrics: Metrics) -> Self {
        Self {
            metrics,
            ..Self::new(config)
        }
    }

    /// Append an entry. An empty `value` records a tombstone.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        if self.first_key.is_none() {
            self.first_key = Some(Bytes::copy_from_slice(key));
        }

        if !self.block_builder.add(key, value) {
            // Current block is full: seal it and start a fresh one. The
            // sealed block cannot be empty, or the add would have gone in.
            let sealed = std::mem::replace(
                &mut self.block_builder,
                BlockBuilder::new(self.config.block_size),
            );
            self.blocks.push(sealed.build()?);

            let accepted = self.block_builder.add(key, value);
            debug_assert!(accepted, "an empty block accepts any single entry");
        }

        self.filter_builder.add(key);
        self.key_count += 1;
        Ok(())
    }

    /// Seal the table and lay out blocks, filter, index, info and the
    /// 4-byte trailer in one contiguous buffer.
    pub fn build(mut self) -> Result<Table> {
        if !self.block_builder.is_empty() {
            self.blocks.push(self.block_builder.build()?);
        }

        let mut buf: Vec<u8> = Vec::new();
        let mut block_meta = Vec::with_capacity(self.blocks.len());

        for block in &self.blocks {
            let first_key = block
                .first_key()
                .ok_or(Error::EmptyBlock)?;
            buf.extend_from_slice(&block.encode(self.config.compression)?);
            block_meta.push(BlockMeta {
                // recorded offsets point just past each encoded block
                offset: buf.len() as u64,
                first_key,
            });
        }

        let (bloom, filter_offset, filter_len) = if self.key_count >= self.config.min_filter_keys {
            let filter = self.filter_builder.build();
            let encoded = filter.encode();
            let offset = buf.len() as u64;
            buf.extend_from_slice(&encoded);
            (Some(filter), offset, encoded.len() as u64)
        } else {
            (None, 0, 0)
        };

        let index = TableIndex { block_meta };
        let encoded_index = index.encode()?;
        let index_offset = buf.len() as u64;
        buf.extend_from_slice(&encoded_index);

        let info = TableInfo {
            first_key: self.first_key.unwrap_or_default(),
            index_offset,
            index_len: encoded_index.len() as u64,
            filter_offset,
            filter_len,
            compression: self.config.compression,
        };

        let info_offset = buf.len() as u64;
        buf.extend_from_slice(&info.encode()?);

        let trailer = u32::try_from(info_offset).map_err(|_| Error::Internal {
            message: format!("info offset {} exceeds the u32 trailer", info_offset),
        })?;
        buf.write_u32::<BigEndian>(trailer)?;

        self.metrics.record_table_build(self.blocks.len() as u64);
        debug!(
            blocks = self.blocks.len(),
            keys = self.key_count,
            bytes = buf.len(),
            codec = %self.config.compression,
            "built table"
        );

        Ok(Table {
            info,
            bloom,
            data: Bytes::from(buf),
        })
    }
}
