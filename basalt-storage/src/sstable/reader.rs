//! Reads table pieces back out of a range-readable blob.
//!
//! Every function validates what it reads against the blob's length and
//! wraps corruption errors with the blob id. A typical point lookup
//! costs at most four range reads: trailer+info, filter, index, block.

use byteorder::{BigEndian, ByteOrder};

use basalt_core::error::{Error, Result};
use basalt_core::traits::ReadOnlyBlob;
use basalt_core::types::Range;

use super::block::Block;
use super::bloom::BloomFilter;
use super::types::{TableIndex, TableInfo};

/// Size of the trailer: a u32 offset of the info record.
const TRAILER_LEN: u64 = 4;

/// Read and validate the info record via the trailer.
pub async fn read_info<B: ReadOnlyBlob + ?Sized>(blob: &B) -> Result<TableInfo> {
    let len = blob.len().await?;
    if len <= TRAILER_LEN {
        return Err(Error::CorruptTable {
            id: blob.id(),
            reason: format!("blob of {} bytes cannot hold a table trailer", len),
        });
    }

    let trailer = blob.read_range(Range::new(len - TRAILER_LEN, len)).await?;
    let info_offset = BigEndian::read_u32(&trailer) as u64;
    if info_offset >= len - TRAILER_LEN {
        return Err(Error::CorruptTable {
            id: blob.id(),
            reason: format!(
                "info offset {} out of range for a {}-byte blob",
                info_offset, len
            ),
        });
    }

    let raw = blob
        .read_range(Range::new(info_offset, len - TRAILER_LEN))
        .await?;
    let info = TableInfo::decode(&raw).map_err(|e| e.with_table_id(blob.id()))?;

    validate_info(&info, len).map_err(|e| e.with_table_id(blob.id()))?;
    Ok(info)
}

fn validate_info(info: &TableInfo, blob_len: u64) -> Result<()> {
    let corrupt = |reason: String| Error::CorruptTable {
        id: String::new(),
        reason,
    };

    let index_end = info
        .index_offset
        .checked_add(info.index_len)
        .ok_or_else(|| corrupt("index extent overflows".to_string()))?;
    if info.index_offset >= blob_len || index_end > blob_len {
        return Err(corrupt(format!(
            "index [{}, {}) outside {}-byte blob",
            info.index_offset, index_end, blob_len
        )));
    }

    if info.filter_len > 0 {
        let filter_end = info
            .filter_offset
            .checked_add(info.filter_len)
            .ok_or_else(|| corrupt("filter extent overflows".to_string()))?;
        if info.filter_offset >= blob_len || filter_end > blob_len {
            return Err(corrupt(format!(
                "filter [{}, {}) outside {}-byte blob",
                info.filter_offset, filter_end, blob_len
            )));
        }
    }

    Ok(())
}

/// Read the bloom filter, or `None` when the table has none.
pub async fn read_bloom<B: ReadOnlyBlob + ?Sized>(
    info: &TableInfo,
    blob: &B,
) -> Result<Option<BloomFilter>> {
    if info.filter_len == 0 {
        return Ok(None);
    }
    let raw = blob
        .read_range(Range::new(
            info.filter_offset,
            info.filter_offset + info.filter_len,
        ))
        .await?;
    let filter = BloomFilter::decode(&raw).map_err(|e| e.with_table_id(blob.id()))?;
    Ok(Some(filter))
}

/// Read the block index, or `None` when the table records none.
pub async fn read_index<B: ReadOnlyBlob + ?Sized>(
    info: &TableInfo,
    blob: &B,
) -> Result<Option<TableIndex>> {
    if info.index_len == 0 {
        return Ok(None);
    }
    let raw = blob
        .read_range(Range::new(
            info.index_offset,
            info.index_offset + info.index_len,
        ))
        .await?;
    let index = TableIndex::decode(&raw).map_err(|e| e.with_table_id(blob.id()))?;
    Ok(Some(index))
}

/// Decode the index from an already-fetched buffer instead of the blob.
pub fn read_index_from_bytes(info: &TableInfo, buf: &[u8]) -> Result<Option<TableIndex>> {
    if info.index_len == 0 {
        return Ok(None);
    }
    if (buf.len() as u64) < info.index_len {
        return Err(Error::InsufficientData {
            message: format!(
                "index needs {} bytes, buffer holds {}",
                info.index_len,
                buf.len()
            ),
        });
    }
    let index = TableIndex::decode(&buf[..info.index_len as usize])?;
    Ok(Some(index))
}

/// Read and decode the blocks with indices in `[range.start, range.end)`.
///
/// One coalesced byte-range read covers the whole span; each block is
/// carved out, decoded with the table's codec, and tagged with its
/// index metadata.
pub async fn read_blocks<B: ReadOnlyBlob + ?Sized>(
    info: &TableInfo,
    index: &TableIndex,
    range: Range,
    blob: &B,
) -> Result<Vec<Block>> {
    let block_count = index.block_count() as u64;
    if range.start >= range.end || range.end > block_count {
        return Err(Error::InvalidBlockRange {
            start: range.start,
            end: range.end,
        });
    }

    // Index offsets point past each block, so a block's start is the
    // previous block's offset (or zero for the first block).
    let start_byte = if range.start == 0 {
        0
    } else {
        index.block_meta[range.start as usize - 1].offset
    };
    let end_byte = index.block_meta[range.end as usize - 1].offset;

    let raw = blob.read_range(Range::new(start_byte, end_byte)).await?;

    let mut blocks = Vec::with_capacity((range.end - range.start) as usize);
    for i in range.start..range.end {
        let meta = &index.block_meta[i as usize];
        let block_start = if i == range.start {
            0
        } else {
            (index.block_meta[i as usize - 1].offset - start_byte) as usize
        };
        let block_end = (meta.offset - start_byte) as usize;

        let mut block = Block::decode(&raw[block_start..block_end], info.compression)?;
        block.meta = Some(meta.clone());
        blocks.push(block);
    }

    Ok(blocks)
}
