//! Cursor over the entries of a single block.

use byteorder::{BigEndian, ByteOrder};

use basalt_core::types::{KeyValue, Kv, Value, TOMBSTONE};

use super::block::{Block, SIZEOF_U16, SIZEOF_U32};

/// Iterates through the key-value pairs of a [`Block`] in key order.
///
/// [`BlockIterator::next_entry`] yields raw entries including
/// tombstones; the [`Iterator`] impl skips tombstones and yields live
/// pairs only. Entries are cheap slices into the block's buffer.
pub struct BlockIterator<'a> {
    block: &'a Block,
    offset_index: usize,
}

impl<'a> BlockIterator<'a> {
    pub fn new(block: &'a Block) -> Self {
        Self {
            block,
            offset_index: 0,
        }
    }

    /// Construct an iterator positioned at `key`, or at the first key
    /// greater than `key` when the exact key is not in the block.
    pub fn new_at_key(block: &'a Block, key: &[u8]) -> Self {
        let offset_index = block.offsets.partition_point(|&offset| {
            let offset = offset as usize;
            let key_len = BigEndian::read_u16(&block.data[offset..]) as usize;
            let entry_key = &block.data[offset + SIZEOF_U16..offset + SIZEOF_U16 + key_len];
            entry_key < key
        });

        Self {
            block,
            offset_index,
        }
    }

    /// Yield the next entry, tombstones included.
    pub fn next_entry(&mut self) -> Option<KeyValue> {
        if self.offset_index >= self.block.offsets.len() {
            return None;
        }

        let data = &self.block.data;
        let mut offset = self.block.offsets[self.offset_index] as usize;

        let key_len = BigEndian::read_u16(&data[offset..]) as usize;
        offset += SIZEOF_U16;
        let key = data.slice(offset..offset + key_len);
        offset += key_len;

        let value_len = BigEndian::read_u32(&data[offset..]);
        offset += SIZEOF_U32;

        let value = if value_len == TOMBSTONE {
            Value::Tombstone
        } else {
            Value::Present(data.slice(offset..offset + value_len as usize))
        };

        self.offset_index += 1;
        Some(KeyValue { key, value })
    }
}

impl Iterator for BlockIterator<'_> {
    type Item = Kv;

    /// Yield the next live pair, skipping tombstones.
    fn next(&mut self) -> Option<Kv> {
        loop {
            let entry = self.next_entry()?;
            if let Value::Present(value) = entry.value {
                return Some(Kv {
                    key: entry.key,
                    value,
                });
            }
        }
    }
}
