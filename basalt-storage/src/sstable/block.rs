//! Data blocks: the unit of compression and checksumming inside a table.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::{BufMut, Bytes, BytesMut};

use basalt_core::error::{Error, Result};
use basalt_core::types::{MAX_KEY_LEN, TOMBSTONE};

use super::compression::{compress, decompress, CompressionCodec};
use super::types::BlockMeta;

pub(crate) const SIZEOF_U16: usize = std::mem::size_of::<u16>();
pub(crate) const SIZEOF_U32: usize = std::mem::size_of::<u32>();

/// Smallest legal encoded block: 2-byte offset count plus 4-byte CRC,
/// with at least one payload byte.
const MIN_ENCODED_LEN: usize = 7;

/// A decoded block: the raw entry region plus one offset per entry.
///
/// Entries reference slices of `data`; `Bytes` keeps those views alive
/// without back-pointers into the owning table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub(crate) data: Bytes,
    pub(crate) offsets: Vec<u16>,
    /// Index metadata attached when the block was carved out of a table.
    pub meta: Option<BlockMeta>,
}

impl Block {
    /// The key of the first entry, if any.
    pub fn first_key(&self) -> Option<Bytes> {
        let offset = *self.offsets.first()? as usize;
        let key_len = BigEndian::read_u16(&self.data[offset..]) as usize;
        Some(self.data.slice(offset + SIZEOF_U16..offset + SIZEOF_U16 + key_len))
    }

    pub fn entry_count(&self) -> usize {
        self.offsets.len()
    }

    /// Encode the block for storage:
    ///
    /// entries ‖ offsets (n × u16) ‖ offset count (u16), compressed as a
    /// single payload, followed by a CRC32 over the compressed bytes.
    /// The CRC sits outside the compression so readers reject bit-rot
    /// before paying decompression cost.
    pub fn encode(&self, codec: CompressionCodec) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(
            self.data.len() + self.offsets.len() * SIZEOF_U16 + SIZEOF_U16 + SIZEOF_U32,
        );
        buf.extend_from_slice(&self.data);
        for offset in &self.offsets {
            buf.write_u16::<BigEndian>(*offset)?;
        }
        buf.write_u16::<BigEndian>(self.offsets.len() as u16)?;

        let mut encoded = compress(&buf, codec)?;
        let checksum = crc32fast::hash(&encoded);
        encoded.write_u32::<BigEndian>(checksum)?;
        Ok(encoded)
    }

    /// Decode an encoded block. The CRC is verified before anything is
    /// decompressed or parsed.
    pub fn decode(bytes: &[u8], codec: CompressionCodec) -> Result<Block> {
        if bytes.len() < MIN_ENCODED_LEN {
            return Err(Error::CorruptBlock {
                reason: format!("encoded block is {} bytes, need at least 7", bytes.len()),
            });
        }

        let payload_len = bytes.len() - SIZEOF_U32;
        let stored = BigEndian::read_u32(&bytes[payload_len..]);
        if crc32fast::hash(&bytes[..payload_len]) != stored {
            return Err(Error::ChecksumFailed);
        }

        let uncompressed = Bytes::from(decompress(&bytes[..payload_len], codec)?);
        if uncompressed.len() < SIZEOF_U16 {
            return Err(Error::CorruptBlock {
                reason: "missing offset count".to_string(),
            });
        }

        let count_at = uncompressed.len() - SIZEOF_U16;
        let offset_count = BigEndian::read_u16(&uncompressed[count_at..]) as usize;

        let offsets_len = offset_count * SIZEOF_U16;
        if offsets_len > count_at {
            return Err(Error::CorruptBlock {
                reason: format!("offset count {} exceeds block payload", offset_count),
            });
        }
        let entries_len = count_at - offsets_len;
        if offset_count * 4 > entries_len {
            return Err(Error::CorruptBlock {
                reason: format!(
                    "offset count {} impossible for a {}-byte entry region",
                    offset_count, entries_len
                ),
            });
        }

        let mut offsets = Vec::with_capacity(offset_count);
        for i in 0..offset_count {
            let offset = BigEndian::read_u16(&uncompressed[entries_len + i * SIZEOF_U16..]);
            if offset as usize >= entries_len {
                return Err(Error::CorruptBlock {
                    reason: format!("entry offset {} beyond entry region", offset),
                });
            }
            offsets.push(offset);
        }

        Ok(Block {
            data: uncompressed.slice(..entries_len),
            offsets,
            meta: None,
        })
    }
}

/// Accumulates sorted entries up to a target encoded size.
pub struct BlockBuilder {
    data: BytesMut,
    offsets: Vec<u16>,
    block_size: usize,
}

impl BlockBuilder {
    /// Create a builder targeting `block_size` bytes of entries, offsets
    /// and count. A single oversized entry is still accepted into an
    /// empty block.
    pub fn new(block_size: usize) -> Self {
        Self {
            data: BytesMut::new(),
            offsets: Vec::new(),
            block_size,
        }
    }

    /// Size of the block as it would stand after sealing: entries,
    /// offset table, and the 2-byte offset count.
    fn estimated_size(&self) -> usize {
        SIZEOF_U16 + self.offsets.len() * SIZEOF_U16 + self.data.len()
    }

    /// Append an entry. An empty `value` records a tombstone.
    ///
    /// Returns `false`, leaving the builder unchanged, when the entry
    /// would push a non-empty block past its size target.
    pub fn add(&mut self, key: &[u8], value: &[u8]) -> bool {
        assert!(!key.is_empty(), "key must not be empty");
        assert!(key.len() <= MAX_KEY_LEN, "key exceeds u16 length prefix");

        let new_size =
            self.estimated_size() + key.len() + value.len() + SIZEOF_U16 * 2 + SIZEOF_U32;
        if new_size > self.block_size && !self.is_empty() {
            return false;
        }

        self.offsets.push(self.data.len() as u16);
        self.data.put_u16(key.len() as u16);
        self.data.put_slice(key);
        if value.is_empty() {
            self.data.put_u32(TOMBSTONE);
        } else {
            self.data.put_u32(value.len() as u32);
            self.data.put_slice(value);
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Seal the builder. Fails with [`Error::EmptyBlock`] when nothing
    /// was added.
    pub fn build(self) -> Result<Block> {
        if self.is_empty() {
            return Err(Error::EmptyBlock);
        }
        Ok(Block {
            data: self.data.freeze(),
            offsets: self.offsets,
            meta: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_encode_decode() {
        let mut builder = BlockBuilder::new(4096);
        assert!(builder.is_empty());
        assert!(builder.add(b"key1", b"value1"));
        assert!(builder.add(b"key2", b"value2"));
        assert!(!builder.is_empty());

        let block = builder.build().unwrap();
        let encoded = block.encode(CompressionCodec::None).unwrap();
        let decoded = Block::decode(&encoded, CompressionCodec::None).unwrap();
        assert_eq!(decoded.data, block.data);
        assert_eq!(decoded.offsets, block.offsets);
    }

    #[test]
    fn test_checksum_verification() {
        let mut builder = BlockBuilder::new(4096);
        assert!(builder.add(b"key1", b"value1"));
        assert!(builder.add(b"key2", b"value2"));
        let block = builder.build().unwrap();

        let mut encoded = block.encode(CompressionCodec::None).unwrap();
        encoded[0] ^= 0xFF;

        assert!(matches!(
            Block::decode(&encoded, CompressionCodec::None),
            Err(Error::ChecksumFailed)
        ));
    }

    #[test]
    fn test_offsets_strictly_increasing() {
        let mut builder = BlockBuilder::new(4096);
        for i in 0..8 {
            assert!(builder.add(format!("key{}", i).as_bytes(), b"v"));
        }
        let block = builder.build().unwrap();

        assert_eq!(block.offsets.len(), 8);
        assert_eq!(block.offsets[0], 0);
        assert!(block.offsets.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_first_add_always_succeeds() {
        let mut builder = BlockBuilder::new(8);
        let huge = vec![b'x'; 1024];
        assert!(builder.add(b"key", &huge));
        // The block is now past its target, so a second add is refused.
        assert!(!builder.add(b"key2", b"v"));
        let block = builder.build().unwrap();
        assert_eq!(block.entry_count(), 1);
    }

    #[test]
    fn test_add_rejects_only_on_overflow() {
        // entries sized so exactly two fit in the target
        let mut builder = BlockBuilder::new(64);
        assert!(builder.add(b"key1", b"0123456789"));
        assert!(builder.add(b"key2", b"0123456789"));
        assert!(!builder.add(b"key3", b"0123456789"));
        // refused add leaves the builder unchanged
        let block = builder.build().unwrap();
        assert_eq!(block.entry_count(), 2);
    }

    #[test]
    fn test_empty_builder_fails() {
        let builder = BlockBuilder::new(4096);
        assert!(matches!(builder.build(), Err(Error::EmptyBlock)));
    }

    #[test]
    fn test_first_key() {
        let mut builder = BlockBuilder::new(4096);
        assert!(builder.add(b"donkey", b"kong"));
        assert!(builder.add(b"kratos", b"atreus"));
        let block = builder.build().unwrap();
        assert_eq!(block.first_key().unwrap(), Bytes::from_static(b"donkey"));
    }

    #[test]
    fn test_tombstone_round_trip() {
        let mut builder = BlockBuilder::new(4096);
        assert!(builder.add(b"key1", b"value1"));
        assert!(builder.add(b"key2", b""));
        assert!(builder.add(b"key3", b"value3"));
        let block = builder.build().unwrap();

        let encoded = block.encode(CompressionCodec::None).unwrap();
        let decoded = Block::decode(&encoded, CompressionCodec::None).unwrap();
        assert_eq!(decoded.data, block.data);
        assert_eq!(decoded.offsets, block.offsets);
    }

    #[test]
    fn test_round_trip_every_codec() {
        for codec in [
            CompressionCodec::None,
            CompressionCodec::Snappy,
            CompressionCodec::Zlib,
            CompressionCodec::Lz4,
            CompressionCodec::Zstd,
        ] {
            let mut builder = BlockBuilder::new(4096);
            assert!(builder.add(b"key1", b"value1"));
            assert!(builder.add(b"key2", b"value2"));
            let block = builder.build().unwrap();

            let encoded = block.encode(codec).unwrap();
            let decoded = Block::decode(&encoded, codec).unwrap();
            assert_eq!(decoded.data, block.data, "{} data", codec);
            assert_eq!(decoded.offsets, block.offsets, "{} offsets", codec);
        }
    }

    #[test]
    fn test_bit_flips_never_pass_silently() {
        let mut builder = BlockBuilder::new(4096);
        assert!(builder.add(b"alpha", b"one"));
        assert!(builder.add(b"beta", b"two"));
        let block = builder.build().unwrap();
        let encoded = block.encode(CompressionCodec::Snappy).unwrap();

        for i in 0..encoded.len() {
            let mut tampered = encoded.clone();
            tampered[i] ^= 0x01;
            assert!(
                Block::decode(&tampered, CompressionCodec::Snappy).is_err(),
                "flip at byte {} was not detected",
                i
            );
        }
    }

    #[test]
    fn test_decode_too_small() {
        assert!(matches!(
            Block::decode(&[0u8; 6], CompressionCodec::None),
            Err(Error::CorruptBlock { .. })
        ));
    }
}
