//! Block compression codecs.
//!
//! The numeric values are part of the on-disk format: the codec a table
//! was written with is recorded in its info record, and readers of old
//! tables must keep decoding them.

use std::fmt;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use basalt_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
#[repr(i8)]
pub enum CompressionCodec {
    None = 0,
    Snappy = 1,
    Zlib = 2,
    Lz4 = 3,
    Zstd = 4,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::None
    }
}

impl From<CompressionCodec> for i8 {
    fn from(codec: CompressionCodec) -> i8 {
        codec as i8
    }
}

impl TryFrom<i8> for CompressionCodec {
    type Error = Error;

    fn try_from(value: i8) -> Result<Self> {
        match value {
            0 => Ok(CompressionCodec::None),
            1 => Ok(CompressionCodec::Snappy),
            2 => Ok(CompressionCodec::Zlib),
            3 => Ok(CompressionCodec::Lz4),
            4 => Ok(CompressionCodec::Zstd),
            _ => Err(Error::InvalidCodec),
        }
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CompressionCodec::None => "None",
            CompressionCodec::Snappy => "Snappy",
            CompressionCodec::Zlib => "Zlib",
            CompressionCodec::Lz4 => "LZ4",
            CompressionCodec::Zstd => "Zstd",
        };
        f.write_str(name)
    }
}

/// Compress the provided bytes. `None` is the identity codec.
pub fn compress(buf: &[u8], codec: CompressionCodec) -> Result<Vec<u8>> {
    match codec {
        CompressionCodec::None => Ok(buf.to_vec()),

        CompressionCodec::Snappy => snap::raw::Encoder::new()
            .compress_vec(buf)
            .map_err(|e| Error::CorruptBlock {
                reason: format!("snappy compression failed: {}", e),
            }),

        CompressionCodec::Zlib => {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(buf)?;
            Ok(encoder.finish()?)
        }

        CompressionCodec::Lz4 => Ok(lz4_flex::compress_prepend_size(buf)),

        CompressionCodec::Zstd => {
            zstd::encode_all(buf, 3).map_err(|e| Error::CorruptBlock {
                reason: format!("zstd compression failed: {}", e),
            })
        }
    }
}

/// Decompress bytes produced by [`compress`] with the same codec.
///
/// Decoding with a codec other than the one that produced the bytes
/// fails; it never silently returns garbage.
pub fn decompress(buf: &[u8], codec: CompressionCodec) -> Result<Vec<u8>> {
    match codec {
        CompressionCodec::None => Ok(buf.to_vec()),

        CompressionCodec::Snappy => snap::raw::Decoder::new()
            .decompress_vec(buf)
            .map_err(|e| Error::CorruptBlock {
                reason: format!("snappy decompression failed: {}", e),
            }),

        CompressionCodec::Zlib => {
            let mut decoder = flate2::read::ZlibDecoder::new(buf);
            let mut out = Vec::new();
            decoder
                .read_to_end(&mut out)
                .map_err(|e| Error::CorruptBlock {
                    reason: format!("zlib decompression failed: {}", e),
                })?;
            Ok(out)
        }

        CompressionCodec::Lz4 => {
            lz4_flex::decompress_size_prepended(buf).map_err(|e| Error::CorruptBlock {
                reason: format!("lz4 decompression failed: {}", e),
            })
        }

        CompressionCodec::Zstd => zstd::decode_all(buf).map_err(|e| Error::CorruptBlock {
            reason: format!("zstd decompression failed: {}", e),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CompressionCodec; 5] = [
        CompressionCodec::None,
        CompressionCodec::Snappy,
        CompressionCodec::Zlib,
        CompressionCodec::Lz4,
        CompressionCodec::Zstd,
    ];

    #[test]
    fn test_round_trip_all_codecs() {
        let payload = b"the quick brown fox jumps over the lazy dog".repeat(16);
        for codec in ALL {
            let encoded = compress(&payload, codec).unwrap();
            let decoded = decompress(&encoded, codec).unwrap();
            assert_eq!(decoded, payload, "{} round trip", codec);
        }
    }

    #[test]
    fn test_round_trip_empty_input() {
        for codec in ALL {
            let encoded = compress(&[], codec).unwrap();
            let decoded = decompress(&encoded, codec).unwrap();
            assert!(decoded.is_empty(), "{} empty round trip", codec);
        }
    }

    #[test]
    fn test_codec_mismatch_fails() {
        let payload = b"mismatched codec payload".repeat(8);
        let encoded = compress(&payload, CompressionCodec::Snappy).unwrap();

        let result = decompress(&encoded, CompressionCodec::Zlib);
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_codec_byte() {
        assert!(matches!(
            CompressionCodec::try_from(9i8),
            Err(Error::InvalidCodec)
        ));
        for codec in ALL {
            assert_eq!(CompressionCodec::try_from(codec as i8).unwrap(), codec);
        }
    }
}
