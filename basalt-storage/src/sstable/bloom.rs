//! Bloom filter over the keys of one table.
//!
//! The filter is built from accumulated 64-bit key hashes and probed
//! with enhanced double hashing (h1 + i·h2 + i² mod m), which avoids
//! the regular-stride aliasing plain double hashing suffers on
//! adversarial inputs. The hash function is an internal detail: filters
//! are built and read per table, never shared across writers.

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use bytes::Bytes;

use basalt_core::error::{Error, Result};

/// Probes per lookup is `bits_per_key · ln 2`, rounded.
const LN_2: f64 = std::f64::consts::LN_2;

fn filter_hash(key: &[u8]) -> u64 {
    twox_hash::xxh3::hash64(key)
}

/// An immutable bloom filter: definite-absent / probable-present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomFilter {
    num_probes: u16,
    data: Bytes,
}

impl BloomFilter {
    pub fn num_probes(&self) -> u16 {
        self.num_probes
    }

    /// Returns `false` only when the key is definitely absent.
    /// An empty filter reports every key as absent.
    pub fn has_key(&self, key: &[u8]) -> bool {
        if self.data.is_empty() || self.num_probes == 0 {
            return false;
        }
        let num_bits = (self.data.len() * 8) as u64;
        let hash = filter_hash(key);
        probes(hash, self.num_probes, num_bits).all(|bit| {
            self.data[(bit / 8) as usize] & (1 << (bit % 8)) != 0
        })
    }

    /// Encode as `num_probes: u16 BE | bit array`. The enclosing table
    /// info supplies the length; the filter does not self-delimit.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(2 + self.data.len());
        buf.write_u16::<BigEndian>(self.num_probes)
            .expect("vec write is infallible");
        buf.extend_from_slice(&self.data);
        buf
    }

    /// Decode bytes produced by [`BloomFilter::encode`].
    pub fn decode(buf: &[u8]) -> Result<BloomFilter> {
        if buf.len() < 2 {
            return Err(Error::InsufficientData {
                message: format!("bloom filter needs 2 header bytes, got {}", buf.len()),
            });
        }
        Ok(BloomFilter {
            num_probes: BigEndian::read_u16(buf),
            data: Bytes::copy_from_slice(&buf[2..]),
        })
    }
}

/// Enhanced double hashing probe sequence: bit `(h1 + i·h2 + i²) mod m`
/// with h1 the high and h2 the low 32 bits of the key hash.
fn probes(hash: u64, num_probes: u16, num_bits: u64) -> impl Iterator<Item = u64> {
    let h1 = (hash >> 32) as u64;
    let h2 = hash & 0xFFFF_FFFF;
    (0..num_probes as u64).map(move |i| {
        h1.wrapping_add(i.wrapping_mul(h2))
            .wrapping_add(i.wrapping_mul(i))
            % num_bits
    })
}

/// Accumulates key hashes until the filter is built.
pub struct FilterBuilder {
    key_hashes: Vec<u64>,
    bits_per_key: u32,
}

impl FilterBuilder {
    pub fn new(bits_per_key: u32) -> Self {
        Self {
            key_hashes: Vec::new(),
            bits_per_key,
        }
    }

    /// Add a key. Keys are assumed unique; duplicates only waste bits.
    pub fn add(&mut self, key: &[u8]) {
        self.key_hashes.push(filter_hash(key));
    }

    pub fn is_empty(&self) -> bool {
        self.key_hashes.is_empty()
    }

    /// Build the filter. An empty builder produces an empty filter with
    /// zero probes.
    pub fn build(&self) -> BloomFilter {
        if self.key_hashes.is_empty() {
            return BloomFilter {
                num_probes: 0,
                data: Bytes::new(),
            };
        }

        let num_bytes =
            (self.key_hashes.len() * self.bits_per_key as usize).div_ceil(8);
        let num_bits = (num_bytes * 8) as u64;
        let num_probes =
            ((self.bits_per_key as f64 * LN_2).round() as u64).clamp(1, u16::MAX as u64) as u16;

        let mut bits = vec![0u8; num_bytes];
        for &hash in &self.key_hashes {
            for bit in probes(hash, num_probes, num_bits) {
                bits[(bit / 8) as usize] |= 1 << (bit % 8);
            }
        }

        BloomFilter {
            num_probes,
            data: Bytes::from(bits),
        }
    }
}
