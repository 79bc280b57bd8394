//! # Bloom Filter
//!
//! A space-efficient probabilistic data structure for set membership testing.
//!
//! A bloom filter can tell you with certainty that a key is **not** in the set
//! (no false negatives), but may occasionally report that a key **is** in the
//! set when it isn't (false positives).
//!
//! ## Usage in SiltKV
//!
//! Each segment keeps a filter built from its key tokens. During point lookups
//! the segment checks its filter first; if it says "not present", the index
//! and data file are never touched.
//!
//! ## Persistence
//!
//! The bit array is stored as one standard base64 blob. Bits are numbered
//! little-endian within each byte, and trailing zero bytes may be omitted, so
//! a decoded array shorter than the filter is zero-padded.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bloom::BloomFilter;
//!
//! let mut bf = BloomFilter::new(1000, 0.01);
//! bf.insert(b"hello");
//! assert!(bf.may_contain(b"hello"));
//! ```
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io;
use xxhash_rust::xxh32::xxh32;

/// A bloom filter backed by a bit vector with `k` probes per key.
///
/// Uses double hashing: `h(i) = h1 + i * h2` where `h1` is the 32-bit xxHash
/// of the key and `h2` is `h1` rotated by 16 bits.
#[derive(Clone, PartialEq, Eq)]
pub struct BloomFilter {
    /// The bit vector storing the filter state.
    bits: Vec<u8>,
    /// Number of bits in the filter.
    num_bits: u32,
    /// Number of hash functions (k).
    num_hashes: u32,
}

impl BloomFilter {
    /// Creates a new bloom filter sized for `expected_items` with the given
    /// target `false_positive_rate`.
    ///
    /// # Panics
    ///
    /// Panics if `expected_items` is 0 or `false_positive_rate` is not in `(0, 1)`.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Self {
        assert!(expected_items > 0, "expected_items must be > 0");
        assert!(
            false_positive_rate > 0.0 && false_positive_rate < 1.0,
            "false_positive_rate must be in (0, 1)"
        );

        // m = ceil(-n * ln(p) / ln(2)^2)
        let n = expected_items as f64;
        let m = (-n * false_positive_rate.ln() / std::f64::consts::LN_2.powi(2)).ceil();
        let m = (m as u64).clamp(1, i32::MAX as u64) as u32;

        // k = round((m / n) * ln(2))
        let k = ((f64::from(m) / n) * std::f64::consts::LN_2).round() as u32;
        let k = k.max(1);

        Self {
            bits: vec![0u8; byte_len(m)],
            num_bits: m,
            num_hashes: k,
        }
    }

    /// Inserts a key into the bloom filter.
    pub fn insert(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.num_hashes {
            let bit_idx = self.get_bit_index(h1, h2, i);
            self.set_bit(bit_idx);
        }
    }

    /// Returns `true` if the key **might** be in the set, `false` if it is
    /// **definitely not** in the set.
    #[must_use]
    pub fn may_contain(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        (0..self.num_hashes).all(|i| self.get_bit(self.get_bit_index(h1, h2, i)))
    }

    #[must_use]
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    #[must_use]
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Returns `true` if no bit is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits.iter().all(|&b| b == 0)
    }

    /// Encodes the bit array as base64, dropping trailing zero bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        let used = self
            .bits
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        STANDARD.encode(&self.bits[..used])
    }

    /// Rebuilds a filter from [`to_base64`](Self::to_base64) output.
    ///
    /// The geometry always comes from `expected_items` and
    /// `false_positive_rate`, never from the blob's length. Blank input gives
    /// an empty filter.
    pub fn from_base64(
        encoded: &str,
        expected_items: usize,
        false_positive_rate: f64,
    ) -> io::Result<Self> {
        let mut bf = Self::new(expected_items, false_positive_rate);
        let encoded = encoded.trim();
        if encoded.is_empty() {
            return Ok(bf);
        }

        let mut bytes = STANDARD
            .decode(encoded)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        bytes.resize(bf.bits.len(), 0);
        bf.bits = bytes;
        bf.clear_unused_bits();
        Ok(bf)
    }

    // ---- Internal helpers ----

    /// h(i) = (h1 + i * h2) with the sign bit masked, mod num_bits.
    fn get_bit_index(&self, h1: u32, h2: u32, i: u32) -> u32 {
        (h1.wrapping_add(i.wrapping_mul(h2)) & 0x7fff_ffff) % self.num_bits
    }

    fn set_bit(&mut self, idx: u32) {
        let byte_idx = (idx / 8) as usize;
        self.bits[byte_idx] |= 1 << (idx % 8);
    }

    fn get_bit(&self, idx: u32) -> bool {
        let byte_idx = (idx / 8) as usize;
        (self.bits[byte_idx] >> (idx % 8)) & 1 == 1
    }

    /// Bits past `num_bits` in the last byte can arrive from a longer blob.
    fn clear_unused_bits(&mut self) {
        let tail = self.num_bits % 8;
        if tail != 0 {
            if let Some(last) = self.bits.last_mut() {
                *last &= (1u8 << tail) - 1;
            }
        }
    }
}

impl std::fmt::Debug for BloomFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BloomFilter")
            .field("num_bits", &self.num_bits)
            .field("num_hashes", &self.num_hashes)
            .field("bytes", &self.bits.len())
            .finish()
    }
}

fn byte_len(num_bits: u32) -> usize {
    (num_bits as usize + 7) / 8
}

fn hash_pair(key: &[u8]) -> (u32, u32) {
    let h1 = xxh32(key, 0);
    (h1, h1.rotate_right(16))
}
