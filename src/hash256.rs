//! 256-bit hashes compared under Hamming distance.
//!
//! A [`Hash256`] is stored as 16 lanes of 16 bits. Lane 0 holds bits 0..16,
//! lane 15 holds bits 240..256. The multi-index in [`crate::index`] keys one
//! table per lane, so the lane width is also the unit of candidate pruning.

use crate::error::{Error, Result};

use byteorder::{BigEndian, ByteOrder};
use rand::Rng;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Not};
use std::str::FromStr;

/// Number of 16-bit lanes in a hash.
pub const NUM_LANES: usize = 16;

/// Number of bits per lane.
pub const LANE_BITS: usize = 16;

/// Total number of bits in a hash.
pub const NUM_BITS: usize = NUM_LANES * LANE_BITS;

/// Length of the hex text form.
pub const HEX_LEN: usize = NUM_LANES * 4;

/// Length of the binary form returned by [`Hash256::to_bytes`].
pub const NUM_BYTES: usize = NUM_BITS / 8;

const HEX_PREFIX: &str = "hash=";

/// A 256-bit hash.
///
/// `Hash256` is `Copy`; the in-place mutators (`set_bit`, `flip_bit`, ...)
/// only ever touch the receiver, so a copy taken beforehand is unaffected.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash256 {
    lanes: [u16; NUM_LANES],
}

impl Hash256 {
    /// The all-zeros hash.
    pub const fn zero() -> Self {
        Self {
            lanes: [0; NUM_LANES],
        }
    }

    /// The all-ones hash.
    pub const fn ones() -> Self {
        Self {
            lanes: [u16::MAX; NUM_LANES],
        }
    }

    pub const fn from_lanes(lanes: [u16; NUM_LANES]) -> Self {
        Self { lanes }
    }

    pub const fn lanes(&self) -> &[u16; NUM_LANES] {
        &self.lanes
    }

    /// Gets the 16-bit value at lane `i`.
    #[inline]
    pub fn lane(&self, i: usize) -> u16 {
        self.lanes[i]
    }

    /// Parses 64 hex digits, most-significant lane first.
    /// A leading `hash=` is accepted and ignored.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix(HEX_PREFIX).unwrap_or(s);
        if digits.len() != HEX_LEN || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::Format {
                input: s.to_string(),
            });
        }

        let mut lanes = [0u16; NUM_LANES];
        for (i, chunk) in digits.as_bytes().chunks_exact(4).enumerate() {
            // chunks are ASCII hex digits, checked above
            let text = std::str::from_utf8(chunk).map_err(|_| Error::Format {
                input: s.to_string(),
            })?;
            let value = u16::from_str_radix(text, 16).map_err(|_| Error::Format {
                input: s.to_string(),
            })?;
            lanes[NUM_LANES - 1 - i] = value;
        }
        Ok(Self { lanes })
    }

    /// Formats as 64 lowercase hex digits, most-significant lane first.
    pub fn to_hex(&self) -> String {
        self.to_string()
    }

    /// Serializes into 32 big-endian bytes in the same order as the hex form.
    pub fn to_bytes(&self) -> [u8; NUM_BYTES] {
        let mut out = [0u8; NUM_BYTES];
        for (chunk, lane) in out.chunks_exact_mut(2).zip(self.lanes.iter().rev()) {
            BigEndian::write_u16(chunk, *lane);
        }
        out
    }

    /// Inverse of [`Hash256::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != NUM_BYTES {
            return Err(Error::InvalidInput(format!(
                "expected {} bytes, got {}",
                NUM_BYTES,
                bytes.len()
            )));
        }
        let mut lanes = [0u16; NUM_LANES];
        for (i, chunk) in bytes.chunks_exact(2).enumerate() {
            lanes[NUM_LANES - 1 - i] = BigEndian::read_u16(chunk);
        }
        Ok(Self { lanes })
    }

    /// Number of set bits.
    pub fn hamming_norm(&self) -> usize {
        self.lanes.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Number of set bits in each lane.
    pub fn lane_norms(&self) -> [u32; NUM_LANES] {
        let mut norms = [0u32; NUM_LANES];
        for (n, w) in norms.iter_mut().zip(self.lanes.iter()) {
            *n = w.count_ones();
        }
        norms
    }

    /// Gets the Hamming distance, in 0..=256.
    pub fn hamming_distance(&self, other: &Self) -> usize {
        self.lanes
            .iter()
            .zip(other.lanes.iter())
            .map(|(x, y)| (x ^ y).count_ones() as usize)
            .sum()
    }

    /// Checks whether the Hamming distance is within `d`.
    /// Stops at the first lane where the running distance exceeds `d`.
    #[inline]
    pub fn hamming_distance_le(&self, other: &Self, d: usize) -> bool {
        let mut e = 0;
        for i in 0..NUM_LANES {
            e += (self.lanes[i] ^ other.lanes[i]).count_ones() as usize;
            if e > d {
                return false;
            }
        }
        true
    }

    #[inline]
    pub fn get_bit(&self, k: usize) -> bool {
        let (lane, bit) = Self::position(k);
        self.lanes[lane] & (1 << bit) != 0
    }

    #[inline]
    pub fn set_bit(&mut self, k: usize) {
        let (lane, bit) = Self::position(k);
        self.lanes[lane] |= 1 << bit;
    }

    #[inline]
    pub fn clear_bit(&mut self, k: usize) {
        let (lane, bit) = Self::position(k);
        self.lanes[lane] &= !(1 << bit);
    }

    #[inline]
    pub fn flip_bit(&mut self, k: usize) {
        let (lane, bit) = Self::position(k);
        self.lanes[lane] ^= 1 << bit;
    }

    pub fn clear_all(&mut self) {
        self.lanes = [0; NUM_LANES];
    }

    pub fn set_all(&mut self) {
        self.lanes = [u16::MAX; NUM_LANES];
    }

    /// Returns a copy with `num_error_bits` random bits flipped.
    ///
    /// Positions are drawn with replacement, so a bit may be flipped and then
    /// flipped back; the result is within `num_error_bits` of `self`.
    pub fn fuzz<R: Rng + ?Sized>(&self, num_error_bits: usize, rng: &mut R) -> Self {
        let mut rv = *self;
        for _ in 0..num_error_bits {
            rv.flip_bit(rng.gen_range(0..NUM_BITS));
        }
        rv
    }

    /// [`Hash256::fuzz`] using the thread-local generator.
    pub fn fuzz_thread_rng(&self, num_error_bits: usize) -> Self {
        self.fuzz(num_error_bits, &mut rand::thread_rng())
    }

    /// Draws a uniformly random hash.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut lanes = [0u16; NUM_LANES];
        rng.fill(&mut lanes[..]);
        Self { lanes }
    }

    /// Renders the bits as a 16x16 matrix of `0`/`1`, most-significant lane on top.
    pub fn bit_matrix(&self) -> String {
        let mut out = String::with_capacity(NUM_LANES * (LANE_BITS * 2 + 1));
        for w in self.lanes.iter().rev() {
            for j in (0..LANE_BITS).rev() {
                out.push_str(if w & (1 << j) != 0 { " 1" } else { " 0" });
            }
            out.push('\n');
        }
        out
    }

    /// Renders the lanes as space-separated 4-digit hex words.
    pub fn words(&self) -> String {
        let words: Vec<String> = self.lanes.iter().rev().map(|w| format!("{:04x}", w)).collect();
        words.join(" ")
    }

    #[inline]
    fn position(k: usize) -> (usize, usize) {
        debug_assert!(k < NUM_BITS);
        ((k & 255) >> 4, k & 15)
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for w in self.lanes.iter().rev() {
            write!(f, "{:04x}", w)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self)
    }
}

impl FromStr for Hash256 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_hex(s)
    }
}

macro_rules! impl_bitwise {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait for Hash256 {
            type Output = Hash256;

            fn $method(self, rhs: Hash256) -> Hash256 {
                let mut lanes = [0u16; NUM_LANES];
                for i in 0..NUM_LANES {
                    lanes[i] = self.lanes[i] $op rhs.lanes[i];
                }
                Hash256 { lanes }
            }
        }
    };
}

impl_bitwise!(BitXor, bitxor, ^);
impl_bitwise!(BitAnd, bitand, &);
impl_bitwise!(BitOr, bitor, |);

impl Not for Hash256 {
    type Output = Hash256;

    fn not(self) -> Hash256 {
        let mut lanes = self.lanes;
        for w in lanes.iter_mut() {
            *w = !*w;
        }
        Hash256 { lanes }
    }
}

/// A hash bound to caller-supplied metadata; the unit stored by the index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashAndMetadata<M> {
    hash: Hash256,
    metadata: M,
}

impl<M> HashAndMetadata<M> {
    pub fn new(hash: Hash256, metadata: M) -> Self {
        Self { hash, metadata }
    }

    pub fn hash(&self) -> &Hash256 {
        &self.hash
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn into_parts(self) -> (Hash256, M) {
        (self.hash, self.metadata)
    }
}

/// A hash with its PDQ quality score in 0..=100.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HashAndQuality {
    pub hash: Hash256,
    pub quality: u32,
}

/// Hashes of the eight dihedral transforms of one image, with the shared quality.
///
/// A variant is `None` when it was not requested.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HashesAndQuality {
    pub hash: Option<Hash256>,
    pub rotate_90: Option<Hash256>,
    pub rotate_180: Option<Hash256>,
    pub rotate_270: Option<Hash256>,
    pub flip_x: Option<Hash256>,
    pub flip_y: Option<Hash256>,
    pub flip_plus_1: Option<Hash256>,
    pub flip_minus_1: Option<Hash256>,
    pub quality: u32,
}

impl HashesAndQuality {
    /// The requested variants in canonical order: original, rot90, rot180,
    /// rot270, flip-x, flip-y, flip-plus-1, flip-minus-1.
    pub fn hashes(&self) -> Vec<Hash256> {
        [
            self.hash,
            self.rotate_90,
            self.rotate_180,
            self.rotate_270,
            self.flip_x,
            self.flip_y,
            self.flip_plus_1,
            self.flip_minus_1,
        ]
        .iter()
        .flatten()
        .copied()
        .collect()
    }
}
