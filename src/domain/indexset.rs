//! Bitset algebra over outcome index sets.
//!
//! An index set selects a subset of a condition's outcome slots. Slot counts
//! go up to 256, so the set is a fixed 256-bit value: four little-endian
//! `u64` limbs (limb 0 holds bits 0..64). Hex rendering and the canonical
//! 32-byte big-endian encoding used for hashing both treat the whole set as
//! one unsigned integer.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

use super::primitives::HexParseError;

pub const MAX_OUTCOME_SLOTS: u32 = 256;

/// A 256-bit outcome index set.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndexSet([u64; 4]);

impl IndexSet {
    pub fn zero() -> Self {
        IndexSet([0; 4])
    }

    /// Build from the low 64 bits. Covers every realistic slot count; larger
    /// sets come from parsing or bit-by-bit construction.
    pub fn from_bits(bits: u64) -> Self {
        IndexSet([bits, 0, 0, 0])
    }

    /// The set covering every slot of `outcome_slot_count`.
    pub fn full(outcome_slot_count: u32) -> Self {
        let mut limbs = [0u64; 4];
        for i in 0..outcome_slot_count.min(MAX_OUTCOME_SLOTS) {
            limbs[(i / 64) as usize] |= 1u64 << (i % 64);
        }
        IndexSet(limbs)
    }

    pub fn with_bit(mut self, index: u32) -> Self {
        if index < MAX_OUTCOME_SLOTS {
            self.0[(index / 64) as usize] |= 1u64 << (index % 64);
        }
        self
    }

    pub fn bit(&self, index: u32) -> bool {
        if index >= MAX_OUTCOME_SLOTS {
            return false;
        }
        self.0[(index / 64) as usize] >> (index % 64) & 1 == 1
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }

    /// True iff every slot in `0..outcome_slot_count` is set and none above.
    pub fn is_full(&self, outcome_slot_count: u32) -> bool {
        *self == Self::full(outcome_slot_count)
    }

    /// True iff no bit at or above `outcome_slot_count` is set.
    pub fn fits(&self, outcome_slot_count: u32) -> bool {
        let mask = Self::full(outcome_slot_count);
        (0..4).all(|i| self.0[i] & !mask.0[i] == 0)
    }

    pub fn intersects(&self, other: &IndexSet) -> bool {
        (0..4).any(|i| self.0[i] & other.0[i] != 0)
    }

    pub fn count_ones(&self) -> u32 {
        self.0.iter().map(|l| l.count_ones()).sum()
    }

    /// Ascending indices of the set bits.
    pub fn bits(&self) -> impl Iterator<Item = u32> + '_ {
        (0..MAX_OUTCOME_SLOTS).filter(move |i| self.bit(*i))
    }

    /// Canonical big-endian 32-byte encoding, for identifier hashing.
    pub fn to_be_bytes(&self) -> [u8; 32] {
        let mut out = [0u8; 32];
        for (i, limb) in self.0.iter().enumerate() {
            let start = 32 - (i + 1) * 8;
            out[start..start + 8].copy_from_slice(&limb.to_be_bytes());
        }
        out
    }

    pub fn from_be_bytes(bytes: [u8; 32]) -> Self {
        let mut limbs = [0u64; 4];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let start = 32 - (i + 1) * 8;
            let mut chunk = [0u8; 8];
            chunk.copy_from_slice(&bytes[start..start + 8]);
            *limb = u64::from_be_bytes(chunk);
        }
        IndexSet(limbs)
    }
}

/// Bitwise OR. The protocol's partitions are pairwise disjoint, so this is
/// also their sum.
impl BitOr for IndexSet {
    type Output = IndexSet;

    fn bitor(self, rhs: IndexSet) -> IndexSet {
        let mut out = [0u64; 4];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] | rhs.0[i];
        }
        IndexSet(out)
    }
}

/// Union of all members of a partition.
pub fn union_of(index_sets: &[IndexSet]) -> IndexSet {
    index_sets
        .iter()
        .fold(IndexSet::zero(), |acc, set| acc | *set)
}

impl fmt::Display for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bytes = self.to_be_bytes();
        let first = bytes.iter().position(|b| *b != 0).unwrap_or(31);
        write!(f, "0x{}", hex::encode(&bytes[first..]))
    }
}

impl fmt::Debug for IndexSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IndexSet({})", self)
    }
}

impl FromStr for IndexSet {
    type Err = HexParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let padded = if stripped.len() % 2 == 1 {
            format!("0{}", stripped)
        } else {
            stripped.to_string()
        };
        let bytes = hex::decode(&padded).map_err(|e| HexParseError::InvalidHex(e.to_string()))?;
        if bytes.len() > 32 {
            return Err(HexParseError::BadLength {
                expected: 32,
                got: bytes.len(),
            });
        }
        let mut full = [0u8; 32];
        full[32 - bytes.len()..].copy_from_slice(&bytes);
        Ok(IndexSet::from_be_bytes(full))
    }
}

impl Serialize for IndexSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for IndexSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
