//! Fixed-width byte primitives: addresses, 32-byte words, and the typed
//! identifiers derived from them.
//!
//! Everything here renders as `0x`-prefixed lowercase hex, both in JSON and
//! in the database.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::BitXor;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a hex-encoded fixed-width value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HexParseError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    #[error("expected {expected} bytes, got {got}")]
    BadLength { expected: usize, got: usize },
}

fn parse_fixed<const N: usize>(s: &str) -> Result<[u8; N], HexParseError> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(stripped).map_err(|e| HexParseError::InvalidHex(e.to_string()))?;
    let got = bytes.len();
    bytes
        .try_into()
        .map_err(|_| HexParseError::BadLength { expected: N, got })
}

macro_rules! hex_newtype {
    ($name:ident, $len:literal) => {
        impl $name {
            pub const LEN: usize = $len;

            pub fn new(bytes: [u8; $len]) -> Self {
                Self(bytes)
            }

            pub fn zero() -> Self {
                Self([0u8; $len])
            }

            pub fn is_zero(&self) -> bool {
                self.0.iter().all(|b| *b == 0)
            }

            pub fn as_bytes(&self) -> &[u8; $len] {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl FromStr for $name {
            type Err = HexParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_fixed::<$len>(s).map(Self)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(D::Error::custom)
            }
        }
    };
}

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address(pub [u8; 20]);

hex_newtype!(Address, 20);

/// A 32-byte word: transaction hashes, question ids, and the raw material of
/// every derived identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Bytes32(pub [u8; 32]);

hex_newtype!(Bytes32, 32);

impl BitXor for Bytes32 {
    type Output = Bytes32;

    fn bitxor(self, rhs: Bytes32) -> Bytes32 {
        let mut out = [0u8; 32];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.0[i] ^ rhs.0[i];
        }
        Bytes32(out)
    }
}

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Bytes32);

        impl $name {
            pub fn zero() -> Self {
                Self(Bytes32::zero())
            }

            pub fn is_zero(&self) -> bool {
                self.0.is_zero()
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                self.0.as_bytes()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl FromStr for $name {
            type Err = HexParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse().map(Self)
            }
        }
    };
}

id_newtype!(ConditionId);
id_newtype!(CollectionId);
id_newtype!(PositionId);

/// Composite key for a user's holding of one position: the 20-byte user
/// address concatenated with the 32-byte position id. This is a literal
/// key, not a digest; it must never be hashed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UserPositionId(pub [u8; 52]);

hex_newtype!(UserPositionId, 52);

impl UserPositionId {
    /// Split the composite key back into its two halves.
    pub fn parts(&self) -> (Address, PositionId) {
        let mut user = [0u8; 20];
        let mut position = [0u8; 32];
        user.copy_from_slice(&self.0[..20]);
        position.copy_from_slice(&self.0[20..]);
        (Address(user), PositionId(Bytes32(position)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_hex_roundtrip() {
        let addr: Address = "0x00112233445566778899aabbccddeeff00112233"
            .parse()
            .unwrap();
        assert_eq!(
            addr.to_string(),
            "0x00112233445566778899aabbccddeeff00112233"
        );
    }

    #[test]
    fn test_address_accepts_unprefixed_hex() {
        let addr: Address = "00112233445566778899aabbccddeeff00112233".parse().unwrap();
        assert!(!addr.is_zero());
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let err = "0x0011".parse::<Address>().unwrap_err();
        assert_eq!(
            err,
            HexParseError::BadLength {
                expected: 20,
                got: 2
            }
        );
    }

    #[test]
    fn test_bytes32_rejects_bad_hex() {
        assert!(matches!(
            "0xzz".parse::<Bytes32>(),
            Err(HexParseError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_bytes32_xor_identity_and_self_inverse() {
        let a: Bytes32 = "0x0101010101010101010101010101010101010101010101010101010101010101"
            .parse()
            .unwrap();
        assert_eq!(a ^ Bytes32::zero(), a);
        assert!((a ^ a).is_zero());
    }

    #[test]
    fn test_zero_detection() {
        assert!(CollectionId::zero().is_zero());
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!CollectionId(Bytes32(bytes)).is_zero());
    }

    #[test]
    fn test_user_position_id_parts() {
        let mut bytes = [0u8; 52];
        bytes[0] = 0xaa;
        bytes[20] = 0xbb;
        let id = UserPositionId(bytes);
        let (user, position) = id.parts();
        assert_eq!(user.0[0], 0xaa);
        assert_eq!(position.as_bytes()[0], 0xbb);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr: Address = "0x00112233445566778899aabbccddeeff00112233"
            .parse()
            .unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"0x00112233445566778899aabbccddeeff00112233\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
