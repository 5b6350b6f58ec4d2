//! Fixed-length 20-byte identifiers and their two byte orders.
//!
//! Contract addresses are displayed and returned by RPC nodes in big-endian
//! ("display") order, but the invocation surface of the CLI tools expects the
//! byte-reversed ("invocation") order. A [`Hash160`] always stores the display
//! order; [`Hash160::to_invocation_hex`] is the single place where the
//! conversion happens.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::FormatError;

/// Number of bytes in a [`Hash160`].
pub const HASH160_LEN: usize = 20;

/// A 20-byte identifier (contract address or account script hash), in display order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash160([u8; HASH160_LEN]);

impl Hash160 {
    pub const fn from_bytes(bytes: [u8; HASH160_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; HASH160_LEN] {
        &self.0
    }

    /// The byte-reversed identifier.
    pub fn reversed(&self) -> Self {
        let mut bytes = self.0;
        bytes.reverse();
        Self(bytes)
    }

    /// `0x`-prefixed lowercase hex in invocation byte order.
    pub fn to_invocation_hex(&self) -> String {
        self.reversed().to_string()
    }
}

impl FromStr for Hash160 {
    type Err = FormatError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let digits = value
            .strip_prefix("0x")
            .or_else(|| value.strip_prefix("0X"))
            .unwrap_or(value);

        let decoded = hex::decode(digits).map_err(|_| FormatError::InvalidHex {
            value: value.to_string(),
        })?;

        let bytes: [u8; HASH160_LEN] =
            decoded
                .try_into()
                .map_err(|decoded: Vec<u8>| FormatError::InvalidLength {
                    value: value.to_string(),
                    expected: HASH160_LEN,
                    actual: decoded.len(),
                })?;

        Ok(Self(bytes))
    }
}

impl fmt::Display for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Hash160 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash160({self})")
    }
}

impl Serialize for Hash160 {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Hash160 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Reverse the byte order of a 20-byte hex identifier.
///
/// Accepts an optional `0x` prefix and returns `0x`-prefixed lowercase hex.
pub fn reverse_hash160(value: &str) -> Result<String, FormatError> {
    Ok(value.parse::<Hash160>()?.reversed().to_string())
}
