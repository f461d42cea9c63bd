//! Address and cluster identifiers.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::fmt;

/// Opaque ownership witness, usually an output script.
///
/// Equality is byte-exact. Displays and serializes as lowercase hex.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Box<[u8]>);

impl Address {
    /// Create an address from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Self {
        Self(bytes.into())
    }

    /// Decode an address from a hex string.
    pub fn from_hex(s: &str) -> std::result::Result<Self, hex::FromHexError> {
        hex::decode(s).map(Self::new)
    }

    /// Raw bytes of the address.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex encoding.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the address has no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Borrow<[u8]> for Address {
    fn borrow(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for Address {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.into())
    }
}

impl From<Vec<u8>> for Address {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes.into_boxed_slice())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifier of a cluster.
///
/// Ids are assigned in registration order and never reused. After a merge the
/// absorbed id is retired and no longer returned by lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterId(u64);

impl ClusterId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClusterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_roundtrip() {
        let addr = Address::from_hex("76a914ab").unwrap();
        assert_eq!(addr.as_bytes(), &[0x76, 0xa9, 0x14, 0xab]);
        assert_eq!(addr.to_string(), "76a914ab");
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Address::from_hex("zz").is_err());
        assert!(Address::from_hex("abc").is_err());
    }

    #[test]
    fn test_byte_exact_equality() {
        let a = Address::from(&b"abc"[..]);
        let b = Address::from(b"abc".to_vec());
        let c = Address::from(&b"abd"[..]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_serde_as_hex_string() {
        let addr = Address::from(&[0x00_u8, 0xff][..]);
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"00ff\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn test_cluster_id_transparent() {
        let id = ClusterId::new(42);
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(id.get(), 42);
    }
}
