//! Bluetooth device addressing.
//!
//! Addresses travel through the stack contract in packed numeric form and are
//! rendered in the conventional colon-separated hexadecimal form for display
//! and logs. Parsing accepts both renderings.

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest value a 48-bit device address can take.
pub const ADDRESS_MAX: u64 = 0xFFFF_FFFF_FFFF;

/// A 48-bit Bluetooth device address in packed numeric form.
///
/// `Display` gives the colon-separated form (`00:1A:7D:DA:71:13`);
/// [`plain_hex`](DeviceAddress::plain_hex) gives the separator-stripped form.
/// Both forms parse back via [`FromStr`], case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceAddress(u64);

impl DeviceAddress {
    /// Create an address from its packed numeric value.
    pub fn new(raw: u64) -> Result<Self, AddressError> {
        if raw > ADDRESS_MAX {
            return Err(AddressError::OutOfRange(raw));
        }
        Ok(DeviceAddress(raw))
    }

    /// Create an address from big-endian bytes, most significant octet first.
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        let mut raw = 0u64;
        for b in bytes {
            raw = (raw << 8) | u64::from(b);
        }
        DeviceAddress(raw)
    }

    /// Packed numeric value; the upper 16 bits are always zero.
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Big-endian byte view, most significant octet first.
    pub fn to_bytes(self) -> [u8; 6] {
        let mut bytes = [0u8; 6];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = ((self.0 >> (8 * (5 - i))) & 0xFF) as u8;
        }
        bytes
    }

    /// Separator-stripped uppercase hexadecimal form, always 12 digits.
    pub fn plain_hex(self) -> String {
        format!("{:012X}", self.0)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.to_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped: String = s.chars().filter(|c| *c != ':').collect();
        if stripped.len() != 12 {
            return Err(AddressError::InvalidLength(stripped.len()));
        }
        let mut bytes = [0u8; 6];
        hex::decode_to_slice(&stripped, &mut bytes)
            .map_err(|_| AddressError::InvalidDigit(s.to_string()))?;
        Ok(DeviceAddress::from_bytes(bytes))
    }
}

impl From<DeviceAddress> for u64 {
    fn from(addr: DeviceAddress) -> u64 {
        addr.0
    }
}

impl Serialize for DeviceAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DeviceAddress {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

/// Errors from address construction and parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("expected 12 hexadecimal digits, found {0}")]
    InvalidLength(usize),
    #[error("invalid hexadecimal digit in address {0:?}")]
    InvalidDigit(String),
    #[error("value {0:#x} does not fit a 48-bit address")]
    OutOfRange(u64),
}
