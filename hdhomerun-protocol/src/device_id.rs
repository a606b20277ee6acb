//! Device identifiers and their checksum.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

const CHECKSUM_LOOKUP: [u32; 16] = [
    0xA, 0x5, 0xF, 0x6, 0x7, 0xC, 0x1, 0xB, 0x9, 0x2, 0x8, 0xD, 0x4, 0x3, 0xE, 0x0,
];

/// 32-bit HDHomeRun device id, displayed as eight upper-case hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(u32);

impl DeviceId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Whether the id carries a valid checksum digit.
    ///
    /// Every real device id satisfies this; a mistyped id almost never does.
    pub fn is_valid(&self) -> bool {
        let id = self.0;
        let mut checksum = 0u32;
        checksum ^= CHECKSUM_LOOKUP[((id >> 28) & 0x0F) as usize];
        checksum ^= (id >> 24) & 0x0F;
        checksum ^= CHECKSUM_LOOKUP[((id >> 20) & 0x0F) as usize];
        checksum ^= (id >> 16) & 0x0F;
        checksum ^= CHECKSUM_LOOKUP[((id >> 12) & 0x0F) as usize];
        checksum ^= (id >> 8) & 0x0F;
        checksum ^= CHECKSUM_LOOKUP[((id >> 4) & 0x0F) as usize];
        checksum ^= id & 0x0F;
        checksum == 0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08X}", self.0)
    }
}

impl FromStr for DeviceId {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u32::from_str_radix(s.trim(), 16)
            .map(DeviceId)
            .map_err(|e| ProtocolError::InvalidTag {
                tag: crate::Tag::DeviceId.as_u8(),
                reason: format!("'{}' is not a hex device id: {}", s, e),
            })
    }
}

impl Serialize for DeviceId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DeviceId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
