//! Protocol constants: ports, packet types, tags and device types.

use serde::{Deserialize, Serialize};

/// UDP port devices listen on for discovery requests.
pub const DISCOVER_UDP_PORT: u16 = 65001;

/// TCP port of the control protocol.
pub const CONTROL_TCP_PORT: u16 = 65001;

/// Largest packet a device will send or accept.
pub const MAX_PACKET_SIZE: usize = 1460;

/// Largest payload that fits in [`MAX_PACKET_SIZE`] after header and CRC.
pub const MAX_PAYLOAD_SIZE: usize = 1452;

/// Device id matching every device in a discovery request.
pub const DEVICE_ID_WILDCARD: u32 = 0xFFFF_FFFF;

/// Packet type field of the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    DiscoverRequest,
    DiscoverReply,
    GetSetRequest,
    GetSetReply,
    UpgradeRequest,
    UpgradeReply,
}

impl PacketType {
    /// Wire value of this packet type.
    pub fn as_u16(self) -> u16 {
        match self {
            PacketType::DiscoverRequest => 0x0002,
            PacketType::DiscoverReply => 0x0003,
            PacketType::GetSetRequest => 0x0004,
            PacketType::GetSetReply => 0x0005,
            PacketType::UpgradeRequest => 0x0006,
            PacketType::UpgradeReply => 0x0007,
        }
    }

    /// Map a wire value back to a packet type.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            0x0002 => Some(PacketType::DiscoverRequest),
            0x0003 => Some(PacketType::DiscoverReply),
            0x0004 => Some(PacketType::GetSetRequest),
            0x0005 => Some(PacketType::GetSetReply),
            0x0006 => Some(PacketType::UpgradeRequest),
            0x0007 => Some(PacketType::UpgradeReply),
            _ => None,
        }
    }
}

/// TLV tags used in discovery and control payloads.
///
/// Tags the crate does not know are carried as [`Tag::Other`] so a reply
/// from newer firmware still decodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    DeviceType,
    DeviceId,
    GetSetName,
    GetSetValue,
    ErrorMessage,
    TunerCount,
    GetSetLockkey,
    LineupUrl,
    StorageUrl,
    DeviceAuthBin,
    BaseUrl,
    DeviceAuthStr,
    StorageId,
    MultiType,
    Other(u8),
}

impl Tag {
    pub fn as_u8(self) -> u8 {
        match self {
            Tag::DeviceType => 0x01,
            Tag::DeviceId => 0x02,
            Tag::GetSetName => 0x03,
            Tag::GetSetValue => 0x04,
            Tag::ErrorMessage => 0x05,
            Tag::TunerCount => 0x10,
            Tag::GetSetLockkey => 0x15,
            Tag::LineupUrl => 0x27,
            Tag::StorageUrl => 0x28,
            Tag::DeviceAuthBin => 0x29,
            Tag::BaseUrl => 0x2A,
            Tag::DeviceAuthStr => 0x2B,
            Tag::StorageId => 0x2C,
            Tag::MultiType => 0x2D,
            Tag::Other(value) => value,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0x01 => Tag::DeviceType,
            0x02 => Tag::DeviceId,
            0x03 => Tag::GetSetName,
            0x04 => Tag::GetSetValue,
            0x05 => Tag::ErrorMessage,
            0x10 => Tag::TunerCount,
            0x15 => Tag::GetSetLockkey,
            0x27 => Tag::LineupUrl,
            0x28 => Tag::StorageUrl,
            0x29 => Tag::DeviceAuthBin,
            0x2A => Tag::BaseUrl,
            0x2B => Tag::DeviceAuthStr,
            0x2C => Tag::StorageId,
            0x2D => Tag::MultiType,
            other => Tag::Other(other),
        }
    }
}

/// Device class reported in the device type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Tuner,
    Storage,
    Wildcard,
    Other(u32),
}

impl DeviceType {
    pub fn as_u32(self) -> u32 {
        match self {
            DeviceType::Tuner => 0x0000_0001,
            DeviceType::Storage => 0x0000_0005,
            DeviceType::Wildcard => 0xFFFF_FFFF,
            DeviceType::Other(value) => value,
        }
    }

    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0000_0001 => DeviceType::Tuner,
            0x0000_0005 => DeviceType::Storage,
            0xFFFF_FFFF => DeviceType::Wildcard,
            other => DeviceType::Other(other),
        }
    }
}
