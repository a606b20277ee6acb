//! Typed views over reply packets.

use crate::constants::{DeviceType, PacketType, Tag};
use crate::device_id::DeviceId;
use crate::error::{ProtocolError, Result};
use crate::packet::Packet;

/// Contents of a discovery reply.
///
/// Only the device id is mandatory; older firmware omits the URL tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverReply {
    pub device_id: DeviceId,
    pub device_type: Option<DeviceType>,
    pub tuner_count: Option<u8>,
    pub base_url: Option<String>,
    pub lineup_url: Option<String>,
    pub device_auth: Option<String>,
}

impl DiscoverReply {
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        packet.expect_type(PacketType::DiscoverReply)?;

        let device_id = packet
            .get(Tag::DeviceId)
            .ok_or_else(|| ProtocolError::InvalidTag {
                tag: Tag::DeviceId.as_u8(),
                reason: "missing".to_string(),
            })?
            .as_u32()
            .map(DeviceId::new)
            .ok_or_else(|| ProtocolError::InvalidTag {
                tag: Tag::DeviceId.as_u8(),
                reason: "expected 4 bytes".to_string(),
            })?;

        Ok(Self {
            device_id,
            device_type: packet.get_u32(Tag::DeviceType).map(DeviceType::from_u32),
            tuner_count: packet.get_u8(Tag::TunerCount),
            base_url: non_empty(packet.get_string(Tag::BaseUrl)),
            lineup_url: non_empty(packet.get_string(Tag::LineupUrl)),
            device_auth: non_empty(packet.get_string(Tag::DeviceAuthStr)),
        })
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_packet(&Packet::decode(data)?)
    }
}

/// Contents of a get/set reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetSetReply {
    pub name: String,
    /// `Err` carries the device's error message.
    pub value: std::result::Result<String, String>,
}

impl GetSetReply {
    pub fn from_packet(packet: &Packet) -> Result<Self> {
        packet.expect_type(PacketType::GetSetReply)?;

        let name = packet.get_string(Tag::GetSetName).unwrap_or_default();
        let value = match packet.get_string(Tag::ErrorMessage) {
            Some(message) => Err(message),
            None => Ok(packet.get_string(Tag::GetSetValue).unwrap_or_default()),
        };

        Ok(Self { name, value })
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::from_packet(&Packet::decode(data)?)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
