//! Packet framing: header, TLV payload and CRC trailer.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::{DeviceType, PacketType, Tag, MAX_PAYLOAD_SIZE};
use crate::error::{ProtocolError, Result};
use crate::tlv::{self, Tlv};

/// Header size: 2 (type) + 2 (payload length).
pub const HEADER_SIZE: usize = 4;

const CRC_SIZE: usize = 4;

/// A decoded protocol packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub packet_type: PacketType,
    pub tlvs: Vec<Tlv>,
}

impl Packet {
    pub fn new(packet_type: PacketType) -> Self {
        Self {
            packet_type,
            tlvs: Vec::new(),
        }
    }

    pub fn with_tlv(mut self, tlv: Tlv) -> Self {
        self.tlvs.push(tlv);
        self
    }

    /// Discovery request for devices of `device_type` with `device_id`.
    ///
    /// Pass [`DeviceType::Wildcard`] / [`crate::DEVICE_ID_WILDCARD`] to match everything.
    pub fn discover_request(device_type: DeviceType, device_id: u32) -> Self {
        Self::new(PacketType::DiscoverRequest)
            .with_tlv(Tlv::u32(Tag::DeviceType, device_type.as_u32()))
            .with_tlv(Tlv::u32(Tag::DeviceId, device_id))
    }

    /// Get (value `None`) or set request for a control variable.
    pub fn getset_request(name: &str, value: Option<&str>, lockkey: Option<u32>) -> Self {
        let mut packet =
            Self::new(PacketType::GetSetRequest).with_tlv(Tlv::string(Tag::GetSetName, name));
        if let Some(value) = value {
            packet.tlvs.push(Tlv::string(Tag::GetSetValue, value));
            if let Some(lockkey) = lockkey {
                packet.tlvs.push(Tlv::u32(Tag::GetSetLockkey, lockkey));
            }
        }
        packet
    }

    /// First entry with the given tag.
    pub fn get(&self, tag: Tag) -> Option<&Tlv> {
        self.tlvs.iter().find(|tlv| tlv.tag == tag)
    }

    pub fn get_string(&self, tag: Tag) -> Option<String> {
        self.get(tag).map(Tlv::as_string)
    }

    pub fn get_u32(&self, tag: Tag) -> Option<u32> {
        self.get(tag).and_then(Tlv::as_u32)
    }

    pub fn get_u8(&self, tag: Tag) -> Option<u8> {
        self.get(tag).and_then(Tlv::as_u8)
    }

    /// Serialize the packet, appending the CRC trailer.
    pub fn encode(&self) -> Result<Bytes> {
        let payload_len: usize = self.tlvs.iter().map(Tlv::encoded_len).sum();
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(ProtocolError::PayloadTooLarge(payload_len, MAX_PAYLOAD_SIZE));
        }

        let mut buf = BytesMut::with_capacity(HEADER_SIZE + payload_len + CRC_SIZE);
        buf.put_u16(self.packet_type.as_u16());
        buf.put_u16(payload_len as u16);
        for tlv in &self.tlvs {
            tlv.encode_into(&mut buf)?;
        }

        let crc = crc32fast::hash(&buf);
        buf.put_u32_le(crc);
        Ok(buf.freeze())
    }

    /// Parse a complete packet, verifying length and CRC.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE + CRC_SIZE {
            return Err(ProtocolError::TooShort(data.len()));
        }

        let raw_type = u16::from_be_bytes([data[0], data[1]]);
        let payload_len = u16::from_be_bytes([data[2], data[3]]) as usize;
        let expected = HEADER_SIZE + payload_len + CRC_SIZE;
        if data.len() != expected {
            return Err(ProtocolError::IncompletePacket {
                expected,
                actual: data.len(),
            });
        }

        let body_end = HEADER_SIZE + payload_len;
        let computed = crc32fast::hash(&data[..body_end]);
        let stored = u32::from_le_bytes([
            data[body_end],
            data[body_end + 1],
            data[body_end + 2],
            data[body_end + 3],
        ]);
        if computed != stored {
            return Err(ProtocolError::CrcMismatch {
                expected: stored,
                computed,
            });
        }

        let packet_type =
            PacketType::from_u16(raw_type).ok_or(ProtocolError::UnknownPacketType(raw_type))?;
        let tlvs = tlv::decode_all(&data[HEADER_SIZE..body_end])?;

        Ok(Self { packet_type, tlvs })
    }

    /// Total size of a packet whose first bytes are `header`, once the
    /// header is available. Used by stream readers to know how much to read.
    pub fn frame_len(header: &[u8; HEADER_SIZE]) -> usize {
        HEADER_SIZE + u16::from_be_bytes([header[2], header[3]]) as usize + CRC_SIZE
    }

    pub(crate) fn expect_type(&self, expected: PacketType) -> Result<()> {
        if self.packet_type != expected {
            return Err(ProtocolError::UnexpectedPacketType {
                expected,
                actual: self.packet_type,
            });
        }
        Ok(())
    }
}
