//! Error types for the HDHomeRun wire protocol.

use thiserror::Error;

/// Errors raised while encoding or decoding protocol packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes than the header and CRC need.
    #[error("Packet too short: {0} bytes")]
    TooShort(usize),

    /// Payload length field disagrees with the bytes received.
    #[error("Incomplete packet: expected {expected} bytes, got {actual}")]
    IncompletePacket { expected: usize, actual: usize },

    /// CRC trailer does not match the packet contents.
    #[error("CRC mismatch: expected 0x{expected:08X}, computed 0x{computed:08X}")]
    CrcMismatch { expected: u32, computed: u32 },

    /// Packet type field is not one the protocol defines.
    #[error("Unknown packet type: 0x{0:04X}")]
    UnknownPacketType(u16),

    /// A TLV runs past the end of the payload.
    #[error("Truncated TLV for tag 0x{0:02X}")]
    TruncatedTlv(u8),

    /// The encoded payload would not fit in a single packet.
    #[error("Payload too large: {0} bytes (max: {1})")]
    PayloadTooLarge(usize, usize),

    /// A single TLV value is longer than the varlen field can express.
    #[error("TLV value too large: {0} bytes")]
    ValueTooLarge(usize),

    /// The packet decoded but is not the kind the caller asked for.
    #[error("Unexpected packet type: expected {expected:?}, got {actual:?}")]
    UnexpectedPacketType {
        expected: crate::PacketType,
        actual: crate::PacketType,
    },

    /// A required tag is missing or has the wrong size.
    #[error("Invalid value for tag 0x{tag:02X}: {reason}")]
    InvalidTag { tag: u8, reason: String },
}

/// Convenience Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
