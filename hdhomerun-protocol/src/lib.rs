//! HDHomeRun wire protocol
//!
//! This crate implements the binary packet format shared by the HDHomeRun
//! UDP discovery protocol and the TCP control protocol, plus parsers for the
//! text values the control protocol returns.
//!
//! # Packet layout
//!
//! ```text
//! +-----------+-------------+-------------------+-----------------+
//! | type u16  | length u16  | payload (TLVs)    | CRC32 u32 LE    |
//! +-----------+-------------+-------------------+-----------------+
//! ```
//!
//! # Quick Start
//!
//! ```rust
//! use hdhomerun_protocol::{Packet, PacketType, Tag};
//!
//! let request = Packet::getset_request("/sys/model", None, None);
//! let bytes = request.encode().unwrap();
//!
//! let decoded = Packet::decode(&bytes).unwrap();
//! assert_eq!(decoded.packet_type, PacketType::GetSetRequest);
//! assert_eq!(decoded.get_string(Tag::GetSetName).as_deref(), Some("/sys/model"));
//! ```

mod constants;
mod device_id;
mod error;
mod packet;
mod reply;
mod tlv;
pub mod values;

pub use constants::{
    DeviceType, PacketType, Tag, CONTROL_TCP_PORT, DEVICE_ID_WILDCARD, DISCOVER_UDP_PORT,
    MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE,
};
pub use device_id::DeviceId;
pub use error::{ProtocolError, Result};
pub use packet::{Packet, HEADER_SIZE};
pub use reply::{DiscoverReply, GetSetReply};
pub use tlv::Tlv;
