//! Tag-length-value encoding used inside packet payloads.
//!
//! Lengths below 128 take one byte. Longer values use two bytes: the low
//! seven bits with the high bit set, then the remaining bits.

use bytes::{BufMut, Bytes, BytesMut};

use crate::constants::Tag;
use crate::error::{ProtocolError, Result};

/// Largest value length the two-byte varlen form can carry.
const MAX_VARLEN: usize = 0x7FFF;

/// A single tag-length-value entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tag: Tag,
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: Tag, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    /// A string value terminated with NUL, as the control protocol expects.
    pub fn string(tag: Tag, value: &str) -> Self {
        let mut buf = BytesMut::with_capacity(value.len() + 1);
        buf.put_slice(value.as_bytes());
        buf.put_u8(0);
        Self::new(tag, buf.freeze())
    }

    pub fn u32(tag: Tag, value: u32) -> Self {
        Self::new(tag, Bytes::copy_from_slice(&value.to_be_bytes()))
    }

    /// Number of bytes this entry takes on the wire.
    pub fn encoded_len(&self) -> usize {
        1 + varlen_size(self.value.len()) + self.value.len()
    }

    pub(crate) fn encode_into(&self, buf: &mut BytesMut) -> Result<()> {
        let len = self.value.len();
        if len > MAX_VARLEN {
            return Err(ProtocolError::ValueTooLarge(len));
        }
        buf.put_u8(self.tag.as_u8());
        if len <= 0x7F {
            buf.put_u8(len as u8);
        } else {
            buf.put_u8(0x80 | (len & 0x7F) as u8);
            buf.put_u8((len >> 7) as u8);
        }
        buf.put_slice(&self.value);
        Ok(())
    }

    /// Value as text with trailing NULs removed.
    pub fn as_string(&self) -> String {
        let trimmed = match self.value.iter().rposition(|b| *b != 0) {
            Some(last) => &self.value[..=last],
            None => &[][..],
        };
        String::from_utf8_lossy(trimmed).into_owned()
    }

    pub fn as_u32(&self) -> Option<u32> {
        let raw: [u8; 4] = self.value.as_ref().try_into().ok()?;
        Some(u32::from_be_bytes(raw))
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self.value.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }
}

fn varlen_size(len: usize) -> usize {
    if len <= 0x7F {
        1
    } else {
        2
    }
}

/// Split a payload into its TLV entries.
pub(crate) fn decode_all(payload: &[u8]) -> Result<Vec<Tlv>> {
    let mut tlvs = Vec::new();
    let mut pos = 0;

    while pos < payload.len() {
        let tag = payload[pos];
        pos += 1;

        let first = *payload.get(pos).ok_or(ProtocolError::TruncatedTlv(tag))?;
        pos += 1;
        let mut len = (first & 0x7F) as usize;
        if first & 0x80 != 0 {
            let second = *payload.get(pos).ok_or(ProtocolError::TruncatedTlv(tag))?;
            pos += 1;
            len |= (second as usize) << 7;
        }

        let end = pos + len;
        if end > payload.len() {
            return Err(ProtocolError::TruncatedTlv(tag));
        }
        tlvs.push(Tlv::new(
            Tag::from_u8(tag),
            Bytes::copy_from_slice(&payload[pos..end]),
        ));
        pos = end;
    }

    Ok(tlvs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(tlv: &Tlv) -> Vec<u8> {
        let mut buf = BytesMut::new();
        tlv.encode_into(&mut buf).unwrap();
        buf.to_vec()
    }

    #[test]
    fn test_short_length_is_one_byte() {
        let bytes = encode(&Tlv::new(Tag::GetSetValue, vec![0xAA; 127]));
        assert_eq!(bytes[0], 0x04);
        assert_eq!(bytes[1], 127);
        assert_eq!(bytes.len(), 2 + 127);
    }

    #[test]
    fn test_long_length_is_two_bytes() {
        let bytes = encode(&Tlv::new(Tag::GetSetValue, vec![0xAA; 300]));
        // 300 = 0b10_0101100 -> low 7 bits 0x2C with high bit, then 0x02
        assert_eq!(bytes[1], 0xAC);
        assert_eq!(bytes[2], 0x02);
        assert_eq!(bytes.len(), 3 + 300);

        let decoded = decode_all(&bytes).unwrap();
        assert_eq!(decoded[0].value.len(), 300);
    }

    #[test]
    fn test_string_is_nul_terminated() {
        let tlv = Tlv::string(Tag::GetSetName, "/sys/model");
        assert_eq!(tlv.value.last(), Some(&0));
        assert_eq!(tlv.as_string(), "/sys/model");
    }

    #[test]
    fn test_truncated_value_is_rejected() {
        let bytes = [0x03, 0x05, b'a', b'b'];
        assert_eq!(decode_all(&bytes), Err(ProtocolError::TruncatedTlv(0x03)));
    }

    #[test]
    fn test_missing_length_is_rejected() {
        assert_eq!(decode_all(&[0x10]), Err(ProtocolError::TruncatedTlv(0x10)));
    }

    #[test]
    fn test_numeric_accessors() {
        assert_eq!(Tlv::u32(Tag::DeviceId, 0x1040_1234).as_u32(), Some(0x1040_1234));
        assert_eq!(Tlv::new(Tag::TunerCount, vec![4u8]).as_u8(), Some(4));
        assert_eq!(Tlv::new(Tag::TunerCount, vec![4u8, 0]).as_u8(), None);
        assert_eq!(Tlv::new(Tag::DeviceId, vec![1u8, 2]).as_u32(), None);
    }
}
