//! The message wire format, as materialized in a delivery pool.
//!
//! ```text
//! offset  size  field
//! 0       64    source name, ASCII, NUL-padded
//! 64      64    destination name, ASCII, NUL-padded
//! 128     4     payload length, little-endian u32
//! 132     L     payload bytes
//! ```

use alloc::vec::Vec;
use core::convert::TryInto;

use serde::{Deserialize, Serialize};

use crate::name::{NameError, ServiceName, SERVICE_NAME_FIELD_BYTES};

/// Header bytes preceding the payload
pub const MESSAGE_HEADER_BYTES: usize = 2 * SERVICE_NAME_FIELD_BYTES + 4;

/// Maximum payload size
pub const MAX_MESSAGE_BYTES: usize = 16 * 1024 * 1024;

static_assertions::const_assert_eq!(MESSAGE_HEADER_BYTES, 132);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WireError {
    Truncated,
    BadName(NameError),
    /// Payload length field exceeds `MAX_MESSAGE_BYTES`
    TooLarge,
    /// Not a known command or event tag
    UnknownTag(u32),
}

/// A single bus message. The payload is opaque to the kernel, except that
/// the leading 4 bytes are interpreted as a little-endian event tag by
/// receive filters and by the core-command dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub source: ServiceName,
    pub dest: ServiceName,
    pub data: Vec<u8>,
}
impl Message {
    pub fn new(source: ServiceName, dest: ServiceName, data: Vec<u8>) -> Self {
        Self { source, dest, data }
    }

    /// Leading u32 of the payload, if there is one
    pub fn event(&self) -> Option<u32> {
        let bytes = self.data.get(..4)?;
        Some(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Total on-wire size, header included
    pub fn wire_len(&self) -> usize {
        MESSAGE_HEADER_BYTES + self.data.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.wire_len());
        let mut field = [0u8; SERVICE_NAME_FIELD_BYTES];
        self.source.write_field(&mut field);
        out.extend_from_slice(&field);
        self.dest.write_field(&mut field);
        out.extend_from_slice(&field);
        out.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn from_bytes(input: &[u8]) -> Result<Self, WireError> {
        if input.len() < MESSAGE_HEADER_BYTES {
            return Err(WireError::Truncated);
        }
        let source = ServiceName::from_field(&input[..SERVICE_NAME_FIELD_BYTES])
            .map_err(WireError::BadName)?;
        let dest = ServiceName::from_field(
            &input[SERVICE_NAME_FIELD_BYTES..2 * SERVICE_NAME_FIELD_BYTES],
        )
        .map_err(WireError::BadName)?;
        let len_field = &input[2 * SERVICE_NAME_FIELD_BYTES..MESSAGE_HEADER_BYTES];
        let len = u32::from_le_bytes(len_field.try_into().unwrap()) as usize;
        if len > MAX_MESSAGE_BYTES {
            return Err(WireError::TooLarge);
        }
        if input.len() < MESSAGE_HEADER_BYTES + len {
            return Err(WireError::Truncated);
        }
        Ok(Self {
            source,
            dest,
            data: input[MESSAGE_HEADER_BYTES..MESSAGE_HEADER_BYTES + len].to_vec(),
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_round_trip() {
        let msg = Message::new(
            ServiceName::new("com.test.a").unwrap(),
            ServiceName::new("com.test.b").unwrap(),
            vec![0xbb, 0x00, 0x00, 0x00, 1, 2, 3],
        );
        let wire = msg.to_bytes();
        assert_eq!(wire.len(), MESSAGE_HEADER_BYTES + 7);
        assert_eq!(&wire[..10], b"com.test.a");
        assert_eq!(wire[10], 0);
        assert_eq!(wire[128..132], (7u32).to_le_bytes());
        assert_eq!(Message::from_bytes(&wire).unwrap(), msg);
        assert_eq!(msg.event(), Some(0xbb));
    }

    #[test]
    fn test_short_payload_has_no_event() {
        let msg = Message::new(
            ServiceName::new("a").unwrap(),
            ServiceName::new("b").unwrap(),
            vec![1, 2, 3],
        );
        assert_eq!(msg.event(), None);
    }

    #[test]
    fn test_truncated() {
        let msg = Message::new(
            ServiceName::new("a").unwrap(),
            ServiceName::new("b").unwrap(),
            vec![0; 16],
        );
        let wire = msg.to_bytes();
        assert_eq!(
            Message::from_bytes(&wire[..wire.len() - 1]),
            Err(WireError::Truncated)
        );
        assert_eq!(Message::from_bytes(&wire[..100]), Err(WireError::Truncated));
    }
}
