//! Transport framing.
//!
//! Each packet on the socket is framed with a fixed header:
//!
//! ```text
//! +------+------+--------+--------+------+--------+--------+-----------------+
//! | 0xCA | 0xAC | id_lo  | id_hi  | type | len_lo | len_hi | payload[0..len] |
//! +------+------+--------+--------+------+--------+--------+-----------------+
//! ```
//!
//! Responses echo the request id. Frames with id 0 are unsolicited pushes.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::constants::{HEADER_SIZE, MAX_PACKET_SIZE, MAX_PAYLOAD_SIZE, PACKET_SIGNATURE, PUSH_REQUEST_ID};
use crate::error::{DecodeError, EncodeError};
use crate::packet_type::PacketType;

const SIGNATURE: [u8; 2] = PACKET_SIGNATURE.to_le_bytes();

/// One framed packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Correlation id; [`PUSH_REQUEST_ID`] for pushes.
    pub request_id: u16,
    pub packet_type: PacketType,
    /// Payload without the header.
    pub payload: Bytes,
}

impl Packet {
    /// A packet with an explicit request id.
    pub fn new(request_id: u16, packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Packet {
            request_id,
            packet_type,
            payload: payload.into(),
        }
    }

    /// An unsolicited packet, as sent by the device for telemetry.
    pub fn push(packet_type: PacketType, payload: impl Into<Bytes>) -> Self {
        Self::new(PUSH_REQUEST_ID, packet_type, payload)
    }

    /// Whether the device sent this unprompted.
    pub fn is_push(&self) -> bool {
        self.request_id == PUSH_REQUEST_ID
    }

    /// Reason text of an `ERROR` packet.
    pub fn error_reason(&self) -> Option<String> {
        (self.packet_type == PacketType::Error)
            .then(|| String::from_utf8_lossy(&self.payload).into_owned())
    }

    /// Encode the packet with its header.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(EncodeError::PayloadTooLarge {
                size: self.payload.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }

        let mut buf = Vec::with_capacity(HEADER_SIZE + self.payload.len());
        buf.put_u16_le(PACKET_SIGNATURE);
        buf.put_u16_le(self.request_id);
        buf.put_u8(self.packet_type.code());
        buf.put_u16_le(self.payload.len() as u16);
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }
}

/// Incremental frame decoder over a byte stream.
#[derive(Debug, Default)]
pub struct FrameCodec {
    /// Buffer for accumulating incoming data.
    buffer: BytesMut,
}

impl FrameCodec {
    pub fn new() -> Self {
        FrameCodec {
            buffer: BytesMut::with_capacity(MAX_PACKET_SIZE),
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next frame.
    ///
    /// Returns `Ok(None)` if more data is needed. Bytes before a signature are
    /// discarded. A frame with an oversize length or unknown type is dropped
    /// and reported; decoding can continue with the next call.
    pub fn decode(&mut self) -> Result<Option<Packet>, DecodeError> {
        self.resync();

        if self.buffer.len() < HEADER_SIZE {
            return Ok(None);
        }

        let request_id = u16::from_le_bytes([self.buffer[2], self.buffer[3]]);
        let code = self.buffer[4];
        let len = u16::from_le_bytes([self.buffer[5], self.buffer[6]]) as usize;

        if len > MAX_PAYLOAD_SIZE {
            // Skip the signature so the next call searches past this header.
            self.buffer.advance(SIGNATURE.len());
            return Err(DecodeError::FrameTooLong {
                max: MAX_PAYLOAD_SIZE,
                actual: len,
            });
        }

        if self.buffer.len() < HEADER_SIZE + len {
            return Ok(None);
        }

        self.buffer.advance(HEADER_SIZE);
        let payload = self.buffer.split_to(len).freeze();
        let packet_type = PacketType::try_from(code)?;

        Ok(Some(Packet {
            request_id,
            packet_type,
            payload,
        }))
    }

    /// Discard bytes until the buffer starts with a signature.
    fn resync(&mut self) {
        let start = self
            .buffer
            .windows(2)
            .position(|w| w == &SIGNATURE[..])
            .unwrap_or_else(|| {
                // Keep a trailing first signature byte; its pair may still arrive.
                match self.buffer.last() {
                    Some(&b) if b == SIGNATURE[0] => self.buffer.len() - 1,
                    _ => self.buffer.len(),
                }
            });

        if start > 0 {
            tracing::trace!(discarded = start, "skipping bytes before frame signature");
            self.buffer.advance(start);
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_header() {
        let packet = Packet::new(0x0102, PacketType::GetState, Bytes::new());
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded, vec![0xCA, 0xAC, 0x02, 0x01, 0xA0, 0x00, 0x00]);
    }

    #[test]
    fn test_encode_rejects_oversize_payload() {
        let packet = Packet::new(1, PacketType::SysConfigMdnsName, vec![0u8; MAX_PAYLOAD_SIZE + 1]);
        assert!(matches!(
            packet.encode(),
            Err(EncodeError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn test_frame_codec_partial() {
        let mut codec = FrameCodec::new();
        let packet = Packet::new(7, PacketType::Position, vec![1, 2, 3, 4]);
        let encoded = packet.encode().unwrap();

        codec.push(&encoded[..5]);
        assert_eq!(codec.decode().unwrap(), None);

        codec.push(&encoded[5..]);
        assert_eq!(codec.decode().unwrap(), Some(packet));
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_frame_codec_multiple() {
        let mut codec = FrameCodec::new();
        let first = Packet::new(1, PacketType::Open, Bytes::new());
        let second = Packet::push(PacketType::Moving, vec![1]);

        codec.push(&first.encode().unwrap());
        codec.push(&second.encode().unwrap());

        assert_eq!(codec.decode().unwrap(), Some(first));
        let decoded = codec.decode().unwrap().unwrap();
        assert!(decoded.is_push());
        assert_eq!(decoded, second);
        assert_eq!(codec.decode().unwrap(), None);
    }

    #[test]
    fn test_frame_codec_skips_garbage() {
        let mut codec = FrameCodec::new();
        let packet = Packet::new(3, PacketType::Close, Bytes::new());

        codec.push(&[0x00, 0xCA, 0x11, 0xFF]);
        codec.push(&packet.encode().unwrap());
        assert_eq!(codec.decode().unwrap(), Some(packet));
    }

    #[test]
    fn test_frame_codec_keeps_split_signature() {
        let mut codec = FrameCodec::new();
        let packet = Packet::new(9, PacketType::Stop, Bytes::new());
        let encoded = packet.encode().unwrap();

        codec.push(&[0x55, encoded[0]]);
        assert_eq!(codec.decode().unwrap(), None);
        assert_eq!(codec.buffered_len(), 1);

        codec.push(&encoded[1..]);
        assert_eq!(codec.decode().unwrap(), Some(packet));
    }

    #[test]
    fn test_frame_codec_unknown_type_is_dropped() {
        let mut codec = FrameCodec::new();
        codec.push(&[0xCA, 0xAC, 0x01, 0x00, 0x77, 0x01, 0x00, 0xEE]);
        let next = Packet::new(2, PacketType::Homing, Bytes::new());
        codec.push(&next.encode().unwrap());

        assert_eq!(codec.decode(), Err(DecodeError::UnknownPacketType(0x77)));
        assert_eq!(codec.decode().unwrap(), Some(next));
    }

    #[test]
    fn test_frame_codec_oversize_length() {
        let mut codec = FrameCodec::new();
        codec.push(&[0xCA, 0xAC, 0x01, 0x00, 0xA1, 0xFF, 0xFF]);
        assert!(matches!(
            codec.decode(),
            Err(DecodeError::FrameTooLong { actual: 0xFFFF, .. })
        ));
        assert_eq!(codec.decode().unwrap(), None);
    }

    #[test]
    fn test_error_reason() {
        let packet = Packet::new(4, PacketType::Error, &b"busy"[..]);
        assert_eq!(packet.error_reason().as_deref(), Some("busy"));
        assert_eq!(Packet::new(4, PacketType::Open, Bytes::new()).error_reason(), None);
    }
}
