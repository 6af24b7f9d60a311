//! ZBXD wire protocol.
//!
//! Every frame is a fixed 13-byte little-endian header followed by a JSON
//! body that may be zlib-compressed:
//!
//! ```text
//! +--------+-------+-----------+-----------+------------------+
//! | "ZBXD" | flags | length A  | length B  | body             |
//! | 4      | 1     | u32 LE    | u32 LE    | length A bytes   |
//! +--------+-------+-----------+-----------+------------------+
//! ```
//!
//! The meaning of the two length fields depends on the compression flag:
//! uncompressed frames repeat the body size in both, compressed frames carry
//! the wire size in A and the inflated size in B.

pub mod decoder;
pub mod packet;

use crate::core::{Result, TrapperError};
use bytes::{BufMut, Bytes, BytesMut};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

pub use decoder::receive;
pub use packet::Packet;

/// Protocol magic.
pub const MAGIC: [u8; 4] = *b"ZBXD";

/// Size of the frame header in bytes.
pub const HEADER_SIZE: usize = 4 + 1 + 4 + 4;

/// Protocol marker, always set.
pub const FLAG_PROTOCOL: u8 = 0x01;

/// Body is a zlib stream.
pub const FLAG_COMPRESSED: u8 = 0x02;

/// Parsed frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub flags: u8,
    pub length_a: u32,
    pub length_b: u32,
}

impl FrameHeader {
    /// Header for an uncompressed body: both lengths carry the body size.
    pub fn plain(body_len: u32) -> Self {
        Self {
            flags: FLAG_PROTOCOL,
            length_a: body_len,
            length_b: body_len,
        }
    }

    /// Header for a compressed body: wire size first, inflated size second.
    pub fn compressed(wire_len: u32, inflated_len: u32) -> Self {
        Self {
            flags: FLAG_PROTOCOL | FLAG_COMPRESSED,
            length_a: wire_len,
            length_b: inflated_len,
        }
    }

    /// Parse and validate the first [`HEADER_SIZE`] bytes of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(TrapperError::TruncatedHeader {
                received: data.len(),
                expected: HEADER_SIZE,
            });
        }
        if data[..4] != MAGIC {
            return Err(TrapperError::UnsupportedProtocol);
        }

        let flags = data[4];
        if flags & FLAG_PROTOCOL == 0 {
            return Err(TrapperError::UnsupportedProtocolVersion);
        }

        Ok(Self {
            flags,
            length_a: u32::from_le_bytes([data[5], data[6], data[7], data[8]]),
            length_b: u32::from_le_bytes([data[9], data[10], data[11], data[12]]),
        })
    }

    /// Serialize into the 13-byte wire form.
    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..4].copy_from_slice(&MAGIC);
        buf[4] = self.flags;
        buf[5..9].copy_from_slice(&self.length_a.to_le_bytes());
        buf[9..13].copy_from_slice(&self.length_b.to_le_bytes());
        buf
    }

    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }

    /// Number of body bytes that follow the header on the wire.
    pub fn body_len(&self) -> usize {
        self.length_a as usize
    }

    /// Size of the body once inflated; only meaningful for compressed frames.
    pub fn inflated_len(&self) -> Option<usize> {
        self.is_compressed().then_some(self.length_b as usize)
    }
}

fn wire_len(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| TrapperError::MessageTooLarge {
        size: len,
        max: u32::MAX as usize,
    })
}

/// Build a complete frame around `payload`.
///
/// With compression the payload is deflated into a scratch buffer first, so
/// both length fields are known before the header is written.
pub fn encode_frame(payload: &[u8], compress: bool) -> Result<Bytes> {
    let mut frame = BytesMut::new();
    write_frame(&mut frame, payload, compress)?;
    Ok(frame.freeze())
}

pub(crate) fn write_frame(buf: &mut BytesMut, payload: &[u8], compress: bool) -> Result<()> {
    let inflated_len = wire_len(payload.len())?;

    if compress {
        let mut encoder = ZlibEncoder::new(Vec::with_capacity(payload.len() / 2), Compression::default());
        encoder.write_all(payload)?;
        let body = encoder.finish()?;

        let header = FrameHeader::compressed(wire_len(body.len())?, inflated_len);
        buf.reserve(HEADER_SIZE + body.len());
        buf.put_slice(&header.to_bytes());
        buf.put_slice(&body);
    } else {
        let header = FrameHeader::plain(inflated_len);
        buf.reserve(HEADER_SIZE + payload.len());
        buf.put_slice(&header.to_bytes());
        buf.put_slice(payload);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout() {
        let header = FrameHeader::plain(0x0102_0304);
        let bytes = header.to_bytes();
        assert_eq!(&bytes[..4], b"ZBXD");
        assert_eq!(bytes[4], 0x01);
        assert_eq!(&bytes[5..9], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(&bytes[9..13], &[0x04, 0x03, 0x02, 0x01]);
        assert_eq!(FrameHeader::parse(&bytes).unwrap(), header);
    }

    #[test]
    fn test_compressed_header_lengths() {
        let header = FrameHeader::compressed(10, 200);
        let parsed = FrameHeader::parse(&header.to_bytes()).unwrap();
        assert!(parsed.is_compressed());
        assert_eq!(parsed.flags, 0x03);
        assert_eq!(parsed.body_len(), 10);
        assert_eq!(parsed.inflated_len(), Some(200));
    }

    #[test]
    fn test_plain_header_ignores_length_b() {
        let mut bytes = FrameHeader::plain(5).to_bytes();
        bytes[9..13].copy_from_slice(&999u32.to_le_bytes());
        let parsed = FrameHeader::parse(&bytes).unwrap();
        assert_eq!(parsed.body_len(), 5);
        assert_eq!(parsed.inflated_len(), None);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut bytes = FrameHeader::plain(0).to_bytes();
        bytes[..4].copy_from_slice(b"ZBXE");
        assert!(matches!(
            FrameHeader::parse(&bytes),
            Err(TrapperError::UnsupportedProtocol)
        ));
    }

    #[test]
    fn test_rejects_missing_protocol_bit() {
        let mut bytes = FrameHeader::plain(0).to_bytes();
        bytes[4] = FLAG_COMPRESSED;
        assert!(matches!(
            FrameHeader::parse(&bytes),
            Err(TrapperError::UnsupportedProtocolVersion)
        ));
    }

    #[test]
    fn test_short_header() {
        assert!(matches!(
            FrameHeader::parse(b"ZBXD\x01"),
            Err(TrapperError::TruncatedHeader { received: 5, .. })
        ));
    }

    #[test]
    fn test_encode_frame_plain() {
        let frame = encode_frame(br#"{"a":1}"#, false).unwrap();
        assert_eq!(frame.len(), HEADER_SIZE + 7);
        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.length_a, 7);
        assert_eq!(header.length_b, 7);
        assert_eq!(&frame[HEADER_SIZE..], br#"{"a":1}"#);
    }

    #[test]
    fn test_encode_frame_compressed_lengths() {
        let payload = br#"{"response":"success","info":"processed: 1; failed: 0"}"#.repeat(4);
        let frame = encode_frame(&payload, true).unwrap();
        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.body_len(), frame.len() - HEADER_SIZE);
        assert_eq!(header.inflated_len(), Some(payload.len()));
    }
}
