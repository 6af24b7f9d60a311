//! Framed response reader.
//!
//! Reads one frame from a byte stream that may deliver the header and body
//! in arbitrarily small pieces, into a fixed 4 KiB buffer.

use crate::core::{Result, TrapperError};
use crate::protocol::{FrameHeader, HEADER_SIZE};
use flate2::read::ZlibDecoder;
use std::io::Read;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Capacity of the receive buffer, header included.
pub const RECV_BUFFER_SIZE: usize = 4096;

/// Upper bound on what a body that fits the receive buffer can inflate to.
/// Deflate tops out at roughly 1032:1.
const MAX_INFLATED_LEN: usize = RECV_BUFFER_SIZE * 1032;

/// Read one frame and return its (inflated) body.
pub async fn receive<R>(reader: &mut R) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut total = 0;

    while total < HEADER_SIZE {
        let n = reader.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }

    if total < HEADER_SIZE {
        return Err(TrapperError::TruncatedHeader {
            received: total,
            expected: HEADER_SIZE,
        });
    }

    let header = FrameHeader::parse(&buf[..HEADER_SIZE])?;
    let expected = header.body_len();

    let capacity = RECV_BUFFER_SIZE - HEADER_SIZE;
    if expected > capacity {
        return Err(TrapperError::MessageTooLarge {
            size: expected,
            max: capacity,
        });
    }

    let received = total - HEADER_SIZE;
    if received > expected {
        return Err(TrapperError::MessageTooLong {
            declared: expected,
            received,
        });
    }

    while total - HEADER_SIZE < expected {
        let n = reader.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
    }

    let body = &buf[HEADER_SIZE..total];
    if body.len() != expected {
        return Err(TrapperError::TruncatedBody {
            expected,
            actual: body.len(),
        });
    }

    match header.inflated_len() {
        Some(inflated_len) => inflate(body, inflated_len),
        None => Ok(body.to_vec()),
    }
}

/// Inflate a zlib body and check it against the advertised size.
///
/// The advertised size comes from the peer, so it only bounds how much is
/// read, never how much is reserved up front.
pub fn inflate(data: &[u8], expected_len: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(expected_len.min(MAX_INFLATED_LEN));
    ZlibDecoder::new(data)
        .take(expected_len as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| TrapperError::decompress(e.to_string()))?;

    if out.len() != expected_len {
        return Err(TrapperError::DecompressedSizeMismatch {
            expected: expected_len,
            actual: out.len(),
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Metric;
    use crate::core::Timestamp;
    use crate::protocol::{encode_frame, FrameHeader, Packet};
    use proptest::prelude::*;
    use serde_json::Value;
    use tokio::io::AsyncWriteExt;

    const RESPONSE: &[u8] =
        br#"{"response":"success","info":"processed: 2; failed: 0; total: 2; seconds spent: 0.000055"}"#;

    /// Feed `bytes` through a duplex pipe whose buffer holds `chunk` bytes.
    async fn receive_chunked(bytes: Vec<u8>, chunk: usize) -> Result<Vec<u8>> {
        let (mut client, mut server) = tokio::io::duplex(chunk);
        let writer = tokio::spawn(async move {
            for piece in bytes.chunks(chunk) {
                server.write_all(piece).await.unwrap();
            }
        });
        let result = receive(&mut client).await;
        writer.await.unwrap();
        result
    }

    #[tokio::test]
    async fn test_receive_plain() {
        let frame = encode_frame(RESPONSE, false).unwrap();
        let body = receive(&mut &frame[..]).await.unwrap();
        assert_eq!(body, RESPONSE);
    }

    #[tokio::test]
    async fn test_receive_compressed() {
        let frame = encode_frame(RESPONSE, true).unwrap();
        let body = receive(&mut &frame[..]).await.unwrap();
        assert_eq!(body, RESPONSE);
    }

    #[tokio::test]
    async fn test_receive_one_byte_at_a_time() {
        let frame = encode_frame(RESPONSE, false).unwrap();
        let whole = receive(&mut &frame[..]).await.unwrap();
        let chunked = receive_chunked(frame.to_vec(), 1).await.unwrap();
        assert_eq!(chunked, whole);

        let frame = encode_frame(RESPONSE, true).unwrap();
        let chunked = receive_chunked(frame.to_vec(), 1).await.unwrap();
        assert_eq!(chunked, RESPONSE);
    }

    #[tokio::test]
    async fn test_packet_roundtrip_through_decoder() {
        let metrics = vec![
            Metric::new("db01", "pg.connections", "17", Timestamp::Unix(100)),
            Metric::new("db01", "pg.locks", "3", Timestamp::Unix(101)),
        ];
        for compress in [false, true] {
            let packet = Packet::new(compress, metrics.clone(), 200).unwrap();
            let body = receive_chunked(packet.as_bytes().to_vec(), 3).await.unwrap();
            let parsed: Value = serde_json::from_slice(&body).unwrap();
            assert_eq!(parsed["request"], "sender data");
            assert_eq!(parsed["clock"], 200);
            assert_eq!(parsed["data"], serde_json::to_value(&metrics).unwrap());
        }
    }

    #[tokio::test]
    async fn test_rejects_bad_magic_regardless_of_body() {
        let mut frame = encode_frame(RESPONSE, false).unwrap().to_vec();
        frame[..4].copy_from_slice(b"HTTP");
        assert!(matches!(
            receive(&mut &frame[..]).await,
            Err(TrapperError::UnsupportedProtocol)
        ));
    }

    #[tokio::test]
    async fn test_rejects_missing_protocol_bit() {
        let mut frame = encode_frame(RESPONSE, false).unwrap().to_vec();
        frame[4] = 0x00;
        assert!(matches!(
            receive(&mut &frame[..]).await,
            Err(TrapperError::UnsupportedProtocolVersion)
        ));
    }

    #[tokio::test]
    async fn test_truncated_header() {
        let frame = encode_frame(RESPONSE, false).unwrap();
        let result = receive_chunked(frame[..8].to_vec(), 2).await;
        assert!(matches!(
            result,
            Err(TrapperError::TruncatedHeader { received: 8, .. })
        ));
    }

    #[tokio::test]
    async fn test_truncated_body() {
        let frame = encode_frame(RESPONSE, false).unwrap();
        let short = frame[..frame.len() - 5].to_vec();
        let result = receive_chunked(short, 4).await;
        assert!(matches!(
            result,
            Err(TrapperError::TruncatedBody { expected, actual }) if expected == RESPONSE.len() && actual == RESPONSE.len() - 5
        ));
    }

    #[tokio::test]
    async fn test_message_too_large() {
        let header = FrameHeader::plain(RECV_BUFFER_SIZE as u32);
        let bytes = header.to_bytes();
        assert!(matches!(
            receive(&mut &bytes[..]).await,
            Err(TrapperError::MessageTooLarge { max, .. }) if max == RECV_BUFFER_SIZE - HEADER_SIZE
        ));
    }

    #[tokio::test]
    async fn test_message_too_long() {
        let mut frame = FrameHeader::plain(2).to_bytes().to_vec();
        frame.extend_from_slice(b"abcdef");
        assert!(matches!(
            receive(&mut &frame[..]).await,
            Err(TrapperError::MessageTooLong { declared: 2, received: 6 })
        ));
    }

    #[tokio::test]
    async fn test_malformed_zlib_body() {
        let body = b"definitely not zlib";
        let mut frame = FrameHeader::compressed(body.len() as u32, 64).to_bytes().to_vec();
        frame.extend_from_slice(body);
        assert!(matches!(
            receive(&mut &frame[..]).await,
            Err(TrapperError::Decompress(_))
        ));
    }

    #[tokio::test]
    async fn test_decompressed_size_mismatch() {
        let good = encode_frame(RESPONSE, true).unwrap();
        let mut header = FrameHeader::parse(&good).unwrap();
        header.length_b += 1;

        let mut frame = header.to_bytes().to_vec();
        frame.extend_from_slice(&good[HEADER_SIZE..]);
        assert!(matches!(
            receive(&mut &frame[..]).await,
            Err(TrapperError::DecompressedSizeMismatch { actual, .. }) if actual == RESPONSE.len()
        ));
    }

    #[test]
    fn test_inflate_with_huge_advertised_size() {
        let frame = encode_frame(RESPONSE, true).unwrap();
        let result = inflate(&frame[HEADER_SIZE..], u32::MAX as usize);
        assert!(matches!(
            result,
            Err(TrapperError::DecompressedSizeMismatch { expected, actual })
                if expected == u32::MAX as usize && actual == RESPONSE.len()
        ));
    }

    #[test]
    fn test_inflate_stops_past_advertised_size() {
        let payload = vec![b'x'; 100_000];
        let frame = encode_frame(&payload, true).unwrap();
        assert!(matches!(
            inflate(&frame[HEADER_SIZE..], 10),
            Err(TrapperError::DecompressedSizeMismatch { expected: 10, actual: 11 })
        ));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_chunked_reads_match_single_read(
            payload in prop::collection::vec(any::<u8>(), 0..3000),
            compress in any::<bool>(),
            chunk in 1..64usize
        ) {
            let frame = encode_frame(&payload, compress).unwrap();
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();

            let whole = runtime.block_on(async { receive(&mut &frame[..]).await }).unwrap();
            let chunked = runtime.block_on(receive_chunked(frame.to_vec(), chunk)).unwrap();

            prop_assert_eq!(&whole, &payload);
            prop_assert_eq!(chunked, whole);
        }
    }
}
