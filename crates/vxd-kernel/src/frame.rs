//! The wire frame: a fixed-size binary header plus a JSON payload.
//!
//! `(id: u32, flags: u16, reserved: u16, len: u32)`, little-endian, followed
//! by exactly `len` payload bytes. This module only knows about bytes; JSON
//! parsing and protocol classification happen above it.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use vxd_core::DaemonError;

/// Size of the binary header in bytes: `u32 + u16 + u16 + u32`.
pub const HEADER_LEN: usize = 12;

/// Correlation id, flags, and length fields that precede every payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Correlation id, echoed back on the response frame.
    pub id: u32,
    /// Reserved for future use; round-tripped but otherwise unexamined.
    pub flags: u16,
    /// Reserved padding field.
    pub reserved: u16,
    /// Number of payload bytes following the header.
    pub len: u32,
}

impl FrameHeader {
    /// Encode to the 12-byte little-endian wire representation.
    #[must_use]
    pub fn to_bytes(self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&self.id.to_le_bytes());
        buf[4..6].copy_from_slice(&self.flags.to_le_bytes());
        buf[6..8].copy_from_slice(&self.reserved.to_le_bytes());
        buf[8..12].copy_from_slice(&self.len.to_le_bytes());
        buf
    }

    /// Decode from a 12-byte little-endian buffer.
    #[must_use]
    pub fn from_bytes(buf: [u8; HEADER_LEN]) -> Self {
        Self {
            id: u32::from_le_bytes(buf[0..4].try_into().expect("4-byte slice")),
            flags: u16::from_le_bytes(buf[4..6].try_into().expect("2-byte slice")),
            reserved: u16::from_le_bytes(buf[6..8].try_into().expect("2-byte slice")),
            len: u32::from_le_bytes(buf[8..12].try_into().expect("4-byte slice")),
        }
    }
}

/// A complete frame: header plus its JSON payload bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The frame's header.
    pub header: FrameHeader,
    /// Raw JSON payload bytes, exactly `header.len` long.
    pub payload: Vec<u8>,
}

impl Frame {
    /// Build a frame, computing `len` from the payload.
    #[must_use]
    pub fn new(id: u32, payload: Vec<u8>) -> Self {
        let len = u32::try_from(payload.len()).unwrap_or(u32::MAX);
        Self {
            header: FrameHeader {
                id,
                flags: 0,
                reserved: 0,
                len,
            },
            payload,
        }
    }
}

/// Read one frame from `reader`. Returns `Ok(None)` on a clean EOF that
/// lands exactly on a header boundary (no partial header bytes consumed);
/// any other I/O failure, including EOF mid-header or mid-payload, is an
/// error.
///
/// # Errors
///
/// Returns [`DaemonError::Framing`] if the declared payload length exceeds
/// `max_payload_bytes`, or [`DaemonError::Io`] if the underlying read fails.
pub async fn read_frame<R>(reader: &mut R, max_payload_bytes: u32) -> Result<Option<Frame>, DaemonError>
where
    R: AsyncRead + Unpin,
{
    let mut header_buf = [0u8; HEADER_LEN];
    match reader.read_exact(&mut header_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(DaemonError::Io(e.to_string())),
    }
    let header = FrameHeader::from_bytes(header_buf);
    if header.len > max_payload_bytes {
        return Err(DaemonError::Framing(format!(
            "payload length {} exceeds max {max_payload_bytes}",
            header.len
        )));
    }
    let mut payload = vec![0u8; header.len as usize];
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|e| DaemonError::Io(e.to_string()))?;
    Ok(Some(Frame { header, payload }))
}

/// Write one frame to `writer` as a single buffered call so the header and
/// payload never interleave with another writer's bytes on the same
/// connection (callers still need their own per-connection write lock when
/// multiple tasks can write to the same socket).
///
/// # Errors
///
/// Returns [`DaemonError::WriteInterrupt`] if the write is interrupted by a
/// broken pipe, [`DaemonError::Io`] for any other I/O failure.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), DaemonError>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::with_capacity(HEADER_LEN + frame.payload.len());
    buf.extend_from_slice(&frame.header.to_bytes());
    buf.extend_from_slice(&frame.payload);
    writer.write_all(&buf).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            DaemonError::WriteInterrupt
        } else {
            DaemonError::Io(e.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trips_through_bytes() {
        let header = FrameHeader {
            id: 42,
            flags: 7,
            reserved: 0,
            len: 1024,
        };
        assert_eq!(FrameHeader::from_bytes(header.to_bytes()), header);
    }

    #[test]
    fn header_is_little_endian() {
        let header = FrameHeader {
            id: 1,
            flags: 0,
            reserved: 0,
            len: 0,
        };
        assert_eq!(&header.to_bytes()[0..4], &[1, 0, 0, 0]);
    }

    #[tokio::test]
    async fn read_frame_round_trips_a_written_frame() {
        let frame = Frame::new(9, br#"{"jsonrpc":"2.0"}"#.to_vec());
        let mut buf = Vec::new();
        write_frame(&mut buf, &frame).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let read_back = read_frame(&mut cursor, 16 * 1024 * 1024)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(read_back.header.id, 9);
        assert_eq!(read_back.payload, frame.payload);
    }

    #[tokio::test]
    async fn read_frame_returns_none_on_clean_eof() {
        let mut cursor = std::io::Cursor::new(Vec::new());
        let result = read_frame(&mut cursor, 1024).await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn read_frame_rejects_oversized_payload() {
        let header = FrameHeader {
            id: 1,
            flags: 0,
            reserved: 0,
            len: 100,
        };
        let mut cursor = std::io::Cursor::new(header.to_bytes().to_vec());
        let err = read_frame(&mut cursor, 10).await.unwrap_err();
        assert!(matches!(err, DaemonError::Framing(_)));
    }

    #[tokio::test]
    async fn read_frame_errors_on_truncated_header() {
        let mut cursor = std::io::Cursor::new(vec![1, 2, 3]);
        let err = read_frame(&mut cursor, 1024).await.unwrap_err();
        assert!(matches!(err, DaemonError::Io(_)));
    }
}
