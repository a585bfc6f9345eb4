use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::WireError;

/// Sentinel appended to every JSON payload. The remote protocol is
/// delimiter-framed: payload bytes must not contain the sentinel.
pub const FRAME_POSTFIX: &[u8] = b"<EOF>";

/// Maximum payload size accepted by framing helpers.
pub const MAX_FRAME_SIZE: usize = 8 * 1024 * 1024;

const READ_CHUNK: usize = 4096;

/// Writes one sentinel-terminated frame to the async writer.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), WireError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(WireError::FrameTooLarge {
            size: payload.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(payload).await?;
    writer.write_all(FRAME_POSTFIX).await?;
    writer.flush().await?;
    Ok(())
}

/// Buffered reader for sentinel-terminated frames. Bytes read past a
/// sentinel are retained for the next frame.
pub struct FrameReader<R> {
    reader: R,
    buffer: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
        }
    }

    /// Reads one frame, stripping the sentinel.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, WireError> {
        loop {
            if let Some(idx) = find_postfix(&self.buffer) {
                let mut frame: Vec<u8> = self
                    .buffer
                    .drain(..idx + FRAME_POSTFIX.len())
                    .collect();
                frame.truncate(idx);
                return Ok(frame);
            }

            if self.buffer.len() > MAX_FRAME_SIZE {
                return Err(WireError::FrameTooLarge {
                    size: self.buffer.len(),
                    max: MAX_FRAME_SIZE,
                });
            }

            let mut chunk = [0_u8; READ_CHUNK];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return Err(WireError::Disconnected);
            }
            self.buffer.extend_from_slice(&chunk[..n]);
        }
    }
}

fn find_postfix(buffer: &[u8]) -> Option<usize> {
    if buffer.len() < FRAME_POSTFIX.len() {
        return None;
    }
    buffer
        .windows(FRAME_POSTFIX.len())
        .position(|window| window == FRAME_POSTFIX)
}
