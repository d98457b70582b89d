//! Newline-delimited JSON framing.
//!
//! A record is a length-unbounded UTF-8 JSON document terminated by `\n`.
//! Receivers buffer raw bytes and split on `\n`, preserving the trailing
//! partial chunk across reads.

use crate::ProtocolError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Serialize a value as one frame (JSON + trailing newline).
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut bytes = serde_json::to_vec(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse one complete line into a value.
pub fn decode<T: DeserializeOwned>(line: &str) -> Result<T, ProtocolError> {
    Ok(serde_json::from_str(line)?)
}

/// Reassembles frames from arbitrary byte chunks.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buf: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and drain every complete line it finishes.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        while let Some(pos) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).take(pos).collect();
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// The unterminated tail, if any.
    pub fn pending(&self) -> &[u8] {
        &self.buf
    }
}

/// Async reader yielding one decoded frame at a time.
pub struct FrameReader<R> {
    reader: R,
    buffer: FrameBuffer,
    ready: VecDeque<String>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, buffer: FrameBuffer::new(), ready: VecDeque::new() }
    }

    /// Next frame, or `None` on clean EOF.
    pub async fn next<T: DeserializeOwned>(&mut self) -> Result<Option<T>, ProtocolError> {
        loop {
            if let Some(line) = self.ready.pop_front() {
                if line.trim().is_empty() {
                    continue;
                }
                return decode(&line).map(Some);
            }
            let mut chunk = [0u8; 4096];
            let n = self.reader.read(&mut chunk).await?;
            if n == 0 {
                return if self.buffer.pending().is_empty() {
                    Ok(None)
                } else {
                    Err(ProtocolError::ConnectionClosed)
                };
            }
            self.ready.extend(self.buffer.push(&chunk[..n]));
        }
    }
}

/// Write one frame to an async sink.
pub async fn write_frame<W, T>(writer: &mut W, value: &T) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let bytes = encode(value)?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
