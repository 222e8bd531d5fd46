// SPDX-License-Identifier: MIT
// Copyright (c) 2026 HQ+Worker Contributors

//! Length-prefixed JSON framing (spec.md §4.1).
//!
//! Wire format: a 4-byte big-endian length prefix followed by a UTF-8 JSON
//! object. The codec rejects frames whose declared length exceeds
//! [`DEFAULT_MAX_FRAME_LEN`] before attempting to allocate a read buffer.

use crate::message::Message;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Default frame size cap: 64 MiB (spec.md §4.1).
pub const DEFAULT_MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Errors the codec or connection layer can surface.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("frame of {len} bytes exceeds cap of {max} bytes")]
    FrameTooLarge { len: u32, max: u32 },

    #[error("connection closed")]
    Closed,

    #[error("malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Serialize a message to its raw JSON form, with no length prefix.
pub fn encode(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}

/// Parse a raw JSON frame body into a message.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Write `payload` prefixed with its big-endian u32 length.
pub async fn write_message<W: AsyncWrite + Unpin>(
    writer: &mut W,
    payload: &[u8],
) -> Result<(), ProtocolError> {
    let len = u32::try_from(payload.len())
        .map_err(|_| ProtocolError::FrameTooLarge { len: u32::MAX, max: DEFAULT_MAX_FRAME_LEN })?;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(payload).await?;
    writer.flush().await?;
    Ok(())
}

/// Read one length-prefixed frame, enforcing `max_frame_len`.
///
/// Returns [`ProtocolError::Closed`] if the stream reaches EOF before a
/// length prefix can be read, which the Worker Runner and Worker Manager
/// both treat as "the peer is gone" rather than a malformed frame.
pub async fn read_message_capped<R: AsyncRead + Unpin>(
    reader: &mut R,
    max_frame_len: u32,
) -> Result<Vec<u8>, ProtocolError> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Err(ProtocolError::Closed),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf);
    if len > max_frame_len {
        return Err(ProtocolError::FrameTooLarge { len, max: max_frame_len });
    }

    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read one length-prefixed frame using [`DEFAULT_MAX_FRAME_LEN`].
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    read_message_capped(reader, DEFAULT_MAX_FRAME_LEN).await
}

#[cfg(test)]
#[path = "codec_tests.rs"]
mod tests;
