//! Two-byte big-endian length prefix framing shared by TCP DNS (RFC 7766)
//! and DNS-over-TLS (RFC 7858).

use dot_proxy_domain::DomainError;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const MAX_FRAMED_MESSAGE_SIZE: usize = u16::MAX as usize;

/// Writes prefix and message as a single buffer so they leave in one send.
pub async fn write_framed<S>(stream: &mut S, message: &[u8]) -> Result<(), DomainError>
where
    S: AsyncWrite + Unpin,
{
    let length = u16::try_from(message.len()).map_err(|_| {
        DomainError::Codec(format!(
            "Message too large to frame: {} bytes (max {})",
            message.len(),
            MAX_FRAMED_MESSAGE_SIZE
        ))
    })?;

    let mut frame = Vec::with_capacity(2 + message.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(message);

    stream
        .write_all(&frame)
        .await
        .map_err(|e| DomainError::Io(format!("Failed to write DNS message: {}", e)))?;
    stream
        .flush()
        .await
        .map_err(|e| DomainError::Io(format!("Failed to flush stream: {}", e)))?;

    Ok(())
}

/// Reads one framed message. Short reads are retried until the advertised
/// length has arrived; EOF before that is an error.
pub async fn read_framed<S>(stream: &mut S) -> Result<Vec<u8>, DomainError>
where
    S: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 2];
    stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| DomainError::Io(format!("Failed to read length prefix: {}", e)))?;

    let length = u16::from_be_bytes(len_buf) as usize;

    let mut message = vec![0u8; length];
    stream
        .read_exact(&mut message)
        .await
        .map_err(|e| DomainError::Io(format!("Failed to read {}-byte message body: {}", length, e)))?;

    Ok(message)
}
