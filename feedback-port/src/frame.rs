use feedback_core::Bundle;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Frames larger than this are rejected before allocating.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// One message as it travels between ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Application id of the sending side.
    pub sender_app_id: Box<str>,
    /// Port name of the sending side.
    pub sender_port: Box<str>,
    /// Whether the sender opened its port as trusted.
    pub trusted: bool,
    pub bundle: Bundle,
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("postcard error: {0}")]
    Postcard(#[from] postcard::Error),
    #[error("frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Write a length-prefixed (u32, big endian) postcard frame and flush.
pub async fn write_frame<W>(writer: &mut W, envelope: &Envelope) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let bytes = postcard::to_stdvec(envelope)?;
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_u32(bytes.len() as u32).await?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;

    Ok(())
}

/// Read one frame. Returns `Ok(None)` on a clean end of stream.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Envelope>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;

    Ok(Some(postcard::from_bytes(&buf)?))
}
