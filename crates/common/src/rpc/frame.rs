use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CryptoError;

/// Largest frame either side will accept (1MB)
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Read one length-prefixed (u32 BE) frame.
/// Returns Ok(None) on clean EOF.
pub async fn read_frame<R>(recv: &mut R) -> Result<Option<Vec<u8>>, CryptoError>
where
    R: AsyncRead + Unpin,
{
    let mut len_buf = [0u8; 4];
    match recv.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(CryptoError::transport(format!(
            "frame of {} bytes exceeds limit",
            len
        )));
    }
    let mut data = vec![0u8; len];
    recv.read_exact(&mut data).await?;
    Ok(Some(data))
}

pub async fn write_frame<W>(send: &mut W, data: &[u8]) -> Result<(), CryptoError>
where
    W: AsyncWrite + Unpin,
{
    if data.len() > MAX_FRAME_SIZE {
        return Err(CryptoError::transport(format!(
            "frame of {} bytes exceeds limit",
            data.len()
        )));
    }
    let len = data.len() as u32;
    send.write_all(&len.to_be_bytes()).await?;
    send.write_all(data).await?;
    send.flush().await?;
    Ok(())
}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CryptoError> {
    Ok(bincode::serialize(value)?)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CryptoError> {
    Ok(bincode::deserialize(bytes)?)
}
