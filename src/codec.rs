//! Wire primitives for the Minecraft Java Edition framed protocol: VarInt,
//! length-prefixed UTF-8 strings, big-endian unsigned shorts, and the
//! length-prefixed packet frame built from them.
//!
//! The codec is stateless; it has no notion of handshake/status/login phase.
//! That belongs to the connection handler.

use crate::error::{ProxyError, ProxyResult};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// A VarInt never takes more than 5 bytes to encode an i32.
pub const VARINT_MAX_SIZE: usize = 5;

/// A decoded packet frame: `packet_id` plus the remaining payload bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub id: i32,
    pub payload: Vec<u8>,
}

/// Writes a VarInt (Minecraft format: little-endian 7-bit groups, high bit as
/// continuation) to `buf`.
pub fn write_varint(mut val: i32, buf: &mut Vec<u8>) {
    loop {
        if (val & !0x7F) == 0 {
            buf.push(val as u8);
            return;
        }
        buf.push(((val & 0x7F) | 0x80) as u8);
        val = ((val as u32) >> 7) as i32;
    }
}

/// Reads a VarInt from the head of `buf`, returning the value and the number
/// of bytes it occupied. `MalformedFrame` if the continuation bit is still
/// set on the fifth byte, or if `buf` runs out mid-sequence.
pub fn read_varint_slice(buf: &[u8]) -> ProxyResult<(i32, usize)> {
    let mut result: i32 = 0;
    for num_read in 0..VARINT_MAX_SIZE {
        let byte = *buf.get(num_read).ok_or(ProxyError::MalformedFrame)?;
        result |= ((byte & 0x7F) as i32) << (7 * num_read);
        if byte & 0x80 == 0 {
            return Ok((result, num_read + 1));
        }
    }
    Err(ProxyError::MalformedFrame)
}

/// Reads a VarInt directly off an async transport, one byte at a time.
///
/// EOF on the very first byte means the peer simply closed without sending
/// anything (`PeerClosed`); EOF after that, or a still-set continuation bit on
/// the fifth byte, means the stream is corrupt mid-sequence (`MalformedFrame`).
pub async fn read_varint_async<R: AsyncRead + Unpin>(r: &mut R) -> ProxyResult<i32> {
    let mut result: i32 = 0;
    for num_read in 0..VARINT_MAX_SIZE {
        let mut byte = [0u8; 1];
        let n = r.read(&mut byte).await?;
        if n == 0 {
            return Err(if num_read == 0 {
                ProxyError::PeerClosed
            } else {
                ProxyError::MalformedFrame
            });
        }
        let byte = byte[0];
        result |= ((byte & 0x7F) as i32) << (7 * num_read);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(ProxyError::MalformedFrame)
}

/// Writes a length-prefixed UTF-8 string.
pub fn write_string(s: &str, buf: &mut Vec<u8>) {
    write_varint(s.len() as i32, buf);
    buf.extend_from_slice(s.as_bytes());
}

/// Reads a length-prefixed UTF-8 string from the head of `buf`, returning the
/// string and the number of bytes consumed.
pub fn read_string_slice(buf: &[u8]) -> ProxyResult<(String, usize)> {
    let (len, off) = read_varint_slice(buf)?;
    if len < 0 {
        return Err(ProxyError::MalformedFrame);
    }
    let len = len as usize;
    let bytes = buf
        .get(off..off + len)
        .ok_or(ProxyError::MalformedFrame)?;
    let s = std::str::from_utf8(bytes)
        .map_err(|_| ProxyError::MalformedFrame)?
        .to_owned();
    Ok((s, off + len))
}

/// Writes a big-endian unsigned short.
pub fn write_u16(v: u16, buf: &mut Vec<u8>) {
    buf.extend_from_slice(&v.to_be_bytes());
}

/// Reads a big-endian unsigned short from the head of `buf`.
pub fn read_u16_slice(buf: &[u8]) -> ProxyResult<(u16, usize)> {
    let bytes: [u8; 2] = buf
        .get(0..2)
        .ok_or(ProxyError::MalformedFrame)?
        .try_into()
        .map_err(|_| ProxyError::MalformedFrame)?;
    Ok((u16::from_be_bytes(bytes), 2))
}

/// Reads one full frame: `length` VarInt, then exactly `length` bytes, split
/// into `packet_id` and the remaining payload. Retries partial reads until
/// `length` bytes have accumulated or the peer closes.
pub async fn read_frame<R: AsyncRead + Unpin>(r: &mut R) -> ProxyResult<Frame> {
    let length = read_varint_async(r).await?;
    if length < 0 {
        return Err(ProxyError::MalformedFrame);
    }
    let length = length as usize;

    let mut data = vec![0u8; length];
    let mut filled = 0;
    while filled < length {
        let n = r.read(&mut data[filled..]).await?;
        if n == 0 {
            return Err(ProxyError::PeerClosed);
        }
        filled += n;
    }

    let (id, off) = read_varint_slice(&data)?;
    Ok(Frame {
        id,
        payload: data[off..].to_vec(),
    })
}

/// Writes `packet_id` and `payload` as one length-prefixed frame in a single
/// write call.
pub async fn write_frame<W: AsyncWrite + Unpin>(
    w: &mut W,
    packet_id: i32,
    payload: &[u8],
) -> ProxyResult<()> {
    let mut data = Vec::with_capacity(payload.len() + VARINT_MAX_SIZE);
    write_varint(packet_id, &mut data);
    data.extend_from_slice(payload);

    let mut packet = Vec::with_capacity(data.len() + VARINT_MAX_SIZE);
    write_varint(data.len() as i32, &mut packet);
    packet.extend_from_slice(&data);

    w.write_all(&packet).await?;
    Ok(())
}
