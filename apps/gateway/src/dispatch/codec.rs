//! Length-prefixed JSON frames for the direct RPC transport.
//!
//! A frame is `<length>#<json>` where `<length>` is the decimal number of
//! UTF-16 code units (not bytes, not chars) in the JSON text. Characters
//! outside the BMP count twice.

use bytes::{Buf, BufMut, BytesMut};
use serde_json::Value;
use tokio_util::codec::{Decoder, Encoder};

/// Longest accepted length prefix, in digits.
const MAX_PREFIX_DIGITS: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed frame: {0}")]
    Malformed(String),
    #[error("invalid json payload: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFrameCodec;

fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl Decoder for JsonFrameCodec {
    type Item = Value;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(hash) = src.iter().position(|b| *b == b'#') else {
            if src.len() > MAX_PREFIX_DIGITS || !src.iter().all(u8::is_ascii_digit) {
                return Err(FrameError::Malformed("missing length prefix".into()));
            }
            return Ok(None);
        };

        let prefix = &src[..hash];
        if prefix.is_empty() || prefix.len() > MAX_PREFIX_DIGITS || !prefix.iter().all(u8::is_ascii_digit) {
            return Err(FrameError::Malformed("invalid length prefix".into()));
        }
        let units: usize = std::str::from_utf8(prefix)
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| FrameError::Malformed("invalid length prefix".into()))?;

        let payload = &src[hash + 1..];
        let mut end = 0usize;
        let mut counted = 0usize;
        while counted < units {
            let Some(&lead) = payload.get(end) else {
                return Ok(None);
            };
            let width = utf8_width(lead)
                .ok_or_else(|| FrameError::Malformed("invalid utf-8 in payload".into()))?;
            if end + width > payload.len() {
                return Ok(None);
            }
            end += width;
            counted += if width == 4 { 2 } else { 1 };
        }
        if counted != units {
            return Err(FrameError::Malformed("length splits a surrogate pair".into()));
        }

        let value = serde_json::from_slice(&payload[..end])?;
        src.advance(hash + 1 + end);
        Ok(Some(value))
    }
}

impl Encoder<Value> for JsonFrameCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Value, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let text = serde_json::to_string(&item)?;
        let prefix = text.encode_utf16().count().to_string();
        dst.reserve(prefix.len() + 1 + text.len());
        dst.put_slice(prefix.as_bytes());
        dst.put_u8(b'#');
        dst.put_slice(text.as_bytes());
        Ok(())
    }
}
