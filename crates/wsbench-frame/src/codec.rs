use bytes::{BufMut, BytesMut};

use crate::channel::{CloseFrame, CloseStatus, FrameKind};
use crate::error::{FrameError, Result};

/// Largest possible header: 2 fixed + 8 extended length + 4 masking key.
pub const MAX_HEADER_SIZE: usize = 14;

/// Control frames (close, ping, pong) carry at most this many payload bytes.
pub const MAX_CONTROL_PAYLOAD: usize = 125;

/// Close reasons share the control payload with the 2-byte status code.
pub const MAX_CLOSE_REASON: usize = MAX_CONTROL_PAYLOAD - 2;

/// Default largest payload emitted per outgoing frame: 16 MiB.
pub const DEFAULT_MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

/// Default largest payload accepted per incoming frame: 64 MiB.
pub const DEFAULT_MAX_INCOMING_FRAME: u64 = 64 * 1024 * 1024;

const FIN_BIT: u8 = 0x80;
const RSV_BITS: u8 = 0x70;
const OPCODE_MASK: u8 = 0x0F;
const MASK_BIT: u8 = 0x80;
const LEN_MASK: u8 = 0x7F;
const LEN_16: u8 = 126;
const LEN_64: u8 = 127;

/// Frame opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Continuation = 0x0,
    Text = 0x1,
    Binary = 0x2,
    Close = 0x8,
    Ping = 0x9,
    Pong = 0xA,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x0 => Ok(Opcode::Continuation),
            0x1 => Ok(Opcode::Text),
            0x2 => Ok(Opcode::Binary),
            0x8 => Ok(Opcode::Close),
            0x9 => Ok(Opcode::Ping),
            0xA => Ok(Opcode::Pong),
            other => Err(FrameError::Protocol(format!("unknown opcode {other:#x}"))),
        }
    }

    pub fn is_control(self) -> bool {
        (self as u8) & 0x8 != 0
    }

    /// Opcode that starts a message of `kind`.
    pub fn for_kind(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Text => Opcode::Text,
            FrameKind::Binary => Opcode::Binary,
            FrameKind::Close => Opcode::Close,
        }
    }
}

/// A decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub fin: bool,
    pub opcode: Opcode,
    pub mask: Option<[u8; 4]>,
    pub payload_len: u64,
}

impl FrameHeader {
    /// An unmasked header.
    pub fn new(fin: bool, opcode: Opcode, payload_len: u64) -> Self {
        Self {
            fin,
            opcode,
            mask: None,
            payload_len,
        }
    }

    /// Bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        let len_bytes = match self.payload_len {
            0..=125 => 0,
            126..=0xFFFF => 2,
            _ => 8,
        };
        2 + len_bytes + if self.mask.is_some() { 4 } else { 0 }
    }
}

/// Total header length implied by the second header byte.
pub fn header_len(second_byte: u8) -> usize {
    let len_bytes = match second_byte & LEN_MASK {
        LEN_16 => 2,
        LEN_64 => 8,
        _ => 0,
    };
    let mask_bytes = if second_byte & MASK_BIT != 0 { 4 } else { 0 };
    2 + len_bytes + mask_bytes
}

/// Wire size of an unmasked single frame carrying `payload_len` bytes.
pub fn encoded_frame_len(payload_len: usize) -> usize {
    FrameHeader::new(true, Opcode::Binary, payload_len as u64).encoded_len() + payload_len
}

/// Encode a frame header.
///
/// Wire format:
/// ```text
/// ┌─────┬─────┬────────┬──────┬─────────┬─────────────────┬──────────────┐
/// │ FIN │ RSV │ Opcode │ MASK │ Len (7) │ Ext len (0/2/8) │ Key (0/4)    │
/// │ 1b  │ 3b  │ 4b     │ 1b   │ 7b      │ big-endian      │              │
/// └─────┴─────┴────────┴──────┴─────────┴─────────────────┴──────────────┘
/// ```
pub fn encode_header(header: &FrameHeader, dst: &mut BytesMut) {
    dst.reserve(header.encoded_len());

    let mut first = header.opcode as u8;
    if header.fin {
        first |= FIN_BIT;
    }
    dst.put_u8(first);

    let mask_bit = if header.mask.is_some() { MASK_BIT } else { 0 };
    match header.payload_len {
        len @ 0..=125 => dst.put_u8(mask_bit | len as u8),
        len @ 126..=0xFFFF => {
            dst.put_u8(mask_bit | LEN_16);
            dst.put_u16(len as u16);
        }
        len => {
            dst.put_u8(mask_bit | LEN_64);
            dst.put_u64(len);
        }
    }

    if let Some(key) = header.mask {
        dst.put_slice(&key);
    }
}

/// Encode a complete unmasked frame.
pub fn encode_frame(fin: bool, opcode: Opcode, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if opcode.is_control() && payload.len() > MAX_CONTROL_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len() as u64,
            max: MAX_CONTROL_PAYLOAD as u64,
        });
    }
    encode_header(&FrameHeader::new(fin, opcode, payload.len() as u64), dst);
    dst.put_slice(payload);
    Ok(())
}

/// Decode a frame header from the start of `src`.
///
/// Returns `Ok(None)` if `src` doesn't hold the whole header yet, otherwise
/// the header and the number of bytes it occupied.
pub fn decode_header(src: &[u8]) -> Result<Option<(FrameHeader, usize)>> {
    if src.len() < 2 {
        return Ok(None);
    }

    let len = header_len(src[1]);
    if src.len() < len {
        return Ok(None);
    }

    if src[0] & RSV_BITS != 0 {
        return Err(FrameError::Protocol("reserved bits set".to_string()));
    }
    let fin = src[0] & FIN_BIT != 0;
    let opcode = Opcode::from_u8(src[0] & OPCODE_MASK)?;

    let mut pos = 2;
    let payload_len = match src[1] & LEN_MASK {
        LEN_16 => {
            let value = u16::from_be_bytes([src[2], src[3]]) as u64;
            pos += 2;
            value
        }
        LEN_64 => {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&src[2..10]);
            let value = u64::from_be_bytes(raw);
            if value >> 63 != 0 {
                return Err(FrameError::Protocol(
                    "64-bit payload length has its most significant bit set".to_string(),
                ));
            }
            pos += 8;
            value
        }
        short => short as u64,
    };

    let mask = if src[1] & MASK_BIT != 0 {
        let mut key = [0u8; 4];
        key.copy_from_slice(&src[pos..pos + 4]);
        Some(key)
    } else {
        None
    };

    if opcode.is_control() {
        if !fin {
            return Err(FrameError::Protocol("fragmented control frame".to_string()));
        }
        if payload_len > MAX_CONTROL_PAYLOAD as u64 {
            return Err(FrameError::Protocol(format!(
                "control frame payload of {payload_len} bytes exceeds {MAX_CONTROL_PAYLOAD}"
            )));
        }
    }

    Ok(Some((
        FrameHeader {
            fin,
            opcode,
            mask,
            payload_len,
        },
        len,
    )))
}

/// XOR `data` with the masking key, where `data` starts `offset` bytes into the payload.
pub fn apply_mask(key: [u8; 4], offset: usize, data: &mut [u8]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[(offset + i) % 4];
    }
}

/// Encode a close payload: 2-byte status followed by the reason, truncated to fit.
pub fn encode_close_payload(status: CloseStatus, reason: &str, dst: &mut BytesMut) {
    let mut end = reason.len().min(MAX_CLOSE_REASON);
    while !reason.is_char_boundary(end) {
        end -= 1;
    }
    dst.reserve(2 + end);
    dst.put_u16(status.code());
    dst.put_slice(&reason.as_bytes()[..end]);
}

/// Decode a close payload.
pub fn decode_close_payload(payload: &[u8]) -> Result<CloseFrame> {
    match payload.len() {
        0 => Ok(CloseFrame {
            status: None,
            reason: String::new(),
        }),
        1 => Err(FrameError::Protocol(
            "close payload shorter than a status code".to_string(),
        )),
        _ => Ok(CloseFrame {
            status: Some(CloseStatus(u16::from_be_bytes([payload[0], payload[1]]))),
            reason: String::from_utf8_lossy(&payload[2..]).into_owned(),
        }),
    }
}

/// Configuration for framed channels.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Largest payload emitted per outgoing frame; larger writes are partial.
    pub max_frame_payload: usize,
    /// Largest payload accepted per incoming frame. Default: 64 MiB.
    pub max_incoming_frame: u64,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_frame_payload: DEFAULT_MAX_FRAME_PAYLOAD,
            max_incoming_frame: DEFAULT_MAX_INCOMING_FRAME,
        }
    }
}
