// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message framing over a byte stream.
//!
//! ```text
//! +-------+--------+-----------+---------+--------+--------+------+
//! | magic | length | messageId | service | object | action | kind |
//! +-------+--------+-----------+---------+--------+--------+------+
//! | u32   | u32    | u32       | u32     | u32    | u32    | u32  |
//! +-------+--------+-----------+---------+--------+--------+------+
//! | body: u32 sigLen | signature bytes | payload                  |
//! +----------------------------------------------------------------+
//! ```
//!
//! All fields little-endian. `length` counts the body (signature block plus
//! payload). The codec accumulates stream bytes and yields complete
//! messages; bad magic, unknown kinds and oversized frames are protocol
//! errors that the session layer answers by closing the socket.

use crate::error::{Error, Result};

/// Frame magic, also versions the wire format.
pub const MAGIC: u32 = 0x72656D6F;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 28;

/// Default maximum body size (16 MB), anti-OOM bound.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MessageKind {
    /// Method invocation, expects a Reply or Error with the same id
    Call = 1,
    /// Successful completion of a Call
    Reply = 2,
    /// Typed failure of a Call
    Error = 3,
    /// Fire-and-forget invocation
    Post = 4,
    /// Signal emission toward subscribers
    Event = 5,
    /// Capability map exchange at session establishment
    Capability = 6,
    /// Cooperative cancellation of an in-flight Call
    Cancel = 7,
}

impl MessageKind {
    /// Decode the wire representation; unknown values are a protocol error.
    pub fn from_u32(value: u32) -> Result<Self> {
        match value {
            1 => Ok(Self::Call),
            2 => Ok(Self::Reply),
            3 => Ok(Self::Error),
            4 => Ok(Self::Post),
            5 => Ok(Self::Event),
            6 => Ok(Self::Capability),
            7 => Ok(Self::Cancel),
            other => Err(Error::Protocol(format!("unknown message kind {}", other))),
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// One framed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Per-socket monotonic correlation id
    pub id: u32,
    /// Target service
    pub service: u32,
    /// Target object within the service
    pub object: u32,
    /// Target member id (method or signal)
    pub action: u32,
    /// Message kind
    pub kind: MessageKind,
    /// Payload type signature
    pub signature: String,
    /// Payload bytes, encoded per the signature
    pub payload: Vec<u8>,
}

impl Message {
    /// Serialize into a framed byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let body_len = 4 + self.signature.len() + self.payload.len();
        let mut out = Vec::with_capacity(HEADER_SIZE + body_len);
        out.extend_from_slice(&MAGIC.to_le_bytes());
        out.extend_from_slice(&(body_len as u32).to_le_bytes());
        out.extend_from_slice(&self.id.to_le_bytes());
        out.extend_from_slice(&self.service.to_le_bytes());
        out.extend_from_slice(&self.object.to_le_bytes());
        out.extend_from_slice(&self.action.to_le_bytes());
        out.extend_from_slice(&self.kind.as_u32().to_le_bytes());
        out.extend_from_slice(&(self.signature.len() as u32).to_le_bytes());
        out.extend_from_slice(self.signature.as_bytes());
        out.extend_from_slice(&self.payload);
        out
    }
}

/// Incremental decoder over accumulated stream bytes.
///
/// Feed raw reads with [`feed`](MessageCodec::feed), then drain complete
/// messages with [`next_message`](MessageCodec::next_message) until it
/// returns `Ok(None)`.
#[derive(Debug)]
pub struct MessageCodec {
    accumulator: Vec<u8>,
    pos: usize,
    max_size: usize,
}

impl Default for MessageCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_MESSAGE_SIZE)
    }
}

impl MessageCodec {
    /// Codec with an explicit body size bound.
    pub fn new(max_size: usize) -> Self {
        Self {
            accumulator: Vec::with_capacity(16384),
            pos: 0,
            max_size,
        }
    }

    /// Append freshly-read stream bytes.
    pub fn feed(&mut self, data: &[u8]) {
        // Compact once the consumed prefix dominates.
        if self.pos > 0 && self.pos > self.accumulator.len() / 2 {
            self.accumulator.drain(..self.pos);
            self.pos = 0;
        }
        self.accumulator.extend_from_slice(data);
    }

    /// Try to decode one complete message.
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        let available = &self.accumulator[self.pos..];
        if available.len() < HEADER_SIZE {
            return Ok(None);
        }

        let magic = read_u32(available, 0);
        if magic != MAGIC {
            return Err(Error::Protocol(format!(
                "bad magic {:#010x} (expected {:#010x})",
                magic, MAGIC
            )));
        }
        let body_len = read_u32(available, 4) as usize;
        if body_len > self.max_size {
            return Err(Error::Protocol(format!(
                "frame too large: {} bytes (max {})",
                body_len, self.max_size
            )));
        }
        if body_len < 4 {
            return Err(Error::Protocol("frame body shorter than its signature block".to_string()));
        }
        if available.len() < HEADER_SIZE + body_len {
            return Ok(None);
        }

        let id = read_u32(available, 8);
        let service = read_u32(available, 12);
        let object = read_u32(available, 16);
        let action = read_u32(available, 20);
        let kind = MessageKind::from_u32(read_u32(available, 24))?;

        let body = &available[HEADER_SIZE..HEADER_SIZE + body_len];
        let sig_len = read_u32(body, 0) as usize;
        if 4 + sig_len > body.len() {
            return Err(Error::Protocol("signature block overruns frame".to_string()));
        }
        let signature = std::str::from_utf8(&body[4..4 + sig_len])
            .map_err(|_| Error::Protocol("signature is not utf-8".to_string()))?
            .to_string();
        let payload = body[4 + sig_len..].to_vec();

        self.pos += HEADER_SIZE + body_len;
        Ok(Some(Message {
            id,
            service,
            object,
            action,
            kind,
            signature,
            payload,
        }))
    }
}

fn read_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}
