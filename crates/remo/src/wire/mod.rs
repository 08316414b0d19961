// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Wire format: message framing and descriptor-driven payload encoding.
//!
//! Everything on the wire is little-endian. A frame is a fixed header
//! (magic, length, correlation and routing ids, message kind) followed by a
//! payload-type signature string and the payload bytes; payloads are
//! encoded through the type descriptors, so both peers only need the
//! signature to decode.

mod frame;
mod ser;
mod signature;

pub use frame::{Message, MessageCodec, MessageKind, DEFAULT_MAX_MESSAGE_SIZE, HEADER_SIZE, MAGIC};
pub use ser::{decode_value, decode_values, encode_value, encode_values};
pub use signature::{parse_signature, parse_signature_list};
