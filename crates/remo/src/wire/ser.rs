// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Descriptor-driven value serialization.
//!
//! Little-endian throughout: fixed-width integers and floats verbatim;
//! strings and raw buffers as `u32 length + bytes`; lists and maps as
//! `u32 count + items`; tuples as concatenated members in declared order;
//! dynamics as a signature string followed by the inner payload; objects as
//! their `u32` arena id.

use crate::dynamic::{Kind, ObjectId, TypeDescriptor, Value};
use crate::error::{Error, Result};
use crate::wire::signature::parse_signature;
use std::sync::Arc;

/// Encode one value, following its own descriptor.
pub fn encode_value(v: &Value, out: &mut Vec<u8>) -> Result<()> {
    let desc = v
        .descriptor()
        .ok_or_else(|| Error::Protocol("cannot encode a null value".to_string()))?
        .clone();
    match desc.kind() {
        Kind::Void => Ok(()),
        Kind::Int => {
            let bits = v.to_int()? as u64;
            let width = desc
                .int_width()
                .ok_or_else(|| Error::Protocol("int descriptor without width".to_string()))?;
            out.extend_from_slice(&bits.to_le_bytes()[..width.bytes()]);
            Ok(())
        }
        Kind::Float => {
            let value = v.to_double()?;
            match desc.float_width() {
                Some(crate::dynamic::FloatWidth::F32) => {
                    out.extend_from_slice(&(value as f32).to_le_bytes());
                }
                _ => out.extend_from_slice(&value.to_le_bytes()),
            }
            Ok(())
        }
        Kind::String => {
            write_bytes(out, v.to_str()?.as_bytes());
            Ok(())
        }
        Kind::Raw => {
            write_bytes(out, v.to_raw()?);
            Ok(())
        }
        Kind::List => {
            write_u32(out, v.len()? as u32);
            for elem in v.elements()? {
                encode_value(elem, out)?;
            }
            Ok(())
        }
        Kind::Map => {
            write_u32(out, v.len()? as u32);
            for (k, e) in v.pairs()? {
                encode_value(k, out)?;
                encode_value(e, out)?;
            }
            Ok(())
        }
        Kind::Tuple => {
            for member in v.elements()? {
                encode_value(member, out)?;
            }
            Ok(())
        }
        Kind::Dynamic => {
            let inner = v.dynamic_inner()?;
            match inner.descriptor() {
                Some(inner_desc) => {
                    write_bytes(out, inner_desc.signature().as_bytes());
                    encode_value(inner, out)
                }
                None => {
                    // A null inner value travels as the unknown signature
                    // with no payload.
                    write_bytes(out, b"X");
                    Ok(())
                }
            }
        }
        Kind::Pointer => encode_value(v.deref_pointer()?, out),
        Kind::Object => {
            write_u32(out, v.to_object()?.0);
            Ok(())
        }
        Kind::Iterator | Kind::Unknown => Err(Error::Protocol(format!(
            "{} values are not wire-encodable",
            desc.kind().name()
        ))),
    }
}

/// Encode an argument vector as concatenated members.
pub fn encode_values(values: &[Value], out: &mut Vec<u8>) -> Result<()> {
    for v in values {
        encode_value(v, out)?;
    }
    Ok(())
}

/// Decode one value of `desc` starting at `pos`, advancing it.
pub fn decode_value(desc: &Arc<TypeDescriptor>, buf: &[u8], pos: &mut usize) -> Result<Value> {
    match desc.kind() {
        Kind::Void => Ok(Value::void()),
        Kind::Unknown => Ok(Value::null()),
        Kind::Int => {
            let width = desc
                .int_width()
                .ok_or_else(|| Error::Protocol("int descriptor without width".to_string()))?;
            let raw = take(buf, pos, width.bytes())?;
            let mut bytes = [0u8; 8];
            bytes[..raw.len()].copy_from_slice(raw);
            let unsigned = u64::from_le_bytes(bytes);
            // Sign-extend signed narrow widths.
            let signed = desc.int_signed().unwrap_or(true);
            let bits = if signed && width.bytes() < 8 {
                let shift = 64 - width.bytes() * 8;
                ((unsigned << shift) as i64) >> shift
            } else {
                unsigned as i64
            };
            let mut out = Value::zero(desc.clone());
            if signed {
                out.set_int(bits)?;
            } else {
                out.set_uint(bits as u64)?;
            }
            Ok(out)
        }
        Kind::Float => {
            let value = match desc.float_width() {
                Some(crate::dynamic::FloatWidth::F32) => {
                    let raw = take(buf, pos, 4)?;
                    f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) as f64
                }
                _ => {
                    let raw = take(buf, pos, 8)?;
                    f64::from_le_bytes([
                        raw[0], raw[1], raw[2], raw[3], raw[4], raw[5], raw[6], raw[7],
                    ])
                }
            };
            let mut out = Value::zero(desc.clone());
            out.set_double(value)?;
            Ok(out)
        }
        Kind::String => {
            let bytes = read_bytes(buf, pos)?;
            let text = std::str::from_utf8(bytes)
                .map_err(|_| Error::Protocol("string payload is not utf-8".to_string()))?;
            let mut out = Value::zero(desc.clone());
            out.set_string(text)?;
            Ok(out)
        }
        Kind::Raw => {
            let bytes = read_bytes(buf, pos)?.to_vec();
            let mut out = Value::zero(desc.clone());
            out.set_raw(bytes)?;
            Ok(out)
        }
        Kind::List => {
            let element = desc
                .element_type()
                .ok_or_else(|| Error::Protocol("list descriptor without element".to_string()))?
                .clone();
            let count = read_u32(buf, pos)? as usize;
            let mut out = Value::zero(desc.clone());
            for _ in 0..count {
                out.append(decode_value(&element, buf, pos)?)?;
            }
            Ok(out)
        }
        Kind::Map => {
            let key = desc
                .key_type()
                .ok_or_else(|| Error::Protocol("map descriptor without key".to_string()))?
                .clone();
            let element = desc
                .element_type()
                .ok_or_else(|| Error::Protocol("map descriptor without element".to_string()))?
                .clone();
            let count = read_u32(buf, pos)? as usize;
            let mut out = Value::zero(desc.clone());
            for _ in 0..count {
                let k = decode_value(&key, buf, pos)?;
                let v = decode_value(&element, buf, pos)?;
                out.insert(k, v)?;
            }
            Ok(out)
        }
        Kind::Tuple => {
            let members = desc
                .member_types()
                .ok_or_else(|| Error::Protocol("tuple descriptor without members".to_string()))?
                .to_vec();
            let decoded = members
                .iter()
                .map(|m| decode_value(m, buf, pos))
                .collect::<Result<Vec<_>>>()?;
            Ok(crate::dynamic::value_from_members(desc.clone(), decoded))
        }
        Kind::Dynamic => {
            let sig_bytes = read_bytes(buf, pos)?;
            let sig = std::str::from_utf8(sig_bytes)
                .map_err(|_| Error::Protocol("dynamic signature is not utf-8".to_string()))?
                .to_string();
            let inner_desc = parse_signature(&sig)?;
            let inner = decode_value(&inner_desc, buf, pos)?;
            Ok(inner.into_dynamic())
        }
        Kind::Pointer => {
            let pointee = desc
                .pointee_type()
                .ok_or_else(|| Error::Protocol("pointer descriptor without pointee".to_string()))?
                .clone();
            let inner = decode_value(&pointee, buf, pos)?;
            Ok(crate::dynamic::value_from_pointee(desc.clone(), inner))
        }
        Kind::Object => {
            let id = read_u32(buf, pos)?;
            Ok(crate::dynamic::value_from_object_id(
                desc.clone(),
                ObjectId(id),
            ))
        }
        Kind::Iterator => Err(Error::Protocol(
            "iterator values are not wire-decodable".to_string(),
        )),
    }
}

/// Decode an argument vector of the given member descriptors.
///
/// The whole buffer must be consumed; leftovers are a framing violation.
pub fn decode_values(
    members: &[Arc<TypeDescriptor>],
    buf: &[u8],
) -> Result<Vec<Value>> {
    let mut pos = 0;
    let values = members
        .iter()
        .map(|m| decode_value(m, buf, &mut pos))
        .collect::<Result<Vec<_>>>()?;
    if pos != buf.len() {
        return Err(Error::Protocol(format!(
            "{} trailing payload bytes",
            buf.len() - pos
        )));
    }
    Ok(values)
}

fn write_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_le_bytes());
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

fn read_u32(buf: &[u8], pos: &mut usize) -> Result<u32> {
    let raw = take(buf, pos, 4)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_bytes<'a>(buf: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let len = read_u32(buf, pos)? as usize;
    take(buf, pos, len)
}

fn take<'a>(buf: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|end| *end <= buf.len())
        .ok_or_else(|| Error::Protocol("truncated payload".to_string()))?;
    let slice = &buf[*pos..end];
    *pos = end;
    Ok(slice)
}
