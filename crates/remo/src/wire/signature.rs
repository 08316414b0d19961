// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Compact type signature parsing.
//!
//! The grammar mirrors [`TypeDescriptor::signature`]: one character per
//! scalar kind, bracketed composites.
//!
//! ```text
//! v void      c/w/i/l  int8/16/32/64     C/W/I/L  uint8/16/32/64
//! f float32   d float64                  s string   r raw
//! m dynamic   o object   X unknown       @E iterator
//! [E] list    {KV} map   (M...) tuple    *P pointer
//! ```

use crate::dynamic::{FloatWidth, IntWidth, TypeDescriptor};
use crate::error::{Error, Result};
use crate::meta::MetaObject;
use std::iter::Peekable;
use std::str::Chars;
use std::sync::Arc;

/// Parse exactly one type from a signature string.
pub fn parse_signature(input: &str) -> Result<Arc<TypeDescriptor>> {
    let mut chars = input.chars().peekable();
    let desc = parse_one(&mut chars, input)?;
    if chars.next().is_some() {
        return Err(Error::Protocol(format!(
            "trailing characters in signature {:?}",
            input
        )));
    }
    Ok(desc)
}

/// Parse a parenthesized signature (`(...)`) into the member type list.
pub fn parse_signature_list(input: &str) -> Result<Vec<Arc<TypeDescriptor>>> {
    let desc = parse_signature(input)?;
    desc.member_types()
        .map(|m| m.to_vec())
        .ok_or_else(|| Error::Protocol(format!("expected a tuple signature, got {:?}", input)))
}

fn parse_one(chars: &mut Peekable<Chars<'_>>, input: &str) -> Result<Arc<TypeDescriptor>> {
    let bad = |c: Option<char>| {
        Error::Protocol(match c {
            Some(c) => format!("unexpected {:?} in signature {:?}", c, input),
            None => format!("truncated signature {:?}", input),
        })
    };

    let c = chars.next().ok_or_else(|| bad(None))?;
    let desc = match c {
        'v' => TypeDescriptor::void(),
        'c' => TypeDescriptor::int(true, IntWidth::W8),
        'w' => TypeDescriptor::int(true, IntWidth::W16),
        'i' => TypeDescriptor::int(true, IntWidth::W32),
        'l' => TypeDescriptor::int(true, IntWidth::W64),
        'C' => TypeDescriptor::int(false, IntWidth::W8),
        'W' => TypeDescriptor::int(false, IntWidth::W16),
        'I' => TypeDescriptor::int(false, IntWidth::W32),
        'L' => TypeDescriptor::int(false, IntWidth::W64),
        'f' => TypeDescriptor::float(FloatWidth::F32),
        'd' => TypeDescriptor::float(FloatWidth::F64),
        's' => TypeDescriptor::string(),
        'r' => TypeDescriptor::raw(),
        'm' => TypeDescriptor::dynamic(),
        'X' => TypeDescriptor::unknown(),
        'o' => TypeDescriptor::object("object", Arc::new(MetaObject::default()), Vec::new()),
        '[' => {
            let element = parse_one(chars, input)?;
            match chars.next() {
                Some(']') => TypeDescriptor::list(element),
                other => return Err(bad(other)),
            }
        }
        '{' => {
            let key = parse_one(chars, input)?;
            let element = parse_one(chars, input)?;
            match chars.next() {
                Some('}') => TypeDescriptor::map(key, element),
                other => return Err(bad(other)),
            }
        }
        '(' => {
            let mut members = Vec::new();
            loop {
                match chars.peek() {
                    Some(')') => {
                        chars.next();
                        break;
                    }
                    Some(_) => members.push(parse_one(chars, input)?),
                    None => return Err(bad(None)),
                }
            }
            TypeDescriptor::tuple(members)
        }
        '*' => TypeDescriptor::pointer(parse_one(chars, input)?),
        '@' => TypeDescriptor::iterator(parse_one(chars, input)?),
        other => return Err(bad(Some(other))),
    };
    Ok(desc)
}
