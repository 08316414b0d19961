// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The value conversion engine.
//!
//! [`convert`] rewrites a value into the shape of a target descriptor. The
//! result is a [`Cow`]: `Borrowed` when the source can stand in unchanged
//! (identity and fingerprint matches), `Owned` when fresh storage was
//! produced. `None` means the pair of shapes is not convertible; the engine
//! never panics on shape mismatches.
//!
//! Rules are evaluated in a fixed order, first match wins:
//! same-kind dispatch, numeric cross-kind, string/raw, dynamic wrapping,
//! proxy generation, dynamic unwrapping, object/pointer bridging, object
//! up-cast, and the fingerprint fallback.

use crate::dynamic::registry::proxy_generator_for;
use crate::dynamic::type_descriptor::{Kind, TypeDescriptor};
use crate::dynamic::value::{Storage, Value};
use std::borrow::Cow;
use std::sync::Arc;

/// Convert `src` into the shape of `target`.
pub fn convert<'a>(src: &'a Value, target: &Arc<TypeDescriptor>) -> Option<Cow<'a, Value>> {
    // Identity short-circuit on descriptor instance.
    if let Some(d) = src.descriptor() {
        if Arc::ptr_eq(d, target) {
            return Some(Cow::Borrowed(src));
        }
    }

    let Some(src_desc) = src.descriptor() else {
        log::warn!("conversion error: cannot convert from a null value");
        return None;
    };

    let skind = src_desc.kind();
    let dkind = target.kind();

    if skind == dkind {
        match skind {
            Kind::Float => {
                let mut out = Value::zero(target.clone());
                out.set_double(src.to_double().ok()?).ok()?;
                return Some(Cow::Owned(out));
            }
            Kind::Int => {
                let v = src.to_int().ok()?;
                let mut out = Value::zero(target.clone());
                // Bounce through the checked setters so narrowing overflows
                // fail here instead of corrupting the target cell.
                let stored = if src_desc.int_signed().unwrap_or(true) {
                    out.set_int(v)
                } else {
                    out.set_uint(v as u64)
                };
                if stored.is_err() {
                    log::warn!(
                        "conversion failure: {} does not fit in {}",
                        src_desc.name(),
                        target.name()
                    );
                    return None;
                }
                return Some(Cow::Owned(out));
            }
            Kind::String => {
                if src_desc.same_info(target) {
                    return Some(Cow::Borrowed(src));
                }
                let mut out = Value::zero(target.clone());
                out.set_string(src.to_str().ok()?).ok()?;
                return Some(Cow::Owned(out));
            }
            Kind::Raw => {
                let mut out = Value::zero(target.clone());
                out.set_raw(src.to_raw().ok()?.to_vec()).ok()?;
                return Some(Cow::Owned(out));
            }
            Kind::Dynamic => {
                let inner = src.dynamic_inner().ok()?;
                return Some(Cow::Owned(inner.clone().into_dynamic()));
            }
            Kind::List => return convert_list(src, src_desc, target).map(Cow::Owned),
            Kind::Map => return convert_map(src, src_desc, target).map(Cow::Owned),
            Kind::Tuple => return convert_tuple(src, src_desc, target).map(Cow::Owned),
            Kind::Pointer => {
                let src_pointee = src_desc.pointee_type()?;
                let dst_pointee = target.pointee_type()?;
                // Only pointer-to-object pairs are bridged; anything else
                // must match exactly.
                if src_pointee.kind() != Kind::Object || dst_pointee.kind() != Kind::Object {
                    if src_desc.same_info(target) {
                        return Some(Cow::Borrowed(src));
                    }
                    return None;
                }
                let pointee = src.deref_pointer().ok()?;
                let converted = convert(pointee, dst_pointee)?;
                if let Cow::Owned(_) = converted {
                    log::error!("assertion error: allocated converted reference");
                }
                let out = Value::with_storage(
                    target.clone(),
                    Storage::Pointer(Box::new(converted.into_owned())),
                );
                return Some(Cow::Owned(out));
            }
            _ => {}
        }
    }

    // Cross-kind numeric.
    if skind == Kind::Float && dkind == Kind::Int {
        let mut out = Value::zero(target.clone());
        if out.set_double(src.to_double().ok()?).is_err() {
            log::warn!(
                "conversion failure: {} does not fit in {}",
                src_desc.name(),
                target.name()
            );
            return None;
        }
        return Some(Cow::Owned(out));
    }
    if skind == Kind::Int && dkind == Kind::Float {
        let v = src.to_int().ok()?;
        let mut out = Value::zero(target.clone());
        if src_desc.int_signed().unwrap_or(true) {
            out.set_int(v).ok()?;
        } else {
            out.set_uint(v as u64).ok()?;
        }
        return Some(Cow::Owned(out));
    }

    // String bytes can be viewed as a buffer; the reverse is not UTF-safe.
    if skind == Kind::String && dkind == Kind::Raw {
        let mut out = Value::zero(target.clone());
        out.set_raw(src.to_str().ok()?.as_bytes().to_vec()).ok()?;
        return Some(Cow::Owned(out));
    }
    if skind == Kind::Raw && dkind == Kind::String {
        log::warn!("conversion attempt from raw to string");
        return None;
    }

    // Anything boxes into a dynamic.
    if dkind == Kind::Dynamic {
        return Some(Cow::Owned(src.clone().into_dynamic()));
    }

    // Specialized proxy conversion for object handles into typed object
    // pointers, through the process-wide generator map.
    if skind == Kind::Object && dkind == Kind::Pointer {
        if let Some(dst_pointee) = target.pointee_type() {
            if dst_pointee.kind() == Kind::Object {
                if let Some(generator) = proxy_generator_for(dst_pointee.info()) {
                    if let Some(proxied) = generator(src) {
                        return Some(Cow::Owned(proxied));
                    }
                }
            }
        }
    }

    // Unwrap the source dynamic and retry the whole rule list.
    if skind == Kind::Dynamic {
        let inner = src.dynamic_inner().ok()?;
        return convert(inner, target);
    }

    // Object to pointer: convert to the pointee, then re-pointerize.
    if skind == Kind::Object && dkind == Kind::Pointer {
        let dst_pointee = target.pointee_type()?;
        let converted = convert(src, dst_pointee)?;
        let out = Value::with_storage(
            target.clone(),
            Storage::Pointer(Box::new(converted.into_owned())),
        );
        return Some(Cow::Owned(out));
    }

    // Object up-cast along the declared inheritance chain: the result views
    // the same object record under the parent descriptor.
    if skind == Kind::Object && src_desc.inherits(target.info()) {
        let id = src.to_object().ok()?;
        return Some(Cow::Owned(Value::with_storage(
            target.clone(),
            Storage::Object(id),
        )));
    }

    // Fingerprint match fallback.
    if src_desc.same_info(target) {
        return Some(Cow::Borrowed(src));
    }

    None
}

/// Convert and always return an owned value (cloning on the borrow path).
pub fn convert_copy(src: &Value, target: &Arc<TypeDescriptor>) -> Option<Value> {
    convert(src, target).map(Cow::into_owned)
}

fn convert_list(
    src: &Value,
    src_desc: &Arc<TypeDescriptor>,
    target: &Arc<TypeDescriptor>,
) -> Option<Value> {
    let src_elem = src_desc.element_type()?;
    let dst_elem = target.element_type()?;
    let need_convert = !src_elem.same_info(dst_elem);

    let mut out = Vec::with_capacity(src.len().ok()?);
    for elem in src.elements().ok()? {
        if !need_convert {
            out.push(elem.clone());
        } else {
            let converted = convert(elem, dst_elem)?;
            out.push(converted.into_owned());
        }
    }
    Some(Value::with_storage(target.clone(), Storage::List(out)))
}

fn convert_map(
    src: &Value,
    src_desc: &Arc<TypeDescriptor>,
    target: &Arc<TypeDescriptor>,
) -> Option<Value> {
    let src_key = src_desc.key_type()?;
    let src_elem = src_desc.element_type()?;
    let dst_key = target.key_type()?;
    let dst_elem = target.element_type()?;

    let same_key = src_key.same_info(dst_key);
    let same_elem = src_elem.same_info(dst_elem);

    let mut out: Vec<(Value, Value)> = Vec::with_capacity(src.len().ok()?);
    for (k, v) in src.pairs().ok()? {
        let ck = if same_key {
            k.clone()
        } else {
            convert(k, dst_key)?.into_owned()
        };
        let cv = if same_elem {
            v.clone()
        } else {
            convert(v, dst_elem)?.into_owned()
        };
        if let Some(slot) = out.iter_mut().find(|(ek, _)| *ek == ck) {
            slot.1 = cv;
        } else {
            out.push((ck, cv));
        }
    }
    Some(Value::with_storage(target.clone(), Storage::Map(out)))
}

fn convert_tuple(
    src: &Value,
    src_desc: &Arc<TypeDescriptor>,
    target: &Arc<TypeDescriptor>,
) -> Option<Value> {
    let src_members = src_desc.member_types()?;
    let dst_members = target.member_types()?;
    if src_members.len() != dst_members.len() {
        log::warn!(
            "conversion failure: tuple size mismatch ({} vs {})",
            src_members.len(),
            dst_members.len()
        );
        return None;
    }

    let mut out = Vec::with_capacity(dst_members.len());
    for (i, dst_member) in dst_members.iter().enumerate() {
        let member = src.at(i).ok()?;
        match convert(member, dst_member) {
            Some(converted) => out.push(converted.into_owned()),
            None => {
                log::warn!(
                    "conversion failure in tuple member between {} and {}",
                    src_members[i].name(),
                    dst_member.name()
                );
                return None;
            }
        }
    }
    Some(Value::with_storage(target.clone(), Storage::Tuple(out)))
}
