// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The dynamic value carrier.
//!
//! A [`Value`] pairs a [`TypeDescriptor`] with one storage cell of that
//! type. A value without a descriptor is the null sentinel ("no value").
//! Cloning always produces an independent, fully-owned copy; Rust ownership
//! takes the place of the explicit destroy step, so a value can neither leak
//! nor be torn down twice.

use crate::dynamic::type_descriptor::{Kind, TypeDescriptor};
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::sync::Arc;

/// Opaque handle to an object record in a session's object arena.
///
/// Objects reference each other by id, never by pointer, so cyclic service
/// graphs stay sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ObjectId(pub u32);

/// Storage cell for one value.
///
/// Unsigned integers are stored bit-preserving in the `Int` variant; the
/// descriptor's signedness decides how the bits are read back.
#[derive(Debug, Clone)]
pub(crate) enum Storage {
    Empty,
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Tuple(Vec<Value>),
    Raw(Vec<u8>),
    Dynamic(Box<Value>),
    Pointer(Box<Value>),
    Object(ObjectId),
    Iter(Box<IterState>),
}

/// Snapshot iterator state: the remaining advancement is `items[pos..]`.
#[derive(Debug, Clone)]
pub(crate) struct IterState {
    pub(crate) items: Vec<Value>,
    pub(crate) pos: usize,
}

/// A dynamically-typed value.
#[derive(Debug, Clone)]
pub struct Value {
    pub(crate) descriptor: Option<Arc<TypeDescriptor>>,
    pub(crate) storage: Storage,
}

impl Default for Value {
    fn default() -> Self {
        Self::null()
    }
}

impl Value {
    /// The null sentinel: no descriptor, no storage.
    pub fn null() -> Self {
        Self {
            descriptor: None,
            storage: Storage::Empty,
        }
    }

    /// The void value.
    pub fn void() -> Self {
        Self {
            descriptor: Some(TypeDescriptor::void()),
            storage: Storage::Empty,
        }
    }

    /// Construct a value of `descriptor` with zeroed storage.
    ///
    /// Numeric cells are zero, strings and containers empty, dynamics box a
    /// null value, object cells hold the invalid id 0.
    pub fn zero(descriptor: Arc<TypeDescriptor>) -> Self {
        let storage = Self::zero_storage(&descriptor);
        Self {
            descriptor: Some(descriptor),
            storage,
        }
    }

    fn zero_storage(descriptor: &TypeDescriptor) -> Storage {
        match descriptor.kind() {
            Kind::Void | Kind::Unknown => Storage::Empty,
            Kind::Int => Storage::Int(0),
            Kind::Float => Storage::Float(0.0),
            Kind::String => Storage::Str(String::new()),
            Kind::List => Storage::List(Vec::new()),
            Kind::Map => Storage::Map(Vec::new()),
            Kind::Tuple => {
                let members = descriptor.member_types().unwrap_or(&[]);
                Storage::Tuple(members.iter().map(|m| Value::zero(m.clone())).collect())
            }
            Kind::Raw => Storage::Raw(Vec::new()),
            Kind::Dynamic => Storage::Dynamic(Box::new(Value::null())),
            Kind::Pointer => Storage::Pointer(Box::new(Value::null())),
            Kind::Object => Storage::Object(ObjectId(0)),
            Kind::Iterator => Storage::Iter(Box::new(IterState {
                items: Vec::new(),
                pos: 0,
            })),
        }
    }

    pub(crate) fn with_storage(descriptor: Arc<TypeDescriptor>, storage: Storage) -> Self {
        Self {
            descriptor: Some(descriptor),
            storage,
        }
    }

    /// Whether this is the null sentinel.
    pub fn is_null(&self) -> bool {
        self.descriptor.is_none()
    }

    /// The descriptor, if any.
    pub fn descriptor(&self) -> Option<&Arc<TypeDescriptor>> {
        self.descriptor.as_ref()
    }

    /// The kind tag; `Unknown` for the null sentinel.
    pub fn kind(&self) -> Kind {
        self.descriptor
            .as_ref()
            .map(|d| d.kind())
            .unwrap_or(Kind::Unknown)
    }

    fn kind_error(&self, expected: &'static str) -> Error {
        Error::KindMismatch {
            expected,
            got: self.kind().name(),
        }
    }

    // ------------------------------------------------------------------
    // Scalar access
    // ------------------------------------------------------------------

    /// Read an integer value as `i64` (bit pattern for unsigned widths).
    pub fn to_int(&self) -> Result<i64> {
        match self.storage {
            Storage::Int(v) if self.kind() == Kind::Int => Ok(v),
            _ => Err(self.kind_error("int")),
        }
    }

    /// Read an unsigned integer value.
    pub fn to_uint(&self) -> Result<u64> {
        match self.storage {
            Storage::Int(v) if self.kind() == Kind::Int => Ok(v as u64),
            _ => Err(self.kind_error("int")),
        }
    }

    /// Read a float value, also accepting Int storage numerically.
    pub fn to_double(&self) -> Result<f64> {
        match self.storage {
            Storage::Float(v) => Ok(v),
            Storage::Int(_) => Ok(self.numeric() as f64),
            _ => Err(self.kind_error("float")),
        }
    }

    /// Borrow a string value.
    pub fn to_str(&self) -> Result<&str> {
        match &self.storage {
            Storage::Str(s) => Ok(s),
            _ => Err(self.kind_error("string")),
        }
    }

    /// Borrow a raw buffer value.
    pub fn to_raw(&self) -> Result<&[u8]> {
        match &self.storage {
            Storage::Raw(b) => Ok(b),
            _ => Err(self.kind_error("raw")),
        }
    }

    /// Read the object id of an Object value.
    pub fn to_object(&self) -> Result<ObjectId> {
        match self.storage {
            Storage::Object(id) => Ok(id),
            Storage::Pointer(ref inner) => inner.to_object(),
            _ => Err(self.kind_error("object")),
        }
    }

    /// The boxed inner value of a Dynamic.
    pub fn dynamic_inner(&self) -> Result<&Value> {
        match &self.storage {
            Storage::Dynamic(inner) => Ok(inner),
            _ => Err(self.kind_error("dynamic")),
        }
    }

    /// The pointee of a Pointer value.
    pub fn deref_pointer(&self) -> Result<&Value> {
        match &self.storage {
            Storage::Pointer(inner) => Ok(inner),
            _ => Err(self.kind_error("pointer")),
        }
    }

    /// Signed numeric reading of an Int storage cell, honoring the
    /// descriptor's signedness (unsigned bit patterns widen losslessly).
    pub(crate) fn numeric(&self) -> i128 {
        match self.storage {
            Storage::Int(v) => {
                let signed = self
                    .descriptor
                    .as_ref()
                    .and_then(|d| d.int_signed())
                    .unwrap_or(true);
                if signed {
                    v as i128
                } else {
                    (v as u64) as i128
                }
            }
            _ => 0,
        }
    }

    // ------------------------------------------------------------------
    // Scalar mutation with range checks
    // ------------------------------------------------------------------

    /// Store a signed integer, range-checked against the descriptor's
    /// width and signedness.
    pub fn set_int(&mut self, v: i64) -> Result<()> {
        let desc = self.descriptor.clone().ok_or_else(|| self.kind_error("int"))?;
        match desc.kind() {
            Kind::Int => {
                let signed = desc.int_signed().unwrap_or(true);
                let width = desc.int_width().unwrap_or(crate::dynamic::IntWidth::W64);
                if signed {
                    let (min, max) = width.signed_range();
                    if v < min || v > max {
                        return Err(Error::Overflow(format!(
                            "{} out of range for {}",
                            v,
                            desc.name()
                        )));
                    }
                } else {
                    if v < 0 || (v as u64) > width.unsigned_max() {
                        return Err(Error::Overflow(format!(
                            "{} out of range for {}",
                            v,
                            desc.name()
                        )));
                    }
                }
                self.storage = Storage::Int(v);
                Ok(())
            }
            Kind::Float => {
                self.storage = Storage::Float(v as f64);
                Ok(())
            }
            _ => Err(self.kind_error("int")),
        }
    }

    /// Store an unsigned integer, range-checked.
    pub fn set_uint(&mut self, v: u64) -> Result<()> {
        let desc = self.descriptor.clone().ok_or_else(|| self.kind_error("int"))?;
        match desc.kind() {
            Kind::Int => {
                let signed = desc.int_signed().unwrap_or(true);
                let width = desc.int_width().unwrap_or(crate::dynamic::IntWidth::W64);
                if signed {
                    let (_, max) = width.signed_range();
                    if v > max as u64 {
                        return Err(Error::Overflow(format!(
                            "{} out of range for {}",
                            v,
                            desc.name()
                        )));
                    }
                } else if v > width.unsigned_max() {
                    return Err(Error::Overflow(format!(
                        "{} out of range for {}",
                        v,
                        desc.name()
                    )));
                }
                self.storage = Storage::Int(v as i64);
                Ok(())
            }
            Kind::Float => {
                self.storage = Storage::Float(v as f64);
                Ok(())
            }
            _ => Err(self.kind_error("int")),
        }
    }

    /// Store a float; on Int descriptors truncates toward zero after an
    /// overflow check.
    pub fn set_double(&mut self, v: f64) -> Result<()> {
        let desc = self.descriptor.clone().ok_or_else(|| self.kind_error("float"))?;
        match desc.kind() {
            Kind::Float => {
                self.storage = Storage::Float(v);
                Ok(())
            }
            Kind::Int => {
                if v.is_nan() {
                    return Err(Error::Overflow("nan has no integer value".to_string()));
                }
                let t = v.trunc();
                let signed = desc.int_signed().unwrap_or(true);
                let width = desc.int_width().unwrap_or(crate::dynamic::IntWidth::W64);
                if signed {
                    let (min, max) = width.signed_range();
                    if t < min as f64 || t > max as f64 {
                        return Err(Error::Overflow(format!(
                            "{} out of range for {}",
                            v,
                            desc.name()
                        )));
                    }
                    self.storage = Storage::Int(t as i64);
                } else {
                    if t < 0.0 || t > width.unsigned_max() as f64 {
                        return Err(Error::Overflow(format!(
                            "{} out of range for {}",
                            v,
                            desc.name()
                        )));
                    }
                    self.storage = Storage::Int((t as u64) as i64);
                }
                Ok(())
            }
            _ => Err(self.kind_error("float")),
        }
    }

    /// Store a string.
    pub fn set_string(&mut self, v: impl Into<String>) -> Result<()> {
        match self.kind() {
            Kind::String => {
                self.storage = Storage::Str(v.into());
                Ok(())
            }
            _ => Err(self.kind_error("string")),
        }
    }

    /// Store raw bytes.
    pub fn set_raw(&mut self, v: Vec<u8>) -> Result<()> {
        match self.kind() {
            Kind::Raw => {
                self.storage = Storage::Raw(v);
                Ok(())
            }
            _ => Err(self.kind_error("raw")),
        }
    }

    // ------------------------------------------------------------------
    // Containers
    // ------------------------------------------------------------------

    /// Element count of a List, Map or Tuple.
    pub fn len(&self) -> Result<usize> {
        match &self.storage {
            Storage::List(v) | Storage::Tuple(v) => Ok(v.len()),
            Storage::Map(v) => Ok(v.len()),
            _ => Err(self.kind_error("list, map or tuple")),
        }
    }

    /// Whether a container is empty.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Element access by index for List and Tuple.
    pub fn at(&self, index: usize) -> Result<&Value> {
        match &self.storage {
            Storage::List(v) | Storage::Tuple(v) => v.get(index).ok_or_else(|| {
                Error::NotFound(format!("index {} out of range (len {})", index, v.len()))
            }),
            _ => Err(self.kind_error("list or tuple")),
        }
    }

    /// Map lookup by key, converting the key to the map's key type first.
    pub fn entry(&self, key: &Value) -> Result<Option<&Value>> {
        let desc = self.descriptor.as_ref().ok_or_else(|| self.kind_error("map"))?;
        let key_type = desc.key_type().ok_or_else(|| self.kind_error("map"))?;
        let ck = crate::dynamic::convert(key, key_type)
            .ok_or_else(|| Error::ConversionFailed("incompatible map key".to_string()))?;
        match &self.storage {
            Storage::Map(pairs) => Ok(pairs.iter().find(|(k, _)| *k == *ck).map(|(_, v)| v)),
            _ => Err(self.kind_error("map")),
        }
    }

    /// Append to a List, converting the element to the element type.
    pub fn append(&mut self, elem: Value) -> Result<()> {
        let desc = self.descriptor.clone().ok_or_else(|| self.kind_error("list"))?;
        if desc.kind() != Kind::List {
            return Err(self.kind_error("list"));
        }
        let elem_type = desc.element_type().ok_or_else(|| self.kind_error("list"))?;
        let converted = crate::dynamic::convert(&elem, elem_type)
            .ok_or_else(|| {
                Error::ConversionFailed(format!(
                    "cannot append {} to {}",
                    elem.kind().name(),
                    desc.name()
                ))
            })?
            .into_owned();
        match &mut self.storage {
            Storage::List(v) => {
                v.push(converted);
                Ok(())
            }
            _ => Err(self.kind_error("list")),
        }
    }

    /// Insert into a Map, converting key and value to the declared types.
    pub fn insert(&mut self, key: Value, value: Value) -> Result<()> {
        let desc = self.descriptor.clone().ok_or_else(|| self.kind_error("map"))?;
        if desc.kind() != Kind::Map {
            return Err(self.kind_error("map"));
        }
        let key_type = desc.key_type().ok_or_else(|| self.kind_error("map"))?;
        let elem_type = desc.element_type().ok_or_else(|| self.kind_error("map"))?;
        let ck = crate::dynamic::convert(&key, key_type)
            .ok_or_else(|| Error::ConversionFailed("incompatible map key".to_string()))?
            .into_owned();
        let cv = crate::dynamic::convert(&value, elem_type)
            .ok_or_else(|| Error::ConversionFailed("incompatible map value".to_string()))?
            .into_owned();
        match &mut self.storage {
            Storage::Map(pairs) => {
                if let Some(slot) = pairs.iter_mut().find(|(k, _)| *k == ck) {
                    slot.1 = cv;
                } else {
                    pairs.push((ck, cv));
                }
                Ok(())
            }
            _ => Err(self.kind_error("map")),
        }
    }

    /// Iterate list/tuple elements.
    pub fn elements(&self) -> Result<std::slice::Iter<'_, Value>> {
        match &self.storage {
            Storage::List(v) | Storage::Tuple(v) => Ok(v.iter()),
            _ => Err(self.kind_error("list or tuple")),
        }
    }

    /// Iterate map pairs.
    pub fn pairs(&self) -> Result<std::slice::Iter<'_, (Value, Value)>> {
        match &self.storage {
            Storage::Map(v) => Ok(v.iter()),
            _ => Err(self.kind_error("map")),
        }
    }

    // ------------------------------------------------------------------
    // Shape changes
    // ------------------------------------------------------------------

    /// View a List as a Tuple value (copying elements); Tuples pass through.
    pub fn to_tuple(&self) -> Result<Value> {
        match self.kind() {
            Kind::Tuple => Ok(self.clone()),
            Kind::List => {
                let elems: Vec<Value> = self.elements()?.cloned().collect();
                let members = elems
                    .iter()
                    .map(|e| {
                        e.descriptor()
                            .cloned()
                            .ok_or_else(|| Error::ConversionFailed("null tuple member".into()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::with_storage(
                    TypeDescriptor::tuple(members),
                    Storage::Tuple(elems),
                ))
            }
            _ => Err(self.kind_error("tuple or list")),
        }
    }

    /// Box this value into a Dynamic.
    pub fn into_dynamic(self) -> Value {
        Value::with_storage(TypeDescriptor::dynamic(), Storage::Dynamic(Box::new(self)))
    }

    /// Snapshot a forward-only iterator over a List's elements.
    pub fn make_iterator(&self) -> Result<Value> {
        let desc = self.descriptor.as_ref().ok_or_else(|| self.kind_error("list"))?;
        let elem = desc.element_type().ok_or_else(|| self.kind_error("list"))?;
        let items: Vec<Value> = self.elements()?.cloned().collect();
        Ok(Value::with_storage(
            TypeDescriptor::iterator(elem.clone()),
            Storage::Iter(Box::new(IterState { items, pos: 0 })),
        ))
    }

    /// Advance an Iterator value, yielding the next element.
    pub fn next_element(&mut self) -> Result<Option<Value>> {
        match &mut self.storage {
            Storage::Iter(state) => {
                if state.pos < state.items.len() {
                    let item = state.items[state.pos].clone();
                    state.pos += 1;
                    Ok(Some(item))
                } else {
                    Ok(None)
                }
            }
            _ => Err(self.kind_error("iterator")),
        }
    }
}

// Constructors used by the wire decoder, which builds values whose storage
// shape is already known to match the descriptor.

pub(crate) fn value_from_members(descriptor: Arc<TypeDescriptor>, members: Vec<Value>) -> Value {
    Value::with_storage(descriptor, Storage::Tuple(members))
}

pub(crate) fn value_from_pointee(descriptor: Arc<TypeDescriptor>, pointee: Value) -> Value {
    Value::with_storage(descriptor, Storage::Pointer(Box::new(pointee)))
}

pub(crate) fn value_from_object_id(descriptor: Arc<TypeDescriptor>, id: ObjectId) -> Value {
    Value::with_storage(descriptor, Storage::Object(id))
}

// ----------------------------------------------------------------------
// Total ordering
// ----------------------------------------------------------------------

/// Total order over values, usable as a container key order.
///
/// Null sorts first; differing kinds compare by kind ordinal except the
/// numeric Int/Float pairing; within a kind, strings and containers compare
/// length-first then elementwise, scalars numerically, the remaining kinds
/// structurally (opaque but total).
pub fn total_cmp(a: &Value, b: &Value) -> Ordering {
    match (&a.descriptor, &b.descriptor) {
        (None, None) => return Ordering::Equal,
        (None, Some(_)) => return Ordering::Less,
        (Some(_), None) => return Ordering::Greater,
        _ => {}
    }
    let ka = a.kind();
    let kb = b.kind();
    if ka != kb {
        // Numeric bridge between the two number kinds.
        if ka == Kind::Int && kb == Kind::Float {
            return (a.numeric() as f64).total_cmp(&b.to_double().unwrap_or(0.0));
        }
        if ka == Kind::Float && kb == Kind::Int {
            return a
                .to_double()
                .unwrap_or(0.0)
                .total_cmp(&(b.numeric() as f64));
        }
        return ka.cmp(&kb);
    }
    match (&a.storage, &b.storage) {
        (Storage::Empty, Storage::Empty) => Ordering::Equal,
        (Storage::Int(_), Storage::Int(_)) => a.numeric().cmp(&b.numeric()),
        (Storage::Float(x), Storage::Float(y)) => x.total_cmp(y),
        (Storage::Str(x), Storage::Str(y)) => {
            // Shorter is less; bytewise only on equal length.
            x.len().cmp(&y.len()).then_with(|| x.as_bytes().cmp(y.as_bytes()))
        }
        (Storage::Raw(x), Storage::Raw(y)) => x.len().cmp(&y.len()).then_with(|| x.cmp(y)),
        (Storage::List(x), Storage::List(y)) | (Storage::Tuple(x), Storage::Tuple(y)) => {
            cmp_slices(x, y)
        }
        (Storage::Map(x), Storage::Map(y)) => {
            let by_len = x.len().cmp(&y.len());
            if by_len != Ordering::Equal {
                return by_len;
            }
            for ((ka, va), (kb, vb)) in x.iter().zip(y.iter()) {
                let c = total_cmp(ka, kb);
                if c != Ordering::Equal {
                    return c;
                }
                let c = total_cmp(va, vb);
                if c != Ordering::Equal {
                    return c;
                }
            }
            Ordering::Equal
        }
        (Storage::Dynamic(x), Storage::Dynamic(y)) => total_cmp(x, y),
        (Storage::Pointer(x), Storage::Pointer(y)) => total_cmp(x, y),
        (Storage::Object(x), Storage::Object(y)) => x.cmp(y),
        (Storage::Iter(x), Storage::Iter(y)) => x
            .pos
            .cmp(&y.pos)
            .then_with(|| x.items.len().cmp(&y.items.len())),
        // Storage/descriptor disagreement is an internal invariant break.
        _ => Ordering::Equal,
    }
}

fn cmp_slices(x: &[Value], y: &[Value]) -> Ordering {
    let by_len = x.len().cmp(&y.len());
    if by_len != Ordering::Equal {
        return by_len;
    }
    for (a, b) in x.iter().zip(y.iter()) {
        let c = total_cmp(a, b);
        if c != Ordering::Equal {
            return c;
        }
    }
    Ordering::Equal
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        // Iterators compare structurally through their descriptor identity.
        if self.kind() == Kind::Iterator && other.kind() == Kind::Iterator {
            let same_type = match (&self.descriptor, &other.descriptor) {
                (Some(a), Some(b)) => a.same_info(b),
                _ => false,
            };
            return same_type && total_cmp(self, other) == Ordering::Equal;
        }
        total_cmp(self, other) == Ordering::Equal
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(total_cmp(self, other))
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamic::{FloatWidth, IntWidth};

    fn i32_value(v: i32) -> Value {
        let mut out = Value::zero(TypeDescriptor::int(true, IntWidth::W32));
        out.set_int(v as i64).expect("in range");
        out
    }

    fn str_value(s: &str) -> Value {
        let mut out = Value::zero(TypeDescriptor::string());
        out.set_string(s).expect("string");
        out
    }

    #[test]
    fn null_sentinel() {
        let v = Value::null();
        assert!(v.is_null());
        assert_eq!(v.kind(), Kind::Unknown);
        assert!(v.to_int().is_err());
    }

    #[test]
    fn int_range_checks() {
        let mut v = Value::zero(TypeDescriptor::int(true, IntWidth::W8));
        assert!(v.set_int(127).is_ok());
        assert!(v.set_int(128).is_err());
        assert!(v.set_int(-128).is_ok());
        assert!(v.set_int(-129).is_err());

        let mut u = Value::zero(TypeDescriptor::int(false, IntWidth::W16));
        assert!(u.set_uint(65535).is_ok());
        assert!(u.set_uint(65536).is_err());
        assert!(u.set_int(-1).is_err());
    }

    #[test]
    fn unsigned_bit_pattern() {
        let mut v = Value::zero(TypeDescriptor::int(false, IntWidth::W64));
        v.set_uint(u64::MAX).expect("fits");
        assert_eq!(v.to_uint().unwrap(), u64::MAX);
        assert_eq!(v.numeric(), u64::MAX as i128);
    }

    #[test]
    fn double_to_int_truncates_and_checks() {
        let mut v = Value::zero(TypeDescriptor::int(true, IntWidth::W32));
        v.set_double(3.9).expect("fits");
        assert_eq!(v.to_int().unwrap(), 3);
        assert!(v.set_double(3e12).is_err());
        assert!(v.set_double(f64::NAN).is_err());
    }

    #[test]
    fn list_append_and_access() {
        let desc = TypeDescriptor::list(TypeDescriptor::int(true, IntWidth::W32));
        let mut list = Value::zero(desc);
        list.append(i32_value(1)).unwrap();
        list.append(i32_value(2)).unwrap();
        assert_eq!(list.len().unwrap(), 2);
        assert_eq!(list.at(1).unwrap().to_int().unwrap(), 2);
        assert!(list.at(2).is_err());
    }

    #[test]
    fn map_insert_and_entry() {
        let desc = TypeDescriptor::map(
            TypeDescriptor::string(),
            TypeDescriptor::int(true, IntWidth::W32),
        );
        let mut map = Value::zero(desc);
        map.insert(str_value("a"), i32_value(1)).unwrap();
        map.insert(str_value("b"), i32_value(2)).unwrap();
        map.insert(str_value("a"), i32_value(3)).unwrap();
        assert_eq!(map.len().unwrap(), 2);
        let got = map.entry(&str_value("a")).unwrap().unwrap();
        assert_eq!(got.to_int().unwrap(), 3);
        assert!(map.entry(&str_value("zz")).unwrap().is_none());
    }

    #[test]
    fn ordering_null_first() {
        let null = Value::null();
        let v = i32_value(0);
        assert_eq!(total_cmp(&null, &v), Ordering::Less);
        assert_eq!(total_cmp(&v, &null), Ordering::Greater);
        assert_eq!(total_cmp(&null, &Value::null()), Ordering::Equal);
    }

    #[test]
    fn ordering_strings_length_first() {
        assert!(str_value("zz") < str_value("aaa"));
        assert!(str_value("abc") < str_value("abd"));
        assert_eq!(str_value("abc"), str_value("abc"));
    }

    #[test]
    fn ordering_int_float_numeric() {
        let i = i32_value(3);
        let mut f = Value::zero(TypeDescriptor::float(FloatWidth::F64));
        f.set_double(3.5).unwrap();
        assert!(i < f);
        assert!(f > i);
        f.set_double(3.0).unwrap();
        assert_eq!(total_cmp(&i, &f), Ordering::Equal);
    }

    #[test]
    fn ordering_trichotomy() {
        let values = [
            Value::null(),
            i32_value(-4),
            i32_value(9),
            str_value(""),
            str_value("x"),
        ];
        for a in &values {
            for b in &values {
                let less = total_cmp(a, b) == Ordering::Less;
                let greater = total_cmp(b, a) == Ordering::Less;
                let equal = total_cmp(a, b) == Ordering::Equal;
                assert_eq!(
                    [less, greater, equal].iter().filter(|x| **x).count(),
                    1,
                    "trichotomy violated"
                );
            }
        }
    }

    #[test]
    fn iterator_advances_and_compares() {
        let desc = TypeDescriptor::list(TypeDescriptor::int(true, IntWidth::W32));
        let mut list = Value::zero(desc);
        list.append(i32_value(10)).unwrap();
        list.append(i32_value(20)).unwrap();

        let mut it = list.make_iterator().unwrap();
        let other = list.make_iterator().unwrap();
        assert_eq!(it, other);

        assert_eq!(it.next_element().unwrap().unwrap().to_int().unwrap(), 10);
        assert_ne!(it, other);
        assert_eq!(it.next_element().unwrap().unwrap().to_int().unwrap(), 20);
        assert!(it.next_element().unwrap().is_none());
    }

    #[test]
    fn list_to_tuple() {
        let desc = TypeDescriptor::list(TypeDescriptor::int(true, IntWidth::W32));
        let mut list = Value::zero(desc);
        list.append(i32_value(1)).unwrap();
        list.append(i32_value(2)).unwrap();
        let tuple = list.to_tuple().unwrap();
        assert_eq!(tuple.kind(), Kind::Tuple);
        assert_eq!(tuple.at(0).unwrap().to_int().unwrap(), 1);
        assert!(str_value("no").to_tuple().is_err());
    }

    #[test]
    fn clone_is_independent() {
        let desc = TypeDescriptor::list(TypeDescriptor::int(true, IntWidth::W32));
        let mut list = Value::zero(desc);
        list.append(i32_value(1)).unwrap();
        let copy = list.clone();
        list.append(i32_value(2)).unwrap();
        assert_eq!(copy.len().unwrap(), 1);
        assert_eq!(list.len().unwrap(), 2);
    }
}
