// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type descriptors for runtime type information.

use crate::meta::MetaObject;
use std::fmt;
use std::sync::Arc;

/// Type kind enumeration.
///
/// The ordinal order is part of the value total-ordering contract: values of
/// different kinds compare by this order (with the Int/Float numeric
/// exception), so variants must not be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kind {
    Void,
    Int,
    Float,
    String,
    List,
    Map,
    Tuple,
    Pointer,
    Object,
    Dynamic,
    Raw,
    Iterator,
    Unknown,
}

impl Kind {
    /// Short lowercase name, used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Int => "int",
            Self::Float => "float",
            Self::String => "string",
            Self::List => "list",
            Self::Map => "map",
            Self::Tuple => "tuple",
            Self::Pointer => "pointer",
            Self::Object => "object",
            Self::Dynamic => "dynamic",
            Self::Raw => "raw",
            Self::Iterator => "iterator",
            Self::Unknown => "unknown",
        }
    }
}

/// Integer storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

impl IntWidth {
    /// Width in bytes (wire size).
    pub fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
        }
    }

    /// Inclusive signed range for this width.
    pub fn signed_range(self) -> (i64, i64) {
        match self {
            Self::W8 => (i8::MIN as i64, i8::MAX as i64),
            Self::W16 => (i16::MIN as i64, i16::MAX as i64),
            Self::W32 => (i32::MIN as i64, i32::MAX as i64),
            Self::W64 => (i64::MIN, i64::MAX),
        }
    }

    /// Inclusive unsigned maximum for this width.
    pub fn unsigned_max(self) -> u64 {
        match self {
            Self::W8 => u8::MAX as u64,
            Self::W16 => u16::MAX as u64,
            Self::W32 => u32::MAX as u64,
            Self::W64 => u64::MAX,
        }
    }
}

/// Floating point storage width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    F32,
    F64,
}

impl FloatWidth {
    /// Width in bytes (wire size).
    pub fn bytes(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }
}

/// Stable fingerprint of a descriptor.
///
/// Two descriptors with equal `TypeInfo` are interchangeable, even when they
/// are distinct allocations from different registry touches.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TypeInfo(Arc<str>);

impl TypeInfo {
    /// The decorated signature string backing this fingerprint.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeInfo({})", self.0)
    }
}

impl fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind-specific payload of a descriptor.
#[derive(Debug, Clone)]
enum Detail {
    None,
    Int { signed: bool, width: IntWidth },
    Float { width: FloatWidth },
    List { element: Arc<TypeDescriptor> },
    Map { key: Arc<TypeDescriptor>, element: Arc<TypeDescriptor> },
    Tuple { members: Vec<Arc<TypeDescriptor>> },
    Pointer { pointee: Arc<TypeDescriptor> },
    Object { meta: Arc<MetaObject>, inherits: Vec<TypeInfo> },
    Iterator { element: Arc<TypeDescriptor> },
}

/// A complete type descriptor.
///
/// The kind tag is immutable, and every kind-specific accessor the
/// conversion engine relies on is total for the matching kind.
#[derive(Debug, Clone)]
pub struct TypeDescriptor {
    name: String,
    kind: Kind,
    detail: Detail,
    info: TypeInfo,
}

impl TypeDescriptor {
    fn build(name: impl Into<String>, kind: Kind, detail: Detail) -> Arc<Self> {
        let name = name.into();
        let mut desc = Self {
            name,
            kind,
            detail,
            info: TypeInfo(Arc::from("")),
        };
        desc.info = TypeInfo(Arc::from(desc.decorated_signature().as_str()));
        Arc::new(desc)
    }

    /// The void descriptor (no payload).
    pub fn void() -> Arc<Self> {
        Self::build("void", Kind::Void, Detail::None)
    }

    /// An integer descriptor with explicit signedness and width.
    pub fn int(signed: bool, width: IntWidth) -> Arc<Self> {
        let name = match (signed, width) {
            (true, IntWidth::W8) => "int8",
            (true, IntWidth::W16) => "int16",
            (true, IntWidth::W32) => "int32",
            (true, IntWidth::W64) => "int64",
            (false, IntWidth::W8) => "uint8",
            (false, IntWidth::W16) => "uint16",
            (false, IntWidth::W32) => "uint32",
            (false, IntWidth::W64) => "uint64",
        };
        Self::build(name, Kind::Int, Detail::Int { signed, width })
    }

    /// A floating point descriptor.
    pub fn float(width: FloatWidth) -> Arc<Self> {
        let name = match width {
            FloatWidth::F32 => "float32",
            FloatWidth::F64 => "float64",
        };
        Self::build(name, Kind::Float, Detail::Float { width })
    }

    /// The string descriptor.
    pub fn string() -> Arc<Self> {
        Self::build("string", Kind::String, Detail::None)
    }

    /// The raw buffer descriptor.
    pub fn raw() -> Arc<Self> {
        Self::build("raw", Kind::Raw, Detail::None)
    }

    /// The dynamic (boxed-any) descriptor.
    pub fn dynamic() -> Arc<Self> {
        Self::build("dynamic", Kind::Dynamic, Detail::None)
    }

    /// The unknown descriptor.
    pub fn unknown() -> Arc<Self> {
        Self::build("unknown", Kind::Unknown, Detail::None)
    }

    /// A list descriptor over `element`.
    pub fn list(element: Arc<TypeDescriptor>) -> Arc<Self> {
        let name = format!("list<{}>", element.name);
        Self::build(name, Kind::List, Detail::List { element })
    }

    /// A map descriptor over `key` and `element`.
    pub fn map(key: Arc<TypeDescriptor>, element: Arc<TypeDescriptor>) -> Arc<Self> {
        let name = format!("map<{},{}>", key.name, element.name);
        Self::build(name, Kind::Map, Detail::Map { key, element })
    }

    /// A tuple descriptor with ordered member types.
    pub fn tuple(members: Vec<Arc<TypeDescriptor>>) -> Arc<Self> {
        let inner: Vec<&str> = members.iter().map(|m| m.name.as_str()).collect();
        let name = format!("tuple<{}>", inner.join(","));
        Self::build(name, Kind::Tuple, Detail::Tuple { members })
    }

    /// A pointer descriptor over `pointee`.
    pub fn pointer(pointee: Arc<TypeDescriptor>) -> Arc<Self> {
        let name = format!("ptr<{}>", pointee.name);
        Self::build(name, Kind::Pointer, Detail::Pointer { pointee })
    }

    /// An object descriptor carrying its meta tables.
    ///
    /// `inherits` lists the fingerprints of the object types this one can be
    /// viewed as (the conversion engine uses it for up-casts).
    pub fn object(
        name: impl Into<String>,
        meta: Arc<MetaObject>,
        inherits: Vec<TypeInfo>,
    ) -> Arc<Self> {
        Self::build(name, Kind::Object, Detail::Object { meta, inherits })
    }

    /// An iterator descriptor over `element`.
    pub fn iterator(element: Arc<TypeDescriptor>) -> Arc<Self> {
        let name = format!("iter<{}>", element.name);
        Self::build(name, Kind::Iterator, Detail::Iterator { element })
    }

    /// Type name for diagnostics.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind tag.
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The stable fingerprint.
    pub fn info(&self) -> &TypeInfo {
        &self.info
    }

    /// Whether two descriptors are interchangeable.
    pub fn same_info(&self, other: &TypeDescriptor) -> bool {
        self.info == other.info
    }

    /// Signedness of an Int descriptor.
    pub fn int_signed(&self) -> Option<bool> {
        match self.detail {
            Detail::Int { signed, .. } => Some(signed),
            _ => None,
        }
    }

    /// Width of an Int descriptor.
    pub fn int_width(&self) -> Option<IntWidth> {
        match self.detail {
            Detail::Int { width, .. } => Some(width),
            _ => None,
        }
    }

    /// Width of a Float descriptor.
    pub fn float_width(&self) -> Option<FloatWidth> {
        match self.detail {
            Detail::Float { width } => Some(width),
            _ => None,
        }
    }

    /// Element type of a List or Iterator descriptor.
    pub fn element_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.detail {
            Detail::List { element } | Detail::Iterator { element } => Some(element),
            Detail::Map { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Key type of a Map descriptor.
    pub fn key_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.detail {
            Detail::Map { key, .. } => Some(key),
            _ => None,
        }
    }

    /// Ordered member types of a Tuple descriptor.
    pub fn member_types(&self) -> Option<&[Arc<TypeDescriptor>]> {
        match &self.detail {
            Detail::Tuple { members } => Some(members),
            _ => None,
        }
    }

    /// Pointee type of a Pointer descriptor.
    pub fn pointee_type(&self) -> Option<&Arc<TypeDescriptor>> {
        match &self.detail {
            Detail::Pointer { pointee } => Some(pointee),
            _ => None,
        }
    }

    /// Meta tables of an Object descriptor.
    pub fn meta_object(&self) -> Option<&Arc<MetaObject>> {
        match &self.detail {
            Detail::Object { meta, .. } => Some(meta),
            _ => None,
        }
    }

    /// Whether an Object descriptor reports inheriting from `target`.
    pub fn inherits(&self, target: &TypeInfo) -> bool {
        match &self.detail {
            Detail::Object { inherits, .. } => inherits.iter().any(|i| i == target),
            _ => false,
        }
    }

    /// Compact wire signature of this type.
    ///
    /// One character per scalar kind, bracketed composites:
    ///
    /// ```text
    /// v void      c/w/i/l  int8/16/32/64     C/W/I/L  uint8/16/32/64
    /// f float32   d float64                  s string   r raw
    /// m dynamic   o object   X unknown       @E iterator
    /// [E] list    {KV} map   (M...) tuple    *P pointer
    /// ```
    pub fn signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out, false);
        out
    }

    /// Signature decorated with object names, used as the `TypeInfo` key so
    /// distinct object types do not collapse onto the bare `o` signature.
    fn decorated_signature(&self) -> String {
        let mut out = String::new();
        self.write_signature(&mut out, true);
        out
    }

    fn write_signature(&self, out: &mut String, decorate: bool) {
        match &self.detail {
            Detail::None => out.push(match self.kind {
                Kind::Void => 'v',
                Kind::String => 's',
                Kind::Raw => 'r',
                Kind::Dynamic => 'm',
                _ => 'X',
            }),
            Detail::Int { signed, width } => out.push(match (signed, width) {
                (true, IntWidth::W8) => 'c',
                (true, IntWidth::W16) => 'w',
                (true, IntWidth::W32) => 'i',
                (true, IntWidth::W64) => 'l',
                (false, IntWidth::W8) => 'C',
                (false, IntWidth::W16) => 'W',
                (false, IntWidth::W32) => 'I',
                (false, IntWidth::W64) => 'L',
            }),
            Detail::Float { width } => out.push(match width {
                FloatWidth::F32 => 'f',
                FloatWidth::F64 => 'd',
            }),
            Detail::List { element } => {
                out.push('[');
                element.write_signature(out, decorate);
                out.push(']');
            }
            Detail::Map { key, element } => {
                out.push('{');
                key.write_signature(out, decorate);
                element.write_signature(out, decorate);
                out.push('}');
            }
            Detail::Tuple { members } => {
                out.push('(');
                for m in members {
                    m.write_signature(out, decorate);
                }
                out.push(')');
            }
            Detail::Pointer { pointee } => {
                out.push('*');
                pointee.write_signature(out, decorate);
            }
            Detail::Object { .. } => {
                out.push('o');
                if decorate {
                    out.push('<');
                    out.push_str(&self.name);
                    out.push('>');
                }
            }
            Detail::Iterator { element } => {
                out.push('@');
                element.write_signature(out, decorate);
            }
        }
    }
}

impl PartialEq for TypeDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl Eq for TypeDescriptor {}
