// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process-wide type registry.
//!
//! Maps static Rust types to their [`TypeDescriptor`] through the
//! [`Reflect`] trait. Registration is lazy, idempotent and first-touch-wins;
//! descriptors are never destroyed. This module and the proxy-generator map
//! are the only process-wide state in the crate.

use crate::dynamic::type_descriptor::{FloatWidth, IntWidth, TypeDescriptor, TypeInfo};
use crate::dynamic::value::{Storage, Value};
use crate::error::{Error, Result};
use parking_lot::RwLock;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

static REGISTRY: OnceLock<RwLock<HashMap<TypeId, Arc<TypeDescriptor>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeId, Arc<TypeDescriptor>>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Types that expose a runtime descriptor.
pub trait Reflect: 'static {
    /// Build the descriptor for this type. Called at most once per process;
    /// use [`type_of`] to get the registered instance.
    fn descriptor() -> Arc<TypeDescriptor>;
}

/// The registered descriptor for `T`, constructing it on first touch.
pub fn type_of<T: Reflect>() -> Arc<TypeDescriptor> {
    let key = TypeId::of::<T>();
    if let Some(found) = registry().read().get(&key) {
        return found.clone();
    }
    let fresh = T::descriptor();
    registry().write().entry(key).or_insert(fresh).clone()
}

// ----------------------------------------------------------------------
// Proxy generator map
// ----------------------------------------------------------------------

/// Factory turning an object handle value into a typed proxy value.
pub type ProxyGenerator = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;

static PROXY_GENERATORS: OnceLock<RwLock<HashMap<TypeInfo, ProxyGenerator>>> = OnceLock::new();

fn proxy_generators() -> &'static RwLock<HashMap<TypeInfo, ProxyGenerator>> {
    PROXY_GENERATORS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Register a proxy generator for a pointed-to object type.
///
/// The conversion engine consults the map when converting an object handle
/// into a pointer-to-object of that type.
pub fn register_proxy_generator(
    pointee: &Arc<TypeDescriptor>,
    generator: impl Fn(&Value) -> Option<Value> + Send + Sync + 'static,
) {
    proxy_generators()
        .write()
        .insert(pointee.info().clone(), Arc::new(generator));
}

pub(crate) fn proxy_generator_for(info: &TypeInfo) -> Option<ProxyGenerator> {
    proxy_generators().read().get(info).cloned()
}

// ----------------------------------------------------------------------
// Value bridging traits
// ----------------------------------------------------------------------

/// Conversion of a concrete Rust value into a dynamic [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

/// Strict extraction of a concrete Rust value out of a dynamic [`Value`].
///
/// This is a re-cast, not a conversion: the value must already carry the
/// expected shape (callers route through the conversion engine first when
/// shapes may differ). Numeric extraction still range-checks.
pub trait FromValue: Sized {
    fn from_value(v: &Value) -> Result<Self>;
}

/// Raw byte buffer, reflected as the Raw kind (a `Vec<u8>` reflects as a
/// list of bytes instead).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Buffer(pub Vec<u8>);

/// Explicitly dynamic argument or return slot.
#[derive(Debug, Clone, Default)]
pub struct Dynamic(pub Value);

impl Reflect for () {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::void()
    }
}

macro_rules! reflect_int {
    ($ty:ty, $signed:expr, $width:expr) => {
        impl Reflect for $ty {
            fn descriptor() -> Arc<TypeDescriptor> {
                TypeDescriptor::int($signed, $width)
            }
        }

        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                Value::with_storage(type_of::<$ty>(), Storage::Int(self as i64))
            }
        }

        impl FromValue for $ty {
            fn from_value(v: &Value) -> Result<Self> {
                let signed = v
                    .descriptor()
                    .and_then(|d| d.int_signed())
                    .unwrap_or(true);
                if signed {
                    <$ty>::try_from(v.to_int()?)
                        .map_err(|_| Error::Overflow(format!("value does not fit {}", stringify!($ty))))
                } else {
                    <$ty>::try_from(v.to_uint()?)
                        .map_err(|_| Error::Overflow(format!("value does not fit {}", stringify!($ty))))
                }
            }
        }
    };
}

reflect_int!(i8, true, IntWidth::W8);
reflect_int!(i16, true, IntWidth::W16);
reflect_int!(i32, true, IntWidth::W32);
reflect_int!(i64, true, IntWidth::W64);
reflect_int!(u8, false, IntWidth::W8);
reflect_int!(u16, false, IntWidth::W16);
reflect_int!(u32, false, IntWidth::W32);
reflect_int!(u64, false, IntWidth::W64);

impl Reflect for f32 {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::float(FloatWidth::F32)
    }
}

impl Reflect for f64 {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::float(FloatWidth::F64)
    }
}

impl IntoValue for f32 {
    fn into_value(self) -> Value {
        Value::with_storage(type_of::<f32>(), Storage::Float(self as f64))
    }
}

impl IntoValue for f64 {
    fn into_value(self) -> Value {
        Value::with_storage(type_of::<f64>(), Storage::Float(self))
    }
}

impl FromValue for f32 {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(v.to_double()? as f32)
    }
}

impl FromValue for f64 {
    fn from_value(v: &Value) -> Result<Self> {
        v.to_double()
    }
}

impl Reflect for String {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::string()
    }
}

impl IntoValue for String {
    fn into_value(self) -> Value {
        Value::with_storage(type_of::<String>(), Storage::Str(self))
    }
}

impl IntoValue for &str {
    fn into_value(self) -> Value {
        self.to_string().into_value()
    }
}

impl FromValue for String {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(v.to_str()?.to_string())
    }
}

impl Reflect for Buffer {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::raw()
    }
}

impl IntoValue for Buffer {
    fn into_value(self) -> Value {
        Value::with_storage(type_of::<Buffer>(), Storage::Raw(self.0))
    }
}

impl FromValue for Buffer {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(Buffer(v.to_raw()?.to_vec()))
    }
}

impl Reflect for Dynamic {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::dynamic()
    }
}

impl IntoValue for Dynamic {
    fn into_value(self) -> Value {
        self.0.into_dynamic()
    }
}

impl FromValue for Dynamic {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(Dynamic(v.dynamic_inner()?.clone()))
    }
}

impl FromValue for () {
    fn from_value(_v: &Value) -> Result<Self> {
        Ok(())
    }
}

impl IntoValue for () {
    fn into_value(self) -> Value {
        Value::void()
    }
}

impl<T: Reflect> Reflect for Vec<T> {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::list(type_of::<T>())
    }
}

impl<T: Reflect + IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        let items: Vec<Value> = self.into_iter().map(IntoValue::into_value).collect();
        Value::with_storage(type_of::<Vec<T>>(), Storage::List(items))
    }
}

impl<T: Reflect + FromValue> FromValue for Vec<T> {
    fn from_value(v: &Value) -> Result<Self> {
        v.elements()?.map(T::from_value).collect()
    }
}

impl<K: Reflect, V: Reflect> Reflect for HashMap<K, V> {
    fn descriptor() -> Arc<TypeDescriptor> {
        TypeDescriptor::map(type_of::<K>(), type_of::<V>())
    }
}

impl<K, V> IntoValue for HashMap<K, V>
where
    K: Reflect + IntoValue,
    V: Reflect + IntoValue,
{
    fn into_value(self) -> Value {
        let pairs: Vec<(Value, Value)> = self
            .into_iter()
            .map(|(k, v)| (k.into_value(), v.into_value()))
            .collect();
        Value::with_storage(type_of::<HashMap<K, V>>(), Storage::Map(pairs))
    }
}

impl<K, V> FromValue for HashMap<K, V>
where
    K: Reflect + FromValue + std::hash::Hash + Eq,
    V: Reflect + FromValue,
{
    fn from_value(v: &Value) -> Result<Self> {
        v.pairs()?
            .map(|(k, e)| Ok((K::from_value(k)?, V::from_value(e)?)))
            .collect()
    }
}

macro_rules! reflect_tuple {
    ($(($($name:ident : $idx:tt),+))+) => {
        $(
            impl<$($name: Reflect),+> Reflect for ($($name,)+) {
                fn descriptor() -> Arc<TypeDescriptor> {
                    TypeDescriptor::tuple(vec![$(type_of::<$name>()),+])
                }
            }

            impl<$($name: Reflect + IntoValue),+> IntoValue for ($($name,)+) {
                fn into_value(self) -> Value {
                    Value::with_storage(
                        type_of::<($($name,)+)>(),
                        Storage::Tuple(vec![$(self.$idx.into_value()),+]),
                    )
                }
            }

            impl<$($name: Reflect + FromValue),+> FromValue for ($($name,)+) {
                fn from_value(v: &Value) -> Result<Self> {
                    Ok(($($name::from_value(v.at($idx)?)?,)+))
                }
            }
        )+
    };
}

reflect_tuple! {
    (A: 0)
    (A: 0, B: 1)
    (A: 0, B: 1, C: 2)
    (A: 0, B: 1, C: 2, D: 3)
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl FromValue for Value {
    fn from_value(v: &Value) -> Result<Self> {
        Ok(v.clone())
    }
}
