// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime type and value system.
//!
//! Everything the messaging layer moves around is a [`Value`]: a pair of a
//! [`TypeDescriptor`] and a storage cell of that type. Descriptors are
//! runtime-introspectable records covering the closed kind set (integers,
//! floats, strings, lists, maps, tuples, pointers, objects, dynamics, raw
//! buffers, iterators). The [`convert`] engine rewrites values between
//! structurally-compatible descriptors; the [`registry`] maps static Rust
//! types to descriptors process-wide.

mod convert;
mod registry;
mod type_descriptor;
mod value;

pub use convert::{convert, convert_copy};
pub use registry::{
    register_proxy_generator, type_of, Buffer, Dynamic, FromValue, IntoValue, Reflect,
};
pub use type_descriptor::{FloatWidth, IntWidth, Kind, TypeDescriptor, TypeInfo};
pub use value::{total_cmp, ObjectId, Value};

pub(crate) use value::{value_from_members, value_from_object_id, value_from_pointee};

#[cfg(test)]
mod tests;
