// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Conversion-checked property slots.

use crate::dynamic::{convert, TypeDescriptor, Value};
use crate::error::{Error, Result};
use crate::meta::Signal;
use parking_lot::Mutex;
use std::sync::Arc;

/// A typed value slot with a change signal.
///
/// Stores values of one descriptor; assignment routes through the
/// conversion engine, so any structurally-compatible value is accepted and
/// anything else is rejected without touching the slot.
pub struct GenericProperty {
    descriptor: Arc<TypeDescriptor>,
    value: Mutex<Value>,
    changed: Signal,
}

impl GenericProperty {
    /// A property of `descriptor`, initialized to the zero value.
    pub fn new(descriptor: Arc<TypeDescriptor>) -> Self {
        let value = Value::zero(descriptor.clone());
        Self {
            descriptor,
            value: Mutex::new(value),
            changed: Signal::new(),
        }
    }

    /// The property's descriptor.
    pub fn descriptor(&self) -> &Arc<TypeDescriptor> {
        &self.descriptor
    }

    /// Current value (owning copy).
    pub fn get(&self) -> Value {
        self.value.lock().clone()
    }

    /// Assign, converting to the property's type first.
    ///
    /// Fires the change signal with the stored value after a successful
    /// assignment.
    pub fn set(&self, v: &Value) -> Result<()> {
        let converted = convert(v, &self.descriptor)
            .ok_or_else(|| {
                Error::ConversionFailed(format!(
                    "failed converting {} to {}",
                    v.kind().name(),
                    self.descriptor.name()
                ))
            })?
            .into_owned();
        *self.value.lock() = converted.clone();
        self.changed.emit(&[converted], None);
        Ok(())
    }

    /// The change signal, for subscription management.
    pub fn changed(&self) -> &Signal {
        &self.changed
    }
}

impl std::fmt::Debug for GenericProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericProperty")
            .field("descriptor", &self.descriptor.name())
            .finish()
    }
}
