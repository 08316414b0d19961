// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Method, signal and property descriptors.
//!
//! Ids are scoped to their parent object, non-zero (0 is reserved for "not
//! a member") and never reused within an object lifetime. Signatures are
//! case-sensitive compact type strings, `name::(args)` for members.

use std::collections::HashMap;

/// Reserved member id, never assigned.
pub const INVALID_MEMBER_ID: u32 = 0;

/// Describes one callable method of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaMethod {
    /// Stable non-zero id within the parent object
    pub id: u32,
    /// Method name
    pub name: String,
    /// Compact signature of the parenthesized argument list, e.g. `(is)`
    pub parameters: String,
    /// Compact signature of the return type, e.g. `i`
    pub returns: String,
}

impl MetaMethod {
    /// Full member signature, `name::(args)`.
    pub fn signature(&self) -> String {
        format!("{}::{}", self.name, self.parameters)
    }
}

/// Describes one signal of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaSignal {
    /// Stable non-zero id within the parent object
    pub id: u32,
    /// Signal name
    pub name: String,
    /// Compact signature of the emitted argument list
    pub parameters: String,
}

impl MetaSignal {
    /// Full member signature, `name::(args)`.
    pub fn signature(&self) -> String {
        format!("{}::{}", self.name, self.parameters)
    }
}

/// Describes one property of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaProperty {
    /// Stable non-zero id within the parent object
    pub id: u32,
    /// Property name
    pub name: String,
    /// Compact signature of the property type
    pub signature: String,
}

/// Introspectable member tables of an object type.
#[derive(Debug, Clone, Default)]
pub struct MetaObject {
    methods: HashMap<u32, MetaMethod>,
    signals: HashMap<u32, MetaSignal>,
    properties: HashMap<u32, MetaProperty>,
}

impl MetaObject {
    /// Look up a method by id.
    pub fn method(&self, id: u32) -> Option<&MetaMethod> {
        self.methods.get(&id)
    }

    /// Look up a signal by id.
    pub fn signal(&self, id: u32) -> Option<&MetaSignal> {
        self.signals.get(&id)
    }

    /// Look up a property by id.
    pub fn property(&self, id: u32) -> Option<&MetaProperty> {
        self.properties.get(&id)
    }

    /// Find a method id by full signature (`name::(args)`), case-sensitive.
    pub fn method_id(&self, signature: &str) -> Option<u32> {
        self.methods
            .values()
            .find(|m| m.signature() == signature)
            .map(|m| m.id)
    }

    /// Find a method id by bare name. With overloads, the lowest id wins.
    pub fn method_id_by_name(&self, name: &str) -> Option<u32> {
        self.methods
            .values()
            .filter(|m| m.name == name)
            .map(|m| m.id)
            .min()
    }

    /// Find a signal id by full signature or bare name.
    pub fn signal_id(&self, name_or_signature: &str) -> Option<u32> {
        self.signals
            .values()
            .filter(|s| s.name == name_or_signature || s.signature() == name_or_signature)
            .map(|s| s.id)
            .min()
    }

    /// Find a property id by name.
    pub fn property_id(&self, name: &str) -> Option<u32> {
        self.properties
            .values()
            .find(|p| p.name == name)
            .map(|p| p.id)
    }

    /// All methods, unordered.
    pub fn methods(&self) -> impl Iterator<Item = &MetaMethod> {
        self.methods.values()
    }

    /// All signals, unordered.
    pub fn signals(&self) -> impl Iterator<Item = &MetaSignal> {
        self.signals.values()
    }

    /// All properties, unordered.
    pub fn properties(&self) -> impl Iterator<Item = &MetaProperty> {
        self.properties.values()
    }
}

/// Builder assigning ids sequentially from 1.
#[derive(Debug, Default)]
pub struct MetaObjectBuilder {
    next_id: u32,
    meta: MetaObject,
}

impl MetaObjectBuilder {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            meta: MetaObject::default(),
        }
    }

    fn take_id(&mut self) -> u32 {
        let id = self.next_id.max(1);
        self.next_id = id + 1;
        id
    }

    /// Declare a method; returns its assigned id.
    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        parameters: impl Into<String>,
        returns: impl Into<String>,
    ) -> u32 {
        let id = self.take_id();
        self.meta.methods.insert(
            id,
            MetaMethod {
                id,
                name: name.into(),
                parameters: parameters.into(),
                returns: returns.into(),
            },
        );
        id
    }

    /// Declare a signal; returns its assigned id.
    pub fn add_signal(&mut self, name: impl Into<String>, parameters: impl Into<String>) -> u32 {
        let id = self.take_id();
        self.meta.signals.insert(
            id,
            MetaSignal {
                id,
                name: name.into(),
                parameters: parameters.into(),
            },
        );
        id
    }

    /// Declare a property; returns its assigned id.
    pub fn add_property(&mut self, name: impl Into<String>, signature: impl Into<String>) -> u32 {
        let id = self.take_id();
        self.meta.properties.insert(
            id,
            MetaProperty {
                id,
                name: name.into(),
                signature: signature.into(),
            },
        );
        id
    }

    /// Finish building.
    pub fn build(self) -> MetaObject {
        self.meta
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_start_at_one() {
        let mut b = MetaObjectBuilder::new();
        let m = b.add_method("add", "(ii)", "i");
        let s = b.add_signal("added", "(i)");
        let p = b.add_property("total", "i");
        assert_eq!((m, s, p), (1, 2, 3));
        assert_ne!(m, INVALID_MEMBER_ID);
    }

    #[test]
    fn signature_lookup_is_case_sensitive() {
        let mut b = MetaObjectBuilder::new();
        let id = b.add_method("add", "(ii)", "i");
        let meta = b.build();

        assert_eq!(meta.method_id("add::(ii)"), Some(id));
        assert_eq!(meta.method_id("Add::(ii)"), None);
        assert_eq!(meta.method_id_by_name("add"), Some(id));
    }

    #[test]
    fn overloads_resolve_to_lowest_id() {
        let mut b = MetaObjectBuilder::new();
        let first = b.add_method("emit", "(i)", "v");
        let _second = b.add_method("emit", "(s)", "v");
        let meta = b.build();
        assert_eq!(meta.method_id_by_name("emit"), Some(first));
        assert_eq!(meta.method_id("emit::(s)"), Some(2));
    }

    #[test]
    fn member_tables_are_disjoint() {
        let mut b = MetaObjectBuilder::new();
        let m = b.add_method("run", "()", "v");
        let s = b.add_signal("done", "()");
        let meta = b.build();

        assert!(meta.method(m).is_some());
        assert!(meta.signal(m).is_none());
        assert!(meta.signal(s).is_some());
        assert_eq!(meta.signal_id("done"), Some(s));
        assert_eq!(meta.property_id("done"), None);
    }
}
