// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Bound objects and the service routing table.
//!
//! A [`BoundObject`] joins a [`MetaObject`] with the live implementations
//! of its members: generic functions for methods, signals, properties.
//! Objects live in an [`ObjectHost`] arena keyed by [`ObjectId`]; services
//! map a service id to one host through the [`Router`].

use crate::dynamic::{ObjectId, TypeDescriptor};
use crate::meta::{
    GenericFunction, GenericProperty, IntoGenericFunction, MetaObject, MetaObjectBuilder, Signal,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Object id of a service's main object.
pub const MAIN_OBJECT_ID: u32 = 1;

/// A service object with live member implementations.
pub struct BoundObject {
    meta: Arc<MetaObject>,
    methods: HashMap<u32, GenericFunction>,
    signals: HashMap<u32, Arc<Signal>>,
    properties: HashMap<u32, Arc<GenericProperty>>,
}

impl BoundObject {
    /// The object's meta tables.
    pub fn meta(&self) -> &Arc<MetaObject> {
        &self.meta
    }

    /// Live method behind an id.
    pub fn method(&self, id: u32) -> Option<&GenericFunction> {
        self.methods.get(&id)
    }

    /// Live signal behind an id.
    pub fn signal(&self, id: u32) -> Option<&Arc<Signal>> {
        self.signals.get(&id)
    }

    /// Live property behind an id.
    pub fn property(&self, id: u32) -> Option<&Arc<GenericProperty>> {
        self.properties.get(&id)
    }

    /// Find a live signal by name.
    pub fn signal_named(&self, name: &str) -> Option<&Arc<Signal>> {
        self.meta.signal_id(name).and_then(|id| self.signals.get(&id))
    }

    /// Find a live property by name.
    pub fn property_named(&self, name: &str) -> Option<&Arc<GenericProperty>> {
        self.meta.property_id(name).and_then(|id| self.properties.get(&id))
    }
}

impl std::fmt::Debug for BoundObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundObject")
            .field("methods", &self.methods.len())
            .field("signals", &self.signals.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Builder advertising members onto a fresh object.
///
/// Member signatures are recorded from the wrapped functions, so the meta
/// tables always agree with the implementations.
#[derive(Default)]
pub struct ObjectBuilder {
    meta: MetaObjectBuilder,
    methods: HashMap<u32, GenericFunction>,
    signals: HashMap<u32, Arc<Signal>>,
    properties: HashMap<u32, Arc<GenericProperty>>,
}

impl ObjectBuilder {
    pub fn new() -> Self {
        Self {
            meta: MetaObjectBuilder::new(),
            methods: HashMap::new(),
            signals: HashMap::new(),
            properties: HashMap::new(),
        }
    }

    /// Advertise a statically-typed method.
    pub fn advertise_method<Args, F>(mut self, name: &str, f: F) -> Self
    where
        F: IntoGenericFunction<Args>,
    {
        let function = f.into_generic_function();
        let id = self.meta.add_method(
            name,
            function.parameters_signature(),
            function.return_signature(),
        );
        self.methods.insert(id, function);
        self
    }

    /// Advertise a pre-wrapped (possibly fully dynamic) method.
    pub fn advertise_raw_method(mut self, name: &str, function: GenericFunction) -> Self {
        let id = self.meta.add_method(
            name,
            function.parameters_signature(),
            function.return_signature(),
        );
        self.methods.insert(id, function);
        self
    }

    /// Advertise a signal with the given parameter signature, e.g. `(is)`.
    pub fn advertise_signal(mut self, name: &str, parameters: &str) -> Self {
        let id = self.meta.add_signal(name, parameters);
        self.signals.insert(id, Arc::new(Signal::new()));
        self
    }

    /// Advertise a property of the given type.
    pub fn advertise_property(mut self, name: &str, descriptor: Arc<TypeDescriptor>) -> Self {
        let id = self.meta.add_property(name, descriptor.signature());
        self.properties
            .insert(id, Arc::new(GenericProperty::new(descriptor)));
        self
    }

    pub fn build(self) -> BoundObject {
        BoundObject {
            meta: Arc::new(self.meta.build()),
            methods: self.methods,
            signals: self.signals,
            properties: self.properties,
        }
    }
}

/// Arena of live objects for one service.
pub struct ObjectHost {
    objects: RwLock<HashMap<ObjectId, Arc<BoundObject>>>,
    next_object: AtomicU32,
}

impl ObjectHost {
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(HashMap::new()),
            next_object: AtomicU32::new(MAIN_OBJECT_ID),
        }
    }

    /// Add an object, returning its arena id.
    pub fn add(&self, object: BoundObject) -> ObjectId {
        let id = ObjectId(self.next_object.fetch_add(1, Ordering::Relaxed));
        self.objects.write().insert(id, Arc::new(object));
        id
    }

    /// Fetch an object by id.
    pub fn get(&self, id: ObjectId) -> Option<Arc<BoundObject>> {
        self.objects.read().get(&id).cloned()
    }

    /// Remove an object. Ids are never reused.
    pub fn remove(&self, id: ObjectId) -> bool {
        self.objects.write().remove(&id).is_some()
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

impl std::fmt::Debug for ObjectHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHost").field("objects", &self.len()).finish()
    }
}

struct ServiceEntry {
    name: String,
    host: Arc<ObjectHost>,
}

/// Routing table from service ids to object hosts.
pub struct Router {
    services: RwLock<HashMap<u32, ServiceEntry>>,
    next_service: AtomicU32,
}

impl Router {
    pub fn new() -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            // Service id 1 is reserved for the service directory.
            next_service: AtomicU32::new(2),
        }
    }

    /// Register a service under an explicit id (directory bootstrap).
    pub fn register_service_with_id(&self, id: u32, name: &str, main_object: BoundObject) {
        let host = Arc::new(ObjectHost::new());
        host.add(main_object);
        self.services.write().insert(
            id,
            ServiceEntry {
                name: name.to_string(),
                host,
            },
        );
        log::debug!("router: registered service '{}' as {}", name, id);
    }

    /// Register a service; its main object gets [`MAIN_OBJECT_ID`].
    pub fn register_service(&self, name: &str, main_object: BoundObject) -> u32 {
        let id = self.next_service.fetch_add(1, Ordering::Relaxed);
        self.register_service_with_id(id, name, main_object);
        id
    }

    /// Remove a service and its whole arena.
    pub fn unregister_service(&self, id: u32) -> bool {
        let removed = self.services.write().remove(&id);
        if let Some(entry) = &removed {
            log::debug!("router: unregistered service '{}' ({})", entry.name, id);
        }
        removed.is_some()
    }

    /// The object host of a service.
    pub fn service_host(&self, id: u32) -> Option<Arc<ObjectHost>> {
        self.services.read().get(&id).map(|e| e.host.clone())
    }

    /// Service id lookup by name.
    pub fn service_id(&self, name: &str) -> Option<u32> {
        self.services
            .read()
            .iter()
            .find(|(_, e)| e.name == name)
            .map(|(id, _)| *id)
    }

    /// Resolve a (service, object) pair to a bound object.
    pub fn find(&self, service: u32, object: u32) -> Option<Arc<BoundObject>> {
        self.service_host(service)?.get(ObjectId(object))
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("services", &self.services.read().len())
            .finish()
    }
}
