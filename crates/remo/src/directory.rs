// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! The service directory.
//!
//! A well-known object (service id 1) mapping service names to endpoints.
//! It is built with the same meta-object machinery as user services:
//! `service`, `services`, `registerService` and `unregisterService`
//! methods plus `serviceAdded` / `serviceRemoved` signals, so peers reach
//! it through ordinary calls.

use crate::dynamic::{type_of, FromValue, IntoValue, Value};
use crate::error::{Error, Result};
use crate::meta::{GenericFunction, MetaObject, MetaObjectBuilder};
use crate::session::{BoundObject, ObjectBuilder, RemoteObject, Router, Session};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Well-known service id of the directory itself.
pub const SERVICE_DIRECTORY_ID: u32 = 1;

/// Well-known name of the directory service.
pub const SERVICE_DIRECTORY_NAME: &str = "ServiceDirectory";

/// One directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    /// Assigned service id
    pub id: u32,
    /// Unique service name
    pub name: String,
    /// Endpoints the service listens on, in preference order
    pub endpoints: Vec<String>,
}

impl ServiceInfo {
    fn to_value(&self) -> Value {
        (self.id, self.name.clone(), self.endpoints.clone()).into_value()
    }

    fn from_value(v: &Value) -> Result<Self> {
        let (id, name, endpoints) = <(u32, String, Vec<String>)>::from_value(v)?;
        Ok(Self {
            id,
            name,
            endpoints,
        })
    }
}

/// Name-to-endpoint registry backing the directory service.
pub struct ServiceDirectory {
    records: RwLock<HashMap<u32, ServiceInfo>>,
    next_id: AtomicU32,
}

impl ServiceDirectory {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            records: RwLock::new(HashMap::new()),
            // Id 1 is the directory itself.
            next_id: AtomicU32::new(SERVICE_DIRECTORY_ID + 1),
        })
    }

    /// Register a service; duplicate names are rejected.
    pub fn register(&self, name: &str, endpoints: Vec<String>) -> Result<u32> {
        let mut records = self.records.write();
        if records.values().any(|r| r.name == name) {
            return Err(Error::Protocol(format!(
                "service '{}' is already registered",
                name
            )));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        records.insert(
            id,
            ServiceInfo {
                id,
                name: name.to_string(),
                endpoints,
            },
        );
        log::info!("directory: registered '{}' as service {}", name, id);
        Ok(id)
    }

    /// Drop a registration.
    pub fn unregister(&self, id: u32) -> Result<()> {
        match self.records.write().remove(&id) {
            Some(info) => {
                log::info!("directory: unregistered '{}' ({})", info.name, id);
                Ok(())
            }
            None => Err(Error::NotFound(format!("service {}", id))),
        }
    }

    /// Look up one record by name.
    pub fn lookup(&self, name: &str) -> Option<ServiceInfo> {
        self.records.read().values().find(|r| r.name == name).cloned()
    }

    /// All records, unordered.
    pub fn list(&self) -> Vec<ServiceInfo> {
        self.records.read().values().cloned().collect()
    }
}

/// Compact signature of one directory record, `(I s [s])`.
const SERVICE_INFO_SIG: &str = "(Is[s])";

/// The meta tables of the directory object, identical on both ends.
pub fn service_directory_meta() -> Arc<MetaObject> {
    let mut b = MetaObjectBuilder::new();
    b.add_method("service", "(s)", SERVICE_INFO_SIG);
    b.add_method("services", "()", "[(Is[s])]");
    b.add_method("registerService", "(s[s])", "I");
    b.add_method("unregisterService", "(I)", "v");
    b.add_signal("serviceAdded", "(Is)");
    b.add_signal("serviceRemoved", "(Is)");
    Arc::new(b.build())
}

/// Build the directory's bound object over a registry instance.
///
/// Member declaration order must match [`service_directory_meta`], which
/// remote peers use to resolve action ids.
pub fn service_directory_object(directory: Arc<ServiceDirectory>) -> BoundObject {
    let info_type = type_of::<(u32, String, Vec<String>)>();
    let list_type = type_of::<Vec<(u32, String, Vec<String>)>>();

    let lookup_dir = directory.clone();
    let list_dir = directory.clone();
    let register_dir = directory.clone();
    let unregister_dir = directory;

    ObjectBuilder::new()
        .advertise_raw_method(
            "service",
            GenericFunction::from_raw(info_type.clone(), vec![type_of::<String>()], move |args| {
                let name = args[0].to_str()?;
                lookup_dir
                    .lookup(name)
                    .map(|info| info.to_value())
                    .ok_or_else(|| Error::NotFound(format!("service '{}'", name)))
            }),
        )
        .advertise_raw_method(
            "services",
            GenericFunction::from_raw(list_type, Vec::new(), move |_args| {
                Ok(list_dir
                    .list()
                    .iter()
                    .map(|info| (info.id, info.name.clone(), info.endpoints.clone()))
                    .collect::<Vec<_>>()
                    .into_value())
            }),
        )
        .advertise_raw_method(
            "registerService",
            GenericFunction::from_raw(
                type_of::<u32>(),
                vec![type_of::<String>(), type_of::<Vec<String>>()],
                move |args| {
                    let name = args[0].to_str()?;
                    let endpoints = Vec::<String>::from_value(&args[1])?;
                    register_dir.register(name, endpoints).map(IntoValue::into_value)
                },
            ),
        )
        .advertise_raw_method(
            "unregisterService",
            GenericFunction::from_raw(type_of::<()>(), vec![type_of::<u32>()], move |args| {
                let id = u32::from_value(&args[0])?;
                unregister_dir.unregister(id)?;
                Ok(().into_value())
            }),
        )
        .advertise_signal("serviceAdded", "(Is)")
        .advertise_signal("serviceRemoved", "(Is)")
        .build()
}

/// Install a directory into a router under the well-known service id.
pub fn install_directory(router: &Router, directory: Arc<ServiceDirectory>) {
    router.register_service_with_id(
        SERVICE_DIRECTORY_ID,
        SERVICE_DIRECTORY_NAME,
        service_directory_object(directory),
    );
}

/// Client face of a remote service directory.
pub struct DirectoryClient {
    remote: RemoteObject,
}

impl DirectoryClient {
    /// Bind the well-known directory object on a session.
    pub fn new(session: &Session) -> Self {
        let remote = session.remote_object(
            SERVICE_DIRECTORY_ID,
            crate::session::MAIN_OBJECT_ID,
            service_directory_meta(),
        );
        Self { remote }
    }

    /// Resolve a service name to its record.
    pub async fn service(&self, name: &str) -> Result<ServiceInfo> {
        let reply = self.remote.call("service", &[name.into_value()]).await?;
        ServiceInfo::from_value(&reply)
    }

    /// List every registered service.
    pub async fn services(&self) -> Result<Vec<ServiceInfo>> {
        let reply = self.remote.call("services", &[]).await?;
        reply
            .elements()?
            .map(ServiceInfo::from_value)
            .collect()
    }

    /// Register a service by name and endpoints, returning its id.
    pub async fn register_service(&self, name: &str, endpoints: Vec<String>) -> Result<u32> {
        let reply = self
            .remote
            .call(
                "registerService",
                &[name.into_value(), endpoints.into_value()],
            )
            .await?;
        u32::from_value(&reply)
    }

    /// Unregister a service by id.
    pub async fn unregister_service(&self, id: u32) -> Result<()> {
        self.remote
            .call("unregisterService", &[id.into_value()])
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::dispatch_test_support::roundtrip_call;

    #[test]
    fn registry_assigns_and_rejects() {
        let dir = ServiceDirectory::new();
        let id = dir.register("calc", vec!["tcp://127.0.0.1:9559".into()]).unwrap();
        assert!(id > SERVICE_DIRECTORY_ID);
        assert!(dir.register("calc", vec![]).is_err());

        let info = dir.lookup("calc").unwrap();
        assert_eq!(info.id, id);
        assert_eq!(info.endpoints.len(), 1);

        dir.unregister(id).unwrap();
        assert!(dir.lookup("calc").is_none());
        assert!(dir.unregister(id).is_err());
    }

    #[test]
    fn meta_matches_bound_object() {
        let meta = service_directory_meta();
        let object = service_directory_object(ServiceDirectory::new());
        for method in meta.methods() {
            let id = object
                .meta()
                .method_id(&method.signature())
                .unwrap_or_else(|| panic!("missing {}", method.signature()));
            assert_eq!(id, method.id, "id drift for {}", method.signature());
        }
        assert!(object.signal_named("serviceAdded").is_some());
    }

    #[test]
    fn service_lookup_through_dispatch() {
        let router = Router::new();
        let dir = ServiceDirectory::new();
        dir.register("calc", vec!["tcp://127.0.0.1:1234".into()]).unwrap();
        install_directory(&router, dir);

        let meta = service_directory_meta();
        let action = meta.method_id("service::(s)").unwrap();
        let reply = roundtrip_call(
            &router,
            SERVICE_DIRECTORY_ID,
            action,
            &["calc".into_value()],
        )
        .expect("lookup succeeds");
        let info = ServiceInfo::from_value(&reply).unwrap();
        assert_eq!(info.name, "calc");
        assert_eq!(info.endpoints, vec!["tcp://127.0.0.1:1234".to_string()]);

        let err = roundtrip_call(
            &router,
            SERVICE_DIRECTORY_ID,
            action,
            &["ghost".into_value()],
        )
        .unwrap_err();
        assert_eq!(err.code(), crate::ErrorCode::NotFound);
    }
}
