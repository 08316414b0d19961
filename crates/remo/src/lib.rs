// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # REMO - Reflective Object Messaging Runtime
//!
//! A service-oriented RPC substrate over a runtime-introspectable value
//! system. Processes expose named services whose methods, signals and
//! properties are described by type descriptors and invoked across the
//! network with strongly-typed arguments carried in dynamic values.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use remo::{Config, ObjectBuilder, Router, Server, Session};
//! use remo::directory::{install_directory, ServiceDirectory};
//! use std::sync::Arc;
//!
//! # async fn example() -> remo::Result<()> {
//! let config = Config::default();
//! let router = Arc::new(Router::new());
//! install_directory(&router, ServiceDirectory::new());
//!
//! // Expose a service.
//! let calculator = ObjectBuilder::new()
//!     .advertise_method("add", |a: i32, b: i32| a + b)
//!     .advertise_signal("added", "(i)")
//!     .build();
//! let service_id = router.register_service("calculator", calculator);
//!
//! let server = Server::listen(&config, router.clone(), "tcp://127.0.0.1:9559").await?;
//!
//! // Call it from a peer.
//! use remo::dynamic::IntoValue;
//! let session = Session::connect(&config, Arc::new(Router::new()), "tcp://127.0.0.1:9559").await?;
//! let sum = session.call(service_id, 1, 1, &[2i32.into_value(), 40i32.into_value()]).await?;
//! assert_eq!(sum.to_int()?, 42);
//! # drop(server);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                        Application Layer                           |
//! |   ObjectBuilder -> BoundObject    RemoteObject / DirectoryClient   |
//! +--------------------------------------------------------------------+
//! |                         Session Layer                              |
//! |   Session (pending calls, ordering) | Router | Dispatch | Server   |
//! +--------------------------------------------------------------------+
//! |                          Wire Layer                                |
//! |   Message framing | Signatures | Descriptor-driven serialization   |
//! +--------------------------------------------------------------------+
//! |                     Type & Value System                            |
//! |   TypeDescriptor | Value | Conversion engine | Type registry       |
//! +--------------------------------------------------------------------+
//! |                        Network Layer                               |
//! |   Url | Resolver (IPv6 policy) | Connector (TCP, TLS handshake)    |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`dynamic::Value`] | Dynamically-typed value: descriptor plus storage |
//! | [`dynamic::TypeDescriptor`] | Runtime type record over the closed kind set |
//! | [`meta::MetaObject`] | Method/signal/property tables of a service object |
//! | [`Session`] | One framed socket with call correlation |
//! | [`Router`] | (service, object) routing table |
//! | [`directory::ServiceDirectory`] | Well-known name-to-endpoint registry |
//!
//! ## Concurrency Model
//!
//! Single-threaded cooperative per I/O executor: every socket task runs on
//! the tokio handle the consumer injects through [`Config`]; the runtime
//! spawns no threads of its own. On one socket, writes complete in
//! submission order and replies correlate by message id in any order.

/// Runtime configuration injected by consumers.
pub mod config;
/// The service directory: well-known name-to-endpoint registry.
pub mod directory;
/// Runtime type and value system (descriptors, values, conversion).
pub mod dynamic;
/// Error taxonomy and crate-level error type.
pub mod error;
/// Meta-description of service objects (methods, signals, properties).
pub mod meta;
/// Endpoint resolution and connection establishment.
pub mod net;
/// Sessions, routing and dispatch over connected sockets.
pub mod session;
/// Wire format: framing, signatures, payload serialization.
pub mod wire;

pub use config::Config;
pub use error::{Error, ErrorCode, Result};
pub use net::{CancelToken, HandshakeSide, TlsContext, Url};
pub use session::{
    BoundObject, CallHandle, ObjectBuilder, ObjectHost, RemoteObject, Router, Server, Session,
    SocketState,
};
