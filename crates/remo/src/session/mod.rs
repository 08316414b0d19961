// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Sessions: framed messaging over connected sockets.
//!
//! A [`Session`] wraps one socket with a writer task (writes complete in
//! submission order), a reader task (frames in, dispatch or completion
//! out), and a pending-call table matching out-of-order replies by message
//! id. Incoming calls route through the shared [`Router`] into
//! [`BoundObject`]s living in per-service object arenas.

mod dispatch;
mod host;
mod server;
#[allow(clippy::module_inception)]
mod session;

pub use host::{BoundObject, ObjectBuilder, ObjectHost, Router, MAIN_OBJECT_ID};
pub use server::Server;
pub use session::{CallHandle, RemoteObject, Session, SocketState};

pub(crate) use dispatch::{decode_error, dispatch};

#[cfg(test)]
pub(crate) use dispatch::dispatch_test_support;
