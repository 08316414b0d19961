// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Endpoint resolution and connection establishment.
//!
//! A textual endpoint (`tcp://host:port` or `tcps://host:port`) is parsed
//! into a [`Url`], resolved into address entries, filtered by IPv6 policy,
//! and dialed; `tcps` endpoints additionally run a TLS handshake. Every
//! stage is cancellable through a [`CancelToken`] checked at suspension
//! points.

mod connect;
mod resolve;
mod url;

pub use connect::{connect, connect_with_callback, HandshakeSide, SocketStream, TlsContext};
pub use resolve::{
    find_first_valid_if_any, resolve_url, resolve_url_list, Resolve, ResolveEntry, SystemResolver,
};
pub use url::{Scheme, Url};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared with an asynchronous pipeline.
///
/// Pipelines poll the token at each suspension point and complete with
/// [`Cancelled`](crate::ErrorCode::Cancelled) once it is set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Fail with `Cancelled` if cancellation was requested.
    pub fn checkpoint(&self) -> crate::Result<()> {
        if self.is_cancelled() {
            Err(crate::Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
