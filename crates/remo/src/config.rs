// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime configuration injected by consumers.
//!
//! The runtime spawns no executor of its own: all socket I/O and
//! continuations run on the tokio handle supplied here (or the ambient
//! handle of the calling task when none is given). TLS contexts arrive
//! pre-built; certificate material loading stays outside the runtime.

use crate::dynamic::{IntoValue, Value};
use crate::net::TlsContext;
use std::time::Duration;

/// Default service directory endpoint.
pub const DEFAULT_DIRECTORY_URL: &str = "tcp://127.0.0.1:9559";

/// Default per-call reply timeout.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

/// Wire format version announced in the capability map.
pub const WIRE_VERSION: u32 = 1;

/// Consumer-supplied runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Well-known service directory endpoint
    pub directory_url: String,

    /// Force TLS even for `tcp://` endpoints
    pub ssl_enabled: bool,

    /// Admit IPv6 resolution entries
    pub ipv6_enabled: bool,

    /// Pre-built TLS context (client or server side)
    pub tls: Option<TlsContext>,

    /// Reply timeout applied by [`Session::call`](crate::Session::call)
    pub call_timeout: Duration,

    /// Frame body size bound (anti-OOM)
    pub max_message_size: usize,

    /// Executor for socket tasks; ambient handle when absent
    pub executor: Option<tokio::runtime::Handle>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory_url: DEFAULT_DIRECTORY_URL.to_string(),
            ssl_enabled: false,
            ipv6_enabled: false,
            tls: None,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            max_message_size: crate::wire::DEFAULT_MAX_MESSAGE_SIZE,
            executor: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the service directory endpoint.
    pub fn with_directory_url(mut self, url: impl Into<String>) -> Self {
        self.directory_url = url.into();
        self
    }

    /// Force TLS on every connection.
    pub fn with_ssl(mut self, enabled: bool) -> Self {
        self.ssl_enabled = enabled;
        self
    }

    /// Admit or refuse IPv6 entries during resolution.
    pub fn with_ipv6(mut self, enabled: bool) -> Self {
        self.ipv6_enabled = enabled;
        self
    }

    /// Inject a pre-built TLS context.
    pub fn with_tls(mut self, tls: TlsContext) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Set the per-call reply timeout.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Bound the accepted frame body size.
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Pin the executor used for socket tasks.
    pub fn with_executor(mut self, handle: tokio::runtime::Handle) -> Self {
        self.executor = Some(handle);
        self
    }

    /// The executor sessions spawn onto.
    pub(crate) fn executor(&self) -> tokio::runtime::Handle {
        self.executor
            .clone()
            .unwrap_or_else(tokio::runtime::Handle::current)
    }

    /// Capability map announced at session establishment.
    pub(crate) fn capabilities(&self) -> Vec<(String, Value)> {
        vec![("WireVersion".to_string(), WIRE_VERSION.into_value())]
    }
}
