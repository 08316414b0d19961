// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Listening endpoint accepting peer sessions.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::net::{CancelToken, SocketStream, TlsContext, Url};
use crate::session::host::Router;
use crate::session::Session;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;

/// A bound listener feeding accepted sockets into sessions.
///
/// Every accepted connection shares the router, so services registered
/// once are reachable from every peer.
pub struct Server {
    local_url: Url,
    router: Arc<Router>,
    sessions: Arc<Mutex<Vec<Session>>>,
    cancel: CancelToken,
}

impl Server {
    /// Bind `url` and start accepting.
    ///
    /// `tcps://` endpoints require a server-side TLS context in the
    /// configuration; each accepted socket then runs the server handshake
    /// before the session attaches.
    pub async fn listen(config: &Config, router: Arc<Router>, url: &str) -> Result<Server> {
        let parsed = Url::parse_listen(url)?;
        let use_tls = parsed.is_ssl() || config.ssl_enabled;

        let acceptor = if use_tls {
            match &config.tls {
                Some(TlsContext::Server(server_config)) => {
                    Some(TlsAcceptor::from(server_config.clone()))
                }
                Some(TlsContext::Client(_)) => {
                    return Err(Error::HandshakeFailed(
                        "listener needs a server-side tls context".to_string(),
                    ))
                }
                None => {
                    return Err(Error::HandshakeFailed(
                        "ssl requested without a tls context".to_string(),
                    ))
                }
            }
        } else {
            None
        };

        let listener = TcpListener::bind((parsed.host(), parsed.port()))
            .await
            .map_err(Error::from)?;
        let local_addr = listener.local_addr()?;
        let local_url = Url::parse(&format!(
            "{}://{}:{}",
            parsed.scheme().as_str(),
            parsed.host(),
            local_addr.port()
        ))?;
        log::info!("listening on {}", local_url);

        let sessions = Arc::new(Mutex::new(Vec::new()));
        let cancel = CancelToken::new();

        let accept_router = router.clone();
        let accept_sessions = sessions.clone();
        let accept_cancel = cancel.clone();
        let accept_config = config.clone();
        config.executor().spawn(async move {
            loop {
                let accepted = listener.accept().await;
                if accept_cancel.is_cancelled() {
                    break;
                }
                match accepted {
                    Ok((stream, peer)) => {
                        log::debug!("accepted connection from {}", peer);
                        let stream = match &acceptor {
                            Some(acceptor) => match acceptor.accept(stream).await {
                                Ok(tls) => SocketStream::TlsServer(Box::new(tls)),
                                Err(e) => {
                                    log::warn!("handshake with {} failed: {}", peer, e);
                                    continue;
                                }
                            },
                            None => SocketStream::Plain(stream),
                        };
                        let session =
                            Session::attach(stream, accept_router.clone(), &accept_config);
                        accept_sessions.lock().push(session);
                    }
                    Err(e) => {
                        log::warn!("accept failed: {}", e);
                        break;
                    }
                }
            }
        });

        Ok(Server {
            local_url,
            router,
            sessions,
            cancel,
        })
    }

    /// The bound endpoint, with the real port for wildcard binds.
    pub fn local_url(&self) -> &Url {
        &self.local_url
    }

    /// The shared routing table.
    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// Sessions accepted so far.
    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Handles to the accepted sessions, e.g. for pushing events to peers.
    pub fn sessions(&self) -> Vec<Session> {
        self.sessions.lock().clone()
    }

    /// Stop accepting and close every accepted session.
    pub fn close(&self) {
        self.cancel.cancel();
        for session in self.sessions.lock().drain(..) {
            session.close();
        }
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_url", &self.local_url.to_string())
            .field("sessions", &self.session_count())
            .finish()
    }
}
