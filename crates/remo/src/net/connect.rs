// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection establishment pipeline.
//!
//! Sequences resolve -> connect -> optional TLS handshake -> socket, as an
//! explicit progression (`Resolving -> Connecting -> Handshaking -> Ready`)
//! with per-entry fallback while candidate addresses remain. Two flavors:
//! the future form ([`connect`]) and the callback form
//! ([`connect_with_callback`]), which invokes its callback exactly once on
//! the supplied executor handle.

use crate::error::{Error, Result};
use crate::net::resolve::{find_first_valid_if_any, Resolve};
use crate::net::{CancelToken, Url};
use rustls::pki_types::ServerName;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::{TlsAcceptor, TlsConnector};

/// Which side of the TLS handshake this endpoint plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeSide {
    Client,
    Server,
}

/// Pre-built TLS configuration injected by the consumer.
///
/// Certificate material loading happens outside the runtime; only the
/// finished rustls config comes in.
#[derive(Clone)]
pub enum TlsContext {
    Client(Arc<rustls::ClientConfig>),
    Server(Arc<rustls::ServerConfig>),
}

impl std::fmt::Debug for TlsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Client(_) => f.write_str("TlsContext::Client"),
            Self::Server(_) => f.write_str("TlsContext::Server"),
        }
    }
}

/// A connected bidirectional byte stream, plain or TLS.
pub enum SocketStream {
    Plain(TcpStream),
    TlsClient(Box<tokio_rustls::client::TlsStream<TcpStream>>),
    TlsServer(Box<tokio_rustls::server::TlsStream<TcpStream>>),
}

impl SocketStream {
    /// Peer address of the underlying TCP stream.
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        let tcp = match self {
            Self::Plain(s) => s,
            Self::TlsClient(s) => s.get_ref().0,
            Self::TlsServer(s) => s.get_ref().0,
        };
        Ok(tcp.peer_addr()?)
    }

    /// Whether the stream is TLS-wrapped.
    pub fn is_tls(&self) -> bool {
        !matches!(self, Self::Plain(_))
    }
}

impl std::fmt::Debug for SocketStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Plain(_) => "plain",
            Self::TlsClient(_) => "tls-client",
            Self::TlsServer(_) => "tls-server",
        };
        write!(f, "SocketStream({})", label)
    }
}

impl AsyncRead for SocketStream {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_read(cx, buf),
            Self::TlsClient(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
            Self::TlsServer(s) => Pin::new(s.as_mut()).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for SocketStream {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_write(cx, buf),
            Self::TlsClient(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
            Self::TlsServer(s) => Pin::new(s.as_mut()).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_flush(cx),
            Self::TlsClient(s) => Pin::new(s.as_mut()).poll_flush(cx),
            Self::TlsServer(s) => Pin::new(s.as_mut()).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            Self::Plain(s) => Pin::new(s).poll_shutdown(cx),
            Self::TlsClient(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
            Self::TlsServer(s) => Pin::new(s.as_mut()).poll_shutdown(cx),
        }
    }
}

/// Resolve `input`, dial it, optionally run a TLS handshake, and hand back
/// the connected socket.
///
/// TCP failures fall through to the next admissible resolved entry;
/// handshake failures are surfaced verbatim without fallback.
pub async fn connect<R: Resolve>(
    resolver: &R,
    input: &str,
    ssl: bool,
    tls: Option<&TlsContext>,
    ipv6_enabled: bool,
    side: HandshakeSide,
    cancel: &CancelToken,
) -> Result<SocketStream> {
    let url = Url::parse(input)?;

    log::debug!("connect {}: resolving", url);
    cancel.checkpoint()?;
    let entries = resolver.resolve(url.host(), url.port()).await?;

    if find_first_valid_if_any(&entries, ipv6_enabled).is_none() {
        return Err(Error::HostNotFound(format!(
            "no admissible address for {}",
            url
        )));
    }

    // Preference order: every IPv4 entry in substrate order, then IPv6
    // entries when the policy admits them.
    let candidates = entries
        .iter()
        .filter(|e| !e.is_ipv6)
        .chain(entries.iter().filter(|e| e.is_ipv6 && ipv6_enabled));

    let mut last_error: Option<Error> = None;
    for entry in candidates {
        cancel.checkpoint()?;
        let Some(ip) = entry.ip_addr() else {
            log::warn!("connect {}: unparseable entry {:?}", url, entry.host);
            continue;
        };
        let addr = SocketAddr::new(ip, url.port());
        log::debug!("connect {}: connecting to {}", url, addr);
        match TcpStream::connect(addr).await {
            Ok(stream) => {
                if !ssl {
                    log::debug!("connect {}: ready (plain)", url);
                    return Ok(SocketStream::Plain(stream));
                }
                log::debug!("connect {}: handshaking", url);
                cancel.checkpoint()?;
                let socket = handshake(stream, &url, tls, side).await?;
                log::debug!("connect {}: ready (tls)", url);
                return Ok(socket);
            }
            Err(e) => {
                log::debug!("connect {}: {} failed: {}", url, addr, e);
                last_error = Some(e.into());
            }
        }
    }

    Err(last_error
        .unwrap_or_else(|| Error::HostNotFound(format!("no usable address for {}", url))))
}

async fn handshake(
    stream: TcpStream,
    url: &Url,
    tls: Option<&TlsContext>,
    side: HandshakeSide,
) -> Result<SocketStream> {
    match (side, tls) {
        (HandshakeSide::Client, Some(TlsContext::Client(config))) => {
            let server_name = ServerName::try_from(url.host().to_string())
                .map_err(|e| Error::HandshakeFailed(format!("bad server name: {}", e)))?;
            let connector = TlsConnector::from(config.clone());
            let tls_stream = connector
                .connect(server_name, stream)
                .await
                .map_err(|e| Error::HandshakeFailed(e.to_string()))?;
            Ok(SocketStream::TlsClient(Box::new(tls_stream)))
        }
        (HandshakeSide::Server, Some(TlsContext::Server(config))) => {
            let acceptor = TlsAcceptor::from(config.clone());
            let tls_stream = acceptor
                .accept(stream)
                .await
                .map_err(|e| Error::HandshakeFailed(e.to_string()))?;
            Ok(SocketStream::TlsServer(Box::new(tls_stream)))
        }
        (_, Some(_)) => Err(Error::HandshakeFailed(
            "tls context does not match handshake side".to_string(),
        )),
        (_, None) => Err(Error::HandshakeFailed(
            "ssl requested without a tls context".to_string(),
        )),
    }
}

/// Callback flavor of [`connect`]: runs the pipeline on `handle` and
/// invokes `callback` exactly once with the outcome.
pub fn connect_with_callback<R>(
    handle: &tokio::runtime::Handle,
    resolver: Arc<R>,
    input: String,
    ssl: bool,
    tls: Option<TlsContext>,
    ipv6_enabled: bool,
    side: HandshakeSide,
    cancel: CancelToken,
    callback: impl FnOnce(Result<SocketStream>) + Send + 'static,
) where
    R: Resolve + Send + Sync + 'static,
{
    handle.spawn(async move {
        let outcome = connect(
            resolver.as_ref(),
            &input,
            ssl,
            tls.as_ref(),
            ipv6_enabled,
            side,
            &cancel,
        )
        .await;
        callback(outcome);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::net::resolve::ResolveEntry;
    use tokio::net::TcpListener;

    struct FixedResolver(Vec<ResolveEntry>);

    impl Resolve for FixedResolver {
        async fn resolve(&self, _host: &str, _port: u16) -> Result<Vec<ResolveEntry>> {
            Ok(self.0.clone())
        }
    }

    async fn local_listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[tokio::test]
    async fn plain_connect_succeeds() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let resolver = FixedResolver(vec![ResolveEntry::v4("127.0.0.1")]);
        let url = format!("tcp://127.0.0.1:{}", port);
        let socket = connect(
            &resolver,
            &url,
            false,
            None,
            false,
            HandshakeSide::Client,
            &CancelToken::new(),
        )
        .await
        .expect("connect");
        assert!(!socket.is_tls());
        assert_eq!(socket.peer_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn bad_url_fails_synchronously() {
        let resolver = FixedResolver(vec![]);
        for input in ["", "abcd", "10.12.14.15.16", "tcp://10.12.14.15", "tcp://10.12.14.15:0"] {
            let err = connect(
                &resolver,
                input,
                false,
                None,
                false,
                HandshakeSide::Client,
                &CancelToken::new(),
            )
            .await
            .unwrap_err();
            assert_eq!(err.code(), ErrorCode::BadAddress, "for {:?}", input);
        }
    }

    #[tokio::test]
    async fn no_admissible_entry_is_host_not_found() {
        let resolver = FixedResolver(vec![ResolveEntry::v6("::1")]);
        let err = connect(
            &resolver,
            "tcp://host.local:1234",
            false,
            None,
            false,
            HandshakeSide::Client,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HostNotFound);
    }

    #[tokio::test]
    async fn falls_through_to_next_entry() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        // The broadcast address fails immediately; the loopback entry wins.
        let resolver = FixedResolver(vec![
            ResolveEntry::v4("255.255.255.255"),
            ResolveEntry::v4("127.0.0.1"),
        ]);
        let url = format!("tcp://example.test:{}", port);
        let socket = connect(
            &resolver,
            &url,
            false,
            None,
            false,
            HandshakeSide::Client,
            &CancelToken::new(),
        )
        .await
        .expect("fallback connect");
        assert_eq!(socket.peer_addr().unwrap().port(), port);
    }

    #[tokio::test]
    async fn refused_connection_reports_code() {
        let (listener, port) = local_listener().await;
        drop(listener);

        let resolver = FixedResolver(vec![ResolveEntry::v4("127.0.0.1")]);
        let url = format!("tcp://127.0.0.1:{}", port);
        let err = connect(
            &resolver,
            &url,
            false,
            None,
            false,
            HandshakeSide::Client,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionRefused);

        // The future flavor reports errors as strings; the taxonomy decodes
        // them back.
        let decoded = ErrorCode::from_name(err.code().name()).expect("known error string");
        assert_eq!(decoded, ErrorCode::ConnectionRefused);
    }

    #[tokio::test]
    async fn ssl_without_context_is_handshake_failure() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let resolver = FixedResolver(vec![ResolveEntry::v4("127.0.0.1")]);
        let url = format!("tcps://127.0.0.1:{}", port);
        let err = connect(
            &resolver,
            &url,
            true,
            None,
            false,
            HandshakeSide::Client,
            &CancelToken::new(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::HandshakeFailed);
    }

    #[tokio::test]
    async fn cancellation_stops_the_pipeline() {
        let resolver = FixedResolver(vec![ResolveEntry::v4("127.0.0.1")]);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = connect(
            &resolver,
            "tcp://127.0.0.1:1",
            false,
            None,
            false,
            HandshakeSide::Client,
            &cancel,
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Cancelled);
    }

    #[tokio::test]
    async fn callback_flavor_fires_once() {
        let (listener, port) = local_listener().await;
        tokio::spawn(async move {
            let _ = listener.accept().await;
        });

        let (tx, rx) = tokio::sync::oneshot::channel();
        let resolver = Arc::new(FixedResolver(vec![ResolveEntry::v4("127.0.0.1")]));
        connect_with_callback(
            &tokio::runtime::Handle::current(),
            resolver,
            format!("tcp://127.0.0.1:{}", port),
            false,
            None,
            false,
            HandshakeSide::Client,
            CancelToken::new(),
            move |outcome| {
                let _ = tx.send(outcome.map(|s| s.is_tls()));
            },
        );
        let outcome = rx.await.expect("callback ran");
        assert_eq!(outcome.unwrap(), false);
    }
}
