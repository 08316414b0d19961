// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! One socket, framed.
//!
//! A session owns a connected [`SocketStream`] through two tasks: the
//! writer drains a queue so writes complete in submission order, and the
//! reader feeds the frame codec, completing pending calls on Reply/Error
//! and routing Call/Post/Event into the shared [`Router`]. Replies may
//! arrive in any order; correlation is by the per-socket monotonic message
//! id. A framing violation or socket loss completes every in-flight call
//! with `Disconnected` and closes the session.

use crate::config::Config;
use crate::dynamic::Value;
use crate::error::{Error, Result};
use crate::net::{connect, CancelToken, HandshakeSide, SocketStream, SystemResolver};
use crate::session::host::Router;
use crate::session::{decode_error, dispatch};
use crate::wire::{
    decode_values, encode_value, encode_values, parse_signature, Message, MessageCodec,
    MessageKind,
};
use crate::meta::MetaObject;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::{mpsc, oneshot};

/// Per-socket connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

enum WriterCommand {
    Frame(Vec<u8>),
    Shutdown,
}

struct SessionInner {
    writer: mpsc::UnboundedSender<WriterCommand>,
    pending: DashMap<u32, oneshot::Sender<Result<Value>>>,
    next_id: AtomicU32,
    state: Mutex<SocketState>,
    peer_capabilities: Mutex<HashMap<String, Value>>,
    router: Arc<Router>,
    call_timeout: Duration,
}

impl SessionInner {
    fn send_frame(&self, bytes: Vec<u8>) -> Result<()> {
        self.writer
            .send(WriterCommand::Frame(bytes))
            .map_err(|_| Error::Disconnected("write queue closed".to_string()))
    }

    fn next_message_id(&self) -> u32 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Complete every in-flight call and flip to a terminal state.
    fn drop_pending(&self, reason: &str) {
        let ids: Vec<u32> = self.pending.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Some((_, tx)) = self.pending.remove(&id) {
                let _ = tx.send(Err(Error::Disconnected(reason.to_string())));
            }
        }
    }

    fn set_state(&self, state: SocketState) {
        *self.state.lock() = state;
    }
}

/// Handle to one connected session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

impl Session {
    /// Dial `url` per the configuration and attach a session to the socket.
    pub async fn connect(config: &Config, router: Arc<Router>, url: &str) -> Result<Self> {
        let cancel = CancelToken::new();
        let ssl = config.ssl_enabled || crate::net::Url::parse(url)?.is_ssl();
        let stream = connect(
            &SystemResolver,
            url,
            ssl,
            config.tls.as_ref(),
            config.ipv6_enabled,
            HandshakeSide::Client,
            &cancel,
        )
        .await?;
        Ok(Self::attach(stream, router, config))
    }

    /// Attach a session to an already-connected socket.
    ///
    /// Spawns the reader and writer tasks on the configured executor handle
    /// and sends the capability map as the first frame.
    pub fn attach(stream: SocketStream, router: Arc<Router>, config: &Config) -> Self {
        let handle = config.executor();
        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();

        let inner = Arc::new(SessionInner {
            writer: writer_tx,
            pending: DashMap::new(),
            next_id: AtomicU32::new(1),
            state: Mutex::new(SocketState::Connected),
            peer_capabilities: Mutex::new(HashMap::new()),
            router,
            call_timeout: config.call_timeout,
        });

        let (mut read_half, mut write_half) = tokio::io::split(stream);

        // Writer: frames leave in submission order.
        handle.spawn(async move {
            while let Some(command) = writer_rx.recv().await {
                match command {
                    WriterCommand::Frame(bytes) => {
                        if write_half.write_all(&bytes).await.is_err() {
                            break;
                        }
                        if write_half.flush().await.is_err() {
                            break;
                        }
                    }
                    WriterCommand::Shutdown => {
                        let _ = write_half.shutdown().await;
                        break;
                    }
                }
            }
        });

        // Reader: frames in, completions and dispatch out.
        let reader_inner = inner.clone();
        let max_size = config.max_message_size;
        handle.spawn(async move {
            let mut codec = MessageCodec::new(max_size);
            let mut buf = vec![0u8; 16 * 1024];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) => {
                        reader_inner.set_state(SocketState::Disconnected);
                        reader_inner.drop_pending("peer closed the socket");
                        break;
                    }
                    Ok(n) => {
                        codec.feed(&buf[..n]);
                        loop {
                            match codec.next_message() {
                                Ok(Some(msg)) => handle_message(&reader_inner, msg),
                                Ok(None) => break,
                                Err(e) => {
                                    // Framing violation: drop the socket and
                                    // everything in flight on it.
                                    log::warn!("closing session: {}", e);
                                    reader_inner.set_state(SocketState::Disconnected);
                                    reader_inner.drop_pending("protocol violation");
                                    let _ = reader_inner.writer.send(WriterCommand::Shutdown);
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        reader_inner.set_state(SocketState::Disconnected);
                        reader_inner.drop_pending(&e.to_string());
                        break;
                    }
                }
            }
        });

        let session = Self { inner };
        session.send_capabilities(config);
        session
    }

    fn send_capabilities(&self, config: &Config) {
        let mut caps = Value::zero(crate::dynamic::TypeDescriptor::map(
            crate::dynamic::type_of::<String>(),
            crate::dynamic::TypeDescriptor::dynamic(),
        ));
        for (key, value) in config.capabilities() {
            if let Err(e) = caps.insert(
                crate::dynamic::IntoValue::into_value(key.as_str()),
                value.clone().into_dynamic(),
            ) {
                log::warn!("skipping capability {}: {}", key, e);
            }
        }
        let mut payload = Vec::new();
        if encode_value(&caps, &mut payload).is_err() {
            return;
        }
        let msg = Message {
            id: self.inner.next_message_id(),
            service: 0,
            object: 0,
            action: 0,
            kind: MessageKind::Capability,
            signature: "{sm}".to_string(),
            payload,
        };
        let _ = self.inner.send_frame(msg.encode());
    }

    /// Current socket state.
    pub fn state(&self) -> SocketState {
        *self.inner.state.lock()
    }

    /// Capabilities announced by the peer, once its Capability frame landed.
    pub fn peer_capability(&self, key: &str) -> Option<Value> {
        self.inner.peer_capabilities.lock().get(key).cloned()
    }

    /// Start a call and return a handle for awaiting or cancelling it.
    pub fn call_begin(
        &self,
        service: u32,
        object: u32,
        action: u32,
        args: &[Value],
    ) -> Result<CallHandle> {
        if self.state() != SocketState::Connected {
            return Err(Error::Disconnected("session is not connected".to_string()));
        }
        let id = self.inner.next_message_id();

        let mut signature = String::from("(");
        for a in args {
            let desc = a
                .descriptor()
                .ok_or_else(|| Error::ConversionFailed("null argument".to_string()))?;
            signature.push_str(&desc.signature());
        }
        signature.push(')');
        let mut payload = Vec::new();
        encode_values(args, &mut payload)?;

        let (tx, rx) = oneshot::channel();
        self.inner.pending.insert(id, tx);

        let msg = Message {
            id,
            service,
            object,
            action,
            kind: MessageKind::Call,
            signature,
            payload,
        };
        if let Err(e) = self.inner.send_frame(msg.encode()) {
            self.inner.pending.remove(&id);
            return Err(e);
        }

        Ok(CallHandle {
            session: self.inner.clone(),
            message: Message {
                payload: Vec::new(),
                ..msg
            },
            rx,
        })
    }

    /// Call and await the reply with the configured timeout.
    pub async fn call(
        &self,
        service: u32,
        object: u32,
        action: u32,
        args: &[Value],
    ) -> Result<Value> {
        let timeout = self.inner.call_timeout;
        self.call_begin(service, object, action, args)?
            .wait(timeout)
            .await
    }

    /// Fire-and-forget invocation.
    pub fn post(&self, service: u32, object: u32, action: u32, args: &[Value]) -> Result<()> {
        self.send_one_way(MessageKind::Post, service, object, action, args)
    }

    /// Push a signal emission to the peer.
    pub fn emit_event(
        &self,
        service: u32,
        object: u32,
        action: u32,
        args: &[Value],
    ) -> Result<()> {
        self.send_one_way(MessageKind::Event, service, object, action, args)
    }

    fn send_one_way(
        &self,
        kind: MessageKind,
        service: u32,
        object: u32,
        action: u32,
        args: &[Value],
    ) -> Result<()> {
        if self.state() != SocketState::Connected {
            return Err(Error::Disconnected("session is not connected".to_string()));
        }
        let mut signature = String::from("(");
        for a in args {
            let desc = a
                .descriptor()
                .ok_or_else(|| Error::ConversionFailed("null argument".to_string()))?;
            signature.push_str(&desc.signature());
        }
        signature.push(')');
        let mut payload = Vec::new();
        encode_values(args, &mut payload)?;
        let msg = Message {
            id: self.inner.next_message_id(),
            service,
            object,
            action,
            kind,
            signature,
            payload,
        };
        self.inner.send_frame(msg.encode())
    }

    /// Bind a remote object handle on this session.
    pub fn remote_object(&self, service: u32, object: u32, meta: Arc<MetaObject>) -> RemoteObject {
        RemoteObject {
            session: self.clone(),
            service,
            object,
            meta,
        }
    }

    /// Close the session: stop writing, complete in-flight calls.
    pub fn close(&self) {
        self.inner.set_state(SocketState::Closing);
        self.inner.drop_pending("session closed locally");
        let _ = self.inner.writer.send(WriterCommand::Shutdown);
        self.inner.set_state(SocketState::Disconnected);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .field("pending", &self.inner.pending.len())
            .finish()
    }
}

fn handle_message(inner: &Arc<SessionInner>, msg: Message) {
    match msg.kind {
        MessageKind::Reply => {
            if let Some((_, tx)) = inner.pending.remove(&msg.id) {
                let _ = tx.send(decode_reply(&msg));
            } else {
                log::debug!("reply for unknown call {}", msg.id);
            }
        }
        MessageKind::Error => {
            if let Some((_, tx)) = inner.pending.remove(&msg.id) {
                let _ = tx.send(Err(decode_error(&msg)));
            } else {
                log::debug!("error for unknown call {}", msg.id);
            }
        }
        MessageKind::Capability => {
            match parse_signature(&msg.signature)
                .and_then(|desc| decode_values(&[desc], &msg.payload))
            {
                Ok(values) => {
                    let mut caps = inner.peer_capabilities.lock();
                    if let Ok(pairs) = values[0].pairs() {
                        for (k, v) in pairs {
                            if let Ok(key) = k.to_str() {
                                let stored =
                                    v.dynamic_inner().map(Clone::clone).unwrap_or_else(|_| v.clone());
                                caps.insert(key.to_string(), stored);
                            }
                        }
                    }
                }
                Err(e) => log::warn!("undecodable capability map: {}", e),
            }
        }
        MessageKind::Call | MessageKind::Post | MessageKind::Event | MessageKind::Cancel => {
            if let Some(reply) = dispatch(&inner.router, &msg) {
                let _ = inner.send_frame(reply.encode());
            }
        }
    }
}

fn decode_reply(msg: &Message) -> Result<Value> {
    if msg.signature.is_empty() || msg.signature == "v" {
        return Ok(Value::void());
    }
    let desc = parse_signature(&msg.signature)?;
    let mut values = decode_values(&[desc], &msg.payload)?;
    Ok(values.remove(0))
}

/// In-flight call: await the reply or cancel it.
pub struct CallHandle {
    session: Arc<SessionInner>,
    message: Message,
    rx: oneshot::Receiver<Result<Value>>,
}

impl CallHandle {
    /// The correlation id of this call.
    pub fn message_id(&self) -> u32 {
        self.message.id
    }

    /// Await the reply, bounded by `timeout`.
    pub async fn wait(self, timeout: Duration) -> Result<Value> {
        let id = self.message.id;
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::Disconnected("reply channel closed".to_string())),
            Err(_) => {
                self.session.pending.remove(&id);
                Err(Error::TimedOut)
            }
        }
    }

    /// Cancel cooperatively: send a Cancel frame carrying the target
    /// message id and complete the local future with `Cancelled` without
    /// waiting for the peer. A later [`wait`](CallHandle::wait) observes
    /// the cancellation.
    pub fn cancel(&self) -> Result<()> {
        let cancel = Message {
            kind: MessageKind::Cancel,
            signature: String::new(),
            payload: Vec::new(),
            ..self.message.clone()
        };
        if let Some((_, tx)) = self.session.pending.remove(&self.message.id) {
            let _ = tx.send(Err(Error::Cancelled));
        }
        self.session.send_frame(cancel.encode())
    }
}

/// A (service, object) pair bound to a session, callable through its meta
/// tables.
#[derive(Clone)]
pub struct RemoteObject {
    session: Session,
    service: u32,
    object: u32,
    meta: Arc<MetaObject>,
}

impl RemoteObject {
    /// The remote meta tables this handle was bound with.
    pub fn meta(&self) -> &Arc<MetaObject> {
        &self.meta
    }

    /// Call a method by member id.
    pub async fn call_id(&self, action: u32, args: &[Value]) -> Result<Value> {
        self.session.call(self.service, self.object, action, args).await
    }

    /// Call a method by name (lowest id wins for overloads).
    pub async fn call(&self, name: &str, args: &[Value]) -> Result<Value> {
        let action = self
            .meta
            .method_id_by_name(name)
            .or_else(|| self.meta.method_id(name))
            .ok_or_else(|| Error::NotFound(format!("method '{}'", name)))?;
        self.call_id(action, args).await
    }

    /// Post toward a signal by name.
    pub fn post(&self, name: &str, args: &[Value]) -> Result<()> {
        let action = self
            .meta
            .signal_id(name)
            .ok_or_else(|| Error::NotFound(format!("signal '{}'", name)))?;
        self.session.post(self.service, self.object, action, args)
    }

    /// Read a property by name.
    pub async fn property(&self, name: &str) -> Result<Value> {
        let action = self
            .meta
            .property_id(name)
            .ok_or_else(|| Error::NotFound(format!("property '{}'", name)))?;
        self.call_id(action, &[]).await
    }

    /// Write a property by name.
    pub async fn set_property(&self, name: &str, value: Value) -> Result<()> {
        let action = self
            .meta
            .property_id(name)
            .ok_or_else(|| Error::NotFound(format!("property '{}'", name)))?;
        self.call_id(action, &[value]).await.map(|_| ())
    }
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject")
            .field("service", &self.service)
            .field("object", &self.object)
            .finish()
    }
}

impl SocketState {
    /// Whether calls can be started in this state.
    pub fn is_usable(self) -> bool {
        matches!(self, SocketState::Connected)
    }
}
