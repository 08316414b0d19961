// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! End-to-end messaging over localhost TCP: calls, typed errors, signals,
//! properties, the service directory, cancellation and disconnect.

use remo::directory::{install_directory, DirectoryClient, ServiceDirectory};
use remo::dynamic::{type_of, IntoValue};
use remo::meta::{IntoGenericFunction, Subscriber};
use remo::net::SocketStream;
use remo::{Config, ErrorCode, ObjectBuilder, Router, Server, Session, SocketState};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn calculator_router() -> (Arc<Router>, u32, Arc<AtomicI64>) {
    let ticks = Arc::new(AtomicI64::new(0));
    let sink = ticks.clone();

    let object = ObjectBuilder::new()
        .advertise_method("add", |a: i32, b: i32| a + b)
        .advertise_method("greet", |name: String| format!("hello {}", name))
        .advertise_signal("tick", "(i)")
        .advertise_property("precision", type_of::<i32>())
        .build();

    let tick_id = object.meta().signal_id("tick").unwrap();
    let on_tick = move |v: i32| {
        sink.fetch_add(v as i64, Ordering::SeqCst);
    };
    object
        .signal(tick_id)
        .unwrap()
        .connect(Subscriber::Handler(Arc::new(on_tick.into_generic_function())));

    let router = Arc::new(Router::new());
    install_directory(&router, ServiceDirectory::new());
    let service = router.register_service("calculator", object);
    (router, service, ticks)
}

async fn start_server() -> (Server, u32, Arc<AtomicI64>) {
    let (router, service, ticks) = calculator_router();
    let server = Server::listen(&Config::default(), router, "tcp://127.0.0.1:0")
        .await
        .expect("listen");
    (server, service, ticks)
}

async fn client_for(server: &Server) -> Session {
    Session::connect(
        &Config::default(),
        Arc::new(Router::new()),
        &server.local_url().to_string(),
    )
    .await
    .expect("connect")
}

#[tokio::test]
async fn call_roundtrip() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    let sum = client
        .call(service, 1, 1, &[2i32.into_value(), 40i32.into_value()])
        .await
        .expect("add");
    assert_eq!(sum.to_int().unwrap(), 42);

    // Wider argument shapes are adapted server-side.
    let sum = client
        .call(service, 1, 1, &[7i64.into_value(), 3i64.into_value()])
        .await
        .expect("adapted add");
    assert_eq!(sum.to_int().unwrap(), 10);

    let greeting = client
        .call(service, 1, 2, &["world".into_value()])
        .await
        .expect("greet");
    assert_eq!(greeting.to_str().unwrap(), "hello world");

    server.close();
}

#[tokio::test]
async fn replies_complete_out_of_order_callers() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    // Several overlapping calls; each future gets its own reply.
    let mut handles = Vec::new();
    for i in 0..8i32 {
        handles.push((
            i,
            client
                .call_begin(service, 1, 1, &[i.into_value(), 100i32.into_value()])
                .expect("begin"),
        ));
    }
    // Await in reverse submission order.
    for (i, handle) in handles.into_iter().rev() {
        let value = handle.wait(Duration::from_secs(5)).await.expect("reply");
        assert_eq!(value.to_int().unwrap(), (i + 100) as i64);
    }

    server.close();
}

#[tokio::test]
async fn unknown_targets_are_typed_errors_and_socket_survives() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    let err = client.call(service, 1, 99, &[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = client.call(service + 50, 1, 1, &[]).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    let err = client
        .call(service, 1, 1, &["x".into_value(), "y".into_value()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConversionFailed);

    // The socket stayed open through all of that.
    assert_eq!(client.state(), SocketState::Connected);
    let sum = client
        .call(service, 1, 1, &[1i32.into_value(), 1i32.into_value()])
        .await
        .expect("still usable");
    assert_eq!(sum.to_int().unwrap(), 2);

    server.close();
}

#[tokio::test]
async fn posts_reach_server_signals() {
    let (server, service, ticks) = start_server().await;
    let client = client_for(&server).await;

    client.post(service, 1, 3, &[5i32.into_value()]).expect("post");
    // A follow-up call orders us after the post on the same socket.
    client
        .call(service, 1, 1, &[0i32.into_value(), 0i32.into_value()])
        .await
        .expect("fence");
    assert_eq!(ticks.load(Ordering::SeqCst), 5);

    server.close();
}

#[tokio::test]
async fn property_get_set_over_the_wire() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    // Property id follows the members declared before it.
    let precision_id = 4;
    client
        .call(service, 1, precision_id, &[6i32.into_value()])
        .await
        .expect("set");
    let value = client
        .call(service, 1, precision_id, &[])
        .await
        .expect("get");
    assert_eq!(value.to_int().unwrap(), 6);

    // Overflow on assignment is a typed error.
    let err = client
        .call(service, 1, precision_id, &[(1i64 << 40).into_value()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ConversionFailed);

    server.close();
}

#[tokio::test]
async fn directory_lookup_and_registration() {
    let (server, _service, _) = start_server().await;
    let client = client_for(&server).await;
    let directory = DirectoryClient::new(&client);

    let id = directory
        .register_service("camera", vec!["tcp://10.0.0.9:4444".to_string()])
        .await
        .expect("register");
    let info = directory.service("camera").await.expect("lookup");
    assert_eq!(info.id, id);
    assert_eq!(info.endpoints, vec!["tcp://10.0.0.9:4444".to_string()]);

    let all = directory.services().await.expect("list");
    assert!(all.iter().any(|s| s.name == "camera"));

    directory.unregister_service(id).await.expect("unregister");
    let err = directory.service("camera").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);

    server.close();
}

#[tokio::test]
async fn cancellation_completes_locally() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    let handle = client
        .call_begin(service, 1, 1, &[1i32.into_value(), 2i32.into_value()])
        .expect("begin");
    handle.cancel().expect("cancel frame sent");
    let err = handle.wait(Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Cancelled);

    // The session is still healthy for later calls.
    let sum = client
        .call(service, 1, 1, &[1i32.into_value(), 2i32.into_value()])
        .await
        .expect("post-cancel call");
    assert_eq!(sum.to_int().unwrap(), 3);

    server.close();
}

#[tokio::test]
async fn silent_peer_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        // Accept and hold the socket without ever replying.
        let _held = listener.accept().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let client = Session::attach(
        SocketStream::Plain(stream),
        Arc::new(Router::new()),
        &Config::default(),
    );

    let handle = client.call_begin(1, 1, 1, &[]).expect("begin");
    let err = handle.wait(Duration::from_millis(100)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::TimedOut);
}

#[tokio::test]
async fn garbage_frames_disconnect_and_complete_inflight() {
    use tokio::io::AsyncWriteExt;

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        // Not a valid frame: wrong magic.
        let _ = socket.write_all(&[0u8; 64]).await;
        tokio::time::sleep(Duration::from_secs(60)).await;
    });

    let stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    let client = Session::attach(
        SocketStream::Plain(stream),
        Arc::new(Router::new()),
        &Config::default(),
    );

    let handle = client.call_begin(1, 1, 1, &[]).expect("begin");
    let err = handle.wait(Duration::from_secs(5)).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Disconnected);
}

#[tokio::test]
async fn peer_close_completes_inflight_with_disconnected() {
    let (server, service, _) = start_server().await;
    let client = client_for(&server).await;

    // Make sure the session works, then tear the server down.
    client
        .call(service, 1, 1, &[1i32.into_value(), 1i32.into_value()])
        .await
        .expect("warmup");
    server.close();

    // Wait for the client to observe the close.
    for _ in 0..100 {
        if client.state() != SocketState::Connected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_ne!(client.state(), SocketState::Connected);

    let err = client
        .call(service, 1, 1, &[1i32.into_value(), 1i32.into_value()])
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::Disconnected);
}

#[tokio::test]
async fn server_pushes_events_to_client_objects() {
    let (server, _service, _) = start_server().await;

    // The client hosts a listener object of its own.
    let heard = Arc::new(AtomicI64::new(0));
    let sink = heard.clone();
    let listener_object = ObjectBuilder::new()
        .advertise_signal("noise", "(i)")
        .build();
    let noise_id = listener_object.meta().signal_id("noise").unwrap();
    let on_noise = move |v: i32| {
        sink.store(v as i64, Ordering::SeqCst);
    };
    listener_object
        .signal(noise_id)
        .unwrap()
        .connect(Subscriber::Handler(Arc::new(on_noise.into_generic_function())));

    let client_router = Arc::new(Router::new());
    let listener_service = client_router.register_service("listener", listener_object);

    let _client = Session::connect(
        &Config::default(),
        client_router,
        &server.local_url().to_string(),
    )
    .await
    .expect("connect");

    // Wait for the accept loop to surface the session, then push an event.
    for _ in 0..100 {
        if server.session_count() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    let peer = server.sessions().pop().expect("accepted session");
    peer.emit_event(listener_service, 1, noise_id, &[9i32.into_value()])
        .expect("event");

    for _ in 0..100 {
        if heard.load(Ordering::SeqCst) == 9 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(heard.load(Ordering::SeqCst), 9);

    server.close();
}
