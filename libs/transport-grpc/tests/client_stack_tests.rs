#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the gRPC client transport stack

use std::time::Duration;
use tonic::transport::Channel;
use tokio::net::TcpListener;
use transport_grpc::{
    ChannelSecurity, GrpcClientConfig, connect_lazy_with_stack, connect_with_stack, resolve_target,
};

#[derive(Clone)]
struct FakeClient {
    _channel: Channel,
}

impl From<Channel> for FakeClient {
    fn from(channel: Channel) -> Self {
        Self { _channel: channel }
    }
}

/// Bind an ephemeral port and release it so nothing is listening there.
fn closed_local_addr() -> std::net::SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

#[test]
fn default_config_is_sane() {
    let cfg = GrpcClientConfig::default();

    assert!(
        cfg.connect_timeout > Duration::from_millis(0),
        "connect_timeout should be positive"
    );
    assert!(
        cfg.rpc_timeout > Duration::from_millis(0),
        "rpc_timeout should be positive"
    );
    assert!(
        !cfg.service_name.is_empty(),
        "service_name should not be empty"
    );
    assert_eq!(cfg.security, ChannelSecurity::Plaintext);
}

#[test]
fn config_cloning_works() {
    let cfg1 = GrpcClientConfig::new("service1").with_connect_timeout(Duration::from_secs(3));

    let cfg2 = cfg1.clone();

    assert_eq!(cfg1.service_name, cfg2.service_name);
    assert_eq!(cfg1.connect_timeout, cfg2.connect_timeout);
}

#[tokio::test]
async fn connect_with_stack_fails_on_closed_port() {
    let cfg = GrpcClientConfig::new("test")
        .with_connect_timeout(Duration::from_millis(500))
        .without_tracing();

    let addr = closed_local_addr();
    let result = connect_with_stack::<FakeClient>(&addr.to_string(), &cfg).await;

    let err = result.err().expect("connecting to a closed port must fail");
    let message = format!("{err:#}");
    assert!(
        message.contains(&addr.to_string()),
        "error should name the target: {message}"
    );
}

#[tokio::test]
async fn connect_with_stack_respects_connect_timeout() {
    let cfg = GrpcClientConfig::new("test").with_connect_timeout(Duration::from_millis(100));

    // TEST-NET-1, never routable
    let started = std::time::Instant::now();
    let result = connect_with_stack::<FakeClient>("http://192.0.2.1:50051", &cfg).await;

    assert!(result.is_err(), "Should fail to connect to non-existent server");
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "connect timeout should bound the attempt"
    );
}

#[tokio::test]
async fn connect_with_stack_rejects_malformed_target() {
    let cfg = GrpcClientConfig::default();

    let result = connect_with_stack::<FakeClient>("http://[::1", &cfg).await;
    let err = result.err().expect("malformed target must fail");
    assert!(format!("{err:#}").contains("invalid gRPC target"));
}

#[tokio::test]
async fn tls_connect_to_plaintext_listener_fails() {
    // accepts TCP and hangs up without ever speaking TLS
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            drop(socket);
        }
    });

    let cfg = GrpcClientConfig::new("test")
        .with_connect_timeout(Duration::from_millis(500))
        .with_security(ChannelSecurity::Tls)
        .without_tracing();

    let result = connect_with_stack::<FakeClient>(&addr.to_string(), &cfg).await;

    let err = result.err().expect("TLS handshake against plain TCP must fail");
    let message = format!("{err:#}");
    assert!(
        message.contains(&format!("failed to connect to https://{addr}")),
        "error should name the https target: {message}"
    );
}

#[tokio::test]
async fn lazy_connect_does_not_dial() {
    let cfg = GrpcClientConfig::new("test").without_tracing();
    let addr = closed_local_addr();

    let result = connect_lazy_with_stack::<FakeClient>(&addr.to_string(), &cfg);

    assert!(result.is_ok(), "nothing is dialed until the first call");
}

#[tokio::test]
async fn lazy_connect_rejects_malformed_target() {
    let cfg = GrpcClientConfig::default();

    let result = connect_lazy_with_stack::<FakeClient>("http://[::1", &cfg);
    let err = result.err().expect("malformed target must fail");
    assert!(format!("{err:#}").contains("invalid gRPC target"));
}

#[test]
fn resolve_target_matches_security_mode() {
    assert_eq!(
        resolve_target("localhost:50051", ChannelSecurity::default()),
        "http://localhost:50051"
    );
    assert_eq!(
        resolve_target("example.com:443", ChannelSecurity::Tls),
        "https://example.com:443"
    );
}

#[test]
fn config_has_debug_impl() {
    let cfg = GrpcClientConfig::default();
    let debug_str = format!("{cfg:?}");

    assert!(debug_str.contains("GrpcClientConfig"));
}
