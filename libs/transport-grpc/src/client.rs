//! gRPC client transport configuration and connection utilities.
//!
//! This module provides the client channel configuration with:
//! - Configurable connect and RPC timeouts
//! - HTTP/2 keepalive settings for connection health
//! - Plaintext or TLS channels chosen at launch time
//! - Tracing spans around connection establishment
//!
//! **Note:** Connections are attempted exactly once. Callers that want
//! retries have to build them on top.
//!
//! [`connect_with_stack`] dials before returning; [`connect_lazy_with_stack`]
//! returns a channel that dials on its first call.

use std::time::Duration;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tracing::Instrument;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);

fn duration_to_i64_ms(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}

/// Security mode of the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelSecurity {
    /// Cleartext HTTP/2 (`http://`).
    #[default]
    Plaintext,
    /// TLS negotiated against the platform's native trust roots (`https://`).
    Tls,
}

impl ChannelSecurity {
    fn scheme(self) -> &'static str {
        match self {
            Self::Plaintext => "http",
            Self::Tls => "https",
        }
    }
}

/// Configuration for the gRPC client transport stack.
#[derive(Debug, Clone)]
pub struct GrpcClientConfig {
    /// Timeout for establishing the initial connection.
    pub connect_timeout: Duration,

    /// Upper bound for any single RPC on this channel.
    ///
    /// Per-call deadlines shorter than this still apply.
    pub rpc_timeout: Duration,

    /// Plaintext or TLS.
    pub security: ChannelSecurity,

    /// Service name for tracing.
    pub service_name: &'static str,

    /// Emit an info event once connected.
    pub enable_tracing: bool,
}

impl Default for GrpcClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            security: ChannelSecurity::Plaintext,
            service_name: "grpc_client",
            enable_tracing: true,
        }
    }
}

impl GrpcClientConfig {
    /// Create a new configuration with the given service name.
    #[must_use]
    pub fn new(service_name: &'static str) -> Self {
        Self {
            service_name,
            ..Default::default()
        }
    }

    /// Set the connect timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the RPC timeout.
    #[must_use]
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Set the channel security mode.
    #[must_use]
    pub fn with_security(mut self, security: ChannelSecurity) -> Self {
        self.security = security;
        self
    }

    /// Disable tracing.
    #[must_use]
    pub fn without_tracing(mut self) -> Self {
        self.enable_tracing = false;
        self
    }
}

/// Turn a launch-time target into a URI tonic can dial.
///
/// A bare `host:port` gets the scheme matching `security`; a target that
/// already carries a scheme is returned unchanged. No other validation is
/// done here; [`validate_target`] and the connect functions report
/// malformed targets.
#[must_use]
pub fn resolve_target(target: &str, security: ChannelSecurity) -> String {
    let target = target.trim();
    if target.contains("://") {
        target.to_owned()
    } else {
        format!("{}://{target}", security.scheme())
    }
}

/// Build a tonic `Endpoint` with timeouts, keepalive and optional TLS.
///
/// Configures:
/// - Connect timeout
/// - Per-RPC timeout
/// - TCP keepalive (30 seconds)
/// - HTTP/2 keepalive interval (30 seconds)
/// - Keepalive timeout (10 seconds)
/// - Keep alive while idle
/// - TLS with native roots for `https` URIs or [`ChannelSecurity::Tls`]
fn build_endpoint(
    uri: String,
    cfg: &GrpcClientConfig,
) -> Result<Endpoint, tonic::transport::Error> {
    let endpoint = Endpoint::from_shared(uri)?
        .connect_timeout(cfg.connect_timeout)
        .timeout(cfg.rpc_timeout)
        .tcp_keepalive(Some(Duration::from_secs(30)))
        .http2_keep_alive_interval(Duration::from_secs(30))
        .keep_alive_timeout(Duration::from_secs(10))
        .keep_alive_while_idle(true);

    let wants_tls =
        cfg.security == ChannelSecurity::Tls || endpoint.uri().scheme_str() == Some("https");
    if wants_tls {
        return endpoint.tls_config(ClientTlsConfig::new().with_native_roots());
    }

    Ok(endpoint)
}

/// Resolve `target` and check that the result parses as a URI.
///
/// Lets callers reject a bad target while loading configuration, before any
/// channel exists.
///
/// # Errors
///
/// Returns an error naming the resolved URI if it cannot be parsed.
pub fn validate_target(target: &str, security: ChannelSecurity) -> anyhow::Result<String> {
    use anyhow::Context;

    let uri = resolve_target(target, security);
    Endpoint::from_shared(uri.clone()).with_context(|| format!("invalid gRPC target '{uri}'"))?;
    Ok(uri)
}

/// Connect to a gRPC service with the configured transport stack.
///
/// The connection is established eagerly, so an unreachable or malformed
/// target is reported here rather than on the first call.
///
/// # Example
///
/// ```ignore
/// use transport_grpc::{GrpcClientConfig, connect_with_stack};
///
/// let config = GrpcClientConfig::new("my_service");
/// let client: MyServiceClient<Channel> =
///     connect_with_stack("localhost:50051", &config).await?;
/// ```
///
/// # Errors
///
/// Returns an error if the target cannot be parsed into a URI, if TLS
/// cannot be configured, or if the connection attempt fails or times out.
pub async fn connect_with_stack<TClient>(
    target: &str,
    cfg: &GrpcClientConfig,
) -> anyhow::Result<TClient>
where
    TClient: From<Channel>,
{
    use anyhow::Context;

    let uri = resolve_target(target, cfg.security);
    let span = tracing::debug_span!(
        "grpc_connect",
        service = cfg.service_name,
        uri = %uri
    );

    async move {
        let endpoint = build_endpoint(uri.clone(), cfg)
            .with_context(|| format!("invalid gRPC target '{uri}'"))?;
        let channel = endpoint
            .connect()
            .await
            .with_context(|| format!("failed to connect to {uri}"))?;

        if cfg.enable_tracing {
            let connect_timeout_ms = duration_to_i64_ms(cfg.connect_timeout);
            let rpc_timeout_ms = duration_to_i64_ms(cfg.rpc_timeout);
            tracing::info!(
                service_name = cfg.service_name,
                connect_timeout_ms,
                rpc_timeout_ms,
                "gRPC client connected"
            );
        }

        Ok(TClient::from(channel))
    }
    .instrument(span)
    .await
}

/// Build a channel with the configured transport stack without dialing.
///
/// The target is parsed and TLS is configured here. The connection itself
/// is made by the first call, so an unreachable server is reported as that
/// call's `UNAVAILABLE` status. Must be called from within a tokio runtime.
///
/// # Errors
///
/// Returns an error if the target cannot be parsed into a URI or if TLS
/// cannot be configured.
pub fn connect_lazy_with_stack<TClient>(
    target: &str,
    cfg: &GrpcClientConfig,
) -> anyhow::Result<TClient>
where
    TClient: From<Channel>,
{
    use anyhow::Context;

    let uri = resolve_target(target, cfg.security);
    let span = tracing::debug_span!(
        "grpc_connect_lazy",
        service = cfg.service_name,
        uri = %uri
    );
    let _entered = span.enter();

    let channel = build_endpoint(uri.clone(), cfg)
        .with_context(|| format!("invalid gRPC target '{uri}'"))?
        .connect_lazy();

    if cfg.enable_tracing {
        tracing::info!(
            service_name = cfg.service_name,
            connect_timeout_ms = duration_to_i64_ms(cfg.connect_timeout),
            rpc_timeout_ms = duration_to_i64_ms(cfg.rpc_timeout),
            "gRPC client channel created"
        );
    }

    Ok(TClient::from(channel))
}
