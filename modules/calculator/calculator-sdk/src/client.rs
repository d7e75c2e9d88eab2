//! gRPC client implementation of `CalculatorClientV1`

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tonic::transport::Channel;
use transport_grpc::{GrpcClientConfig, connect_lazy_with_stack, resolve_target};

use crate::SERVICE_NAME;
use crate::api::{CalculatorClientV1, CalculatorConnector, CalculatorError};
use crate::proto::calculator_client::CalculatorClient;
use crate::proto::{AddRequest, Empty};

fn duration_to_u64_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// gRPC client implementation of `CalculatorClientV1`
///
/// Holds the only handle to its channel; taking it out of the slot drops
/// the channel.
pub(crate) struct CalculatorGrpcClient {
    inner: Mutex<Option<CalculatorClient<Channel>>>,
    target: String,
    uri: String,
}

impl CalculatorGrpcClient {
    /// Open a channel to the calculator service at `target`.
    ///
    /// The channel dials on the first call; only a malformed target or a
    /// TLS setup failure is reported here.
    pub(crate) fn open(target: &str, cfg: &GrpcClientConfig) -> Result<Self, CalculatorError> {
        let channel: Channel =
            connect_lazy_with_stack(target, cfg).map_err(|e| CalculatorError::Connect {
                target: target.to_owned(),
                message: describe(e.to_string(), e.chain().skip(1)),
            })?;

        Ok(Self {
            inner: Mutex::new(Some(CalculatorClient::new(channel))),
            target: target.to_owned(),
            uri: resolve_target(target, cfg.security),
        })
    }

    fn stub(&self) -> Result<CalculatorClient<Channel>, CalculatorError> {
        self.inner.lock().clone().ok_or(CalculatorError::Closed)
    }

    /// `UNAVAILABLE` on this channel means the server could not be reached.
    fn classify(&self, status: &tonic::Status, deadline: Duration) -> CalculatorError {
        if status.code() == tonic::Code::Unavailable {
            let detail = describe(
                status.message().to_owned(),
                std::iter::successors(status.source(), |cause| (*cause).source()),
            );
            return CalculatorError::Connect {
                target: self.target.clone(),
                message: format!("failed to connect to {}: {detail}", self.uri),
            };
        }
        CalculatorError::from_status(status, deadline)
    }
}

/// Join `head` and its causes with `": "`, skipping a cause whose text the
/// message already ends with. hyper and tonic wrap connect errors in layers
/// that repeat the same text.
fn describe<'a>(head: String, causes: impl Iterator<Item = &'a (dyn Error + 'static)>) -> String {
    let mut message = head;
    for cause in causes {
        let text = cause.to_string();
        if text.is_empty() || message.ends_with(&text) {
            continue;
        }
        if !message.is_empty() {
            message.push_str(": ");
        }
        message.push_str(&text);
    }
    message
}

#[async_trait]
impl CalculatorClientV1 for CalculatorGrpcClient {
    async fn add(&self, a: f64, b: f64, deadline: Duration) -> Result<f64, CalculatorError> {
        let mut client = self.stub()?;

        // grpc-timeout lets the server give up too
        let mut request = tonic::Request::new(AddRequest { a, b });
        request.set_timeout(deadline);

        tracing::debug!(
            a,
            b,
            deadline_ms = duration_to_u64_ms(deadline),
            "calling Calculator.Add"
        );

        let response = tokio::time::timeout(deadline, client.add(request))
            .await
            .map_err(|_| CalculatorError::DeadlineExceeded { timeout: deadline })?
            .map_err(|status| self.classify(&status, deadline))?;

        Ok(response.into_inner().result)
    }

    async fn ping(&self, deadline: Duration) -> Result<(), CalculatorError> {
        let mut client = self.stub()?;

        let mut request = tonic::Request::new(Empty {});
        request.set_timeout(deadline);

        tokio::time::timeout(deadline, client.ping(request))
            .await
            .map_err(|_| CalculatorError::DeadlineExceeded { timeout: deadline })?
            .map_err(|status| self.classify(&status, deadline))?;

        Ok(())
    }

    fn close(&self) {
        if self.inner.lock().take().is_some() {
            tracing::debug!(uri = %self.uri, "calculator channel released");
        }
    }
}

/// Opens tonic channels to the calculator service.
#[derive(Debug, Clone)]
pub struct GrpcConnector {
    cfg: GrpcClientConfig,
}

impl GrpcConnector {
    /// Create a connector with the given transport configuration.
    #[must_use]
    pub fn new(cfg: GrpcClientConfig) -> Self {
        Self { cfg }
    }
}

impl Default for GrpcConnector {
    fn default() -> Self {
        Self::new(GrpcClientConfig::new(SERVICE_NAME))
    }
}

#[async_trait]
impl CalculatorConnector for GrpcConnector {
    async fn connect(&self, target: &str) -> Result<Box<dyn CalculatorClientV1>, CalculatorError> {
        let client = CalculatorGrpcClient::open(target, &self.cfg)?;
        Ok(Box::new(client))
    }
}
