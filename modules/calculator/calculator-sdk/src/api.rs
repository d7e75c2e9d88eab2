//! Calculator API traits and types
//!
//! Contract traits and the error type for the calculator service.

use std::time::Duration;

use async_trait::async_trait;

/// Calculator API trait
///
/// One open channel to the calculator service. The channel is released by
/// [`CalculatorClientV1::close`]; every call after that fails with
/// [`CalculatorError::Closed`].
#[async_trait]
pub trait CalculatorClientV1: Send + Sync {
    /// Add two numbers remotely and return the sum computed by the server.
    async fn add(&self, a: f64, b: f64, deadline: Duration) -> Result<f64, CalculatorError>;

    /// Liveness check against the server.
    async fn ping(&self, deadline: Duration) -> Result<(), CalculatorError>;

    /// Release the underlying channel. Idempotent.
    fn close(&self);
}

/// Opens channels to a calculator service.
#[async_trait]
pub trait CalculatorConnector: Send + Sync {
    /// Establish a channel to `target` (`host:port` or a full URI).
    async fn connect(&self, target: &str) -> Result<Box<dyn CalculatorClientV1>, CalculatorError>;
}

/// Error type for Calculator operations
///
/// Every variant is a failed remote call; callers that only need
/// success/failure can treat them alike.
#[derive(thiserror::Error, Debug)]
pub enum CalculatorError {
    /// The message already names the target.
    #[error("{message}")]
    Connect { target: String, message: String },

    #[error("deadline of {}ms exceeded", .timeout.as_millis())]
    DeadlineExceeded { timeout: Duration },

    #[error("remote call failed with status {code:?}: {message}")]
    Remote { code: tonic::Code, message: String },

    #[error("channel is closed")]
    Closed,
}

impl CalculatorError {
    /// True when the call gave up because its deadline elapsed.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::DeadlineExceeded { .. })
    }

    /// Classify a non-OK status returned by a call bounded by `deadline`.
    ///
    /// tonic reports its own client-side timer as `Cancelled`, the server
    /// reports `DeadlineExceeded`; both mean the deadline elapsed.
    pub(crate) fn from_status(status: &tonic::Status, deadline: Duration) -> Self {
        match status.code() {
            tonic::Code::DeadlineExceeded => Self::DeadlineExceeded { timeout: deadline },
            tonic::Code::Cancelled if status.message().contains("Timeout expired") => {
                Self::DeadlineExceeded { timeout: deadline }
            }
            code => Self::Remote {
                code,
                message: status.message().to_owned(),
            },
        }
    }
}
