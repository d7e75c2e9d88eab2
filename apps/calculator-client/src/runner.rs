//! One client invocation: connect, call, report, release.
//!
//! Lifecycle: `Idle -> Connected -> Completed(Success | Failure)`. A failed
//! connect goes straight to `Completed(Failure)`; leaving `Connected` always
//! releases the channel through [`ChannelGuard`].

use std::fmt;
use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use calculator_sdk::{CalculatorClientV1, CalculatorConnector, CalculatorError};

/// Process outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    /// Numeric process exit code: `0` or `1`.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::Failure => 1,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        Self::from(status.code())
    }
}

/// Where and how long to talk to the server.
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    pub target: &'a str,
    pub deadline: Duration,
}

#[derive(Debug, Clone, Copy)]
enum Operation {
    Add { a: f64, b: f64 },
    Ping,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Sum(f64),
    Pong,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sum(result) => write!(f, "Add result: {result}"),
            Self::Pong => f.write_str("Ping ok"),
        }
    }
}

/// Owns the connected client and closes it exactly once when dropped.
struct ChannelGuard {
    client: Box<dyn CalculatorClientV1>,
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        self.client.close();
        tracing::debug!(state = "completed", "channel closed");
    }
}

/// Call `Add(a, b)` on `invocation.target` and print `Add result: <value>`.
///
/// On any failure one `RPC failed: ...` line goes to `err` and the status is
/// [`ExitStatus::Failure`]. Nothing is retried.
pub async fn run_add<C>(
    connector: &C,
    invocation: &Invocation<'_>,
    a: f64,
    b: f64,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitStatus
where
    C: CalculatorConnector + ?Sized,
{
    let result = execute(connector, invocation, Operation::Add { a, b }).await;
    report(result, out, err)
}

/// Call `Ping` on `invocation.target` and print `Ping ok`.
///
/// Same failure policy as [`run_add`].
pub async fn run_ping<C>(
    connector: &C,
    invocation: &Invocation<'_>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitStatus
where
    C: CalculatorConnector + ?Sized,
{
    let result = execute(connector, invocation, Operation::Ping).await;
    report(result, out, err)
}

async fn execute<C>(
    connector: &C,
    invocation: &Invocation<'_>,
    operation: Operation,
) -> Result<Outcome, CalculatorError>
where
    C: CalculatorConnector + ?Sized,
{
    tracing::debug!(target_addr = invocation.target, state = "idle", "connecting");
    let channel = ChannelGuard {
        client: connector.connect(invocation.target).await?,
    };
    tracing::debug!(target_addr = invocation.target, state = "connected", ?operation, "calling");

    let result = match operation {
        Operation::Add { a, b } => channel
            .client
            .add(a, b, invocation.deadline)
            .await
            .map(Outcome::Sum),
        Operation::Ping => channel
            .client
            .ping(invocation.deadline)
            .await
            .map(|()| Outcome::Pong),
    };
    drop(channel);
    result
}

fn report(
    result: Result<Outcome, CalculatorError>,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> ExitStatus {
    match result {
        Ok(outcome) => match writeln!(out, "{outcome}") {
            Ok(()) => ExitStatus::Success,
            Err(e) => {
                tracing::error!(error = %e, "failed to write result");
                ExitStatus::Failure
            }
        },
        Err(failure) => {
            tracing::warn!(
                error = %failure,
                timeout = failure.is_timeout(),
                "remote call failed"
            );
            if let Err(e) = writeln!(err, "RPC failed: {failure}") {
                tracing::error!(error = %e, "failed to write error report");
            }
            ExitStatus::Failure
        }
    }
}
