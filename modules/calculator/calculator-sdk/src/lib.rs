//! Calculator SDK
//!
//! This crate provides everything needed to consume the calculator service:
//! - API traits (`CalculatorClientV1`, `CalculatorConnector`)
//! - Error type (`CalculatorError`)
//! - tonic-backed connector (`GrpcConnector`)
//! - Proto stubs, including the server side for test doubles
//!
//! ## Usage
//!
//! ```ignore
//! use std::time::Duration;
//! use calculator_sdk::{CalculatorConnector, GrpcConnector};
//!
//! let client = GrpcConnector::default().connect("localhost:50051").await?;
//! let sum = client.add(5.5, 2.5, Duration::from_secs(5)).await?;
//! client.close();
//! ```

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

// === API TRAITS AND TYPES ===
mod api;
pub use api::{CalculatorClientV1, CalculatorConnector, CalculatorError};

// === GRPC CLIENT ===
mod client;
pub use client::GrpcConnector;

// === GRPC PROTO STUBS ===
/// Generated protobuf types for the Calculator service
pub mod proto {
    tonic::include_proto!("demo.calculator");
}

pub use proto::calculator_server::{Calculator, CalculatorServer};
pub use proto::{AddRequest, AddResponse, Empty};

/// Fully qualified name of the Calculator service
pub const SERVICE_NAME: &str = "demo.calculator.Calculator";

/// Address used when nothing else is configured
pub const DEFAULT_TARGET: &str = "localhost:50051";
