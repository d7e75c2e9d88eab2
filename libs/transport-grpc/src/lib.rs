#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
//! gRPC channel plumbing shared by calculator clients.
//!
//! Only the transport side lives here: target resolution, timeouts,
//! keepalive and the plaintext/TLS choice. Service-specific stubs belong
//! in the SDK crates.

pub mod client;

pub use client::{
    ChannelSecurity, GrpcClientConfig, connect_lazy_with_stack, connect_with_stack,
    resolve_target, validate_target,
};
