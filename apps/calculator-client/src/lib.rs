//! Calculator command-line client
//!
//! - `config.rs` - layered configuration (defaults, YAML, env, CLI)
//! - `logging.rs` - `tracing` subscriber setup
//! - `runner.rs` - the connect/call/report/release lifecycle
//!
//! The binary in `main.rs` only parses arguments and wires these together.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

pub mod config;
pub mod logging;
pub mod runner;
