//! Process-wide `tracing` subscriber.
//!
//! Logs always go to stderr so stdout carries nothing but the result line.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter directive for the given verbosity count (-v info, -vv debug, -vvv trace).
#[must_use]
pub fn effective_level(cfg: &LoggingConfig, verbose: u8) -> &str {
    match verbose {
        0 => cfg.level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over everything else.
pub fn init_logging(cfg: &LoggingConfig, verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(effective_level(cfg, verbose)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if cfg.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = installed {
        eprintln!("logging already initialized: {e}");
    }
}
