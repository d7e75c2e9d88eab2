//! Layered client configuration.
//!
//! Precedence, lowest first: built-in defaults, the YAML file given with
//! `--config`, `CALCULATOR__*` environment variables, command-line flags.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use transport_grpc::{ChannelSecurity, GrpcClientConfig, validate_target};

/// Prefix of environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "CALCULATOR__";

const DEFAULT_TIMEOUT_SECS: f64 = 5.0;
const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 5.0;

/// Effective configuration of one client run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// `host:port`, or a full `http://` / `https://` URI.
    pub target: String,
    /// Negotiate TLS for bare `host:port` targets.
    pub tls: bool,
    /// Deadline of each remote call, in seconds.
    pub timeout_secs: f64,
    /// Bound on establishing the connection, in seconds.
    pub connect_timeout_secs: f64,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            target: calculator_sdk::DEFAULT_TARGET.to_owned(),
            tls: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            logging: LoggingConfig::default(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "error".to_owned(),
            json: false,
        }
    }
}

/// Values given on the command line; `None`/`false` leaves the loaded value alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub target: Option<String>,
    pub timeout_secs: Option<f64>,
    pub tls: bool,
}

impl ClientConfig {
    /// Build the provider chain without extracting it.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load defaults, the optional YAML file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if any layer holds a value of the wrong type or an
    /// unknown key.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::figment(path)
            .extract()
            .context("invalid client configuration")
    }

    /// Apply command-line flags on top of the loaded layers.
    pub fn apply_cli_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(target) = &overrides.target {
            self.target.clone_from(target);
        }
        if let Some(timeout) = overrides.timeout_secs {
            self.timeout_secs = timeout;
        }
        if overrides.tls {
            self.tls = true;
        }
    }

    /// Deadline applied to each remote call.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout_secs` is not a positive finite number.
    pub fn rpc_deadline(&self) -> Result<Duration> {
        positive_secs("timeout_secs", self.timeout_secs)
    }

    /// # Errors
    ///
    /// Returns an error if `connect_timeout_secs` is not a positive finite number.
    pub fn connect_timeout(&self) -> Result<Duration> {
        positive_secs("connect_timeout_secs", self.connect_timeout_secs)
    }

    #[must_use]
    pub fn security(&self) -> ChannelSecurity {
        if self.tls {
            ChannelSecurity::Tls
        } else {
            ChannelSecurity::Plaintext
        }
    }

    /// Transport settings for the calculator channel.
    ///
    /// # Errors
    ///
    /// Returns an error if either timeout is invalid or the target does not
    /// parse as a URI.
    pub fn transport(&self) -> Result<GrpcClientConfig> {
        validate_target(&self.target, self.security())?;
        Ok(GrpcClientConfig::new(calculator_sdk::SERVICE_NAME)
            .with_connect_timeout(self.connect_timeout()?)
            .with_rpc_timeout(self.rpc_deadline()?)
            .with_security(self.security()))
    }
}

fn positive_secs(key: &str, secs: f64) -> Result<Duration> {
    if !secs.is_finite() || secs <= 0.0 {
        anyhow::bail!("{key} must be a positive number of seconds, got {secs}");
    }
    Duration::try_from_secs_f64(secs).with_context(|| format!("{key} is out of range: {secs}"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn defaults_match_the_demo_server() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.target, "localhost:50051");
        assert!(!cfg.tls);
        assert_eq!(cfg.rpc_deadline().unwrap(), Duration::from_secs(5));
        assert_eq!(cfg.logging.level, "error");
    }

    #[test]
    fn yaml_then_env_then_cli() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "client.yaml",
                "target: \"10.0.0.7:6000\"\ntimeout_secs: 2.5\nlogging:\n  level: debug\n",
            )?;
            jail.set_env("CALCULATOR__TIMEOUT_SECS", "3");
            jail.set_env("CALCULATOR__LOGGING__JSON", "true");

            let mut cfg = ClientConfig::load(Some(Path::new("client.yaml"))).unwrap();
            assert_eq!(cfg.target, "10.0.0.7:6000");
            assert_eq!(cfg.timeout_secs, 3.0);
            assert_eq!(cfg.logging.level, "debug");
            assert!(cfg.logging.json);

            cfg.apply_cli_overrides(&CliOverrides {
                target: Some("127.0.0.1:50051".to_owned()),
                timeout_secs: None,
                tls: true,
            });
            assert_eq!(cfg.target, "127.0.0.1:50051");
            assert_eq!(cfg.timeout_secs, 3.0);
            assert_eq!(cfg.security(), ChannelSecurity::Tls);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("client.yaml", "retries: 3\n")?;
            assert!(ClientConfig::load(Some(Path::new("client.yaml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn non_positive_timeouts_are_rejected() {
        let mut cfg = ClientConfig {
            timeout_secs: 0.0,
            ..ClientConfig::default()
        };
        assert!(cfg.rpc_deadline().is_err());

        cfg.timeout_secs = f64::NAN;
        assert!(cfg.transport().is_err());

        cfg.timeout_secs = 0.25;
        cfg.connect_timeout_secs = -1.0;
        assert!(cfg.transport().is_err());
    }

    #[test]
    fn malformed_target_is_rejected() {
        let cfg = ClientConfig {
            target: "http://[::1".to_owned(),
            ..ClientConfig::default()
        };
        let err = cfg.transport().unwrap_err();
        assert!(format!("{err:#}").contains("invalid gRPC target"));
    }

    #[test]
    fn transport_carries_timeouts_and_security() {
        let cfg = ClientConfig {
            tls: true,
            timeout_secs: 1.5,
            connect_timeout_secs: 2.0,
            ..ClientConfig::default()
        };
        let transport = cfg.transport().unwrap();
        assert_eq!(transport.rpc_timeout, Duration::from_millis(1500));
        assert_eq!(transport.connect_timeout, Duration::from_secs(2));
        assert_eq!(transport.security, ChannelSecurity::Tls);
        assert_eq!(transport.service_name, calculator_sdk::SERVICE_NAME);
    }
}
