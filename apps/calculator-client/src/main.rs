use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use calculator_client::config::{CliOverrides, ClientConfig};
use calculator_client::logging::init_logging;
use calculator_client::runner::{self, ExitStatus, Invocation};
use calculator_sdk::GrpcConnector;
use clap::{Parser, Subcommand};

const DEFAULT_A: f64 = 5.5;
const DEFAULT_B: f64 = 2.5;

/// Calculator client - calls Calculator.Add on a gRPC server and prints the result
#[derive(Parser)]
#[command(name = "calculator-client")]
#[command(about = "Calculator client - calls Calculator.Add on a gRPC server")]
#[command(version)]
struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Server address, host:port or a full http(s):// URI (overrides config)
    #[arg(short, long, global = true)]
    target: Option<String>,

    /// Call deadline in seconds (overrides config)
    #[arg(long, global = true)]
    timeout: Option<f64>,

    /// Negotiate TLS with the server
    #[arg(long, global = true)]
    tls: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add two numbers remotely (default)
    Add {
        /// First operand
        #[arg(default_value_t = DEFAULT_A, allow_negative_numbers = true)]
        a: f64,
        /// Second operand
        #[arg(default_value_t = DEFAULT_B, allow_negative_numbers = true)]
        b: f64,
    },
    /// Check that the server answers
    Ping,
    /// Validate configuration, print it and exit
    Check,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(path) = cli.config.as_deref() {
        if !path.is_file() {
            anyhow::bail!("config file does not exist: {}", path.display());
        }
    }

    // defaults -> YAML -> env (CALCULATOR__*) -> CLI
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    config.apply_cli_overrides(&CliOverrides {
        target: cli.target,
        timeout_secs: cli.timeout,
        tls: cli.tls,
    });

    init_logging(&config.logging, cli.verbose);

    let transport = config.transport()?;
    let invocation = Invocation {
        target: &config.target,
        deadline: transport.rpc_timeout,
    };
    let connector = GrpcConnector::new(transport);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let command = cli.command.unwrap_or(Commands::Add {
        a: DEFAULT_A,
        b: DEFAULT_B,
    });
    let status = match command {
        Commands::Add { a, b } => {
            runner::run_add(&connector, &invocation, a, b, &mut stdout, &mut stderr).await
        }
        Commands::Ping => runner::run_ping(&connector, &invocation, &mut stdout, &mut stderr).await,
        Commands::Check => {
            tracing::info!("configuration is valid");
            println!("{}", serde_json::to_string_pretty(&config)?);
            ExitStatus::Success
        }
    };

    Ok(status.into())
}
