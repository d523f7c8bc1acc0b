//! vsum CLI application
//!
//! Offloads a vector addition to an FPGA accelerator, checks the result
//! against the host and reports PASSED or FAILED through the exit status.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;

mod commands;
mod exit;

use commands::{ConfigCommand, DevicesCommand, RunCommand};

/// vsum - vector addition offload to FPGA accelerators
#[derive(Parser)]
#[command(name = "vsum")]
#[command(about = "Offload a vector addition to an FPGA accelerator and verify it")]
#[command(long_about = r#"
Offloads c[i] = a[i] + b[i] to an accelerator kernel programmed from a
precompiled binary, then compares the device result with a host reference.

Examples:
  # Run on a Xilinx card
  vsum run --binary sum.awsxclbin

  # Run against the host-simulated accelerator
  vsum run --binary sum_emu.xclbin --runtime sim

  # List platforms and accelerator devices
  vsum devices
"#)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL", global = true, default_value = "warn")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, value_name = "FORMAT", global = true, default_value = "compact")]
    log_format: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the offload and verify the result
    Run(RunCommand),

    /// List platforms and their accelerator devices
    Devices(DevicesCommand),

    /// Print the effective configuration as TOML
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli.log_level, &cli.log_format);

    let result = match cli.command {
        Some(Commands::Run(cmd)) => cmd.execute(cli.config.as_deref()),
        Some(Commands::Devices(cmd)) => cmd.execute(cli.config.as_deref()).map(|()| true),
        Some(Commands::Config(cmd)) => cmd.execute(cli.config.as_deref()).map(|()| true),
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            Ok(true)
        }
    };

    match result {
        Ok(true) => std::process::exit(exit::EXIT_SUCCESS),
        Ok(false) => std::process::exit(exit::EXIT_FAILURE),
        Err(e) => {
            error!("Command failed: {}", e);

            let mut source = e.source();
            while let Some(err) = source {
                error!("  Caused by: {}", err);
                source = err.source();
            }

            std::process::exit(exit::EXIT_FAILURE);
        }
    }
}

/// Setup logging on stderr; `RUST_LOG` takes precedence over `--log-level`.
fn setup_logging(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        "json" => {
            subscriber.json().with_timer(tracing_subscriber::fmt::time::uptime()).init();
        }
        "pretty" => {
            subscriber.pretty().init();
        }
        _ => {
            subscriber.compact().init();
        }
    }
}
