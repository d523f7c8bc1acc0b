//! CLI command implementations

pub mod config;
pub mod devices;
pub mod run;

pub use config::ConfigCommand;
pub use devices::DevicesCommand;
pub use run::RunCommand;

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::info;
use vsum_offload::{OffloadConfig, RuntimeKind};

/// Flags that override the configuration file and `VSUM_*` variables.
#[derive(Debug, Default, Args)]
pub struct ConfigOverrides {
    /// Compiled accelerator image
    #[arg(short, long, value_name = "PATH")]
    pub binary: Option<PathBuf>,

    /// Platform name prefix to select
    #[arg(long, value_name = "NAME")]
    pub vendor: Option<String>,

    /// Kernel entry point inside the image
    #[arg(long, value_name = "NAME")]
    pub kernel: Option<String>,

    /// Number of elements per input vector
    #[arg(long, value_name = "N")]
    pub length: Option<usize>,

    /// Accelerator runtime (opencl, sim)
    #[arg(long, value_name = "RUNTIME")]
    pub runtime: Option<RuntimeKind>,
}

/// Load the configuration file (if any), apply env overrides, then flags.
pub fn load_config(path: Option<&Path>, overrides: &ConfigOverrides) -> Result<OffloadConfig> {
    let mut config = match path {
        Some(path) => OffloadConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => {
            info!("Using default configuration");
            OffloadConfig::from_env().context("Failed to read VSUM_* environment")?
        }
    };

    if let Some(binary) = &overrides.binary {
        config.binary = Some(binary.clone());
    }
    if let Some(vendor) = &overrides.vendor {
        config.vendor = vendor.clone();
    }
    if let Some(kernel) = &overrides.kernel {
        config.kernel = kernel.clone();
    }
    if let Some(length) = overrides.length {
        config.length = length;
    }
    if let Some(runtime) = overrides.runtime {
        config.runtime = runtime;
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}
