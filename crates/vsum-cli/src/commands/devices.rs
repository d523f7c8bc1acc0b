//! The `devices` command: platform and accelerator listing.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use vsum_offload::device::{self, PlatformListing};
use vsum_offload::runtime::sim::{SimKernel, SimRuntime};
use vsum_offload::RuntimeKind;

use super::{ConfigOverrides, load_config};

/// List platforms and their accelerator devices
#[derive(Debug, Parser)]
pub struct DevicesCommand {
    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

impl DevicesCommand {
    pub fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let config = load_config(config_path, &self.overrides)?;
        let listings = match config.runtime {
            RuntimeKind::Sim => device::list(&SimRuntime::card(SimKernel::Sum)),
            RuntimeKind::OpenCl => list_opencl()?,
        }
        .context("Platform enumeration failed")?;

        print_listings(&listings, &config.vendor);
        Ok(())
    }
}

#[cfg(feature = "opencl")]
fn list_opencl() -> Result<vsum_offload::error::Result<Vec<PlatformListing>>> {
    Ok(device::list(&vsum_offload::runtime::opencl::OpenClRuntime::new()))
}

#[cfg(not(feature = "opencl"))]
fn list_opencl() -> Result<vsum_offload::error::Result<Vec<PlatformListing>>> {
    anyhow::bail!("vsum was built without the `opencl` feature; rebuild with it or use --runtime sim")
}

fn print_listings(listings: &[PlatformListing], vendor: &str) {
    if listings.is_empty() {
        println!("No platforms found");
        return;
    }
    for platform in listings {
        let marker = if platform.name.starts_with(vendor) { "*" } else { " " };
        println!("{marker} Platform: {}", platform.name);
        if platform.accelerators.is_empty() {
            println!("    (no accelerator devices)");
        }
        for (i, name) in platform.accelerators.iter().enumerate() {
            println!("    [{i}] {name}");
        }
    }
}
