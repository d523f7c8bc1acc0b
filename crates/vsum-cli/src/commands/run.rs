//! The `run` command: offload, verify, report.

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use std::path::Path;
use vsum_offload::runtime::sim::{SimKernel, SimRuntime};
use vsum_offload::{OffloadConfig, OffloadReport, RuntimeKind, Verdict};

use super::{ConfigOverrides, load_config};

/// Offload the vector addition and verify the device result
#[derive(Debug, Parser)]
pub struct RunCommand {
    #[command(flatten)]
    pub overrides: ConfigOverrides,

    /// Host kernel behind the simulated card (sum, first-operand)
    #[arg(long, value_name = "KERNEL", default_value = "sum")]
    pub sim_kernel: SimKernel,
}

impl RunCommand {
    /// Returns whether verification passed.
    pub fn execute(&self, config_path: Option<&Path>) -> Result<bool> {
        let config = load_config(config_path, &self.overrides)?;
        let report = match config.runtime {
            RuntimeKind::Sim => {
                vsum_offload::execute(&SimRuntime::card(self.sim_kernel), &config)
            }
            RuntimeKind::OpenCl => execute_opencl(&config)?,
        }
        .context("Offload failed")?;

        print_report(&report);
        Ok(report.verdict.is_pass())
    }
}

#[cfg(feature = "opencl")]
fn execute_opencl(
    config: &OffloadConfig,
) -> Result<Result<OffloadReport, vsum_offload::ExecuteError>> {
    Ok(vsum_offload::execute(&vsum_offload::runtime::opencl::OpenClRuntime::new(), config))
}

#[cfg(not(feature = "opencl"))]
fn execute_opencl(
    _config: &OffloadConfig,
) -> Result<Result<OffloadReport, vsum_offload::ExecuteError>> {
    anyhow::bail!("vsum was built without the `opencl` feature; rebuild with it or use --runtime sim")
}

fn print_report(report: &OffloadReport) {
    println!("Platform: {}", report.platform);
    println!("Device:   {}", report.device);
    if let Some(t) = report.kernel_time {
        println!("Kernel:   {:.3} ms over {} elements", t.as_secs_f64() * 1e3, report.elements);
    }

    match &report.verdict {
        Verdict::Pass => println!("TEST {}", style("PASSED").green().bold()),
        Verdict::Fail(mismatch) => {
            println!("Error: Result mismatch");
            println!("{mismatch}");
            println!("TEST {}", style("FAILED").red().bold());
        }
    }
}
