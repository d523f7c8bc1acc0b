//! End-to-end offload: locate, load, program, run, verify.

use crate::binary;
use crate::config::{ConfigError, OffloadConfig};
use crate::context::{ExecutionContext, KernelSignature};
use crate::device;
use crate::error::OffloadError;
use crate::pipeline::OffloadPipeline;
use crate::reference;
use crate::runtime::AcceleratorRuntime;
use crate::verify::{self, Verdict};
use std::time::Duration;
use tracing::info;

/// Everything the entry point needs to report a completed offload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffloadReport {
    pub platform: String,
    pub device: String,
    pub elements: usize,
    pub verdict: Verdict,
    pub kernel_time: Option<Duration>,
}

/// Why [`execute`] stopped before producing a verdict.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Offload(#[from] OffloadError),
}

/// Run the configured vector addition on `runtime` and verify it against
/// the host reference.
///
/// A mismatch is a normal outcome reported through
/// [`OffloadReport::verdict`]; only setup and device failures are errors.
pub fn execute<R: AcceleratorRuntime>(
    runtime: &R,
    config: &OffloadConfig,
) -> Result<OffloadReport, ExecuteError> {
    config.validate()?;
    let binary_path = config.binary_path()?;

    let (a, b) = reference::ramp_inputs(config.length);
    let expected = reference::vector_add(&a, &b);

    let platform = device::locate(runtime, &config.vendor)?;
    let platform_name = platform.name.clone();
    let device = platform.into_first_device()?;

    let image = binary::load(binary_path)?;
    let signature = KernelSignature::vector_add(config.kernel.clone(), config.length);
    let mut ctx = ExecutionContext::create(runtime, &device, image, signature)?;

    let output = OffloadPipeline::new(&mut ctx).run(&a, &b)?;
    let verdict = verify::compare(expected.as_slice(), output.result.as_slice(), config.length)?;
    info!(%verdict, "verification complete");

    Ok(OffloadReport {
        platform: platform_name,
        device: ctx.device_name().to_string(),
        elements: config.length,
        verdict,
        kernel_time: output.kernel_time,
    })
}
