//! The offload pipeline: stage inputs, run the kernel once, collect output.

use crate::context::ExecutionContext;
use crate::error::{OffloadError, Result};
use crate::host::HostArray;
use crate::runtime::{AccessMode, DeviceSession};
use std::time::Duration;
use tracing::{debug, info};

/// Result of one completed offload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    /// Fully populated kernel output.
    pub result: HostArray,
    /// Device-reported kernel execution time, if the runtime profiles.
    pub kernel_time: Option<Duration>,
}

/// Drives a single `c = kernel(a, b)` invocation through an
/// [`ExecutionContext`].
pub struct OffloadPipeline<'ctx, S: DeviceSession> {
    ctx: &'ctx mut ExecutionContext<S>,
}

impl<'ctx, S: DeviceSession> OffloadPipeline<'ctx, S> {
    pub fn new(ctx: &'ctx mut ExecutionContext<S>) -> Self {
        Self { ctx }
    }

    /// Run the kernel on `a` and `b`.
    ///
    /// Steps run strictly in order: allocate, write inputs (blocking), bind
    /// `a`, `b`, `c`, launch over the flat range, read output (blocking),
    /// then wait for the queue to drain. Output is only returned once that
    /// final barrier has succeeded.
    ///
    /// The three device buffers live only for this call and are released
    /// when it returns, before the [`ExecutionContext`] itself is dropped.
    ///
    /// # Errors
    ///
    /// [`OffloadError::InvalidWorkload`] before any device call if the
    /// inputs are empty, differ in length or disagree with the kernel's
    /// element count; otherwise the first failing device step.
    pub fn run(&mut self, a: &HostArray, b: &HostArray) -> Result<RunOutput> {
        let len = self.validate(a, b)?;
        let bytes = self.ctx.signature().buffer_bytes()?;

        let mut buf_a = self.ctx.allocate_buffer(bytes, AccessMode::ReadOnly)?;
        let mut buf_b = self.ctx.allocate_buffer(bytes, AccessMode::ReadOnly)?;
        let buf_c = self.ctx.allocate_buffer(bytes, AccessMode::WriteOnly)?;

        self.ctx.write_buffer(&mut buf_a, a.as_slice())?;
        self.ctx.write_buffer(&mut buf_b, b.as_slice())?;
        debug!(bytes, "inputs staged");

        self.ctx.bind_argument(0, &buf_a)?;
        self.ctx.bind_argument(1, &buf_b)?;
        self.ctx.bind_argument(2, &buf_c)?;

        self.ctx.launch()?;

        let mut result = HostArray::zeroed(len);
        self.ctx.read_buffer(&buf_c, result.as_mut_slice())?;

        self.ctx.finish()?;

        let kernel_time = self.ctx.kernel_time();
        if let Some(t) = kernel_time {
            info!(elements = len, kernel_us = t.as_micros() as u64, "kernel complete");
        }
        Ok(RunOutput { result, kernel_time })
    }

    fn validate(&self, a: &HostArray, b: &HostArray) -> Result<usize> {
        let expected = self.ctx.signature().element_count();
        if a.is_empty() {
            return Err(OffloadError::InvalidWorkload { reason: "input arrays are empty".into() });
        }
        if a.len() != b.len() {
            return Err(OffloadError::InvalidWorkload {
                reason: format!("input lengths differ: a={} b={}", a.len(), b.len()),
            });
        }
        if a.len() != expected {
            return Err(OffloadError::InvalidWorkload {
                reason: format!(
                    "kernel '{}' is configured for {expected} elements, inputs hold {}",
                    self.ctx.signature().name(),
                    a.len()
                ),
            });
        }
        Ok(a.len())
    }
}
