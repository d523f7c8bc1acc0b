//! Vector addition offload to FPGA accelerators.
//!
//! This crate provides:
//! - [`device`]: platform lookup by vendor prefix and accelerator selection
//! - [`binary`]: loading compiled accelerator images
//! - [`context`]: the programmed device, its queue and the kernel contract
//! - [`pipeline`]: one staged `c = a + b` kernel invocation
//! - [`verify`]: first-mismatch comparison against the host reference
//! - [`runtime`]: the runtime boundary, with OpenCL (feature `opencl`) and
//!   host-simulated implementations
//! - [`offload`]: all of the above wired together for the CLI

pub mod binary;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod host;
pub mod offload;
pub mod pipeline;
pub mod reference;
pub mod runtime;
pub mod verify;

// Re-export primary public types.
pub use binary::BinaryImage;
pub use config::{ConfigError, OffloadConfig, RuntimeKind};
pub use context::{DeviceBuffer, ExecutionContext, KernelSignature};
pub use device::{LocatedPlatform, PlatformListing};
pub use error::{DeviceError, ErrorKind, OffloadError};
pub use host::HostArray;
pub use offload::{ExecuteError, OffloadReport, execute};
pub use pipeline::{OffloadPipeline, RunOutput};
pub use runtime::{AcceleratorRuntime, AccessMode, DeviceSession};
pub use verify::{Mismatch, Verdict};
