//! The accelerator runtime boundary.
//!
//! [`AcceleratorRuntime`] and [`DeviceSession`] are the only way the rest
//! of the crate talks to hardware. [`sim::SimRuntime`] implements them on
//! the host; `opencl::OpenClRuntime` (feature `opencl`) binds them to a
//! vendor OpenCL ICD such as Xilinx XRT.
//!
//! Every call blocks until the runtime reports completion or failure.
//! There is no timeout: a wedged device blocks the caller indefinitely.

use crate::binary::BinaryImage;
use crate::error::Result;
use std::time::Duration;

#[cfg(feature = "opencl")]
pub mod opencl;
pub mod sim;

/// Device memory access mode, named from the kernel's point of view
/// exactly like the OpenCL `CL_MEM_*` flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl std::fmt::Display for AccessMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AccessMode::ReadOnly => write!(f, "read-only"),
            AccessMode::WriteOnly => write!(f, "write-only"),
            AccessMode::ReadWrite => write!(f, "read-write"),
        }
    }
}

/// Platform and device discovery plus device programming.
pub trait AcceleratorRuntime {
    type Platform;
    type Device;
    type Session: DeviceSession;

    /// All platforms the runtime exposes, in runtime order.
    fn platforms(&self) -> Result<Vec<Self::Platform>>;

    fn platform_name(&self, platform: &Self::Platform) -> Result<String>;

    /// Devices of the accelerator class on `platform`. GPUs and CPUs are
    /// never returned.
    fn accelerator_devices(&self, platform: &Self::Platform) -> Result<Vec<Self::Device>>;

    fn device_name(&self, device: &Self::Device) -> Result<String>;

    /// Create a context and a profiling-enabled queue on `device`, program
    /// it with `image` and resolve `kernel_name` in the result.
    fn open_session(
        &self,
        device: &Self::Device,
        image: BinaryImage,
        kernel_name: &str,
    ) -> Result<Self::Session>;
}

/// One context, one in-order command queue and one resolved kernel.
pub trait DeviceSession {
    type Buffer;

    /// Allocate exactly `bytes` of device memory.
    fn allocate(&mut self, bytes: usize, mode: AccessMode) -> Result<Self::Buffer>;

    /// Blocking host-to-device copy of `src` into the start of `buffer`.
    fn write(&mut self, buffer: &mut Self::Buffer, src: &[i32]) -> Result<()>;

    /// Bind `buffer` to the kernel's positional argument `index`.
    fn set_arg(&mut self, index: u32, buffer: &Self::Buffer) -> Result<()>;

    /// Enqueue one kernel execution over the flat range `0..global_size`.
    fn enqueue_kernel(&mut self, global_size: usize) -> Result<()>;

    /// Blocking device-to-host copy of the start of `buffer` into `dst`.
    fn read(&mut self, buffer: &Self::Buffer, dst: &mut [i32]) -> Result<()>;

    /// Wait until every queued command has retired.
    fn finish(&mut self) -> Result<()>;

    /// Execution time of the last kernel, once `finish` has returned.
    fn kernel_time(&self) -> Option<Duration>;
}
