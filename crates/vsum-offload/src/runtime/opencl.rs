//! OpenCL binding of the runtime boundary via `opencl3`.
//!
//! Targets vendor ICDs that expose FPGA cards as `CL_DEVICE_TYPE_ACCELERATOR`
//! (Xilinx XRT, Intel FPGA SDK). Programs are always built from a
//! precompiled binary; there is no source compilation path.

use super::{AcceleratorRuntime, AccessMode, DeviceSession};
use crate::binary::BinaryImage;
use crate::error::{DeviceError, Result};
use opencl3::command_queue::{CL_QUEUE_PROFILING_ENABLE, CommandQueue};
use opencl3::context::Context;
use opencl3::device::{CL_DEVICE_TYPE_ACCELERATOR, Device};
use opencl3::event::Event;
use opencl3::kernel::Kernel;
use opencl3::memory::{Buffer, CL_MEM_READ_ONLY, ClMem, CL_MEM_READ_WRITE, CL_MEM_WRITE_ONLY};
use opencl3::platform::{Platform, get_platforms};
use opencl3::program::Program;
use opencl3::types::{CL_BLOCKING, cl_device_id};
use std::time::Duration;
use tracing::{debug, info};

/// Runtime backed by the system OpenCL ICD loader.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenClRuntime;

impl OpenClRuntime {
    pub fn new() -> Self {
        Self
    }
}

impl AcceleratorRuntime for OpenClRuntime {
    type Platform = Platform;
    type Device = cl_device_id;
    type Session = OpenClSession;

    fn platforms(&self) -> Result<Vec<Platform>> {
        get_platforms()
            .map_err(|e| DeviceError::Enumeration { reason: format!("get platforms: {e}") }.into())
    }

    fn platform_name(&self, platform: &Platform) -> Result<String> {
        platform
            .name()
            .map_err(|e| DeviceError::Enumeration { reason: format!("platform name: {e}") }.into())
    }

    fn accelerator_devices(&self, platform: &Platform) -> Result<Vec<cl_device_id>> {
        match platform.get_devices(CL_DEVICE_TYPE_ACCELERATOR) {
            Ok(ids) => Ok(ids),
            // CL_DEVICE_NOT_FOUND is how ICDs report an empty device class.
            Err(e) if e.0 == opencl3::error_codes::CL_DEVICE_NOT_FOUND => Ok(Vec::new()),
            Err(e) => {
                Err(DeviceError::Enumeration { reason: format!("accelerator devices: {e}") }.into())
            }
        }
    }

    fn device_name(&self, device: &cl_device_id) -> Result<String> {
        Device::new(*device)
            .name()
            .map_err(|e| DeviceError::Enumeration { reason: format!("device name: {e}") }.into())
    }

    fn open_session(
        &self,
        device: &cl_device_id,
        image: BinaryImage,
        kernel_name: &str,
    ) -> Result<OpenClSession> {
        let device = Device::new(*device);

        let context = Context::from_device(&device)
            .map_err(|e| DeviceError::ContextCreation { reason: e.to_string() })?;

        let queue = CommandQueue::create_default_with_properties(
            &context,
            CL_QUEUE_PROFILING_ENABLE,
            0,
        )
        .map_err(|e| DeviceError::QueueCreation { reason: e.to_string() })?;

        // The context holds exactly one device, so one binary covers it.
        let program =
            Program::create_and_build_from_binary(&context, &[image.as_bytes()], "")
                .map_err(|log| DeviceError::Programming {
                    reason: format!("{}: {log}", image.source().display()),
                })?;
        info!(bytes = image.len(), "device programmed from {}", image.source().display());

        let kernel = Kernel::create(&program, kernel_name).map_err(|e| {
            DeviceError::KernelNotFound { name: kernel_name.to_string(), reason: e.to_string() }
        })?;

        Ok(OpenClSession {
            kernel,
            _program: program,
            queue,
            context,
            last_launch: None,
            kernel_time: None,
        })
    }
}

/// Context, profiling queue and kernel for one programmed device.
///
/// Field order is drop order: the kernel and program are released before
/// the queue and context that own them.
pub struct OpenClSession {
    last_launch: Option<Event>,
    kernel: Kernel,
    _program: Program,
    queue: CommandQueue,
    context: Context,
    kernel_time: Option<Duration>,
}

impl std::fmt::Debug for OpenClSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenClSession")
            .field("kernel_time", &self.kernel_time)
            .finish_non_exhaustive()
    }
}

fn mode_to_flags(mode: AccessMode) -> u64 {
    match mode {
        AccessMode::ReadOnly => CL_MEM_READ_ONLY,
        AccessMode::WriteOnly => CL_MEM_WRITE_ONLY,
        AccessMode::ReadWrite => CL_MEM_READ_WRITE,
    }
}

fn profiled_duration(event: &Event) -> std::result::Result<Duration, String> {
    let start = event.profiling_command_start().map_err(|e| e.to_string())?;
    let end = event.profiling_command_end().map_err(|e| e.to_string())?;
    Ok(Duration::from_nanos(end.saturating_sub(start)))
}

impl DeviceSession for OpenClSession {
    type Buffer = Buffer<i32>;

    fn allocate(&mut self, bytes: usize, mode: AccessMode) -> Result<Buffer<i32>> {
        let elem = std::mem::size_of::<i32>();
        if bytes % elem != 0 {
            return Err(DeviceError::BufferAllocation {
                size: bytes,
                reason: format!("not a whole number of {elem}-byte elements"),
            }
            .into());
        }
        // SAFETY: no host pointer is passed, so the driver owns the storage.
        let buffer = unsafe {
            Buffer::<i32>::create(&self.context, mode_to_flags(mode), bytes / elem, std::ptr::null_mut())
                .map_err(|e| DeviceError::BufferAllocation { size: bytes, reason: e.to_string() })?
        };
        debug!(bytes, %mode, "device buffer allocated");
        Ok(buffer)
    }

    fn write(&mut self, buffer: &mut Buffer<i32>, src: &[i32]) -> Result<()> {
        // SAFETY: blocking write, `src` outlives the call.
        unsafe {
            self.queue
                .enqueue_write_buffer(buffer, CL_BLOCKING, 0, src, &[])
                .map_err(|e| DeviceError::DataTransfer { reason: format!("write: {e}") })?;
        }
        debug!(bytes = std::mem::size_of_val(src), "host to device transfer complete");
        Ok(())
    }

    fn set_arg(&mut self, index: u32, buffer: &Buffer<i32>) -> Result<()> {
        // SAFETY: the argument is a live cl_mem handle of the kernel's type.
        unsafe {
            self.kernel.set_arg(index, &buffer.get()).map_err(|e| DeviceError::KernelLaunch {
                reason: format!("set argument {index}: {e}"),
            })?;
        }
        Ok(())
    }

    fn enqueue_kernel(&mut self, global_size: usize) -> Result<()> {
        let global = [global_size];
        // SAFETY: all arguments were bound through `set_arg`; offsets and
        // local sizes are null, leaving work-group shape to the runtime.
        let event = unsafe {
            self.queue
                .enqueue_nd_range_kernel(
                    self.kernel.get(),
                    1,
                    std::ptr::null(),
                    global.as_ptr(),
                    std::ptr::null(),
                    &[],
                )
                .map_err(|e| DeviceError::KernelLaunch { reason: e.to_string() })?
        };
        self.last_launch = Some(event);
        Ok(())
    }

    fn read(&mut self, buffer: &Buffer<i32>, dst: &mut [i32]) -> Result<()> {
        // SAFETY: blocking read into a host slice that outlives the call.
        unsafe {
            self.queue
                .enqueue_read_buffer(buffer, CL_BLOCKING, 0, dst, &[])
                .map_err(|e| DeviceError::DataTransfer { reason: format!("read: {e}") })?;
        }
        debug!(bytes = std::mem::size_of_val(dst), "device to host transfer complete");
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.queue
            .finish()
            .map_err(|e| DeviceError::Synchronization { reason: e.to_string() })?;
        if let Some(event) = self.last_launch.take() {
            match profiled_duration(&event) {
                Ok(elapsed) => self.kernel_time = Some(elapsed),
                Err(reason) => debug!("kernel profiling unavailable: {reason}"),
            }
        }
        Ok(())
    }

    fn kernel_time(&self) -> Option<Duration> {
        self.kernel_time
    }
}
