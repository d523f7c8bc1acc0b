//! Host-simulated accelerator runtime.
//!
//! Stands in for a vendor runtime when no hardware is attached: the CLI
//! exposes it as `--runtime sim`, and tests use it both as a trusted
//! reference device and as a deliberately faulty one. Every command is
//! logged so callers can assert allocation sizes and queue ordering.

use super::{AcceleratorRuntime, AccessMode, DeviceSession};
use crate::binary::BinaryImage;
use crate::error::{DeviceError, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// Number of positional arguments every simulated kernel takes.
const SIM_KERNEL_ARITY: usize = 3;

/// Host implementations a simulated device can be "programmed" with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimKernel {
    /// `c[i] = a[i] + b[i]`, the correct vector addition.
    Sum,
    /// `c[i] = a[i]`, ignoring the second operand.
    FirstOperand,
}

impl SimKernel {
    fn execute(self, a: &[i32], b: &[i32], c: &mut [i32]) {
        match self {
            SimKernel::Sum => {
                for ((c, &a), &b) in c.iter_mut().zip(a).zip(b) {
                    *c = a.wrapping_add(b);
                }
            }
            SimKernel::FirstOperand => c.copy_from_slice(a),
        }
    }
}

impl std::fmt::Display for SimKernel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimKernel::Sum => write!(f, "sum"),
            SimKernel::FirstOperand => write!(f, "first-operand"),
        }
    }
}

impl std::str::FromStr for SimKernel {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sum" => Ok(Self::Sum),
            "first-operand" => Ok(Self::FirstOperand),
            other => Err(format!("unknown simulated kernel: {other}")),
        }
    }
}

/// Platform name of [`SimRuntime::card`].
pub const SIM_PLATFORM_NAME: &str = "Xilinx (simulated)";
/// Device name of every simulated card.
pub const SIM_DEVICE_NAME: &str = "simulated accelerator card";
/// Kernel exported by the image of [`SimRuntime::card`].
pub const SIM_KERNEL_NAME: &str = "sum";

/// Device class, mirroring `CL_DEVICE_TYPE_*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Accelerator,
    Gpu,
    Cpu,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimDevice {
    pub name: String,
    pub class: DeviceClass,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimPlatform {
    pub name: String,
    pub devices: Vec<SimDevice>,
}

impl SimPlatform {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), devices: Vec::new() }
    }

    pub fn with_device(mut self, name: impl Into<String>, class: DeviceClass) -> Self {
        self.devices.push(SimDevice { name: name.into(), class });
        self
    }
}

/// Failure injected into a simulated session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    Allocation,
    Transfer,
    Launch,
    Finish,
}

/// A simulated set of platforms and the kernels their devices can run.
#[derive(Debug, Clone, Default)]
pub struct SimRuntime {
    platforms: Vec<SimPlatform>,
    kernels: HashMap<String, SimKernel>,
    fault: Option<SimFault>,
}

impl SimRuntime {
    /// A runtime with no platforms and no kernels.
    pub fn new() -> Self {
        Self::default()
    }

    /// The stock simulated card: platform [`SIM_PLATFORM_NAME`] with one
    /// accelerator whose image exports only [`SIM_KERNEL_NAME`].
    pub fn card(kernel: SimKernel) -> Self {
        Self::new()
            .with_platform(
                SimPlatform::new(SIM_PLATFORM_NAME)
                    .with_device(SIM_DEVICE_NAME, DeviceClass::Accelerator),
            )
            .with_kernel(SIM_KERNEL_NAME, kernel)
    }

    /// One platform named `vendor` carrying a single accelerator card
    /// whose image provides `kernel_name` implemented by `kernel`.
    pub fn single_card(vendor: &str, kernel_name: &str, kernel: SimKernel) -> Self {
        Self::new()
            .with_platform(
                SimPlatform::new(format!("{vendor} (simulated)"))
                    .with_device(SIM_DEVICE_NAME, DeviceClass::Accelerator),
            )
            .with_kernel(kernel_name, kernel)
    }

    pub fn with_platform(mut self, platform: SimPlatform) -> Self {
        self.platforms.push(platform);
        self
    }

    pub fn with_kernel(mut self, name: impl Into<String>, kernel: SimKernel) -> Self {
        self.kernels.insert(name.into(), kernel);
        self
    }

    /// Make every session opened from this runtime fail at `fault`.
    pub fn with_fault(mut self, fault: SimFault) -> Self {
        self.fault = Some(fault);
        self
    }
}

impl AcceleratorRuntime for SimRuntime {
    type Platform = SimPlatform;
    type Device = SimDevice;
    type Session = SimSession;

    fn platforms(&self) -> Result<Vec<SimPlatform>> {
        Ok(self.platforms.clone())
    }

    fn platform_name(&self, platform: &SimPlatform) -> Result<String> {
        Ok(platform.name.clone())
    }

    fn accelerator_devices(&self, platform: &SimPlatform) -> Result<Vec<SimDevice>> {
        Ok(platform
            .devices
            .iter()
            .filter(|d| d.class == DeviceClass::Accelerator)
            .cloned()
            .collect())
    }

    fn device_name(&self, device: &SimDevice) -> Result<String> {
        Ok(device.name.clone())
    }

    fn open_session(
        &self,
        device: &SimDevice,
        image: BinaryImage,
        kernel_name: &str,
    ) -> Result<SimSession> {
        if device.class != DeviceClass::Accelerator {
            return Err(DeviceError::ContextCreation {
                reason: format!("'{}' is not an accelerator device", device.name),
            }
            .into());
        }
        if image.is_empty() {
            return Err(DeviceError::Programming { reason: "empty program binary".into() }.into());
        }
        let kernel =
            *self.kernels.get(kernel_name).ok_or_else(|| DeviceError::KernelNotFound {
                name: kernel_name.to_string(),
                reason: format!("image {} does not export it", image.source().display()),
            })?;

        debug!(device = %device.name, kernel = kernel_name, "simulated device programmed");
        Ok(SimSession {
            kernel,
            fault: self.fault,
            memory: Vec::new(),
            args: [None; SIM_KERNEL_ARITY],
            commands: Vec::new(),
            pending_kernel_time: None,
            kernel_time: None,
        })
    }
}

/// Handle to simulated device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimBuffer {
    id: usize,
    bytes: usize,
}

impl SimBuffer {
    pub fn id(&self) -> usize {
        self.id
    }
}

/// A command as the simulated queue received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimCommand {
    Allocate { buffer: usize, bytes: usize, mode: AccessMode },
    Write { buffer: usize, bytes: usize },
    SetArg { index: u32, buffer: usize },
    Launch { global_size: usize },
    Read { buffer: usize, bytes: usize },
    Finish,
}

/// In-order simulated queue. Commands execute at submission.
#[derive(Debug)]
pub struct SimSession {
    kernel: SimKernel,
    fault: Option<SimFault>,
    memory: Vec<Vec<u8>>,
    args: [Option<usize>; SIM_KERNEL_ARITY],
    commands: Vec<SimCommand>,
    pending_kernel_time: Option<Duration>,
    kernel_time: Option<Duration>,
}

impl SimSession {
    /// Every command received so far, in submission order.
    pub fn commands(&self) -> &[SimCommand] {
        &self.commands
    }

    /// `(bytes, mode)` of every allocation request, in order.
    pub fn allocations(&self) -> Vec<(usize, AccessMode)> {
        self.commands
            .iter()
            .filter_map(|c| match *c {
                SimCommand::Allocate { bytes, mode, .. } => Some((bytes, mode)),
                _ => None,
            })
            .collect()
    }

    fn check_fault(&self, at: SimFault) -> std::result::Result<(), String> {
        if self.fault == Some(at) {
            Err(format!("injected {at:?} fault"))
        } else {
            Ok(())
        }
    }

    fn load(&self, buffer: usize, len: usize) -> Vec<i32> {
        self.memory[buffer][..len * 4]
            .chunks_exact(4)
            .map(|c| i32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }

    fn store(&mut self, buffer: usize, values: &[i32]) {
        for (dst, v) in self.memory[buffer].chunks_exact_mut(4).zip(values) {
            dst.copy_from_slice(&v.to_ne_bytes());
        }
    }
}

impl DeviceSession for SimSession {
    type Buffer = SimBuffer;

    fn allocate(&mut self, bytes: usize, mode: AccessMode) -> Result<SimBuffer> {
        self.check_fault(SimFault::Allocation)
            .map_err(|reason| DeviceError::BufferAllocation { size: bytes, reason })?;
        let id = self.memory.len();
        self.memory.push(vec![0; bytes]);
        self.commands.push(SimCommand::Allocate { buffer: id, bytes, mode });
        Ok(SimBuffer { id, bytes })
    }

    fn write(&mut self, buffer: &mut SimBuffer, src: &[i32]) -> Result<()> {
        self.check_fault(SimFault::Transfer)
            .map_err(|reason| DeviceError::DataTransfer { reason })?;
        let bytes = std::mem::size_of_val(src);
        if bytes > buffer.bytes {
            return Err(DeviceError::DataTransfer {
                reason: format!("write of {bytes} bytes exceeds buffer of {}", buffer.bytes),
            }
            .into());
        }
        self.store(buffer.id, src);
        self.commands.push(SimCommand::Write { buffer: buffer.id, bytes });
        Ok(())
    }

    fn set_arg(&mut self, index: u32, buffer: &SimBuffer) -> Result<()> {
        let slot = self.args.get_mut(index as usize).ok_or_else(|| DeviceError::KernelLaunch {
            reason: format!("argument index {index} out of range"),
        })?;
        *slot = Some(buffer.id);
        self.commands.push(SimCommand::SetArg { index, buffer: buffer.id });
        Ok(())
    }

    fn enqueue_kernel(&mut self, global_size: usize) -> Result<()> {
        self.check_fault(SimFault::Launch).map_err(|reason| DeviceError::KernelLaunch { reason })?;
        let [Some(a), Some(b), Some(c)] = self.args else {
            return Err(DeviceError::KernelLaunch { reason: "unbound kernel argument".into() }.into());
        };
        let needed = global_size * 4;
        if let Some(short) = [a, b, c].into_iter().find(|&id| self.memory[id].len() < needed) {
            return Err(DeviceError::KernelLaunch {
                reason: format!("buffer {short} is smaller than the {needed}-byte range"),
            }
            .into());
        }

        let started = Instant::now();
        let (lhs, rhs) = (self.load(a, global_size), self.load(b, global_size));
        let mut out = vec![0; global_size];
        self.kernel.execute(&lhs, &rhs, &mut out);
        self.store(c, &out);

        self.pending_kernel_time = Some(started.elapsed());
        self.commands.push(SimCommand::Launch { global_size });
        Ok(())
    }

    fn read(&mut self, buffer: &SimBuffer, dst: &mut [i32]) -> Result<()> {
        self.check_fault(SimFault::Transfer)
            .map_err(|reason| DeviceError::DataTransfer { reason })?;
        let bytes = std::mem::size_of_val(dst);
        if bytes > buffer.bytes {
            return Err(DeviceError::DataTransfer {
                reason: format!("read of {bytes} bytes exceeds buffer of {}", buffer.bytes),
            }
            .into());
        }
        dst.copy_from_slice(&self.load(buffer.id, dst.len()));
        self.commands.push(SimCommand::Read { buffer: buffer.id, bytes });
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.check_fault(SimFault::Finish)
            .map_err(|reason| DeviceError::Synchronization { reason })?;
        self.kernel_time = self.pending_kernel_time.take().or(self.kernel_time);
        self.commands.push(SimCommand::Finish);
        Ok(())
    }

    fn kernel_time(&self) -> Option<Duration> {
        self.kernel_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> BinaryImage {
        BinaryImage::from_bytes(vec![1, 2, 3], "sum.xclbin")
    }

    fn session(kernel: SimKernel) -> SimSession {
        let rt = SimRuntime::single_card("Xilinx", "sum", kernel);
        let platform = &rt.platforms().unwrap()[0];
        let device = &rt.accelerator_devices(platform).unwrap()[0];
        rt.open_session(device, image(), "sum").unwrap()
    }

    #[test]
    fn stock_card_identity_is_fixed() {
        let rt = SimRuntime::card(SimKernel::Sum);
        let platform = &rt.platforms().unwrap()[0];
        assert_eq!(platform.name, SIM_PLATFORM_NAME);
        let device = &rt.accelerator_devices(platform).unwrap()[0];
        assert!(rt.open_session(device, image(), SIM_KERNEL_NAME).is_ok());
        assert!(rt.open_session(device, image(), "vadd").is_err());
    }

    #[test]
    fn gpu_devices_are_filtered_out() {
        let rt = SimRuntime::new().with_platform(
            SimPlatform::new("Mixed")
                .with_device("gpu0", DeviceClass::Gpu)
                .with_device("fpga0", DeviceClass::Accelerator)
                .with_device("cpu0", DeviceClass::Cpu),
        );
        let platform = &rt.platforms().unwrap()[0];
        let names: Vec<_> = rt
            .accelerator_devices(platform)
            .unwrap()
            .iter()
            .map(|d| d.name.clone())
            .collect();
        assert_eq!(names, ["fpga0"]);
    }

    #[test]
    fn unknown_kernel_fails_programming() {
        let rt = SimRuntime::single_card("Xilinx", "sum", SimKernel::Sum);
        let platform = &rt.platforms().unwrap()[0];
        let device = &rt.accelerator_devices(platform).unwrap()[0];
        let err = rt.open_session(device, image(), "vadd").unwrap_err();
        assert!(err.to_string().contains("'vadd' not found"), "{err}");
    }

    #[test]
    fn empty_image_fails_programming() {
        let rt = SimRuntime::single_card("Xilinx", "sum", SimKernel::Sum);
        let platform = &rt.platforms().unwrap()[0];
        let device = &rt.accelerator_devices(platform).unwrap()[0];
        let err = rt
            .open_session(device, BinaryImage::from_bytes(Vec::new(), "x"), "sum")
            .unwrap_err();
        assert!(matches!(err, crate::OffloadError::Device(DeviceError::Programming { .. })));
    }

    #[test]
    fn sum_kernel_adds_bound_buffers() {
        let mut s = session(SimKernel::Sum);
        let mut a = s.allocate(16, AccessMode::ReadOnly).unwrap();
        let mut b = s.allocate(16, AccessMode::ReadOnly).unwrap();
        let c = s.allocate(16, AccessMode::WriteOnly).unwrap();
        s.write(&mut a, &[1, 2, 3, 4]).unwrap();
        s.write(&mut b, &[10, 20, 30, 40]).unwrap();
        s.set_arg(0, &a).unwrap();
        s.set_arg(1, &b).unwrap();
        s.set_arg(2, &c).unwrap();
        s.enqueue_kernel(4).unwrap();
        let mut out = [0; 4];
        s.read(&c, &mut out).unwrap();
        assert!(s.kernel_time().is_none());
        s.finish().unwrap();
        assert_eq!(out, [11, 22, 33, 44]);
        assert!(s.kernel_time().is_some());
    }

    #[test]
    fn launch_without_all_arguments_fails() {
        let mut s = session(SimKernel::Sum);
        let a = s.allocate(16, AccessMode::ReadOnly).unwrap();
        s.set_arg(0, &a).unwrap();
        assert!(s.enqueue_kernel(4).is_err());
    }

    #[test]
    fn argument_index_beyond_arity_fails() {
        let mut s = session(SimKernel::Sum);
        let a = s.allocate(16, AccessMode::ReadOnly).unwrap();
        assert!(s.set_arg(3, &a).is_err());
    }

    #[test]
    fn oversized_write_is_rejected() {
        let mut s = session(SimKernel::Sum);
        let mut a = s.allocate(8, AccessMode::ReadOnly).unwrap();
        assert!(s.write(&mut a, &[1, 2, 3]).is_err());
    }

    #[test]
    fn sim_kernel_parses_and_displays() {
        for k in [SimKernel::Sum, SimKernel::FirstOperand] {
            assert_eq!(k.to_string().parse::<SimKernel>().unwrap(), k);
        }
        assert!("product".parse::<SimKernel>().is_err());
    }
}
