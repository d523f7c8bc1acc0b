//! Execution context: one programmed device, its queue and its kernel.
//!
//! [`ExecutionContext`] owns the runtime session exclusively and enforces
//! the kernel's argument contract on top of it, so a buffer bound to the
//! wrong slot or a host slice of the wrong size is refused before anything
//! reaches the device.

use crate::binary::BinaryImage;
use crate::error::{OffloadError, Result};
use crate::runtime::{AcceleratorRuntime, AccessMode, DeviceSession};
use std::time::Duration;
use tracing::{debug, info};

/// Bytes per kernel element (`int` on the device).
pub const ELEMENT_BYTES: usize = std::mem::size_of::<i32>();

/// One positional kernel parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSlot {
    pub name: &'static str,
    pub mode: AccessMode,
}

/// Declared parameters of a kernel and the element range it runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSignature {
    name: String,
    slots: Vec<ArgSlot>,
    element_count: usize,
}

impl KernelSignature {
    /// `name(const int *a, const int *b, int *c)` over `element_count` items.
    pub fn vector_add(name: impl Into<String>, element_count: usize) -> Self {
        Self {
            name: name.into(),
            slots: vec![
                ArgSlot { name: "a", mode: AccessMode::ReadOnly },
                ArgSlot { name: "b", mode: AccessMode::ReadOnly },
                ArgSlot { name: "c", mode: AccessMode::WriteOnly },
            ],
            element_count,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn slots(&self) -> &[ArgSlot] {
        &self.slots
    }

    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Byte size every argument buffer must have.
    ///
    /// # Errors
    ///
    /// [`OffloadError::InvalidWorkload`] if the size overflows `usize`.
    pub fn buffer_bytes(&self) -> Result<usize> {
        self.element_count.checked_mul(ELEMENT_BYTES).ok_or_else(|| {
            OffloadError::InvalidWorkload {
                reason: format!("{} elements overflow the address space", self.element_count),
            }
        })
    }
}

/// Device memory of a fixed byte size and access mode.
#[derive(Debug)]
pub struct DeviceBuffer<B> {
    inner: B,
    bytes: usize,
    mode: AccessMode,
}

impl<B> DeviceBuffer<B> {
    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

/// Exclusive owner of a device session and its programmed kernel.
#[derive(Debug)]
pub struct ExecutionContext<S: DeviceSession> {
    session: S,
    signature: KernelSignature,
    device_name: String,
    bound: Vec<bool>,
}

impl<S: DeviceSession> ExecutionContext<S> {
    /// Program `device` with `image` and resolve the kernel named in
    /// `signature`. The image is consumed by programming.
    pub fn create<R>(
        runtime: &R,
        device: &R::Device,
        image: BinaryImage,
        signature: KernelSignature,
    ) -> Result<Self>
    where
        R: AcceleratorRuntime<Session = S>,
    {
        let device_name = runtime.device_name(device)?;
        info!(device = %device_name, kernel = signature.name(), "programming device");

        let session = runtime.open_session(device, image, signature.name())?;
        let bound = vec![false; signature.slots().len()];
        Ok(Self { session, signature, device_name, bound })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn signature(&self) -> &KernelSignature {
        &self.signature
    }

    /// The underlying runtime session.
    pub fn session(&self) -> &S {
        &self.session
    }

    /// Allocate exactly `bytes` of device memory; never rounded.
    pub fn allocate_buffer(&mut self, bytes: usize, mode: AccessMode) -> Result<DeviceBuffer<S::Buffer>> {
        let inner = self.session.allocate(bytes, mode)?;
        debug!(bytes, %mode, "allocated device buffer");
        Ok(DeviceBuffer { inner, bytes, mode })
    }

    /// Blocking copy of `src` into `buffer`. `src` must fill it exactly.
    pub fn write_buffer(&mut self, buffer: &mut DeviceBuffer<S::Buffer>, src: &[i32]) -> Result<()> {
        check_transfer_size(std::mem::size_of_val(src), buffer.bytes)?;
        self.session.write(&mut buffer.inner, src)
    }

    /// Blocking copy of `buffer` into `dst`. `dst` must match it exactly.
    pub fn read_buffer(&mut self, buffer: &DeviceBuffer<S::Buffer>, dst: &mut [i32]) -> Result<()> {
        check_transfer_size(std::mem::size_of_val(dst), buffer.bytes)?;
        self.session.read(&buffer.inner, dst)
    }

    /// Bind `buffer` to positional argument `index` of the kernel.
    ///
    /// # Errors
    ///
    /// [`OffloadError::ArgumentBinding`] if `index` is past the last
    /// parameter, or the buffer's mode or size differs from what that
    /// parameter declares.
    pub fn bind_argument(&mut self, index: u32, buffer: &DeviceBuffer<S::Buffer>) -> Result<()> {
        let slot = *self.signature.slots().get(index as usize).ok_or_else(|| {
            OffloadError::ArgumentBinding {
                index,
                reason: format!(
                    "kernel '{}' takes {} arguments",
                    self.signature.name(),
                    self.signature.slots().len()
                ),
            }
        })?;

        if buffer.mode != slot.mode {
            return Err(OffloadError::ArgumentBinding {
                index,
                reason: format!(
                    "parameter '{}' expects a {} buffer, got {}",
                    slot.name, slot.mode, buffer.mode
                ),
            });
        }

        let expected = self.signature.buffer_bytes()?;
        if buffer.bytes != expected {
            return Err(OffloadError::ArgumentBinding {
                index,
                reason: format!(
                    "parameter '{}' expects {expected} bytes, buffer holds {}",
                    slot.name, buffer.bytes
                ),
            });
        }

        self.session.set_arg(index, &buffer.inner)?;
        self.bound[index as usize] = true;
        debug!(index, param = slot.name, "kernel argument bound");
        Ok(())
    }

    /// Enqueue one execution over the whole element range.
    pub fn launch(&mut self) -> Result<()> {
        if let Some(index) = self.bound.iter().position(|b| !b) {
            return Err(OffloadError::ArgumentBinding {
                index: index as u32,
                reason: format!("parameter '{}' is unbound", self.signature.slots()[index].name),
            });
        }
        self.session.enqueue_kernel(self.signature.element_count())
    }

    /// Block until every queued command has retired.
    pub fn finish(&mut self) -> Result<()> {
        self.session.finish()
    }

    pub fn kernel_time(&self) -> Option<Duration> {
        self.session.kernel_time()
    }
}

fn check_transfer_size(host_bytes: usize, device_bytes: usize) -> Result<()> {
    if host_bytes != device_bytes {
        return Err(OffloadError::SizeMismatch { host_bytes, device_bytes });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::sim::{SimKernel, SimRuntime, SimSession};

    fn context(len: usize) -> ExecutionContext<SimSession> {
        let rt = SimRuntime::single_card("Xilinx", "sum", SimKernel::Sum);
        let platform = crate::device::locate(&rt, "Xilinx").unwrap();
        let device = platform.into_first_device().unwrap();
        let image = BinaryImage::from_bytes(vec![0x7f; 32], "sum.xclbin");
        ExecutionContext::create(&rt, &device, image, KernelSignature::vector_add("sum", len)).unwrap()
    }

    #[test]
    fn vector_add_signature_is_a_b_c() {
        let sig = KernelSignature::vector_add("sum", 1024);
        let names: Vec<_> = sig.slots().iter().map(|s| s.name).collect();
        assert_eq!(names, ["a", "b", "c"]);
        assert_eq!(sig.slots()[2].mode, AccessMode::WriteOnly);
        assert_eq!(sig.buffer_bytes().unwrap(), 4096);
    }

    #[test]
    fn overflowing_signature_is_rejected() {
        let sig = KernelSignature::vector_add("sum", usize::MAX);
        assert!(matches!(sig.buffer_bytes(), Err(OffloadError::InvalidWorkload { .. })));
    }

    #[test]
    fn allocation_size_is_exact() {
        let mut ctx = context(8);
        let buf = ctx.allocate_buffer(33, AccessMode::ReadOnly).unwrap();
        assert_eq!(buf.bytes(), 33);
        assert_eq!(ctx.session().allocations(), [(33, AccessMode::ReadOnly)]);
    }

    #[test]
    fn output_buffer_in_first_slot_is_rejected() {
        let mut ctx = context(8);
        let c = ctx.allocate_buffer(32, AccessMode::WriteOnly).unwrap();
        let err = ctx.bind_argument(0, &c).unwrap_err();
        assert!(matches!(err, OffloadError::ArgumentBinding { index: 0, .. }), "{err:?}");
        assert!(err.to_string().contains("'a' expects a read-only buffer"), "{err}");
    }

    #[test]
    fn input_buffer_in_output_slot_is_rejected() {
        let mut ctx = context(8);
        let a = ctx.allocate_buffer(32, AccessMode::ReadOnly).unwrap();
        assert!(ctx.bind_argument(2, &a).is_err());
    }

    #[test]
    fn index_past_arity_is_rejected() {
        let mut ctx = context(8);
        let a = ctx.allocate_buffer(32, AccessMode::ReadOnly).unwrap();
        let err = ctx.bind_argument(3, &a).unwrap_err();
        assert!(err.to_string().contains("takes 3 arguments"), "{err}");
    }

    #[test]
    fn wrong_sized_buffer_is_rejected() {
        let mut ctx = context(8);
        let a = ctx.allocate_buffer(28, AccessMode::ReadOnly).unwrap();
        let err = ctx.bind_argument(0, &a).unwrap_err();
        assert!(err.to_string().contains("expects 32 bytes"), "{err}");
    }

    #[test]
    fn launch_requires_every_argument() {
        let mut ctx = context(8);
        let a = ctx.allocate_buffer(32, AccessMode::ReadOnly).unwrap();
        let b = ctx.allocate_buffer(32, AccessMode::ReadOnly).unwrap();
        ctx.bind_argument(0, &a).unwrap();
        ctx.bind_argument(1, &b).unwrap();
        let err = ctx.launch().unwrap_err();
        assert!(err.to_string().contains("'c' is unbound"), "{err}");
    }

    #[test]
    fn short_host_slice_is_a_size_mismatch() {
        let mut ctx = context(8);
        let mut a = ctx.allocate_buffer(32, AccessMode::ReadOnly).unwrap();
        let err = ctx.write_buffer(&mut a, &[1, 2, 3]).unwrap_err();
        assert!(matches!(err, OffloadError::SizeMismatch { host_bytes: 12, device_bytes: 32 }));
        assert!(ctx.session().commands().iter().all(|c| !matches!(c, crate::runtime::sim::SimCommand::Write { .. })));
    }

    #[test]
    fn programming_failure_surfaces_as_device_error() {
        let rt = SimRuntime::single_card("Xilinx", "vadd", SimKernel::Sum);
        let device = crate::device::locate(&rt, "Xilinx").unwrap().into_first_device().unwrap();
        let image = BinaryImage::from_bytes(vec![1], "sum.xclbin");
        let err = ExecutionContext::create(&rt, &device, image, KernelSignature::vector_add("sum", 4))
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Device);
    }
}
