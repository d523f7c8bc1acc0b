//! Platform lookup by vendor and accelerator device selection.

use crate::error::{OffloadError, Result};
use crate::runtime::AcceleratorRuntime;
use tracing::{debug, info};

/// The platform matched by [`locate`] and its accelerator devices.
#[derive(Debug, Clone)]
pub struct LocatedPlatform<D> {
    /// Full platform name as reported by the runtime.
    pub name: String,
    /// Accelerator-class devices, in runtime order. May be empty.
    pub devices: Vec<D>,
}

impl<D> LocatedPlatform<D> {
    /// Take the first accelerator device.
    ///
    /// # Errors
    ///
    /// [`OffloadError::NoAcceleratorDevice`] if the platform has none.
    pub fn into_first_device(self) -> Result<D> {
        self.devices
            .into_iter()
            .next()
            .ok_or(OffloadError::NoAcceleratorDevice { platform: self.name })
    }
}

/// Find the first platform whose name starts with `vendor` and list its
/// accelerator devices.
///
/// There is no fallback: if no platform name has `vendor` as a prefix the
/// call fails with [`OffloadError::PlatformNotFound`].
pub fn locate<R: AcceleratorRuntime>(
    runtime: &R,
    vendor: &str,
) -> Result<LocatedPlatform<R::Device>> {
    let mut examined = Vec::new();

    for platform in runtime.platforms()? {
        let name = runtime.platform_name(&platform)?;
        debug!(platform = %name, vendor, "examining platform");

        if name.starts_with(vendor) {
            let devices = runtime.accelerator_devices(&platform)?;
            info!(platform = %name, devices = devices.len(), "found platform");
            return Ok(LocatedPlatform { name, devices });
        }
        examined.push(name);
    }

    Err(OffloadError::PlatformNotFound { vendor: vendor.to_string(), examined })
}

/// One platform and the names of its accelerator devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformListing {
    pub name: String,
    pub accelerators: Vec<String>,
}

/// Every platform the runtime exposes with its accelerator device names.
pub fn list<R: AcceleratorRuntime>(runtime: &R) -> Result<Vec<PlatformListing>> {
    let mut listings = Vec::new();
    for platform in runtime.platforms()? {
        let name = runtime.platform_name(&platform)?;
        let accelerators = runtime
            .accelerator_devices(&platform)?
            .iter()
            .map(|d| runtime.device_name(d))
            .collect::<Result<Vec<_>>>()?;
        listings.push(PlatformListing { name, accelerators });
    }
    Ok(listings)
}
