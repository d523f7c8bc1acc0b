//! Error types for accelerator discovery, programming and offload.

use std::path::PathBuf;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OffloadError>;

/// Coarse classification of an [`OffloadError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Setup problems: wrong vendor, missing image, mismatched sizes.
    Configuration,
    /// Failures reported by the accelerator runtime itself.
    Device,
}

/// Failures reported by the accelerator runtime.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("platform enumeration failed: {reason}")]
    Enumeration { reason: String },

    #[error("context creation failed: {reason}")]
    ContextCreation { reason: String },

    #[error("command queue creation failed: {reason}")]
    QueueCreation { reason: String },

    #[error("device programming failed: {reason}")]
    Programming { reason: String },

    #[error("kernel '{name}' not found in programmed image: {reason}")]
    KernelNotFound { name: String, reason: String },

    #[error("buffer allocation of {size} bytes failed: {reason}")]
    BufferAllocation { size: usize, reason: String },

    #[error("data transfer failed: {reason}")]
    DataTransfer { reason: String },

    #[error("kernel launch failed: {reason}")]
    KernelLaunch { reason: String },

    #[error("queue synchronization failed: {reason}")]
    Synchronization { reason: String },
}

/// Every way a single offload attempt can fail.
#[derive(Debug, thiserror::Error)]
pub enum OffloadError {
    #[error("no platform name starts with '{vendor}' (examined: {examined:?})")]
    PlatformNotFound { vendor: String, examined: Vec<String> },

    #[error("platform '{platform}' exposes no accelerator devices")]
    NoAcceleratorDevice { platform: String },

    #[error("accelerator binary '{}' is not readable: {source}", path.display())]
    BinaryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("accelerator binary '{}' is empty", path.display())]
    EmptyBinary { path: PathBuf },

    #[error("host data of {host_bytes} bytes does not match device buffer of {device_bytes} bytes")]
    SizeMismatch { host_bytes: usize, device_bytes: usize },

    #[error("invalid workload: {reason}")]
    InvalidWorkload { reason: String },

    #[error("kernel argument {index}: {reason}")]
    ArgumentBinding { index: u32, reason: String },

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl OffloadError {
    /// Classify the error as a configuration or device failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Device(_) => ErrorKind::Device,
            _ => ErrorKind::Configuration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_errors_classify_as_device() {
        let err: OffloadError =
            DeviceError::Programming { reason: "bad xclbin".into() }.into();
        assert_eq!(err.kind(), ErrorKind::Device);
        assert!(err.to_string().contains("bad xclbin"));
    }

    #[test]
    fn setup_errors_classify_as_configuration() {
        let err = OffloadError::PlatformNotFound {
            vendor: "Xilinx".into(),
            examined: vec!["Intel(R) OpenCL".into()],
        };
        assert_eq!(err.kind(), ErrorKind::Configuration);
        let msg = err.to_string();
        assert!(msg.contains("Xilinx"), "{msg}");
        assert!(msg.contains("Intel(R) OpenCL"), "{msg}");
    }

    #[test]
    fn empty_binary_message_names_path() {
        let err = OffloadError::EmptyBinary { path: PathBuf::from("sum.xclbin") };
        assert_eq!(err.to_string(), "accelerator binary 'sum.xclbin' is empty");
    }
}
