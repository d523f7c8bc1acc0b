//! Offload configuration file format.
//!
//! Loads [`OffloadConfig`] from a TOML file (`vsum.toml`) with environment
//! variable overrides via `VSUM_*` prefixed variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Largest element count: every index must be representable as an `i32`.
pub const MAX_LENGTH: usize = i32::MAX as usize;

/// Which accelerator runtime to bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeKind {
    /// The system OpenCL ICD loader (requires the `opencl` feature).
    OpenCl,
    /// The host-simulated accelerator.
    Sim,
}

impl std::fmt::Display for RuntimeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenCl => write!(f, "opencl"),
            Self::Sim => write!(f, "sim"),
        }
    }
}

impl std::str::FromStr for RuntimeKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opencl" => Ok(Self::OpenCl),
            "sim" => Ok(Self::Sim),
            other => Err(format!("unknown runtime: {other}")),
        }
    }
}

/// Offload configuration loaded from TOML with environment overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// Platform name prefix to select.
    /// Override: `VSUM_VENDOR`
    pub vendor: String,

    /// Compiled accelerator image. Which file targets hardware and which
    /// targets emulation is up to whoever builds the images.
    /// Override: `VSUM_BINARY`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary: Option<PathBuf>,

    /// Kernel entry point inside the image.
    /// Override: `VSUM_KERNEL`
    pub kernel: String,

    /// Number of `i32` elements per input vector.
    /// Override: `VSUM_LENGTH`
    pub length: usize,

    /// Accelerator runtime.
    /// Override: `VSUM_RUNTIME`
    pub runtime: RuntimeKind,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            vendor: "Xilinx".to_string(),
            binary: None,
            kernel: "sum".to_string(),
            length: 1024,
            runtime: RuntimeKind::OpenCl,
        }
    }
}

/// Errors that can occur when loading or validating an [`OffloadConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid environment override {key}={value}: {reason}")]
    EnvOverride { key: String, value: String, reason: String },
}

impl OffloadConfig {
    /// Render this configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Generate the default configuration as a TOML string.
    pub fn default_toml() -> Result<String, ConfigError> {
        Self::default().to_toml()
    }

    /// Load configuration from a TOML file, falling back to defaults for
    /// missing fields, then apply environment variable overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Load from TOML string (useful for testing).
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut cfg: OffloadConfig = toml::from_str(toml_str)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load only from environment variables, starting from defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.vendor.is_empty() {
            return Err(ConfigError::Validation("vendor must not be empty".into()));
        }
        if self.kernel.is_empty() {
            return Err(ConfigError::Validation("kernel must not be empty".into()));
        }
        if self.length == 0 {
            return Err(ConfigError::Validation("length must be > 0".into()));
        }
        if self.length > MAX_LENGTH {
            return Err(ConfigError::Validation(format!(
                "length {} overflows the 32-bit element values (max {MAX_LENGTH})",
                self.length
            )));
        }
        if self.length.checked_mul(std::mem::size_of::<i32>()).is_none() {
            return Err(ConfigError::Validation(format!(
                "length {} overflows the buffer size",
                self.length
            )));
        }
        if self.binary.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
            return Err(ConfigError::Validation("binary path must not be empty".into()));
        }
        Ok(())
    }

    /// The configured image path.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Validation`] if no binary was configured.
    pub fn binary_path(&self) -> Result<&Path, ConfigError> {
        self.binary.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "no accelerator binary configured (set `binary` or VSUM_BINARY)".into(),
            )
        })
    }

    /// Apply `VSUM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("VSUM_VENDOR") {
            self.vendor = val;
        }

        if let Ok(val) = std::env::var("VSUM_BINARY") {
            self.binary = Some(PathBuf::from(val));
        }

        if let Ok(val) = std::env::var("VSUM_KERNEL") {
            self.kernel = val;
        }

        if let Ok(val) = std::env::var("VSUM_LENGTH") {
            self.length = val.parse::<usize>().map_err(|e| ConfigError::EnvOverride {
                key: "VSUM_LENGTH".into(),
                value: val.clone(),
                reason: e.to_string(),
            })?;
        }

        if let Ok(val) = std::env::var("VSUM_RUNTIME") {
            self.runtime = val.parse::<RuntimeKind>().map_err(|reason| ConfigError::EnvOverride {
                key: "VSUM_RUNTIME".into(),
                value: val.clone(),
                reason,
            })?;
        }

        Ok(())
    }
}
