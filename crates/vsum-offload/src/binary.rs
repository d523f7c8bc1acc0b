//! Loading compiled accelerator images (`.xclbin`, `.awsxclbin`, ...).

use crate::error::{OffloadError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Raw bytes of a compiled kernel program.
///
/// The contents are opaque to the host; only the device runtime
/// interprets them. Moved into the runtime when the device is programmed.
#[derive(Clone, PartialEq, Eq)]
pub struct BinaryImage {
    bytes: Vec<u8>,
    source: PathBuf,
}

impl BinaryImage {
    /// Wrap bytes already in memory. `source` is only used for messages.
    pub fn from_bytes(bytes: Vec<u8>, source: impl Into<PathBuf>) -> Self {
        Self { bytes, source: source.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Path the image was read from.
    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl fmt::Debug for BinaryImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BinaryImage")
            .field("source", &self.source)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Read the whole image at `path` into memory.
///
/// # Errors
///
/// [`OffloadError::BinaryUnreadable`] if the file cannot be opened or read,
/// [`OffloadError::EmptyBinary`] if it holds zero bytes.
pub fn load(path: &Path) -> Result<BinaryImage> {
    info!("Importing accelerator binary {}", path.display());

    let bytes = std::fs::read(path).map_err(|source| OffloadError::BinaryUnreadable {
        path: path.to_path_buf(),
        source,
    })?;

    if bytes.is_empty() {
        return Err(OffloadError::EmptyBinary { path: path.to_path_buf() });
    }

    debug!(bytes = bytes.len(), "binary image loaded");
    Ok(BinaryImage::from_bytes(bytes, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_reads_entire_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let payload: Vec<u8> = (0..=255u8).cycle().take(10_000).collect();
        file.write_all(&payload).unwrap();

        let image = load(file.path()).unwrap();
        assert_eq!(image.len(), payload.len());
        assert_eq!(image.as_bytes(), payload.as_slice());
        assert_eq!(image.source(), file.path());
    }

    #[test]
    fn missing_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.xclbin");
        let err = load(&path).unwrap_err();
        assert!(matches!(err, OffloadError::BinaryUnreadable { .. }), "{err:?}");
    }

    #[test]
    fn zero_length_file_is_rejected() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load(file.path()).unwrap_err();
        assert!(matches!(err, OffloadError::EmptyBinary { .. }), "{err:?}");
    }

    #[test]
    fn debug_omits_payload() {
        let image = BinaryImage::from_bytes(vec![0xAB; 4096], "k.xclbin");
        let desc = format!("{image:?}");
        assert!(desc.contains("len: 4096"));
        assert!(!desc.contains("171"));
    }
}
