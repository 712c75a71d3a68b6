use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::DeployResult;

/// A compiled firmware image, base64-encoded for storage as a database string.
#[derive(Debug, Clone)]
pub struct FirmwareArtifact {
    pub path: PathBuf,
    pub size: usize,
    encoded: String,
}

impl FirmwareArtifact {
    pub fn load(path: &Path) -> DeployResult<Self> {
        let bytes = std::fs::read(path)?;
        let artifact = Self::from_bytes(path, &bytes);
        info!("Firmware size: {} bytes", artifact.encoded.len());
        Ok(artifact)
    }

    pub fn from_bytes(path: impl Into<PathBuf>, bytes: &[u8]) -> Self {
        Self {
            path: path.into(),
            size: bytes.len(),
            encoded: base64::encode(bytes),
        }
    }

    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodes_whole_image() {
        let artifact = FirmwareArtifact::from_bytes("firmware.bin", &[0xE9, 0x03, 0x02, 0x20, 0x00]);
        assert_eq!(artifact.size, 5);
        assert_eq!(artifact.encoded(), "6QMCIAA=");
    }

    #[test]
    fn test_missing_image() {
        let result = FirmwareArtifact::load(Path::new("/nonexistent/firmware.bin"));
        assert!(matches!(result, Err(crate::error::DeployError::Io(_))));
    }
}
