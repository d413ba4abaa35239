use crate::bus::i2c::SYSFS_ROOT;
use crate::config::PresenceDetection;
use crate::errors::{PresenceError, PresenceResult};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Tells whether hardware is inserted at a location
pub trait PresenceDetector: Send {
    fn is_present(&self, detection: &PresenceDetection) -> PresenceResult<bool>;
}

/// Reads presence from sysfs attributes and exported GPIO lines
#[derive(Debug, Clone)]
pub struct SysfsPresenceDetector {
    sysfs_root: PathBuf,
}

impl SysfsPresenceDetector {
    pub fn new(sysfs_root: impl AsRef<Path>) -> Self {
        Self {
            sysfs_root: sysfs_root.as_ref().to_path_buf(),
        }
    }

    /// `/sys/...` and relative paths are rebased onto the sysfs root. Other
    /// absolute paths are read as given.
    fn sysfs_file_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        match path.strip_prefix(SYSFS_ROOT) {
            Ok(relative) => self.sysfs_root.join(relative),
            Err(_) => self.sysfs_root.join(path),
        }
    }

    fn gpio_value_path(&self, line: u32) -> PathBuf {
        self.sysfs_root
            .join("class/gpio")
            .join(format!("gpio{}", line))
            .join("value")
    }
}

impl Default for SysfsPresenceDetector {
    fn default() -> Self {
        Self::new(SYSFS_ROOT)
    }
}

impl PresenceDetector for SysfsPresenceDetector {
    fn is_present(&self, detection: &PresenceDetection) -> PresenceResult<bool> {
        let (path, desired_value) = match detection {
            PresenceDetection::SysfsFile { path, desired_value } => {
                (self.sysfs_file_path(path), *desired_value)
            }
            PresenceDetection::GpioLine { line, desired_value } => (self.gpio_value_path(*line), *desired_value),
        };
        let value = read_value(&path)?;
        debug!(
            "[presence] {} reads {} (present when {})",
            path.display(),
            value,
            desired_value
        );
        Ok(value == desired_value)
    }
}

/// Presence files hold a decimal or `0x`-prefixed integer
fn read_value(path: &Path) -> PresenceResult<i64> {
    let raw = fs::read_to_string(path).map_err(|e| PresenceError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let text = raw.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    };
    parsed.ok_or_else(|| PresenceError::InvalidValue {
        path: path.to_path_buf(),
        value: text.to_string(),
    })
}
