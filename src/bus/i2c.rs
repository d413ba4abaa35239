use super::eeprom::parse_identity;
use crate::errors::{I2cError, I2cResult};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default mount point of sysfs
pub const SYSFS_ROOT: &str = "/sys";

const I2C_DEVICES_DIR: &str = "bus/i2c/devices";
const BUS_PREFIX: &str = "i2c-";
const CHANNEL_PREFIX: &str = "channel-";

/// Kernel-facing I2C primitives the explorer drives.
///
/// Creation calls are idempotent: a node that already exists with the same
/// driver counts as success, so a pass can re-run over hardware a previous
/// pass already set up. They return whether a new node was created.
pub trait I2cExplorer: Send {
    /// Maps each main board bus adapter name to its kernel bus name
    fn buses_from_bsp(&self, bus_names: &[String]) -> I2cResult<BTreeMap<String, String>>;

    /// FRU type name stored in the EEPROM of the device at `eeprom_path`
    fn fru_type_name(&self, eeprom_path: &Path) -> I2cResult<String>;

    fn create_i2c_device(&self, driver: &str, bus: &str, addr: u8) -> I2cResult<bool>;

    fn create_i2c_mux(&self, driver: &str, bus: &str, addr: u8, num_channels: u8) -> I2cResult<bool>;

    /// Kernel buses behind the mux at `bus`@`addr`, in ascending channel order.
    /// Fails with `MuxNotCreated` if called before `create_i2c_mux`.
    fn mux_channel_buses(&self, bus: &str, addr: u8) -> I2cResult<Vec<String>>;

    /// Path of the device at `addr` on `bus`
    fn i2c_path(&self, bus: &str, addr: u8) -> I2cResult<PathBuf>;
}

/// `I2cExplorer` backed by the kernel's sysfs i2c interface
#[derive(Debug, Clone)]
pub struct SysfsI2cExplorer {
    devices_dir: PathBuf,
}

impl SysfsI2cExplorer {
    /// `sysfs_root` is normally `/sys`
    pub fn new(sysfs_root: impl AsRef<Path>) -> Self {
        Self {
            devices_dir: sysfs_root.as_ref().join(I2C_DEVICES_DIR),
        }
    }

    fn bound_driver(&self, device_path: &Path) -> I2cResult<String> {
        let name_path = device_path.join("name");
        read_trimmed(&name_path)
    }

    fn create_node(&self, driver: &str, bus: &str, addr: u8) -> I2cResult<bool> {
        let device_path = self.i2c_path(bus, addr)?;
        if device_path.exists() {
            let existing = self.bound_driver(&device_path)?;
            if existing != driver {
                return Err(I2cError::DeviceConflict {
                    bus: bus.to_string(),
                    addr,
                    existing,
                    expected: driver.to_string(),
                });
            }
            debug!("[i2c] {} already present at {}@{:#04x}", driver, bus, addr);
            return Ok(false);
        }

        let new_device = self.devices_dir.join(bus).join("new_device");
        fs::write(&new_device, format!("{} {:#04x}", driver, addr)).map_err(|e| I2cError::Io {
            path: new_device.clone(),
            source: e,
        })?;
        if !device_path.exists() {
            return Err(I2cError::DeviceNotCreated {
                driver: driver.to_string(),
                bus: bus.to_string(),
                addr,
            });
        }
        info!("[i2c] created {} at {}@{:#04x}", driver, bus, addr);
        Ok(true)
    }
}

impl Default for SysfsI2cExplorer {
    fn default() -> Self {
        Self::new(SYSFS_ROOT)
    }
}

impl I2cExplorer for SysfsI2cExplorer {
    fn buses_from_bsp(&self, bus_names: &[String]) -> I2cResult<BTreeMap<String, String>> {
        let entries = fs::read_dir(&self.devices_dir).map_err(|e| I2cError::Io {
            path: self.devices_dir.clone(),
            source: e,
        })?;

        // adapter name -> kernel bus name; sorted so duplicates resolve to the lowest bus
        let mut adapters: Vec<(u32, String, String)> = Vec::new();
        for entry in entries.flatten() {
            let kernel_bus = entry.file_name().to_string_lossy().into_owned();
            let Ok(number) = bus_number(&kernel_bus) else {
                continue;
            };
            match read_trimmed(&entry.path().join("name")) {
                Ok(adapter) => adapters.push((number, adapter, kernel_bus)),
                Err(e) => debug!("[i2c] skipping {}: {}", kernel_bus, e),
            }
        }
        adapters.sort();

        let mut resolved = BTreeMap::new();
        for name in bus_names {
            let kernel_bus = adapters
                .iter()
                .find(|(_, adapter, _)| adapter == name)
                .map(|(_, _, kernel_bus)| kernel_bus.clone())
                .ok_or_else(|| I2cError::BusNotFound {
                    bus: name.clone(),
                    root: self.devices_dir.clone(),
                })?;
            debug!("[i2c] main board bus {} is {}", name, kernel_bus);
            resolved.insert(name.clone(), kernel_bus);
        }
        Ok(resolved)
    }

    fn fru_type_name(&self, eeprom_path: &Path) -> I2cResult<String> {
        let eeprom_file = eeprom_path.join("eeprom");
        let contents = fs::read(&eeprom_file).map_err(|e| I2cError::Io {
            path: eeprom_file.clone(),
            source: e,
        })?;
        let identity = parse_identity(&contents).map_err(|reason| I2cError::EepromUnrecognized {
            path: eeprom_file.clone(),
            reason,
        })?;
        info!(
            "[i2c] EEPROM {} identifies {} (serial {})",
            eeprom_file.display(),
            identity.product_name,
            identity.serial_number.as_deref().unwrap_or("unknown")
        );
        Ok(identity.product_name)
    }

    fn create_i2c_device(&self, driver: &str, bus: &str, addr: u8) -> I2cResult<bool> {
        self.create_node(driver, bus, addr)
    }

    fn create_i2c_mux(&self, driver: &str, bus: &str, addr: u8, num_channels: u8) -> I2cResult<bool> {
        debug!(
            "[i2c] mux {} at {}@{:#04x} expects {} channel(s)",
            driver, bus, addr, num_channels
        );
        self.create_node(driver, bus, addr)
    }

    fn mux_channel_buses(&self, bus: &str, addr: u8) -> I2cResult<Vec<String>> {
        let mux_path = self.i2c_path(bus, addr)?;
        let entries = fs::read_dir(&mux_path).map_err(|_| I2cError::MuxNotCreated {
            bus: bus.to_string(),
            addr,
        })?;

        let mut channels: Vec<(u32, String)> = Vec::new();
        for entry in entries.flatten() {
            let file_name = entry.file_name().to_string_lossy().into_owned();
            let Some(channel) = file_name
                .strip_prefix(CHANNEL_PREFIX)
                .and_then(|n| n.parse::<u32>().ok())
            else {
                continue;
            };
            let invalid = || I2cError::InvalidChannel {
                bus: bus.to_string(),
                addr,
                channel,
            };
            let target = fs::read_link(entry.path()).map_err(|_| invalid())?;
            let kernel_bus = target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| bus_number(n).is_ok())
                .ok_or_else(invalid)?;
            channels.push((channel, kernel_bus));
        }
        channels.sort();
        // a gap would shift every later channel onto the wrong `<mux>@k` name
        for (position, (channel, _)) in (0u32..).zip(&channels) {
            if *channel != position {
                return Err(I2cError::InvalidChannel {
                    bus: bus.to_string(),
                    addr,
                    channel: position,
                });
            }
        }
        Ok(channels.into_iter().map(|(_, kernel_bus)| kernel_bus).collect())
    }

    fn i2c_path(&self, bus: &str, addr: u8) -> I2cResult<PathBuf> {
        let number = bus_number(bus)?;
        Ok(self.devices_dir.join(format!("{}-{:04x}", number, addr)))
    }
}

/// `"i2c-12"` -> 12
pub fn bus_number(bus: &str) -> I2cResult<u32> {
    bus.strip_prefix(BUS_PREFIX)
        .and_then(|n| n.parse().ok())
        .ok_or_else(|| I2cError::InvalidBusName {
            bus: bus.to_string(),
        })
}

fn read_trimmed(path: &Path) -> I2cResult<String> {
    fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| I2cError::Io {
            path: path.to_path_buf(),
            source: e,
        })
}
