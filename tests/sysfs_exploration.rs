use platform_manager::bus::SysfsI2cExplorer;
use platform_manager::config::{parse_platform_config, PlatformValidator};
use platform_manager::errors::{ExplorationError, I2cError};
use platform_manager::presence::SysfsPresenceDetector;
use platform_manager::PlatformExplorer;
use std::fs;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const CHASSIS: &str = "::Chassis_Slot@0/CHASSIS";
const PIM: &str = "::Chassis_Slot@0/CHASSIS::PIM_SLOT@0/PIM16Q";

/// A sysfs tree as the kernel leaves it after a previous pass bound everything
struct BoundChassis {
    root: TempDir,
}

impl BoundChassis {
    fn new() -> Self {
        let root = TempDir::new().unwrap();
        let chassis = Self { root };
        chassis.add_bus(0, "SMB_I2C_0");
        let mux = chassis.add_device(0, 0x70, "pca9548");
        for channel in 0..4 {
            let bus = channel + 4;
            chassis.add_bus(bus, &format!("i2c-0-mux (chan_id {})", channel));
            symlink(
                chassis.devices().join(format!("i2c-{}", bus)),
                mux.join(format!("channel-{}", channel)),
            )
            .unwrap();
        }
        let eeprom = chassis.add_device(4, 0x50, "24c64");
        fs::write(eeprom.join("eeprom"), identity_eeprom("PIM16Q")).unwrap();
        chassis.add_device(4, 0x48, "lm75");
        chassis.set_pim_present(true);
        chassis
    }

    fn devices(&self) -> PathBuf {
        self.root.path().join("bus/i2c/devices")
    }

    fn presence_file(&self) -> PathBuf {
        self.root.path().join("pim0_present")
    }

    fn set_pim_present(&self, present: bool) {
        fs::write(self.presence_file(), if present { "1\n" } else { "0\n" }).unwrap();
    }

    fn add_bus(&self, number: u32, adapter: &str) {
        let dir = self.devices().join(format!("i2c-{}", number));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), adapter).unwrap();
    }

    fn add_device(&self, bus: u32, addr: u8, driver: &str) -> PathBuf {
        let dir = self.devices().join(format!("{}-{:04x}", bus, addr));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("name"), format!("{}\n", driver)).unwrap();
        dir
    }

    fn explorer(&self) -> PlatformExplorer {
        let toml = platform_toml(&self.presence_file());
        let config = parse_platform_config(&toml, false).unwrap();
        PlatformValidator::new().validate(&config).unwrap();
        PlatformExplorer::new(
            config,
            Box::new(SysfsI2cExplorer::new(self.root.path())),
            Box::new(SysfsPresenceDetector::new(self.root.path())),
        )
    }
}

fn identity_eeprom(product_name: &str) -> Vec<u8> {
    let mut raw = vec![0xFB, 0xFB, 5, 0xFF, 1, product_name.len() as u8];
    raw.extend_from_slice(product_name.as_bytes());
    raw.extend_from_slice(&[0xFA, 2, 0x12, 0x34]);
    raw.resize(256, 0xFF);
    raw
}

fn platform_toml(presence_file: &Path) -> String {
    format!(
        r#"
i2c_busses_from_main_board = ["SMB_I2C_0"]

[chassis_slot_config]
slot_type = "CHASSIS_SLOT"
outgoing_i2c_bus_names = ["SMB_I2C_0"]

[[chassis_fru_type_config.i2c_device_configs]]
bus_name = "INCOMING@0"
address = "0x70"
kernel_device_name = "pca9548"
num_outgoing_channels = 4
fru_scoped_name = "mux0"

[chassis_fru_type_config.outgoing_slot_configs."PIM_SLOT@0"]
slot_type = "PIM_SLOT"
outgoing_i2c_bus_names = ["mux0@0"]
presence_detection = {{ sysfs_file = {{ path = "{}", desired_value = 1 }} }}

[slot_type_configs.CHASSIS_SLOT]

[slot_type_configs.PIM_SLOT.fru_eeprom]
incoming_bus_index = 0
address = "0x50"
kernel_device_name = "24c64"

[[fru_type_configs.PIM16Q.i2c_device_configs]]
bus_name = "INCOMING@0"
address = "0x48"
kernel_device_name = "lm75"
"#,
        presence_file.display()
    )
}

#[test]
fn test_explore_bound_chassis_creates_nothing_new() {
    let chassis = BoundChassis::new();
    let mut explorer = chassis.explorer();

    let summary = explorer.explore().unwrap();
    assert_eq!(summary.devices_created, 0);
    assert_eq!(summary.frus, vec![CHASSIS.to_string(), PIM.to_string()]);

    let table = explorer.kernel_i2c_bus_names();
    assert_eq!(table.get("", "SMB_I2C_0"), Some("i2c-0"));
    assert_eq!(table.get(CHASSIS, "mux0@0"), Some("i2c-4"));
    assert_eq!(table.get(CHASSIS, "mux0@3"), Some("i2c-7"));
    assert_eq!(table.get(PIM, "INCOMING@0"), Some("i2c-4"));

    // no creation request reached the kernel
    assert!(!chassis.devices().join("i2c-0/new_device").exists());
    assert!(!chassis.devices().join("i2c-4/new_device").exists());
}

#[test]
fn test_pulled_pim_drops_out_of_the_table() {
    let chassis = BoundChassis::new();
    let mut explorer = chassis.explorer();
    explorer.explore().unwrap();

    chassis.set_pim_present(false);
    explorer.explore().unwrap();

    let table = explorer.kernel_i2c_bus_names();
    assert!(!table.contains_fru(PIM));
    assert_eq!(table.get(CHASSIS, "mux0@0"), Some("i2c-4"));
}

#[test]
fn test_unbound_device_fails_the_pass_and_keeps_last_table() {
    let chassis = BoundChassis::new();
    let mut explorer = chassis.explorer();
    explorer.explore().unwrap();
    let good = explorer.kernel_i2c_bus_names().clone();

    // the sensor vanished and nothing binds a new one in this tree
    fs::remove_dir_all(chassis.devices().join("4-0048")).unwrap();
    match explorer.explore().unwrap_err() {
        ExplorationError::Hardware { fru, source, .. } => {
            assert_eq!(fru, PIM);
            assert!(matches!(source, I2cError::DeviceNotCreated { addr: 0x48, .. }));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(
        fs::read_to_string(chassis.devices().join("i2c-4/new_device")).unwrap(),
        "lm75 0x48"
    );
    assert_eq!(explorer.kernel_i2c_bus_names(), &good);
}
