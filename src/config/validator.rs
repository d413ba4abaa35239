use super::platform_config::{FruTypeConfig, PlatformConfig, SlotConfig};
use crate::errors::{ConfigError, ConfigResult};
use std::collections::HashSet;
use tracing::error;

const MAX_I2C_ADDRESS: u8 = 0x7f;
const INCOMING_PREFIX: &str = "INCOMING@";

/// Startup checks that make a config safe to explore.
///
/// Everything that can be decided without hardware is rejected here, so that
/// an exploration pass only fails for reasons the hardware gives it.
#[derive(Debug, Default)]
pub struct PlatformValidator;

impl PlatformValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn is_valid(&self, config: &PlatformConfig) -> bool {
        match self.validate(config) {
            Ok(()) => true,
            Err(e) => {
                error!("[config] {}", e);
                false
            }
        }
    }

    pub fn validate(&self, config: &PlatformConfig) -> ConfigResult<()> {
        if config.i2c_busses_from_main_board.is_empty() {
            return Err(invalid("i2c_busses_from_main_board is empty"));
        }

        let main_board: HashSet<&str> = config
            .i2c_busses_from_main_board
            .iter()
            .map(String::as_str)
            .collect();
        for bus in &config.chassis_slot_config.outgoing_i2c_bus_names {
            if !main_board.contains(bus.as_str()) {
                return Err(invalid(format!(
                    "chassis slot exposes '{}' which is not a main board bus",
                    bus
                )));
            }
        }

        self.validate_slot("chassis_slot_config", &config.chassis_slot_config, config)?;
        self.validate_fru("CHASSIS", &config.chassis_fru_type_config, config)?;
        for (name, fru) in &config.fru_type_configs {
            self.validate_fru(name, fru, config)?;
        }
        for (name, slot_type) in &config.slot_type_configs {
            match (&slot_type.fru_eeprom, &slot_type.fru_type) {
                (None, Some(fru_type)) if !config.fru_type_configs.contains_key(fru_type) => {
                    return Err(invalid(format!(
                        "slot type '{}' names unknown FRU type '{}'",
                        name, fru_type
                    )));
                }
                (Some(eeprom), _) if eeprom.address > MAX_I2C_ADDRESS => {
                    return Err(invalid(format!(
                        "slot type '{}' EEPROM address {:#04x} is not a 7-bit address",
                        name, eeprom.address
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn validate_slot(&self, slot_name: &str, slot: &SlotConfig, config: &PlatformConfig) -> ConfigResult<()> {
        let slot_type = config.slot_type_configs.get(&slot.slot_type).ok_or_else(|| {
            invalid(format!(
                "slot '{}' refers to unknown slot type '{}'",
                slot_name, slot.slot_type
            ))
        })?;
        if let Some(eeprom) = &slot_type.fru_eeprom {
            if eeprom.incoming_bus_index >= slot.outgoing_i2c_bus_names.len() {
                return Err(invalid(format!(
                    "slot '{}' has {} outgoing bus(es) but its EEPROM sits on bus {}",
                    slot_name,
                    slot.outgoing_i2c_bus_names.len(),
                    eeprom.incoming_bus_index
                )));
            }
        }
        Ok(())
    }

    /// Walks the devices in declaration order, tracking which local bus names
    /// exist at each point. `INCOMING@<n>` buses are always accepted because
    /// their count depends on the slot the FRU is plugged into.
    fn validate_fru(&self, fru_type: &str, fru: &FruTypeConfig, config: &PlatformConfig) -> ConfigResult<()> {
        let mut known: HashSet<String> = HashSet::new();
        let is_known =
            |known: &HashSet<String>, bus: &str| bus.starts_with(INCOMING_PREFIX) || known.contains(bus);

        for device in &fru.i2c_device_configs {
            if device.address > MAX_I2C_ADDRESS {
                return Err(invalid(format!(
                    "{}: device '{}' address {:#04x} is not a 7-bit address",
                    fru_type,
                    device.display_name(),
                    device.address
                )));
            }
            if !is_known(&known, &device.bus_name) {
                return Err(invalid(format!(
                    "{}: device '{}' sits on bus '{}' which is not produced before it",
                    fru_type,
                    device.display_name(),
                    device.bus_name
                )));
            }
            if device.is_mux() {
                let scoped = device.fru_scoped_name.as_ref().ok_or_else(|| {
                    invalid(format!(
                        "{}: mux '{}' at {:#04x} has no fru_scoped_name",
                        fru_type, device.kernel_device_name, device.address
                    ))
                })?;
                for channel in 0..device.num_outgoing_channels {
                    known.insert(format!("{}@{}", scoped, channel));
                }
            }
        }

        for (slot_name, slot) in &fru.outgoing_slot_configs {
            for bus in &slot.outgoing_i2c_bus_names {
                if !is_known(&known, bus) {
                    return Err(invalid(format!(
                        "{}: slot '{}' exposes bus '{}' which the FRU does not produce",
                        fru_type, slot_name, bus
                    )));
                }
            }
            self.validate_slot(slot_name, slot, config)?;
            let slot_type = &config.slot_type_configs[&slot.slot_type];
            if slot_type.fru_eeprom.is_none() && slot_type.fru_type.is_none() {
                return Err(invalid(format!(
                    "{}: slot '{}' of type '{}' has no way to identify what is plugged in",
                    fru_type, slot_name, slot.slot_type
                )));
            }
        }
        Ok(())
    }
}

fn invalid(reason: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError(reason.into())
}
