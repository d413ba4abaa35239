use crate::errors::{ConfigError, ConfigResult};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

/// Root of the platform description, parsed once at startup
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlatformConfig {
    #[serde(default)]
    pub platform_name: Option<String>,
    /// Bus adapter names the BSP exposes on the main board
    pub i2c_busses_from_main_board: Vec<String>,
    pub chassis_slot_config: SlotConfig,
    pub chassis_fru_type_config: FruTypeConfig,
    #[serde(default)]
    pub fru_type_configs: HashMap<String, FruTypeConfig>,
    #[serde(default)]
    pub slot_type_configs: HashMap<String, SlotTypeConfig>,
}

/// One class of pluggable unit
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FruTypeConfig {
    /// Processed in order: a device may sit on a channel of an earlier mux
    #[serde(default)]
    pub i2c_device_configs: Vec<I2cDeviceConfig>,
    #[serde(default)]
    pub outgoing_slot_configs: BTreeMap<String, SlotConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SlotConfig {
    pub slot_type: String,
    /// `None` for slots that are always populated
    #[serde(default)]
    pub presence_detection: Option<PresenceDetection>,
    #[serde(default)]
    pub outgoing_i2c_bus_names: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SlotTypeConfig {
    #[serde(default)]
    pub fru_eeprom: Option<FruEepromConfig>,
    /// FRU type plugged in every slot of this type, for slots without an EEPROM
    #[serde(default)]
    pub fru_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FruEepromConfig {
    pub incoming_bus_index: usize,
    #[serde(deserialize_with = "deserialize_i2c_address")]
    pub address: u8,
    pub kernel_device_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct I2cDeviceConfig {
    /// Name the device's own bus is known by inside its FRU
    pub bus_name: String,
    #[serde(deserialize_with = "deserialize_i2c_address")]
    pub address: u8,
    pub kernel_device_name: String,
    #[serde(default)]
    pub num_outgoing_channels: u8,
    #[serde(default)]
    pub fru_scoped_name: Option<String>,
}

impl I2cDeviceConfig {
    pub fn is_mux(&self) -> bool {
        self.num_outgoing_channels > 0
    }

    /// Label used in logs and channel bus names
    pub fn display_name(&self) -> &str {
        self.fru_scoped_name
            .as_deref()
            .unwrap_or(&self.kernel_device_name)
    }
}

/// How to tell whether something is plugged into a slot
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceDetection {
    /// A sysfs attribute that reads `desired_value` when present
    SysfsFile { path: String, desired_value: i64 },
    /// A GPIO line exported through the sysfs GPIO class
    GpioLine { line: u32, desired_value: i64 },
}

/// Accepts either an integer or a hex string such as `"0x70"`
fn deserialize_i2c_address<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawAddress {
        Number(u64),
        Text(String),
    }

    let value = match RawAddress::deserialize(deserializer)? {
        RawAddress::Number(n) => n,
        RawAddress::Text(s) => parse_address_str(&s).map_err(<D::Error as serde::de::Error>::custom)?,
    };
    u8::try_from(value)
        .map_err(|_| serde::de::Error::custom(format!("I2C address {:#x} out of range", value)))
}

fn parse_address_str(s: &str) -> Result<u64, String> {
    let trimmed = s.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => trimmed.parse::<u64>(),
    };
    parsed.map_err(|e| format!("invalid I2C address '{}': {}", s, e))
}

/// Parse a config from text. `.json` sources are JSON, everything else TOML.
pub fn parse_platform_config(content: &str, is_json: bool) -> ConfigResult<PlatformConfig> {
    if is_json {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(toml::from_str(content)?)
    }
}

/// Loads config from a TOML or JSON file
pub fn load_platform_config(path: &str) -> ConfigResult<PlatformConfig> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::LoadError {
        path: path.to_string(),
        source: e,
    })?;
    let is_json = Path::new(path)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    parse_platform_config(&content, is_json)
}
