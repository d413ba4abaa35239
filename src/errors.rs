use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the I2C primitives (sysfs device creation, mux channel
/// lookup, EEPROM identification)
#[derive(Error, Debug)]
pub enum I2cError {
    #[error("I/O on '{path}' failed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Main board I2C bus '{bus}' not found under {root}")]
    BusNotFound { bus: String, root: PathBuf },

    #[error("Invalid kernel I2C bus name '{bus}'")]
    InvalidBusName { bus: String },

    #[error("Device at {bus}@{addr:#04x} is bound to '{existing}', expected '{expected}'")]
    DeviceConflict {
        bus: String,
        addr: u8,
        existing: String,
        expected: String,
    },

    #[error("Device '{driver}' at {bus}@{addr:#04x} did not appear after creation")]
    DeviceNotCreated { driver: String, bus: String, addr: u8 },

    #[error("No mux found at {bus}@{addr:#04x}; create it before reading its channels")]
    MuxNotCreated { bus: String, addr: u8 },

    #[error("Channel {channel} of mux at {bus}@{addr:#04x} is missing or does not point at an I2C bus")]
    InvalidChannel { bus: String, addr: u8, channel: u32 },

    #[error("EEPROM at '{path}' is not recognized: {reason}")]
    EepromUnrecognized { path: PathBuf, reason: String },
}

/// Presence detection errors
#[derive(Error, Debug)]
pub enum PresenceError {
    #[error("Failed to read presence from '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Presence value '{value}' in '{path}' is not an integer")]
    InvalidValue { path: PathBuf, value: String },
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from '{path}': {source}")]
    LoadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML configuration: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid JSON configuration: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Failures that abort one exploration pass
#[derive(Error, Debug)]
pub enum ExplorationError {
    #[error("No chassis present")]
    ChassisNotPresent,

    #[error("Bus '{bus}' is not known in FRU '{fru}'")]
    UnresolvedBus { fru: String, bus: String },

    #[error("Mux '{device}' in FRU '{fru}' has {actual} channel bus(es), expected {expected}")]
    ChannelCountMismatch {
        fru: String,
        device: String,
        expected: u8,
        actual: usize,
    },

    #[error("Slot '{slot}' in FRU '{fru}' refers to unknown slot type '{slot_type}'")]
    UnknownSlotType {
        fru: String,
        slot: String,
        slot_type: String,
    },

    #[error("Slot '{slot}' in FRU '{fru}' holds unknown FRU type '{fru_type}'")]
    UnknownFruType {
        fru: String,
        slot: String,
        fru_type: String,
    },

    #[error("Slot '{slot}' in FRU '{fru}' has no incoming bus {index} for its EEPROM")]
    EepromBusOutOfRange { fru: String, slot: String, index: usize },

    #[error("Slot type '{slot_type}' names neither an EEPROM nor a fixed FRU type")]
    UnidentifiableSlot { slot_type: String },

    #[error("{operation} failed in FRU '{fru}': {source}")]
    Hardware {
        fru: String,
        operation: String,
        #[source]
        source: I2cError,
    },

    #[error("Presence check of '{slot}' in FRU '{fru}' failed: {source}")]
    Presence {
        fru: String,
        slot: String,
        #[source]
        source: PresenceError,
    },

    #[error("Exploration pass did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Exploration pass aborted: {reason}")]
    Aborted { reason: String },
}

impl ExplorationError {
    /// Resolution misses are ordering defects in the configuration or the
    /// explorer, not hardware faults.
    pub fn is_logic_error(&self) -> bool {
        matches!(
            self,
            ExplorationError::UnresolvedBus { .. }
                | ExplorationError::UnknownSlotType { .. }
                | ExplorationError::EepromBusOutOfRange { .. }
                | ExplorationError::UnidentifiableSlot { .. }
        )
    }
}

/// Result type aliases for convenience
pub type I2cResult<T> = Result<T, I2cError>;
pub type PresenceResult<T> = Result<T, PresenceError>;
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type ExplorationResult<T> = Result<T, ExplorationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logic_errors_are_distinguished_from_hardware_faults() {
        let unresolved = ExplorationError::UnresolvedBus {
            fru: "::Chassis_Slot@0/CHASSIS".to_string(),
            bus: "mux0@2".to_string(),
        };
        assert!(unresolved.is_logic_error());

        let hardware = ExplorationError::Hardware {
            fru: "::Chassis_Slot@0/CHASSIS".to_string(),
            operation: "create mux".to_string(),
            source: I2cError::MuxNotCreated {
                bus: "i2c-1".to_string(),
                addr: 0x70,
            },
        };
        assert!(!hardware.is_logic_error());
        assert!(!ExplorationError::ChassisNotPresent.is_logic_error());
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = ExplorationError::ChannelCountMismatch {
            fru: "::Chassis_Slot@0/CHASSIS".to_string(),
            device: "mux0".to_string(),
            expected: 4,
            actual: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("mux0"));
        assert!(msg.contains("::Chassis_Slot@0/CHASSIS"));
        assert!(msg.contains("expected 4"));

        let err = I2cError::DeviceConflict {
            bus: "i2c-4".to_string(),
            addr: 0x50,
            existing: "24c02".to_string(),
            expected: "24c64".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Device at i2c-4@0x50 is bound to '24c02', expected '24c64'"
        );
    }
}
