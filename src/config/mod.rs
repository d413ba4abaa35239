pub mod platform_config;
pub mod settings;
pub mod validator;

pub use platform_config::{
    load_platform_config, parse_platform_config, FruEepromConfig, FruTypeConfig,
    I2cDeviceConfig, PlatformConfig, PresenceDetection, SlotConfig, SlotTypeConfig,
};
pub use settings::RunSettings;
pub use validator::PlatformValidator;
