pub mod eeprom;
pub mod i2c;

pub use eeprom::{parse_identity, FruIdentity};
pub use i2c::{I2cExplorer, SysfsI2cExplorer};
