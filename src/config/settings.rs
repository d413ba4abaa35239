use crate::bus::i2c::SYSFS_ROOT;
use crate::errors::{ConfigError, ConfigResult};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_EXPLORE_INTERVAL_SECS: u64 = 55;
const DEFAULT_EXPLORE_TIMEOUT_SECS: u64 = 30;

/// Process settings taken from the environment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    /// Platform config file; the embedded default is used when unset
    pub config_file: Option<String>,
    pub explore_interval: Duration,
    pub pass_timeout: Duration,
    pub sysfs_root: PathBuf,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            config_file: None,
            explore_interval: Duration::from_secs(DEFAULT_EXPLORE_INTERVAL_SECS),
            pass_timeout: Duration::from_secs(DEFAULT_EXPLORE_TIMEOUT_SECS),
            sysfs_root: PathBuf::from(SYSFS_ROOT),
        }
    }
}

impl RunSettings {
    /// Reads `CONFIG_FILE`, `EXPLORE_INTERVAL_SECS`, `EXPLORE_TIMEOUT_SECS`
    /// and `SYSFS_ROOT`
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let defaults = Self::default();
        let seconds = |key: &str, default: Duration| -> ConfigResult<Duration> {
            match lookup(key) {
                None => Ok(default),
                Some(raw) => match raw.trim().parse::<u64>() {
                    Ok(0) | Err(_) => Err(ConfigError::InvalidValue {
                        field: key.to_string(),
                        reason: format!("'{}' is not a positive number of seconds", raw),
                    }),
                    Ok(secs) => Ok(Duration::from_secs(secs)),
                },
            }
        };

        Ok(Self {
            config_file: lookup("CONFIG_FILE").filter(|path| !path.is_empty()),
            explore_interval: seconds("EXPLORE_INTERVAL_SECS", defaults.explore_interval)?,
            pass_timeout: seconds("EXPLORE_TIMEOUT_SECS", defaults.pass_timeout)?,
            sysfs_root: lookup("SYSFS_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.sysfs_root),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let settings = RunSettings::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(settings, RunSettings::default());
        assert_eq!(settings.explore_interval, Duration::from_secs(55));
        assert_eq!(settings.sysfs_root, PathBuf::from("/sys"));
    }

    #[test]
    fn test_overrides() {
        let settings = RunSettings::from_lookup(lookup_from(&[
            ("CONFIG_FILE", "/etc/platform_manager.json"),
            ("EXPLORE_INTERVAL_SECS", "10"),
            ("EXPLORE_TIMEOUT_SECS", " 5 "),
            ("SYSFS_ROOT", "/tmp/sys"),
        ]))
        .unwrap();
        assert_eq!(settings.config_file.as_deref(), Some("/etc/platform_manager.json"));
        assert_eq!(settings.explore_interval, Duration::from_secs(10));
        assert_eq!(settings.pass_timeout, Duration::from_secs(5));
        assert_eq!(settings.sysfs_root, PathBuf::from("/tmp/sys"));
    }

    #[test]
    fn test_invalid_interval_is_rejected() {
        for bad in ["0", "soon", "-3"] {
            let err = RunSettings::from_lookup(lookup_from(&[("EXPLORE_INTERVAL_SECS", bad)])).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { ref field, .. } if field == "EXPLORE_INTERVAL_SECS"));
        }
    }
}
