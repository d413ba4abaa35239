// Public modules
pub mod bus;
pub mod config;
pub mod errors;
pub mod explorer;
pub mod naming;
pub mod presence;
pub mod scheduler;

// Re-export commonly used types
pub use config::{load_platform_config, PlatformConfig, PlatformValidator, RunSettings};
pub use errors::{ConfigError, ExplorationError, ExplorationResult};
pub use explorer::{ExplorationSummary, PlatformExplorer};
pub use naming::NamingTable;
pub use scheduler::{run_pass, spawn_explore_task, PassOutcome};

use crate::bus::SysfsI2cExplorer;
use crate::config::parse_platform_config;
use crate::errors::ConfigResult;
use crate::presence::SysfsPresenceDetector;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// Platform description compiled into the binary
pub const DEFAULT_PLATFORM_CONFIG: &str = include_str!("../config/platform_manager.toml");

/// Initialize tracing, filtered by `RUST_LOG` or INFO when it is unset
pub fn init_tracing() {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(rust_log.as_deref()))
        .init();
}

/// Builds the log filter from `RUST_LOG`-style directives
pub fn env_filter(directives: Option<&str>) -> EnvFilter {
    match directives.map(str::trim).filter(|d| !d.is_empty()) {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::new("info"),
    }
}

/// Loads and validates the platform config from `config_file`, or from the
/// embedded default when no file is given
pub fn load_config(config_file: Option<&str>) -> ConfigResult<PlatformConfig> {
    let config = match config_file {
        Some(path) => {
            info!("[config] Using config file: {}", path);
            load_platform_config(path)?
        }
        None => {
            info!("[config] No config file was provided. Using the embedded default");
            parse_platform_config(DEFAULT_PLATFORM_CONFIG, false)?
        }
    };
    if let Ok(json) = serde_json::to_string(&config) {
        debug!("[config] {}", json);
    }

    PlatformValidator::new().validate(&config)?;
    info!(
        "[config] loaded {} FRU type(s), {} slot type(s)",
        config.fru_type_configs.len(),
        config.slot_type_configs.len()
    );
    Ok(config)
}

/// Run the platform manager until the exploration task ends
pub async fn run_platform_manager(settings: RunSettings) -> Result<(), Box<dyn std::error::Error>> {
    info!("[PlatformManager] starting up...");

    let config = load_config(settings.config_file.as_deref()).map_err(|e| {
        error!("[config] {}", e);
        e
    })?;

    let explorer = PlatformExplorer::new(
        config,
        Box::new(SysfsI2cExplorer::new(&settings.sysfs_root)),
        Box::new(SysfsPresenceDetector::new(&settings.sysfs_root)),
    );
    let explorer = Arc::new(Mutex::new(explorer));

    let task = spawn_explore_task(explorer, settings.explore_interval, settings.pass_timeout);
    info!("[main] exploration task launched");

    task.await?;
    Ok(())
}
