use platform_manager::{init_tracing, run_platform_manager, RunSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // RUST_LOG=debug also dumps the config and each pass's bus table
    init_tracing();

    let settings = RunSettings::from_env()?;
    tracing::info!(
        "[main] config: {}, sysfs: {}",
        settings.config_file.as_deref().unwrap_or("<embedded>"),
        settings.sysfs_root.display()
    );

    run_platform_manager(settings).await
}
