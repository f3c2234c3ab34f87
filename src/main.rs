use clap::Parser;
use env_logger::{Builder, WriteStyle};
use homesens::cli::Cli;
use homesens::config::AppConfig;
use log::error;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration first (without logging). An explicitly requested
    // file must exist; the implicit default may be absent.
    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::new().unwrap_or_else(|e| {
            eprintln!("Failed to load configuration: {}", e);
            // Fall back to default configuration
            AppConfig::default()
        }),
    };
    cli.apply(&mut config);

    // Initialise logger with a configured log level
    Builder::new()
        .filter_level(config.get_log_level())
        .write_style(WriteStyle::Always)
        .format_timestamp_secs()
        .init();

    config.check()?;

    if let Err(e) = homesens::run(config, cli.list_sensors).await {
        error!("Application error: {}", e);
        return Err(e);
    }
    Ok(())
}
