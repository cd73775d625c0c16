//! mx - audio matrix configuration manager
//!
//! CLI entry point for listing, inspecting and uploading matrix configurations.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::{debug, info, warn};

use audiomatrix::cli::{Cli, Command};
use audiomatrix::config::Config;
use audiomatrix::device::{DeviceClient, HttpDeviceClient};
use audiomatrix::manager::{ConfigManagerHandle, UploadRequest};
use audiomatrix::matrix::ConfigStore;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("audiomatrix")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("audiomatrix.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let mut config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.host = host;
    }
    if let Some(path) = cli.configs_path {
        config.configs_path = path;
    }
    info!(host = %config.host, configs = %config.configs_path.display(), "mx loaded config");

    let store = ConfigStore::new(&config.configs_path);

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Command::List => cmd_list(&config, store).await,
        Command::Current => cmd_current(&config, store).await,
        Command::Upload { file, no_wait } => cmd_upload(&config, store, &file, no_wait).await,
        Command::Restore { file } => cmd_restore(&config, &store, &file).await,
        Command::Dump { name } => cmd_dump(&config, &store, &name).await,
        Command::Diff { file } => cmd_diff(&config, &store, &file).await,
    }
}

fn device_client(config: &Config) -> Result<HttpDeviceClient> {
    config.validate()?;
    HttpDeviceClient::new(&config.host, &config.device).context("Failed to create device client")
}

async fn start_manager(client: HttpDeviceClient, store: ConfigStore) -> Result<ConfigManagerHandle> {
    ConfigManagerHandle::spawn(Arc::new(client), store)
        .await
        .context("Failed to start config manager")
}

async fn cmd_list(config: &Config, store: ConfigStore) -> Result<()> {
    // Listing never touches the device, so an unset host is fine here
    let client = HttpDeviceClient::new(&config.host, &config.device)?;
    let manager = start_manager(client, store).await?;
    let result = manager.list_configurations().await;
    manager.terminate().await;

    let paths = result.context("Failed to list configurations")?;
    if paths.is_empty() {
        println!("{} No configurations in {}", "!".yellow(), config.configs_path.display());
    }
    for path in paths {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        println!("{} {}", name.cyan(), path.display().to_string().dimmed());
    }
    Ok(())
}

async fn cmd_current(config: &Config, store: ConfigStore) -> Result<()> {
    let manager = start_manager(device_client(config)?, store).await?;
    let result = manager.get_current_matrix_config().await;
    manager.terminate().await;

    let current = result.context("Failed to determine current configuration")?;
    if current.is_known() {
        println!("{} Current configuration: {}", "✓".green(), current.source.to_string().cyan());
    } else {
        println!("{} Current configuration: {}", "?".yellow(), current.source);
    }
    Ok(())
}

async fn cmd_upload(config: &Config, store: ConfigStore, file: &Path, no_wait: bool) -> Result<()> {
    let path = store.resolve(file);
    if !path.is_file() {
        return Err(eyre::eyre!("Configuration file not found: {}", file.display()));
    }

    let manager = start_manager(device_client(config)?, store).await?;
    match manager.upload(&path).await? {
        UploadRequest::Busy => {
            manager.terminate().await;
            return Err(eyre::eyre!("Another upload is in progress"));
        }
        UploadRequest::Accepted => {
            println!("{} Upload of {} accepted", "→".cyan(), path.display());
        }
    }

    if no_wait {
        // The upload is abandoned when the manager stops with this process
        warn!(path = %path.display(), "Not waiting for upload to finish");
        manager.terminate().await;
        return Ok(());
    }

    let waited = tokio::time::timeout(
        config.upload.wait_timeout(),
        manager.wait_for_upload(config.upload.poll_interval()),
    )
    .await;
    manager.terminate().await;

    let state = waited
        .map_err(|_| eyre::eyre!("Upload did not finish within {:?}", config.upload.wait_timeout()))?
        .context("Config manager stopped during upload")?;

    match state.last_error {
        Some(reason) => Err(eyre::eyre!("Upload failed: {}", reason)),
        None => {
            println!("{} Uploaded {}", "✓".green(), path.display());
            Ok(())
        }
    }
}

async fn cmd_restore(config: &Config, store: &ConfigStore, file: &Path) -> Result<()> {
    let client = device_client(config)?;
    let matrix = store.load(file)?;
    info!(file = %file.display(), endpoint = %client.endpoint(), "Restoring configuration directly");
    client
        .write_matrix_config(&matrix)
        .await
        .context("Failed to write configuration to device")?;
    println!("{} Restored {}", "✓".green(), file.display());
    Ok(())
}

async fn cmd_dump(config: &Config, store: &ConfigStore, name: &str) -> Result<()> {
    let client = device_client(config)?;
    let live = client
        .read_matrix_config()
        .await
        .context("Failed to read configuration from device")?;
    let path = store.save(name, &live)?;
    println!("{} Saved {} settings to {}", "✓".green(), live.len(), path.display());
    Ok(())
}

async fn cmd_diff(config: &Config, store: &ConfigStore, file: &Path) -> Result<()> {
    let client = device_client(config)?;
    let stored = store.load(file)?;
    let live = client
        .read_matrix_config()
        .await
        .context("Failed to read configuration from device")?;

    let diff = live.diff(&stored);
    if diff.is_empty() {
        println!("{} Device matches {}", "✓".green(), file.display());
    } else {
        println!("{} {} setting(s) differ (device -> {}):", "!".yellow(), diff.len(), file.display());
        print!("{}", diff);
    }
    Ok(())
}
