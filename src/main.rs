use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use tg_exporter::{
    discover_installations, AssetCatalog, BatchCoordinator, ClientRunner, EnigoInput,
    ExportConfig, LogObserver, OutputCollector, ProcessSupervisor, ScreenDriver,
    SystemProcesses, TemplateLocator, XcapGrab,
};

/// Unattended data export for multi-account Telegram Desktop installations.
#[derive(Parser, Debug)]
#[command(name = "tg-exporter", version, about)]
struct Cli {
    /// Root directory to scan for client executables. Repeatable.
    #[arg(long = "client-dir", required = true)]
    client_dirs: Vec<PathBuf>,

    /// Destination root for relocated export archives.
    #[arg(long)]
    export_dir: Option<PathBuf>,

    /// Directory of per-language reference images.
    #[arg(long)]
    assets_dir: Option<PathBuf>,

    /// Directory the client writes exports into.
    #[arg(long)]
    download_dir: Option<PathBuf>,

    /// JSON config file layered over the built-in defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Upper bound on a single export, e.g. "30m" or "2h".
    #[arg(long, value_parser = humantime::parse_duration)]
    completion_timeout: Option<Duration>,

    /// Log file, written alongside stderr output.
    #[arg(long, default_value = "telegram_export.log")]
    log_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_file)?;

    let mut config = match &cli.config {
        Some(path) => ExportConfig::load(path)?,
        None => ExportConfig::default(),
    };
    if let Some(dir) = cli.export_dir {
        config.export_base_dir = dir;
    }
    if let Some(dir) = cli.assets_dir {
        config.assets_dir = dir;
    }
    if let Some(dir) = cli.download_dir {
        config.download_dir = dir;
    }
    if let Some(timeout) = cli.completion_timeout {
        config.timeouts.completion = timeout;
    }

    let catalog = AssetCatalog::new(config.assets_dir.clone());
    catalog.verify(&config.languages, &config.export_options)?;

    let processes = SystemProcesses::new(config.identity_markers.clone());
    let installations = discover_installations(&cli.client_dirs, &processes)?;
    if installations.is_empty() {
        anyhow::bail!(
            "no verified client executables found under {:?}",
            cli.client_dirs
        );
    }

    let driver = ScreenDriver::new(
        Box::new(TemplateLocator::new()),
        Box::new(EnigoInput::new().context("input backend unavailable")?),
        Box::new(XcapGrab::new()),
        catalog,
        config.timeouts.locate_poll,
    );
    let supervisor = ProcessSupervisor::new(Box::new(processes), config.timeouts.terminate_grace);
    let collector = OutputCollector::new(
        config.download_dir.clone(),
        config.export_base_dir.clone(),
    );
    let runner = ClientRunner::new(driver, supervisor, collector, config.clone());

    let mut coordinator = BatchCoordinator::new(runner, config, Box::new(LogObserver));
    let summary = coordinator.run(&installations)?;

    println!(
        "{} clients: {} succeeded, {} failed, {} skipped",
        summary.total, summary.succeeded, summary.failed, summary.skipped
    );
    if !summary.failures.is_empty() {
        println!("details written to the failure report");
        std::process::exit(1);
    }
    Ok(())
}

/// Stderr plus a plain-text log file, filtered by `RUST_LOG` when set.
fn init_tracing(log_file: &PathBuf) -> anyhow::Result<()> {
    let file = File::create(log_file)
        .with_context(|| format!("cannot create log file {}", log_file.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(file)),
        )
        .init();
    Ok(())
}
