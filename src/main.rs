use std::path::PathBuf;

use clap::Parser;
use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use tracing::{info, warn};

use statkeeper::config::{self, load_config, load_config_from_path};
use statkeeper::logging::{self, LogFormat};
use statkeeper::scheduler::{Scheduler, SchedulerOptions, Shutdown, ShutdownTrigger};
use statkeeper::store::Store;
use statkeeper::system::host::host_info;
use statkeeper::system::proc::ProcSource;

#[derive(Parser)]
#[command(
    name = "statkeeper",
    about = "Record kernel CPU and memory counters to SQLite once a second"
)]
struct Cli {
    /// Path to config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database file to append samples to
    #[arg(long)]
    database: Option<PathBuf>,

    /// Root of the proc filesystem to read counters from
    #[arg(long)]
    proc_root: Option<PathBuf>,

    /// Log filter directive, e.g. info or statkeeper=debug
    #[arg(long)]
    log_level: Option<String>,

    /// Log output: text, json
    #[arg(long)]
    log_format: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    let config = load_config_for_cli(&cli);

    let format = match LogFormat::from_name(&config.general.log_format) {
        Some(format) => format,
        None => {
            eprintln!(
                "unknown log format {:?}, using text",
                config.general.log_format
            );
            LogFormat::Text
        }
    };
    logging::init(&config.general.log_level, format)?;

    let host = host_info();
    info!(
        host = host.host_name.as_deref().unwrap_or("unknown"),
        kernel = host.kernel_version.as_deref().unwrap_or("unknown"),
        os = host.os_version.as_deref().unwrap_or("unknown"),
        cpus = host.logical_cpus,
        "starting statkeeper"
    );

    let source = ProcSource::open(&config.sampling.proc_root).wrap_err_with(|| {
        format!(
            "failed to open proc filesystem at {}",
            config.sampling.proc_root.display()
        )
    })?;
    let store = Store::open(&config.storage.database_path).wrap_err_with(|| {
        format!(
            "failed to open {}",
            config.storage.database_path.display()
        )
    })?;

    let (trigger, shutdown) = Shutdown::channel();
    listen_for_signals(trigger)?;

    let options = SchedulerOptions {
        persist_on_read_error: config.sampling.persist_on_read_error,
    };
    let mut scheduler = Scheduler::new(source, store, shutdown, options);
    scheduler.run().await;

    info!("exit");
    Ok(())
}

fn load_config_for_cli(cli: &Cli) -> config::Config {
    let mut config = match &cli.config {
        Some(path) => load_config_from_path(path),
        None => load_config(),
    };

    if let Some(ref path) = cli.database {
        config.storage.database_path = path.clone();
    }
    if let Some(ref root) = cli.proc_root {
        config.sampling.proc_root = root.clone();
    }
    if let Some(ref level) = cli.log_level {
        config.general.log_level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.general.log_format = format.clone();
    }

    config
}

/// Registers the handlers up front so a signal during the first tick is not lost.
#[cfg(unix)]
fn listen_for_signals(trigger: ShutdownTrigger) -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut interrupt =
        signal(SignalKind::interrupt()).wrap_err("failed to register SIGINT handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).wrap_err("failed to register SIGTERM handler")?;

    tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                _ = interrupt.recv() => "SIGINT",
                _ = terminate.recv() => "SIGTERM",
            };
            if trigger.trigger() {
                info!(signal = name, "shutdown requested");
            } else {
                warn!(signal = name, "second signal received, exiting immediately");
                std::process::exit(130);
            }
        }
    });
    Ok(())
}

#[cfg(not(unix))]
fn listen_for_signals(trigger: ShutdownTrigger) -> Result<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                return;
            }
            if trigger.trigger() {
                info!(signal = "ctrl-c", "shutdown requested");
            } else {
                warn!(signal = "ctrl-c", "second signal received, exiting immediately");
                std::process::exit(130);
            }
        }
    });
    Ok(())
}
