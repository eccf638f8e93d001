//! Thread verification kanban tool.
//!
//! Writes and reads the two thread codes stored on kanban cards through an
//! ACR122U reader, or through a simulated reader with `--simulate`.

mod config;
mod interrupt;
mod prompt;
mod terminal;

use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use kanban_hardware::AnyCardSession;
use kanban_hardware::mock::{MockCardSession, MockReaderHandle};
use tokio::task::LocalSet;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::{AppConfig, Backend, DEFAULT_LOG_FILTER, ReaderConfig};
use crate::interrupt::Interrupts;
use crate::prompt::{Controller, Prompt};
use crate::terminal::TerminalDisplay;

#[derive(Parser)]
#[command(version, about = "Write and verify kanban thread-code cards")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use the simulated reader instead of PC/SC hardware
    #[arg(long)]
    simulate: bool,

    /// Substring of the PC/SC reader name to use
    #[arg(short, long)]
    reader: Option<String>,

    /// Debug level output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref());

    let filter = config
        .as_ref()
        .map_or(DEFAULT_LOG_FILTER, |config| config.logging.filter.as_str());
    setup_logging(filter, cli.verbose);

    match config.and_then(|config| run(cli, config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn setup_logging(filter: &str, verbose: bool) {
    let default = if verbose { "debug" } else { filter };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli, mut config: AppConfig) -> Result<()> {
    if cli.simulate {
        config.reader.backend = Backend::Simulated;
    }
    if let Some(name) = cli.reader {
        config.reader.name_filter = name;
    }

    let (session, simulator) = open_session(&config)?;
    info!("Using {} reader backend", session.backend());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let controller = Rc::new(Controller::new(
        session,
        TerminalDisplay::new(),
        config.controller,
    ));

    let local = LocalSet::new();
    local.block_on(&runtime, async move {
        controller.startup().await;

        let monitor = {
            let controller = Rc::clone(&controller);
            tokio::task::spawn_local(async move { controller.run_presence_monitor().await })
        };

        let interrupts = Interrupts::listen();
        let result = Prompt::new(&controller, simulator, interrupts).run().await;
        monitor.abort();
        result
    })
}

fn open_session(config: &AppConfig) -> Result<(AnyCardSession, Option<MockReaderHandle>)> {
    match config.reader.backend {
        Backend::Simulated => {
            let (mut session, handle) = MockCardSession::new();
            if let Some(interval) = config.reader.poll_interval() {
                session = session.with_poll_interval(interval);
            }
            Ok((session.into(), Some(handle)))
        }
        Backend::Pcsc => Ok((open_pcsc(&config.reader)?, None)),
    }
}

#[cfg(feature = "pcsc")]
fn open_pcsc(reader: &ReaderConfig) -> Result<AnyCardSession> {
    let mut session = kanban_hardware::pcsc::PcscCardSession::new()
        .context("Failed to establish PC/SC context")?
        .with_name_filter(&reader.name_filter);
    if let Some(interval) = reader.poll_interval() {
        session = session.with_poll_interval(interval);
    }
    Ok(session.into())
}

#[cfg(not(feature = "pcsc"))]
fn open_pcsc(_reader: &ReaderConfig) -> Result<AnyCardSession> {
    anyhow::bail!(
        "PC/SC support is not compiled in; rebuild with `--features pcsc` or run with --simulate"
    )
}
