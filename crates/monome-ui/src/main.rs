//! monome-ui: host-side control for serialosc arc and grid devices.
//!
//! # Usage
//!
//! ```text
//! monome-ui [--config <PATH>] [--log-level <LEVEL>] <COMMAND>
//!
//! Commands:
//!   list   Print every device serialosc reports
//!   arc    Drive the first arc with one or more encoder pages
//!   grid   Drive the first grid with a freeform button page
//! ```
//!
//! In `arc` mode, pushing any encoder advances to the next page and typing a
//! page number on stdin jumps to it. Ctrl+C clears the LEDs and exits.
//!
//! # Architecture overview
//!
//! ```text
//! serialosc  ──UDP──  DiscoveryClient   (listener thread)
//! device     ──UDP──  DeviceSession     (listener thread)
//!                         │ InputHandler
//!                         ▼
//!                     Controller ── pages ── LedSurface (the session)
//!                         │ subscribers
//!                         ▼
//!                     main loop (tokio: stdin, Ctrl+C, page requests)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use monome_core::{ControlError, DeviceDescriptor, KeyMode, LedSurface};
use monome_ui::application::controller::{ArcController, GridController};
use monome_ui::application::page::{VariantSpec, UNASSIGNED_TAG};
use monome_ui::application::ring_page::{ArcEvent, EncoderKeyEvent};
use monome_ui::infrastructure::network::discovery::DiscoveryClient;
use monome_ui::infrastructure::network::port_allocator::PortAllocator;
use monome_ui::infrastructure::network::session::DeviceSession;
use monome_ui::infrastructure::storage::config::{load_config, HostConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Parser)]
#[command(
    name = "monome-ui",
    about = "Page-based control surface host for serialosc arc and grid devices",
    version
)]
struct Cli {
    /// Path to the TOML config file (defaults to the platform config dir).
    #[arg(long, global = true, env = "MONOME_UI_CONFIG")]
    config: Option<PathBuf>,

    /// Log level when `RUST_LOG` is unset; overrides `[logging] level`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every device serialosc reports.
    List,
    /// Drive the first arc.
    Arc {
        /// Number of pages to create.
        #[arg(long, default_value_t = 2)]
        pages: usize,

        /// Ring mode for every ring, or one per ring separated by commas.
        #[arg(long, default_value = "bipolar", value_delimiter = ',')]
        mode: Vec<String>,
    },
    /// Drive the first grid.
    Grid,
}

fn variant_spec(mut modes: Vec<String>) -> VariantSpec {
    if modes.len() == 1 {
        VariantSpec::Uniform(modes.remove(0))
    } else {
        VariantSpec::PerUnit(modes)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;

    let level = cli.log_level.clone().unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    match cli.command {
        Command::List => run_list(&config).await,
        Command::Arc { pages, mode } => run_arc(&config, pages, variant_spec(mode)).await,
        Command::Grid => run_grid(&config).await,
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Starts discovery and waits for the first device; Ctrl+C cancels the wait.
async fn discover(config: &HostConfig) -> anyhow::Result<(Arc<DiscoveryClient>, Vec<DeviceDescriptor>)> {
    let discovery = Arc::new(DiscoveryClient::start(config.discovery_options())?);
    info!("discovery listening on UDP {}", discovery.local_port());

    let waiter = Arc::clone(&discovery);
    let timeout = config.discovery_timeout();
    let mut wait = tokio::task::spawn_blocking(move || waiter.await_at_least_one(timeout));

    let devices = tokio::select! {
        joined = &mut wait => joined??,
        _ = tokio::signal::ctrl_c() => {
            discovery.interrupt();
            wait.await??
        }
    };
    Ok((discovery, devices))
}

async fn run_list(config: &HostConfig) -> anyhow::Result<()> {
    let (_discovery, devices) = discover(config).await?;
    for device in devices {
        match device.device_class() {
            Some(class) => println!("{device}  [{class}]"),
            None => println!("{device}  [unsupported]"),
        }
    }
    Ok(())
}

/// Blanks every unit of `surface`, logging failures.
fn clear(surface: &dyn LedSurface) {
    for unit in 0..surface.geometry().units() {
        if let Err(e) = surface.set_all(unit, 0) {
            warn!("failed to clear unit {unit}: {e}");
        }
    }
}

// ── Arc ───────────────────────────────────────────────────────────────────────

async fn run_arc(config: &HostConfig, pages: usize, spec: VariantSpec) -> anyhow::Result<()> {
    let (discovery, _) = discover(config).await?;
    let ports = PortAllocator::new(config.session.client_port_base);
    let session = Arc::new(DeviceSession::connect(&discovery, &ports, config.arc_session_options())?);

    let controller = ArcController::new(session.clone(), config.ring_page_settings());
    controller.set_sensitivity(config.arc.sensitivity)?;
    for _ in 0..pages.max(1) {
        controller.add_page(spec.clone())?;
    }

    let (page_tx, mut page_rx) = mpsc::unbounded_channel::<()>();
    controller.subscribe(move |event| {
        info!("{event:?}");
        if let ArcEvent::Key(EncoderKeyEvent { down: true, .. }) = event {
            let _ = page_tx.send(());
        }
    });
    session.set_handler(Arc::new(controller.input_handler()));
    info!("arc ready with {} pages; type a page number to switch", controller.page_count());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                break;
            }
            Some(()) = page_rx.recv() => {
                match controller.next_page() {
                    Ok(Some(page)) => info!("page {page}"),
                    Ok(None) => {}
                    Err(e) => error!("failed to switch page: {e}"),
                }
            }
            line = lines.next_line(), if stdin_open => match line? {
                Some(text) => select_page(&controller, text.trim()),
                None => stdin_open = false,
            },
        }
    }

    session.clear_handler();
    clear(session.as_ref());
    Ok(())
}

fn select_page(controller: &ArcController, text: &str) {
    if text.is_empty() {
        return;
    }
    match text.parse::<usize>() {
        Ok(page) => match controller.set_current_page(page) {
            Ok(()) => info!("page {page}"),
            Err(e) => warn!("{e}"),
        },
        Err(_) => warn!("not a page number: {text:?}"),
    }
}

// ── Grid ──────────────────────────────────────────────────────────────────────

async fn run_grid(config: &HostConfig) -> anyhow::Result<()> {
    let (discovery, _) = discover(config).await?;
    let ports = PortAllocator::new(config.session.client_port_base);
    let session = Arc::new(DeviceSession::connect(&discovery, &ports, config.grid_session_options())?);

    let controller = GridController::new(session.clone(), config.key_page_settings());
    let geometry = controller.geometry();
    if geometry.units() < 3 {
        bail!("grid needs at least 3 rows, configured height is {}", geometry.units());
    }

    // Row 0 toggles, row 1 momentary, row 2 one radio group.
    let page = controller.add_page(UNASSIGNED_TAG)?;
    controller.update_page(page, |p| -> Result<(), ControlError> {
        for x in 0..geometry.width() {
            p.assign(x, 0, KeyMode::Toggle, None)?;
            p.assign(x, 1, KeyMode::Momentary, None)?;
        }
        let group = p.add_radio_group();
        for x in 0..geometry.width() {
            p.assign(x, 2, KeyMode::Radio, Some(group))?;
        }
        Ok(())
    })??;

    controller.subscribe(|event| info!("{event:?}"));
    session.set_handler(Arc::new(controller.input_handler()));
    info!("grid ready; press Ctrl+C to exit");

    tokio::signal::ctrl_c().await.context("failed to listen for Ctrl+C")?;
    info!("received Ctrl+C, shutting down");

    session.clear_handler();
    clear(session.as_ref());
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
