//! game-notifier — push a notification when a game goes free on Epic or a
//! watched game goes on sale on Steam.
//!
//! ## Architecture overview
//!
//! ```text
//! ┌─────────────┐ run_cycle ┌──────────┐  fetch  ┌───────────┐
//! │ schedule.rs │ ────────► │ poll.rs  │ ──────► │  source/  │
//! │   (loop)    │           │ (cycle)  │ ◄────── │ epic/steam│
//! └─────────────┘           └──────────┘  items  └───────────┘
//!                             │      │
//!                 get/set     │      │ publish
//!                             ▼      ▼
//!                     ┌──────────┐ ┌──────────────┐
//!                     │  store/  │ │ transport.rs │
//!                     │ (sqlite) │ │    (ntfy)    │
//!                     └──────────┘ └──────────────┘
//! ```
//!
//! * **`source/`** — the `GameSource` trait and the Epic and Steam
//!   implementations.
//! * **`store/`** — the SQLite record of what was announced and when.
//! * **`poll`** — one pass over all sources: fetch, judge, record, publish.
//! * **`schedule`** — repeats the pass on a fixed interval.
//! * **`transport`** — delivers notifications to an ntfy topic.
//! * **`config`** — reads an instance's `.env` file.
//! * **`main`** — wires everything together.

mod config;
mod error;
mod poll;
mod schedule;
mod source;
mod store;
#[cfg(test)]
mod test_server;
mod transport;

use std::path::PathBuf;
use std::sync::{mpsc, Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use poll::{PollSource, Poller};
use schedule::Scheduler;
use source::{CatalogClient, EpicSource, HttpCatalogClient, SteamSource};
use store::NotificationStore;
use transport::NtfyTransport;

#[derive(Parser, Debug)]
#[command(version, about)]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create or upgrade the database of an instance.
    Init {
        /// Instance directory, or the `.env` file inside it.
        path: PathBuf,
    },
    /// Poll storefronts and send notifications until terminated.
    Run {
        /// The instance's `.env` file.
        env_file: PathBuf,

        /// Run a single poll cycle and exit.
        #[arg(long)]
        once: bool,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .init();
}

fn init(path: PathBuf) -> Result<()> {
    let db_path = config::db_path(&path);
    NotificationStore::open(&db_path)
        .with_context(|| format!("failed to initialize {}", db_path.display()))?;
    tracing::info!(db = %db_path.display(), "database initialized");
    Ok(())
}

/// The active sources, in the order they are polled.
fn build_sources(config: &Config, client: Arc<dyn CatalogClient>) -> Vec<Box<dyn PollSource>> {
    let mut sources: Vec<Box<dyn PollSource>> = Vec::new();
    if config.epic_enabled {
        sources.push(Box::new(EpicSource::new(
            client.clone(),
            &config.epic_locale,
            &config.epic_country,
        )));
    }
    if !config.steam_games.is_empty() {
        sources.push(Box::new(SteamSource::new(
            client,
            config.steam_games.clone(),
            &config.steam_country,
        )));
    }
    sources
}

fn run(env_file: PathBuf, once: bool) -> Result<()> {
    let config = Config::load(&env_file)
        .with_context(|| format!("failed to load {}", env_file.display()))?;

    let db_path = config::db_path(&env_file);
    let store = NotificationStore::open(&db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;

    let client: Arc<dyn CatalogClient> = Arc::new(
        HttpCatalogClient::new(config.http_timeout).context("failed to build HTTP client")?,
    );
    let transport =
        NtfyTransport::new(config.http_timeout).context("failed to build ntfy client")?;

    let poller = Poller::new(build_sources(&config, client), store, transport, &config.topic);
    if poller.source_names().is_empty() {
        tracing::warn!("no sources enabled, cycles will do nothing");
    }
    tracing::info!(
        sources = ?poller.source_names(),
        interval_minutes = config.poll_interval.as_secs() / 60,
        "starting"
    );

    let scheduler = Scheduler::new(poller, config.poll_interval);
    if once {
        scheduler.run_once();
        return Ok(());
    }

    // Nothing ever sends on this channel; the loop runs until the process is
    // terminated.
    let (_stop_tx, stop_rx) = mpsc::channel();
    scheduler.run(&stop_rx);
    Ok(())
}

fn main() -> Result<()> {
    init_logging();

    match CliArgs::parse().command {
        Command::Init { path } => init(path),
        Command::Run { env_file, once } => run(env_file, once),
    }
}
