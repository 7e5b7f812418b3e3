//! Wordgate server binary.
//!
//! Bootstrap only: logging, configuration, wiring. The core accepts
//! everything it needs at construction and never reaches for globals.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordgate::config::{self, Config};
use wordgate::guard::RateGuard;
use wordgate::quotes::StaticQuotes;
use wordgate::{Server, Shutdown};

#[derive(Parser)]
#[command(name = "wordgate")]
#[command(about = "Proof-of-work guarded quote service", long_about = None)]
struct Cli {
    /// Path to a TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wordgate=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let cfg = match cli.config {
        Some(path) => {
            tracing::info!(path = %path.display(), "reading config");
            config::load_config(&path)?
        }
        None => Config::default(),
    };

    tracing::info!(
        bind_address = %cfg.net.bind_address(),
        timeout_ms = cfg.net.timeout_ms,
        max_difficulty = cfg.pow.max_difficulty,
        rate_difficulty_factor = cfg.pow.rate_difficulty_factor,
        guard_window_secs = cfg.pow.guard_window_secs,
        "configuration loaded"
    );

    let shutdown = Shutdown::new();

    let guard = Arc::new(RateGuard::new(cfg.pow.guard_window()));
    tokio::spawn(Arc::clone(&guard).run(shutdown.subscribe()));

    let listener = TcpListener::bind(cfg.net.bind_address()).await?;
    let server = Server::new(&cfg, guard, Arc::new(StaticQuotes::default()));

    let run = server.run(listener, &shutdown);
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
            shutdown.trigger();
            run.await?;
        }
    }

    tracing::info!("shutdown complete");
    Ok(())
}
