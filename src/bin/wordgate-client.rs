//! Wordgate client binary: fetch quotes, paying the proof-of-work toll.

use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wordgate::client::Client;

#[derive(Parser)]
#[command(name = "wordgate-client")]
#[command(about = "Client for the proof-of-work guarded quote service", long_about = None)]
struct Cli {
    /// Server address.
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    addr: String,

    /// Number of quotes to fetch.
    #[arg(short, long, default_value_t = 1)]
    count: u32,

    /// Per-operation timeout in milliseconds; also the solve budget.
    #[arg(short, long, default_value_t = 5_000)]
    timeout_ms: u64,

    /// Read buffer size in bytes.
    #[arg(long, default_value_t = 1024)]
    buff_size: usize,
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
    let client = Client::new(cli.addr, Duration::from_millis(cli.timeout_ms), cli.buff_size);

    for i in 1..=cli.count {
        let quote = client.fetch_quote().await?;
        tracing::info!(n = i, "quote received");
        println!("{quote}");
    }

    Ok(())
}
