pub mod handlers;

use crate::presentation::cli::{Cli, Commands};
use clap::Parser;
use parcel_relay::Result;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_FILTER: &str = "parceld=info,parcel_relay=info,parcel_core=info";

/// Installs the fmt subscriber. `RUST_LOG` wins unless logs are disabled.
pub fn init_tracing(disabled: bool) {
    let filter = if disabled {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    };
    // A second init (tests) is harmless.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { config } => handlers::handle_run(config).await,
        Commands::Once { config } => handlers::handle_once(config).await,
        Commands::CheckConfig { config } => handlers::handle_check_config(config),
        Commands::Hash { file } => {
            init_tracing(false);
            handlers::handle_hash(file)
        }
        Commands::Split {
            artifact,
            part_size,
            out,
            encrypted,
        } => {
            init_tracing(false);
            handlers::handle_split(artifact, part_size, out, encrypted)
        }
        Commands::History { config } => handlers::handle_history(config),
    }
}
