use std::path::PathBuf;

use clap::Parser;

use feed_capture::config::load_or_default;
use feed_capture::lifecycle;
use feed_capture::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "feed-capture")]
#[command(about = "Capture live feed events into per-category JSON files", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration before logging so the log level can come from it
    let config = load_or_default(cli.config.as_deref())?;

    logging::init(&config.observability);

    tracing::info!("feed-capture v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        api_url = %config.feed.api_url,
        callback_url = %config.feed.callback_url,
        output_directory = %config.output.directory,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    if let Err(e) = lifecycle::run(config).await {
        tracing::error!(error = %e, "Fatal error");
        return Err(e.into());
    }
    Ok(())
}
