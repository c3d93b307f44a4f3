use std::path::PathBuf;

use clap::{Parser, Subcommand};

use feed_capture::config::load_or_default;
use feed_capture::feed::SubscriptionClient;
use feed_capture::lifecycle::configured_subscription;
use feed_capture::observability::logging;

#[derive(Parser)]
#[command(name = "capture-cli")]
#[command(about = "Manage the live feed subscription by hand", long_about = None)]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the feed API base URL
    #[arg(short, long)]
    api: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new subscription for the configured callback URL
    Subscribe,
    /// Update an existing subscription, creating one if the update fails
    Update {
        /// Subscription identifier
        id: String,
    },
    /// Delete a subscription
    Unsubscribe {
        /// Subscription identifier
        id: String,
    },
    /// Print the subscription that would be registered
    Show,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_or_default(cli.config.as_deref())?;
    if let Some(api) = cli.api {
        config.feed.api_url = api;
    }
    logging::init(&config.observability);

    let client = SubscriptionClient::new(&config.feed)?;
    let mut subscription = configured_subscription(&config);

    match cli.command {
        Commands::Subscribe => {
            subscription.id.clear();
            client.create(&mut subscription).await?;
            print_json(&subscription)?;
        }
        Commands::Update { id } => {
            subscription.id = id;
            client.register(&mut subscription).await?;
            print_json(&subscription)?;
        }
        Commands::Unsubscribe { id } => {
            let reply = client.unregister(&id).await?;
            match serde_json::from_str::<serde_json::Value>(&reply) {
                Ok(json) => print_json(&json)?,
                Err(_) => println!("{}", reply),
            }
        }
        Commands::Show => print_json(&subscription)?,
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
