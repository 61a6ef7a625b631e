use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use newsdesk_core::AppConfig;

mod commands;

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(author, version, about = "Fetch, normalize and follow RSS and Atom feeds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct SourceArgs {
    /// Feed URL (repeatable); defaults to the configured sources
    #[arg(short = 'u', long = "url")]
    urls: Vec<String>,
    /// Read sources from an OPML subscription list
    #[arg(long)]
    opml: Option<PathBuf>,
    /// Print items as JSON instead of digests
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch every source once and print all items
    Fetch {
        #[command(flatten)]
        sources: SourceArgs,
    },
    /// Poll sources until Ctrl-C, printing only new items
    Poll {
        #[command(flatten)]
        sources: SourceArgs,
        /// Seconds between cycles (minimum 1)
        #[arg(short = 'i', long)]
        interval: Option<u64>,
    },
    /// Fetch a publisher's feed for a topic, e.g. `news america politics`
    News {
        publisher: String,
        topic: Vec<String>,
        #[arg(long)]
        json: bool,
    },
    /// List built-in publishers, or one publisher's feeds
    Catalog { publisher: Option<String> },
    /// List configured sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load()?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Commands::Fetch { sources } => {
            commands::fetch::run(&config, &sources.urls, sources.opml.as_ref(), sources.json).await
        }
        Commands::Poll { sources, interval } => {
            commands::poll::run(
                &config,
                &sources.urls,
                sources.opml.as_ref(),
                interval,
                sources.json,
            )
            .await
        }
        Commands::News {
            publisher,
            topic,
            json,
        } => commands::news::run(&config, &publisher, &topic, json).await,
        Commands::Catalog { publisher } => commands::catalog::run(publisher.as_deref()),
        Commands::Sources => commands::sources::run(&config),
    }
}
