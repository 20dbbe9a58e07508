use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use newsimpact::config::StorageConfig;
use newsimpact::indexing::hashtags::DEFAULT_SUGGESTION_LIMIT;
use newsimpact::reports::repository::ReportStore;
use newsimpact::storage::client::{S3StorageClient, StorageClient};

/// Maintenance tool for the news impact report bucket.
#[derive(Debug, Parser)]
#[command(name = "newsimpact", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List report summaries, newest first.
    List,
    /// Show reports that already contain the given news URL.
    Duplicates { url: String },
    /// Rebuild the news URL index from all reports.
    ReindexUrls,
    /// Rebuild the hashtag index from all reports (drops unused tags).
    RebuildHashtags,
    /// Suggest known hashtags starting with a prefix.
    Hashtags {
        #[arg(default_value = "")]
        prefix: String,
        #[arg(long, default_value_t = DEFAULT_SUGGESTION_LIMIT)]
        limit: usize,
    },
    /// Print impact statistics of a report.
    Stats { report_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "newsimpact=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let cfg = StorageConfig::from_env().context("Failed to load storage configuration")?;
    let storage: Arc<dyn StorageClient> = Arc::new(
        S3StorageClient::from_config(&cfg)
            .await
            .context("Failed to initialize S3 client")?,
    );
    let store = ReportStore::new(storage);

    match cli.command {
        Command::List => {
            let reports = store.list_reports().await?;
            print_json(&reports)?;
        }
        Command::Duplicates { url } => {
            let entries = store.find_url_duplicates(&url).await;
            print_json(&entries)?;
        }
        Command::ReindexUrls => {
            let entries = store.url_index().rebuild().await?;
            tracing::info!("Indexed {} news URLs", entries.len());
        }
        Command::RebuildHashtags => {
            let tags = store.rebuild_hashtag_index().await?;
            print_json(&tags)?;
        }
        Command::Hashtags { prefix, limit } => {
            let tags = store.hashtag_index().suggestions(&prefix, limit).await;
            print_json(&tags)?;
        }
        Command::Stats { report_id } => {
            let report = store
                .get_report(&report_id)
                .await?
                .with_context(|| format!("Report '{}' not found", report_id))?;
            print_json(&report.statistics())?;
        }
    }

    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
