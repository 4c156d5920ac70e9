#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, warn, Instrument};

use voxingest_seed::loader::{ingest_all, SeedFiles};
use voxingest_seed::store::{JsonlStore, SeedStore};

#[derive(Debug, Parser)]
#[command(name = "voxingest-seed")]
struct Args {
    /// Topics seed file (category -> topic names map).
    #[arg(long, env = "VOXINGEST_TOPICS_FILE")]
    topics_file: PathBuf,

    #[arg(long, env = "VOXINGEST_TROPHIES_FILE")]
    trophies_file: PathBuf,

    #[arg(long, env = "VOXINGEST_AWARDS_FILE")]
    awards_file: PathBuf,

    #[arg(long, env = "VOXINGEST_USERS_FILE")]
    users_file: PathBuf,

    /// Directory the JSONL store writes into.
    #[arg(long, env = "VOXINGEST_OUT_DIR", default_value = "voxingest-out")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    voxingest_observe::logging::init_tracing();
    let args = Args::parse();

    let span = info_span!(
        "voxingest-seed",
        topics_file = %args.topics_file.display(),
        trophies_file = %args.trophies_file.display(),
        awards_file = %args.awards_file.display(),
        users_file = %args.users_file.display(),
        out_dir = %args.out_dir.display(),
    );

    async move {
        let store: Arc<dyn SeedStore> = Arc::new(JsonlStore::create(&args.out_dir)?);
        let cancel = CancellationToken::new();

        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if signal::ctrl_c().await.is_ok() {
                    warn!("ctrl-c received; cancelling ingestion");
                    cancel.cancel();
                }
            }
        });

        let files = SeedFiles {
            topics: args.topics_file,
            trophies: args.trophies_file,
            awards: args.awards_file,
            users: args.users_file,
        };

        let start = Instant::now();
        info!("starting seed ingestion");
        let summary = ingest_all(store, &files, &cancel).await?;

        info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            topics = summary.topics,
            trophies = summary.trophies,
            awards = summary.awards,
            users = summary.users,
            user_trophies = summary.user_trophies,
            "seed ingestion complete"
        );
        Ok(())
    }
    .instrument(span)
    .await
}
