//! This file defines the tweetstats binary entry point.

use tweetstats::app;
use tweetstats::cli;
use tweetstats::error::StatsError;
use tweetstats::import;
use tweetstats::metrics;
use tweetstats::server;
use tweetstats::store::{self, SqliteStore};
use tweetstats::tracing;

use ::tracing::{event, Level};
use std::path::PathBuf;
use std::sync::Arc;

/// Application entry point
#[tokio::main]
async fn main() {
    let args = cli::parse();
    tracing::init_tracing(&args);
    let result = run(&args).await;
    if let Err(error) = &result {
        event!(Level::ERROR, "{}", error);
    }
    tracing::shutdown_tracing();
    if result.is_err() {
        std::process::exit(1);
    }
}

async fn run(args: &cli::CommandLineArgs) -> Result<(), StatsError> {
    metrics::register_metrics()?;
    event!(Level::INFO, db_url = %args.db_url, "Opening corpus");
    let store = SqliteStore::open(&args.db_url)?;

    if let Some(path) = &args.import_csv {
        let path = PathBuf::from(path);
        let importer = store.clone();
        tokio::task::spawn_blocking(move || import::import_csv(&importer, &path)).await??;
    }

    store::spawn_index_provisioning(store.clone());
    let service = app::service(Arc::new(store));
    server::serve(args, service).await
}
