//! flockcache - persistent HTTP response cache
//!
//! Command-line front end over the store and the conditional fetcher.

use std::io::{self, Write};

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flockcache::cli::{request_headers, Cli, Command};
use flockcache::fetch::{ReqwestClient, ResponseStore};
use flockcache::models::{FetchResponse, ItemResponse, KeyResponse, PruneResponse, StatsResponse};
use flockcache::{spawn_prune_task, ConditionalFetcher, Config, Headers, HttpResponse};

/// Main entry point for the flockcache binary.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber on stderr
/// 2. Parse arguments and layer them over the environment configuration
/// 3. Open the store with the configured lock strategy
/// 4. Run the subcommand, printing its JSON result on stdout
fn main() -> anyhow::Result<()> {
    // Defaults to warnings only, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flockcache=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.apply(Config::from_env());
    info!(
        "Configuration loaded: store={}, default_ttl={}s, lock={}",
        config.store_path.display(),
        config.default_ttl,
        config.lock_strategy
    );

    let store = ResponseStore::from_config(&config);

    match cli.command {
        Command::Fetch { url, headers } => {
            let fetcher = ConditionalFetcher::new(ReqwestClient::new(&config)?);
            let (response, outcome) = fetcher
                .fetch_with_outcome(&store, &url, &request_headers(&headers))
                .with_context(|| format!("failed to fetch {}", url))?;

            let summary = FetchResponse::new(url, &response, outcome);
            eprintln!("{}", serde_json::to_string(&summary)?);

            let mut stdout = io::stdout().lock();
            stdout.write_all(&response.body)?;
            stdout.flush()?;
        }
        Command::Get { key } => match store.get_item(&key)? {
            Some(item) => print_json(&ItemResponse::new(key, &item))?,
            None => bail!("Key not found: {}", key),
        },
        Command::Put { key, body } => {
            let response = HttpResponse::new(200, Headers::new(), body);
            store.create_or_update(&key, response, None, Some(config.default_ttl))?;
            print_json(&KeyResponse::new(key, "stored"))?;
        }
        Command::Expire { key, at } => {
            store.update_expires(&key, at)?;
            print_json(&KeyResponse::new(key, "expired"))?;
        }
        Command::Delete { key } => {
            store.delete(&key)?;
            print_json(&KeyResponse::new(key, "deleted"))?;
        }
        Command::Prune { before, by } => {
            let removed = store.prune(before, by)?;
            print_json(&PruneResponse::new(removed))?;
        }
        Command::Clear => {
            let removed = store.clear()?;
            print_json(&PruneResponse::new(removed))?;
        }
        Command::Stats => {
            let stats = store.stats()?;
            print_json(&StatsResponse::new(
                config.store_path.display().to_string(),
                config.default_ttl,
                stats,
            ))?;
        }
        Command::Maintain { .. } => maintain(store, config.prune_interval)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, value)?;
    writeln!(stdout)?;
    Ok(())
}

/// Runs the periodic prune task until Ctrl+C or SIGTERM.
fn maintain(store: ResponseStore, prune_interval: u64) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let prune_handle = spawn_prune_task(store, prune_interval);
        info!("Background prune task started");
        shutdown_signal(prune_handle).await
    })?;

    info!("Maintenance shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// On shutdown signal, aborts the prune task.
async fn shutdown_signal(prune_handle: tokio::task::JoinHandle<()>) -> io::Result<()> {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<io::Result<()>>();

    let result = tokio::select! {
        result = signal::ctrl_c() => {
            info!("Received Ctrl+C, initiating shutdown...");
            result
        }
        result = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
            result
        }
    };

    prune_handle.abort();
    warn!("Prune task aborted");
    result
}
