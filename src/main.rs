//! HackMap store daemon
//!
//! Opens the shared SQLite store as one tab, seeds it on first run and logs
//! every change it observes until interrupted.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use hackmap_store::notify::ChangeBus;
use hackmap_store::search::DirectoryIndex;
use hackmap_store::store::{SqliteStore, Store};
use hackmap_store::{Config, Tab};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting HackMap store");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Index path: {:?}", config.index_path);

    if config.force_reseed {
        tracing::warn!("HACKMAP_FORCE_RESEED is set; sample data will overwrite stored collections");
    }

    // Open the shared store
    let store = Store::new(Arc::new(SqliteStore::open(&config.db_path).await?));

    let bus = ChangeBus::new();
    let tab = Tab::open(store, &bus, &config).await?;

    // Initialize search index
    let index = Arc::new(match &config.index_path {
        Some(path) => DirectoryIndex::open(path)?,
        None => DirectoryIndex::in_memory()?,
    });

    let _watcher = tab.watch_revisions().await?;
    let reconciler = tab.reconciler(Some(Arc::clone(&index))).await?;

    let snapshot = reconciler.snapshot();
    tracing::info!(
        revision = snapshot.revision_id,
        hackathons = snapshot.hackathons.len(),
        teams = snapshot.teams.len(),
        users = snapshot.users.len(),
        ideas = snapshot.ideas.len(),
        "Directory loaded"
    );

    // Optional one-off search from the command line
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if !query.trim().is_empty() {
        for hit in index.search(&query, 10, 0)? {
            tracing::info!(kind = ?hit.kind, id = %hit.record_id, score = hit.score, "Search hit");
        }
    }

    let mut updates = reconciler.subscribe();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                tracing::info!(
                    revision = snapshot.revision_id,
                    hackathons = snapshot.hackathons.len(),
                    teams = snapshot.teams.len(),
                    users = snapshot.users.len(),
                    ideas = snapshot.ideas.len(),
                    current_user = ?snapshot.current_user.as_ref().map(|u| u.username.as_str()),
                    "Directory changed"
                );
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}
