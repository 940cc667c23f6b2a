//! Re-read on change.
//!
//! A tab never patches its view from the signal itself; it re-reads every
//! collection and publishes the result as one [`DirectorySnapshot`].

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::errors::StoreError;
use crate::models::{Collection, DirectorySnapshot};
use crate::notify::{ChangeNotifier, Subscription};
use crate::search::DirectoryIndex;
use crate::store::Store;

/// Read the whole directory.
///
/// The revision is read first, so a snapshot is never older than its revision.
pub async fn load_snapshot(store: &Store) -> Result<DirectorySnapshot, StoreError> {
    let revision_id = store.revision().await?;

    Ok(DirectorySnapshot {
        revision_id,
        hackathons: store.read(Collection::Hackathons).await?.unwrap_or_default(),
        teams: store.read(Collection::Teams).await?.unwrap_or_default(),
        users: store.read(Collection::Users).await?.unwrap_or_default(),
        ideas: store.read(Collection::SharedIdeas).await?.unwrap_or_default(),
        current_user: store.current_user().await?,
    })
}

/// Keeps a tab's snapshot (and optional search index) current.
pub struct Reconciler {
    snapshot: watch::Receiver<Arc<DirectorySnapshot>>,
    task: JoinHandle<()>,
    _subscription: Subscription,
}

impl Reconciler {
    /// Load the initial snapshot and start reacting to `notifier`'s signals.
    pub async fn start(
        store: Store,
        notifier: &ChangeNotifier,
        index: Option<Arc<DirectoryIndex>>,
    ) -> Result<Self, StoreError> {
        let initial = load_snapshot(&store).await?;
        if let Some(index) = &index {
            index.rebuild(&initial.hackathons, &initial.ideas).await?;
        }

        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(initial));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();

        let subscription = notifier.subscribe(move || {
            // Closed only after the task is gone
            let _ = signal_tx.send(());
        });

        let task = tokio::spawn(refresh_loop(store, index, signal_rx, snapshot_tx));

        Ok(Self {
            snapshot: snapshot_rx,
            task,
            _subscription: subscription,
        })
    }

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<DirectorySnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    /// A receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<Arc<DirectorySnapshot>> {
        self.snapshot.clone()
    }
}

impl Drop for Reconciler {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn refresh_loop(
    store: Store,
    index: Option<Arc<DirectoryIndex>>,
    mut signals: mpsc::UnboundedReceiver<()>,
    snapshot_tx: watch::Sender<Arc<DirectorySnapshot>>,
) {
    while signals.recv().await.is_some() {
        // Coalesce a burst into one re-read
        while signals.try_recv().is_ok() {}

        let snapshot = match load_snapshot(&store).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("Snapshot refresh failed: {}", e);
                continue;
            }
        };

        if let Some(index) = &index {
            if let Err(e) = index.rebuild(&snapshot.hackathons, &snapshot.ideas).await {
                tracing::warn!("Search index rebuild failed: {}", e);
            }
        }

        tracing::debug!(revision = snapshot.revision_id, "Snapshot refreshed");
        snapshot_tx.send_replace(Arc::new(snapshot));
    }
}
