//! Cross-process change detection.
//!
//! Tabs in other processes share the store file but not the bus. The watcher
//! polls the store revision and raises a local signal whenever it moved past
//! the last revision this tab wrote or observed.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::ChangeNotifier;
use crate::errors::StoreError;
use crate::store::Store;

/// Background task turning store revision changes into change signals.
pub struct RevisionWatcher {
    task: JoinHandle<()>,
}

impl RevisionWatcher {
    pub async fn start(
        store: Store,
        notifier: ChangeNotifier,
        interval: Duration,
    ) -> Result<Self, StoreError> {
        notifier.observe_revision(store.revision().await?).await;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;

                let revision = match store.revision().await {
                    Ok(revision) => revision,
                    Err(e) => {
                        tracing::warn!("Revision poll failed: {}", e);
                        continue;
                    }
                };
                if !notifier.observe_revision(revision).await {
                    continue;
                }

                tracing::debug!(revision, "Store revision moved");
                notifier.notify_local();
            }
        });

        Ok(Self { task })
    }

    pub fn stop(self) {}
}

impl Drop for RevisionWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
