//! One open client of the shared store.

use std::sync::Arc;

use crate::api::CollectionApi;
use crate::config::Config;
use crate::errors::StoreError;
use crate::mail::{EmailDispatcher, SimulatedMailer};
use crate::notify::{ChangeBus, ChangeNotifier, RevisionWatcher};
use crate::reconcile::Reconciler;
use crate::search::DirectoryIndex;
use crate::seed::{SeedInitializer, SeedReport};
use crate::store::Store;

/// A tab: seeded store access, its own notifier and the collection API.
pub struct Tab {
    api: CollectionApi,
    watch_interval: std::time::Duration,
    seed_report: SeedReport,
}

impl Tab {
    /// Open a tab with the simulated mailer.
    pub async fn open(store: Store, bus: &ChangeBus, config: &Config) -> Result<Self, StoreError> {
        let mailer: Arc<dyn EmailDispatcher> = Arc::new(SimulatedMailer::new(config.email_delay));
        Self::open_with_mailer(store, bus, config, mailer).await
    }

    pub async fn open_with_mailer(
        store: Store,
        bus: &ChangeBus,
        config: &Config,
        mailer: Arc<dyn EmailDispatcher>,
    ) -> Result<Self, StoreError> {
        let seed_report = SeedInitializer::new(store.clone(), config.force_reseed)
            .seed_all()
            .await?;

        let notifier = ChangeNotifier::new(bus);
        if !seed_report.seeded.is_empty() {
            notifier.notify();
        }

        tracing::info!(
            tab = notifier.tab_id(),
            backend = store.backend().backend_tag(),
            seeded = ?seed_report.seeded,
            "Tab opened"
        );

        let api = CollectionApi::new(store, notifier, mailer)
            .with_max_write_retries(config.max_write_retries);

        Ok(Self {
            api,
            watch_interval: config.watch_interval,
            seed_report,
        })
    }

    pub fn api(&self) -> &CollectionApi {
        &self.api
    }

    pub fn store(&self) -> &Store {
        self.api.store()
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        self.api.notifier()
    }

    /// Collections this tab seeded when it opened.
    pub fn seed_report(&self) -> &SeedReport {
        &self.seed_report
    }

    /// Pick up writes made by other processes sharing the store file.
    pub async fn watch_revisions(&self) -> Result<RevisionWatcher, StoreError> {
        RevisionWatcher::start(
            self.store().clone(),
            self.notifier().clone(),
            self.watch_interval,
        )
        .await
    }

    pub async fn reconciler(
        &self,
        index: Option<Arc<DirectoryIndex>>,
    ) -> Result<Reconciler, StoreError> {
        Reconciler::start(self.store().clone(), self.notifier(), index).await
    }
}
