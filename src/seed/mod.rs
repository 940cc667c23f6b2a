//! First-run sample content.
//!
//! Each collection is seeded at most once per process, and only when it has
//! never been written, unless a forced reseed was configured. The per-process
//! claim lives on the shared [`Store`] handle, so every tab opened on it
//! respects it. The write is conditional on the collection still being absent,
//! so two processes starting together cannot both seed it.

mod data;

pub use data::{sample_hackathons, sample_ideas, sample_teams, sample_users};

use serde::Serialize;

use crate::errors::StoreError;
use crate::models::Collection;
use crate::store::Store;

/// Which collections a [`SeedInitializer::seed_all`] call wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub seeded: Vec<Collection>,
}

pub struct SeedInitializer {
    store: Store,
    force_reseed: bool,
}

impl SeedInitializer {
    pub fn new(store: Store, force_reseed: bool) -> Self {
        Self {
            store,
            force_reseed,
        }
    }

    /// Write `seed` into `collection` if it is absent (or reseeding is forced).
    ///
    /// Returns whether this call wrote anything.
    pub async fn ensure_seeded<T: Serialize>(
        &self,
        collection: Collection,
        seed: &[T],
    ) -> Result<bool, StoreError> {
        if !self.store.claim_seed(collection) {
            return Ok(false);
        }

        let result = if self.force_reseed {
            self.store.write(collection, seed).await.map(|_| true)
        } else {
            match self.store.write_if_version(collection, 0, seed).await {
                Ok(_) => Ok(true),
                Err(StoreError::Conflict { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        };
        let written = result.inspect_err(|_| self.store.release_seed(collection))?;

        if written {
            tracing::info!(%collection, records = seed.len(), forced = self.force_reseed, "Seeded collection");
        } else {
            tracing::debug!(%collection, "Collection already present, not seeding");
        }
        Ok(written)
    }

    /// Seed every collection with the built-in sample content.
    pub async fn seed_all(&self) -> Result<SeedReport, StoreError> {
        let mut report = SeedReport::default();

        if self
            .ensure_seeded(Collection::Hackathons, &sample_hackathons()?)
            .await?
        {
            report.seeded.push(Collection::Hackathons);
        }
        if self.ensure_seeded(Collection::Teams, &sample_teams()?).await? {
            report.seeded.push(Collection::Teams);
        }
        if self.ensure_seeded(Collection::Users, &sample_users()?).await? {
            report.seeded.push(Collection::Users);
        }
        if self
            .ensure_seeded(Collection::SharedIdeas, &sample_ideas()?)
            .await?
        {
            report.seeded.push(Collection::SharedIdeas);
        }

        Ok(report)
    }
}
