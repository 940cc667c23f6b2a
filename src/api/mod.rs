//! Collection API: the only sanctioned path for modifying a collection.
//!
//! Every mutator reads the whole collection with its version, applies the
//! change in memory, writes the collection back only if nobody else wrote it in
//! between, and then notifies. A lost race re-runs the whole sequence against
//! fresh data. A failing change writes nothing.

mod accounts;
mod hackathons;
mod ideas;
mod teams;

use std::sync::Arc;

use crate::errors::StoreError;
use crate::mail::EmailDispatcher;
use crate::models::{Collection, Record, User};
use crate::notify::ChangeNotifier;
use crate::store::{Store, Versioned};

/// Default compare-and-swap attempts per mutator call.
pub const DEFAULT_MAX_WRITE_RETRIES: u32 = 5;

/// Result of an in-memory change applied by a mutator.
pub enum Outcome<R> {
    /// The collection changed and must be written back.
    Changed(R),
    /// Nothing to write; no notification either.
    Unchanged(R),
}

/// Record mutators and queries over an injected [`Store`].
#[derive(Clone)]
pub struct CollectionApi {
    store: Store,
    notifier: ChangeNotifier,
    mailer: Arc<dyn EmailDispatcher>,
    max_write_retries: u32,
}

impl CollectionApi {
    pub fn new(store: Store, notifier: ChangeNotifier, mailer: Arc<dyn EmailDispatcher>) -> Self {
        Self {
            store,
            notifier,
            mailer,
            max_write_retries: DEFAULT_MAX_WRITE_RETRIES,
        }
    }

    pub fn with_max_write_retries(mut self, max_write_retries: u32) -> Self {
        self.max_write_retries = max_write_retries.max(1);
        self
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    /// Read-modify-write one collection as a single logical step.
    pub async fn mutate<T, R, F>(&self, mut change: F) -> Result<R, StoreError>
    where
        T: Record,
        R: Send,
        F: FnMut(&mut Vec<T>) -> Result<Outcome<R>, StoreError> + Send,
    {
        let collection = T::COLLECTION;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let Versioned {
                value: mut records,
                version,
            } = self.store.read_versioned::<T>(collection).await?;

            let outcome = match change(&mut records)? {
                Outcome::Unchanged(result) => return Ok(result),
                Outcome::Changed(result) => result,
            };

            let written = self
                .notifier
                .commit(
                    &self.store,
                    self.store.write_if_version(collection, version, &records),
                )
                .await;
            match written {
                Ok(new_version) => {
                    tracing::debug!(%collection, version = new_version, attempt, "Collection written");
                    return Ok(outcome);
                }
                Err(StoreError::Conflict { .. }) if attempt < self.max_write_retries => {
                    tracing::debug!(%collection, attempt, "Concurrent write detected, retrying");
                }
                Err(e) => {
                    tracing::warn!(%collection, attempt, "Write failed: {}", e);
                    return Err(e);
                }
            }
        }
    }

    /// Append a record and return it as stored.
    pub async fn append_record<T: Record>(&self, record: T) -> Result<T, StoreError> {
        let stored = self
            .mutate::<T, _, _>(|records| {
                records.push(record.clone());
                Ok(Outcome::Changed(record.clone()))
            })
            .await?;

        let collection = T::COLLECTION;
        tracing::info!(%collection, id = stored.id(), "Record appended");
        Ok(stored)
    }

    /// Replace the record with `id` by `patch(record)`, keeping every other record in place.
    pub async fn update_record<T, F>(&self, id: &str, patch: F) -> Result<T, StoreError>
    where
        T: Record,
        F: Fn(&T) -> Result<T, StoreError> + Send + Sync,
    {
        let updated = self
            .mutate::<T, _, _>(|records| {
                let index = records
                    .iter()
                    .position(|r| r.id() == id)
                    .ok_or_else(|| not_found::<T>(id))?;

                let replacement = patch(&records[index])?;
                if replacement.id() != id {
                    return Err(StoreError::Validation(format!(
                        "Patch changed record id from {} to {}",
                        id,
                        replacement.id()
                    )));
                }
                records[index] = replacement.clone();
                Ok(Outcome::Changed(replacement))
            })
            .await?;

        let collection = T::COLLECTION;
        tracing::info!(%collection, id, "Record updated");
        Ok(updated)
    }

    /// Remove the record with `id`; removing an absent id is not an error.
    pub async fn remove_record<T: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .mutate::<T, _, _>(|records| {
                let before = records.len();
                records.retain(|r| r.id() != id);
                if records.len() == before {
                    Ok(Outcome::Unchanged(false))
                } else {
                    Ok(Outcome::Changed(true))
                }
            })
            .await?;

        let collection = T::COLLECTION;
        tracing::info!(%collection, id, removed, "Record removal");
        Ok(removed)
    }

    pub async fn find_by_id<T: Record>(&self, id: &str) -> Result<Option<T>, StoreError> {
        let records: Vec<T> = self.list().await?;
        Ok(records.into_iter().find(|r| r.id() == id))
    }

    pub async fn find_all<T, P>(&self, predicate: P) -> Result<Vec<T>, StoreError>
    where
        T: Record,
        P: Fn(&T) -> bool + Send,
    {
        let records: Vec<T> = self.list().await?;
        Ok(records.into_iter().filter(|r| predicate(r)).collect())
    }

    /// Every record of the collection, in stored order.
    pub async fn list<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        Ok(self.store.read(T::COLLECTION).await?.unwrap_or_default())
    }

    /// The logged-in user, or `NotAuthenticated`.
    pub async fn require_current_user(&self) -> Result<User, StoreError> {
        self.store.current_user().await?.ok_or_else(|| {
            StoreError::NotAuthenticated("You need to be logged in to do that".to_string())
        })
    }

    /// Mirror an updated user into the current-user document when it is the same account.
    ///
    /// Runs after the user record is committed, so failures are logged, never returned.
    async fn refresh_current_user(&self, user: &User) {
        let result = match self.store.current_user().await {
            Ok(Some(current)) if current.id == user.id => {
                self.notifier
                    .commit(&self.store, self.store.set_current_user(user))
                    .await
            }
            Ok(_) => Ok(()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(user = %user.username, "Could not refresh current user: {}", e);
        }
    }

    /// Best-effort email to a registered user; failures are logged, never returned.
    async fn email_user(&self, username: &str, subject: &str, body: &str) {
        let recipient = match self
            .find_all::<User, _>(|u| u.has_username(username))
            .await
        {
            Ok(users) => users.into_iter().next(),
            Err(e) => {
                tracing::warn!("Could not look up {} for email: {}", username, e);
                return;
            }
        };

        let Some(recipient) = recipient else {
            tracing::debug!("No account for {}, skipping email", username);
            return;
        };

        if let Err(e) = self.mailer.send(&recipient.email, subject, body).await {
            tracing::warn!("Email to {} failed: {}", recipient.email, e);
        }
    }
}

fn not_found<T: Record>(id: &str) -> StoreError {
    StoreError::NotFound(format!("{} has no record {}", collection_label(T::COLLECTION), id))
}

fn collection_label(collection: Collection) -> &'static str {
    match collection {
        Collection::Hackathons => "Hackathons",
        Collection::Teams => "Teams",
        Collection::Users => "Users",
        Collection::SharedIdeas => "Shared ideas",
    }
}
