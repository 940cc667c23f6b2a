//! Hackathon listing and registration.

use chrono::{DateTime, Utc};

use super::{CollectionApi, Outcome};
use crate::errors::StoreError;
use crate::models::{new_id, parse_timestamp, Hackathon, NewHackathon, OrganizerRef, User};

impl CollectionApi {
    /// Publish a hackathon organized by the logged-in user.
    pub async fn create_hackathon(&self, request: NewHackathon) -> Result<Hackathon, StoreError> {
        let organizer = self.require_current_user().await?;
        if !organizer.is_organizer() {
            return Err(StoreError::Validation(
                "Only organizers can create hackathons".to_string(),
            ));
        }

        let title = request.title.trim().to_string();
        if title.is_empty() {
            return Err(StoreError::Validation("Title is required".to_string()));
        }

        let starts = parse_timestamp(&request.start_date).ok_or_else(|| {
            StoreError::Validation(format!("Invalid start date {:?}", request.start_date))
        })?;
        let ends = parse_timestamp(&request.end_date).ok_or_else(|| {
            StoreError::Validation(format!("Invalid end date {:?}", request.end_date))
        })?;
        if ends < starts {
            return Err(StoreError::Validation(
                "A hackathon cannot end before it starts".to_string(),
            ));
        }

        let hackathon = self
            .append_record(Hackathon {
                id: new_id(),
                title,
                theme: request.theme,
                description: request.description,
                start_date: request.start_date,
                end_date: request.end_date,
                registration_deadline: request.registration_deadline,
                location: request.location,
                tags: request.tags,
                prizes: request.prizes,
                sponsors: request.sponsors,
                organizer: Some(OrganizerRef {
                    id: Some(organizer.id.clone()),
                    username: organizer.username.clone(),
                }),
                participants: 0,
                schedule: request.schedule,
            })
            .await?;

        // Separate write; the hackathon stays published even if this one fails
        let organizer_update = self
            .update_record::<User, _>(&organizer.id, |u| {
                let mut u = u.clone();
                if !u.created_hackathons.contains(&hackathon.id) {
                    u.created_hackathons.push(hackathon.id.clone());
                }
                Ok(u)
            })
            .await;
        match organizer_update {
            Ok(user) => self.refresh_current_user(&user).await,
            Err(e) => tracing::warn!(
                hackathon_id = %hackathon.id,
                "Could not record hackathon on organizer: {}",
                e
            ),
        }

        Ok(hackathon)
    }

    /// Register the logged-in user for a hackathon whose registration is open at `now`.
    ///
    /// Returns `false` when the user was already registered; that is not an error.
    pub async fn register_for_hackathon(
        &self,
        hackathon_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let current = self.require_current_user().await?;

        let hackathon = self
            .find_by_id::<Hackathon>(hackathon_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("Hackathon {} not found", hackathon_id)))?;
        if !hackathon.registration_open(now) {
            return Err(StoreError::Validation(format!(
                "Registration for {} is closed",
                hackathon.title
            )));
        }

        let registered = self
            .mutate::<User, _, _>(|users| {
                let user = users
                    .iter_mut()
                    .find(|u| u.id == current.id)
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("User {} not found", current.username))
                    })?;

                if user.register_hackathon(hackathon_id) {
                    Ok(Outcome::Changed(Some(user.clone())))
                } else {
                    Ok(Outcome::Unchanged(None))
                }
            })
            .await?;

        let Some(user) = registered else {
            tracing::debug!(user = %current.username, hackathon_id, "Already registered");
            return Ok(false);
        };
        self.refresh_current_user(&user).await;

        // Informational counter; the registration itself is already stored
        if let Err(e) = self
            .update_record::<Hackathon, _>(hackathon_id, |h| {
                let mut h = h.clone();
                h.participants = h.participants.saturating_add(1);
                Ok(h)
            })
            .await
        {
            tracing::warn!(hackathon_id, "Participant count update failed: {}", e);
        }

        tracing::info!(user = %user.username, hackathon_id, "Registered for hackathon");
        Ok(true)
    }

    /// Hackathons that have not ended yet, soonest first.
    pub async fn upcoming_hackathons(&self, now: DateTime<Utc>) -> Result<Vec<Hackathon>, StoreError> {
        let mut upcoming = self
            .find_all::<Hackathon, _>(|h| h.ends_at().map_or(true, |ends| ends >= now))
            .await?;
        upcoming.sort_by_key(|h| h.starts_at());
        Ok(upcoming)
    }
}
