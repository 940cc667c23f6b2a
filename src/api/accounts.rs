//! Sign-up, login and profile operations.

use super::{CollectionApi, Outcome};
use crate::errors::StoreError;
use crate::models::{new_id, now_rfc3339, NewUser, ProfileUpdate, User};

impl CollectionApi {
    /// Register a new account.
    ///
    /// Username and email must be unused, compared case-insensitively. The new
    /// account is not logged in.
    pub async fn sign_up(&self, request: NewUser) -> Result<User, StoreError> {
        let username = request.username.trim().to_string();
        let email = request.email.trim().to_string();

        if username.is_empty() {
            return Err(StoreError::Validation("Username is required".to_string()));
        }
        if !email.contains('@') {
            return Err(StoreError::Validation(format!(
                "{:?} is not a valid email address",
                email
            )));
        }

        let user = User {
            id: new_id(),
            username,
            email,
            role: request.role,
            is_logged_in: false,
            bio: None,
            links: Default::default(),
            skills: Default::default(),
            registered_hackathons: Vec::new(),
            created_hackathons: Vec::new(),
            hackathon_count: 0,
            team_count: 0,
            created_at: now_rfc3339(),
        };

        let created = self
            .mutate::<User, _, _>(|users| {
                if users.iter().any(|u| u.has_username(&user.username)) {
                    return Err(StoreError::UniquenessViolation(format!(
                        "Username {} is already taken",
                        user.username
                    )));
                }
                if users.iter().any(|u| u.has_email(&user.email)) {
                    return Err(StoreError::UniquenessViolation(format!(
                        "Email {} is already registered",
                        user.email
                    )));
                }
                users.push(user.clone());
                Ok(Outcome::Changed(user.clone()))
            })
            .await?;

        tracing::info!(user = %created.username, "Account created");
        Ok(created)
    }

    /// Log in by username or email.
    pub async fn log_in(&self, identifier: &str) -> Result<User, StoreError> {
        let identifier = identifier.trim();
        let account = self
            .find_all::<User, _>(|u| u.has_username(identifier) || u.has_email(identifier))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("No account for {}", identifier)))?;

        let user = self
            .update_record::<User, _>(&account.id, |u| {
                let mut u = u.clone();
                u.is_logged_in = true;
                Ok(u)
            })
            .await?;

        self.notifier()
            .commit(self.store(), self.store().set_current_user(&user))
            .await?;

        tracing::info!(user = %user.username, "Logged in");
        Ok(user)
    }

    /// Log the current user out. Logging out with nobody logged in is a no-op.
    pub async fn log_out(&self) -> Result<(), StoreError> {
        let Some(current) = self.store().current_user().await? else {
            return Ok(());
        };

        // The account may have been removed by hand; logging out must still work
        match self
            .update_record::<User, _>(&current.id, |u| {
                let mut u = u.clone();
                u.is_logged_in = false;
                Ok(u)
            })
            .await
        {
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        self.notifier()
            .commit(self.store(), self.store().clear_current_user())
            .await?;

        tracing::info!(user = %current.username, "Logged out");
        Ok(())
    }

    pub async fn current_user(&self) -> Result<Option<User>, StoreError> {
        self.store().current_user().await
    }

    /// Edit the logged-in user's bio, links or skills.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<User, StoreError> {
        let current = self.require_current_user().await?;

        let user = self
            .update_record::<User, _>(&current.id, |u| {
                let mut u = u.clone();
                if let Some(bio) = &update.bio {
                    u.bio = Some(bio.clone()).filter(|b| !b.trim().is_empty());
                }
                if let Some(links) = &update.links {
                    u.links = links.clone();
                }
                if let Some(skills) = &update.skills {
                    u.skills = skills
                        .iter()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect();
                }
                Ok(u)
            })
            .await?;

        self.refresh_current_user(&user).await;
        Ok(user)
    }

    /// Add `delta` to a user's informational team counter.
    ///
    /// The team write this follows has already committed, so failures are
    /// logged and the counter is left to drift.
    pub(super) async fn adjust_team_count(&self, user_id: &str, delta: i32) {
        let result = self
            .update_record::<User, _>(user_id, |u| {
                let mut u = u.clone();
                u.team_count = u.team_count.saturating_add_signed(delta);
                Ok(u)
            })
            .await;

        match result {
            Ok(user) => self.refresh_current_user(&user).await,
            // Seeded teams may list members without an account
            Err(StoreError::NotFound(_)) => {
                tracing::debug!(user_id, "No account to update team count for");
            }
            Err(e) => tracing::warn!(user_id, delta, "Team count update failed: {}", e),
        }
    }
}
