//! User model.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::normalize::{string_or_number, vec_string_or_number};
use super::{Collection, Record};

/// What a user can do in the directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Organizer,
    #[default]
    Attendee,
}

/// A registered account.
///
/// `hackathon_count` and `team_count` are informational; the lists are
/// authoritative and the counters are only touched by the mutator that changes
/// the matching list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub links: BTreeMap<String, String>,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default, deserialize_with = "vec_string_or_number")]
    pub registered_hackathons: Vec<String>,
    #[serde(default, deserialize_with = "vec_string_or_number")]
    pub created_hackathons: Vec<String>,
    #[serde(default)]
    pub hackathon_count: u32,
    #[serde(default)]
    pub team_count: u32,
    #[serde(default)]
    pub created_at: String,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }
}

impl User {
    /// Case-insensitive username comparison.
    pub fn has_username(&self, username: &str) -> bool {
        self.username.eq_ignore_ascii_case(username.trim())
    }

    /// Case-insensitive email comparison.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email.trim())
    }

    pub fn is_organizer(&self) -> bool {
        self.role == UserRole::Organizer
    }

    /// Add a hackathon registration; returns false when already registered.
    pub fn register_hackathon(&mut self, hackathon_id: &str) -> bool {
        if self.registered_hackathons.iter().any(|id| id == hackathon_id) {
            return false;
        }
        self.registered_hackathons.push(hackathon_id.to_string());
        self.hackathon_count = self.hackathon_count.saturating_add(1);
        true
    }
}

/// Sign-up payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: UserRole,
}

/// Profile edit; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub links: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub skills: Option<BTreeSet<String>>,
}
