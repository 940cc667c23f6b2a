//! Data models for the HackMap directory.
//!
//! These models match the JSON documents the web client keeps in local storage.

mod hackathon;
mod idea;
mod normalize;
mod snapshot;
mod team;
mod user;

pub use hackathon::*;
pub use idea::*;
pub use normalize::{OrganizerRef, Prize};
pub use snapshot::*;
pub use team::*;
pub use user::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Storage key of the single logged-in user document.
pub const CURRENT_USER_KEY: &str = "hackmap-user";

/// A named, whole-document set of records persisted under one store key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Hackathons,
    Teams,
    Users,
    SharedIdeas,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Hackathons,
        Collection::Teams,
        Collection::Users,
        Collection::SharedIdeas,
    ];

    /// Key the collection is stored under.
    pub fn key(&self) -> &'static str {
        match self {
            Collection::Hackathons => "hackmap-hackathons",
            Collection::Teams => "hackmap-teams",
            Collection::Users => "hackmap-all-users",
            Collection::SharedIdeas => "hackmap-shared-ideas",
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// One entity instance stored inside a [`Collection`].
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

/// Generate a fresh record identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time in the RFC 3339 form every record uses.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
