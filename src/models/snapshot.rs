//! Snapshot of every collection, as re-read after a change signal.

use super::{Hackathon, Idea, Team, User};

/// The full directory as one tab sees it after its latest re-read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DirectorySnapshot {
    pub revision_id: i64,
    pub hackathons: Vec<Hackathon>,
    pub teams: Vec<Team>,
    pub users: Vec<User>,
    pub ideas: Vec<Idea>,
    pub current_user: Option<User>,
}

impl DirectorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.hackathons.is_empty()
            && self.teams.is_empty()
            && self.users.is_empty()
            && self.ideas.is_empty()
    }
}
