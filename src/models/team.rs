//! Team model and its membership invariants.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use super::normalize::{option_string_or_number, string_or_number};
use super::{Collection, Record};
use crate::errors::StoreError;

/// Capacity used when a stored team carries no `maxMembers`.
pub const DEFAULT_MAX_MEMBERS: u32 = 4;

/// Role given to the creator of a team.
pub const LEADER_ROLE: &str = "leader";

/// Role given to everyone else on joining.
pub const MEMBER_ROLE: &str = "member";

/// A member entry inside a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "name")]
    pub username: String,
    #[serde(default)]
    pub role: String,
}

impl TeamMember {
    pub fn new(id: &str, username: &str, role: &str) -> Self {
        Self {
            id: id.to_string(),
            username: username.to_string(),
            role: role.to_string(),
        }
    }

    /// Producers disagree on the leadership literal, so both known spellings count.
    pub fn is_leader(&self) -> bool {
        let role = self.role.trim();
        role.eq_ignore_ascii_case(LEADER_ROLE) || role.eq_ignore_ascii_case("team lead")
    }
}

/// A pending request from a user to join a team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRequest {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(deserialize_with = "string_or_number")]
    pub user_id: String,
    pub username: String,
    #[serde(default)]
    pub request_date: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
}

/// A team-initiated offer of membership.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invitation {
    pub username: String,
    #[serde(default)]
    pub invited_at: String,
    #[serde(default)]
    pub status: InvitationStatus,
}

/// The project a team is working on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectIdea {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tech_stack: Vec<String>,
    #[serde(default)]
    pub progress: u8,
}

/// A team formed around a hackathon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default, deserialize_with = "option_string_or_number")]
    pub hackathon_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hackathon_name: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub members: Vec<TeamMember>,
    #[serde(default)]
    pub members_count: u32,
    #[serde(default = "default_max_members")]
    pub max_members: u32,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub invite_code: String,
    #[serde(default)]
    pub join_requests: Vec<JoinRequest>,
    #[serde(default)]
    pub invitations: Vec<Invitation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_idea: Option<ProjectIdea>,
    #[serde(default)]
    pub created_at: String,
}

fn default_max_members() -> u32 {
    DEFAULT_MAX_MEMBERS
}

impl Record for Team {
    const COLLECTION: Collection = Collection::Teams;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Team {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.id == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.members.len() as u32 >= self.max_members
    }

    pub fn leader(&self) -> Option<&TeamMember> {
        self.members.iter().find(|m| m.is_leader())
    }

    /// Recompute the cached count from the member list.
    pub fn sync_members_count(&mut self) {
        self.members_count = self.members.len() as u32;
    }

    /// Append a member, enforcing duplicate and capacity rules.
    pub fn add_member(&mut self, member: TeamMember) -> Result<(), StoreError> {
        if self.has_member(&member.id) {
            return Err(StoreError::DuplicateMembership(format!(
                "{} is already a member of {}",
                member.username, self.name
            )));
        }
        if self.is_full() {
            return Err(StoreError::CapacityExceeded(format!(
                "Team {} is full ({}/{})",
                self.name,
                self.members.len(),
                self.max_members
            )));
        }
        self.members.push(member);
        self.sync_members_count();
        Ok(())
    }

    /// Drop a member; returns whether anyone was removed.
    pub fn remove_member(&mut self, user_id: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != user_id);
        self.sync_members_count();
        self.members.len() != before
    }

    /// Case-insensitive, constant-time invite code check.
    pub fn invite_code_matches(&self, code: &str) -> bool {
        let stored = self.invite_code.trim().to_ascii_uppercase();
        let provided = code.trim().to_ascii_uppercase();
        !stored.is_empty() && bool::from(stored.as_bytes().ct_eq(provided.as_bytes()))
    }

    pub fn pending_invitation_for(&self, username: &str) -> Option<&Invitation> {
        self.invitations.iter().find(|i| {
            i.status == InvitationStatus::Pending && i.username.eq_ignore_ascii_case(username)
        })
    }
}

/// Payload for creating a team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTeam {
    pub name: String,
    #[serde(default)]
    pub hackathon_id: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_max_members")]
    pub max_members: u32,
    #[serde(default)]
    pub skills: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn team(max_members: u32) -> Team {
        serde_json::from_value(json!({
            "id": "t1",
            "name": "Rustaceans",
            "members": [{ "id": "u1", "name": "alice", "role": "Team Lead" }],
            "membersCount": 1,
            "maxMembers": max_members,
            "inviteCode": "ABC123"
        }))
        .unwrap()
    }

    #[test]
    fn test_legacy_member_name_and_leader_role() {
        let team = team(4);
        assert_eq!(team.members[0].username, "alice");
        assert_eq!(team.leader().map(|m| m.id.as_str()), Some("u1"));
    }

    #[test]
    fn test_add_member_keeps_count_in_sync() {
        let mut team = team(2);
        team.add_member(TeamMember::new("u2", "bob", MEMBER_ROLE))
            .unwrap();
        assert_eq!(team.members_count, 2);

        let err = team
            .add_member(TeamMember::new("u3", "carol", MEMBER_ROLE))
            .unwrap_err();
        assert!(matches!(err, StoreError::CapacityExceeded(_)));
        assert_eq!(team.members.len(), 2);
        assert_eq!(team.members_count, 2);
    }

    #[test]
    fn test_duplicate_member_rejected() {
        let mut team = team(4);
        let err = team
            .add_member(TeamMember::new("u1", "alice", MEMBER_ROLE))
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateMembership(_)));
    }

    #[test]
    fn test_invite_code_matching() {
        let team = team(4);
        assert!(team.invite_code_matches("abc123"));
        assert!(team.invite_code_matches(" ABC123 "));
        assert!(!team.invite_code_matches("WRONG1"));
        assert!(!team.invite_code_matches(""));
    }
}
