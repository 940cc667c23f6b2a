//! Team formation: creation, invite codes, join requests and invitations.
//!
//! Each operation validates and rewrites the team inside one mutator call, so
//! `membersCount == members.len() <= maxMembers` holds in every stored state.
//! The members' informational team counters are updated afterwards, in a
//! separate write.

use rand::Rng;

use super::{CollectionApi, Outcome};
use crate::errors::StoreError;
use crate::models::{
    new_id, now_rfc3339, Hackathon, Invitation, InvitationStatus, JoinRequest, NewTeam,
    ProjectIdea, Team, TeamMember, User, LEADER_ROLE, MEMBER_ROLE,
};

const INVITE_CODE_LEN: usize = 6;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A random code no team in `teams` currently uses.
fn generate_invite_code(teams: &[Team]) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let code: String = (0..INVITE_CODE_LEN)
            .map(|_| INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())] as char)
            .collect();
        if !teams.iter().any(|t| t.invite_code_matches(&code)) {
            return code;
        }
    }
}

/// The team with `team_id`, its member count recomputed from the member list.
fn find_team_mut<'a>(teams: &'a mut [Team], team_id: &str) -> Result<&'a mut Team, StoreError> {
    let team = teams
        .iter_mut()
        .find(|t| t.id == team_id)
        .ok_or_else(|| StoreError::NotFound(format!("Team {} not found", team_id)))?;
    team.sync_members_count();
    Ok(team)
}

impl CollectionApi {
    /// Create a team led by the logged-in user.
    pub async fn create_team(&self, request: NewTeam) -> Result<Team, StoreError> {
        let current = self.require_current_user().await?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(StoreError::Validation("Team name is required".to_string()));
        }
        if request.max_members == 0 {
            return Err(StoreError::Validation(
                "A team needs room for at least one member".to_string(),
            ));
        }

        let hackathon_name = match &request.hackathon_id {
            Some(id) => Some(
                self.find_by_id::<Hackathon>(id)
                    .await?
                    .ok_or_else(|| StoreError::NotFound(format!("Hackathon {} not found", id)))?
                    .title,
            ),
            None => None,
        };

        let team = self
            .mutate::<Team, _, _>(|teams| {
                let mut team = Team {
                    id: new_id(),
                    name: name.clone(),
                    hackathon_id: request.hackathon_id.clone(),
                    hackathon_name: hackathon_name.clone(),
                    description: request.description.clone(),
                    members: vec![TeamMember::new(&current.id, &current.username, LEADER_ROLE)],
                    members_count: 0,
                    max_members: request.max_members,
                    skills: request.skills.clone(),
                    invite_code: generate_invite_code(teams),
                    join_requests: Vec::new(),
                    invitations: Vec::new(),
                    project_idea: None,
                    created_at: now_rfc3339(),
                };
                team.sync_members_count();
                teams.push(team.clone());
                Ok(Outcome::Changed(team))
            })
            .await?;

        self.adjust_team_count(&current.id, 1).await;

        tracing::info!(team = %team.name, leader = %current.username, "Team created");
        Ok(team)
    }

    /// Join whichever team uses `code`.
    pub async fn join_with_invite_code(&self, code: &str) -> Result<Team, StoreError> {
        let current = self.require_current_user().await?;
        let code = code.trim();

        let team = self
            .mutate::<Team, _, _>(|teams| {
                let team = teams
                    .iter_mut()
                    .find(|t| t.invite_code_matches(code))
                    .ok_or_else(|| {
                        StoreError::InvalidInviteCode(format!("No team uses invite code {}", code))
                    })?;

                team.add_member(TeamMember::new(&current.id, &current.username, MEMBER_ROLE))?;
                team.join_requests.retain(|r| r.user_id != current.id);
                for invitation in team.invitations.iter_mut() {
                    if invitation.status == InvitationStatus::Pending
                        && invitation.username.eq_ignore_ascii_case(&current.username)
                    {
                        invitation.status = InvitationStatus::Accepted;
                    }
                }
                Ok(Outcome::Changed(team.clone()))
            })
            .await?;

        self.adjust_team_count(&current.id, 1).await;

        tracing::info!(team = %team.name, user = %current.username, "Joined with invite code");
        Ok(team)
    }

    /// Ask to join a team; asking twice keeps the first request.
    pub async fn request_to_join(&self, team_id: &str) -> Result<Team, StoreError> {
        let current = self.require_current_user().await?;

        let (team, created) = self
            .mutate::<Team, _, _>(|teams| {
                let team = find_team_mut(teams, team_id)?;
                if team.has_member(&current.id) {
                    return Err(StoreError::DuplicateMembership(format!(
                        "You are already a member of {}",
                        team.name
                    )));
                }
                if team.is_full() {
                    return Err(StoreError::CapacityExceeded(format!(
                        "Team {} is full",
                        team.name
                    )));
                }
                if team.join_requests.iter().any(|r| r.user_id == current.id) {
                    return Ok(Outcome::Unchanged((team.clone(), false)));
                }

                team.join_requests.push(JoinRequest {
                    id: new_id(),
                    user_id: current.id.clone(),
                    username: current.username.clone(),
                    request_date: now_rfc3339(),
                });
                Ok(Outcome::Changed((team.clone(), true)))
            })
            .await?;

        if created {
            tracing::info!(team = %team.name, user = %current.username, "Join request sent");
            if let Some(leader) = team.leader() {
                self.email_user(
                    &leader.username,
                    &format!("New join request for {}", team.name),
                    &format!(
                        "{} would like to join {}. Review the request on the team page.",
                        current.username, team.name
                    ),
                )
                .await;
            }
        }
        Ok(team)
    }

    /// Accept a pending join request, adding the requester as a member.
    pub async fn accept_join_request(
        &self,
        team_id: &str,
        request_id: &str,
    ) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        let (team, request) = self
            .mutate::<Team, _, _>(|teams| {
                let team = find_team_mut(teams, team_id)?;
                let index = team
                    .join_requests
                    .iter()
                    .position(|r| r.id == request_id)
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("Join request {} not found", request_id))
                    })?;

                let request = team.join_requests[index].clone();
                team.add_member(TeamMember::new(
                    &request.user_id,
                    &request.username,
                    MEMBER_ROLE,
                ))?;
                team.join_requests.remove(index);
                Ok(Outcome::Changed((team.clone(), request)))
            })
            .await?;

        self.adjust_team_count(&request.user_id, 1).await;

        tracing::info!(team = %team.name, user = %request.username, "Join request accepted");
        self.email_user(
            &request.username,
            &format!("Welcome to {}", team.name),
            &format!("Your request to join {} was accepted.", team.name),
        )
        .await;
        Ok(team)
    }

    pub async fn decline_join_request(
        &self,
        team_id: &str,
        request_id: &str,
    ) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        self.mutate::<Team, _, _>(|teams| {
            let team = find_team_mut(teams, team_id)?;
            let before = team.join_requests.len();
            team.join_requests.retain(|r| r.id != request_id);
            if team.join_requests.len() == before {
                return Err(StoreError::NotFound(format!(
                    "Join request {} not found",
                    request_id
                )));
            }
            Ok(Outcome::Changed(team.clone()))
        })
        .await
    }

    /// Invite a registered user by username; a repeated invite is a no-op.
    pub async fn invite_user(&self, team_id: &str, username: &str) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        let invitee = self
            .find_all::<User, _>(|u| u.has_username(username))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("User {} not found", username.trim())))?;

        let (team, created) = self
            .mutate::<Team, _, _>(|teams| {
                let team = find_team_mut(teams, team_id)?;
                if team.has_member(&invitee.id)
                    || team
                        .members
                        .iter()
                        .any(|m| m.username.eq_ignore_ascii_case(&invitee.username))
                {
                    return Err(StoreError::DuplicateMembership(format!(
                        "{} is already a member of {}",
                        invitee.username, team.name
                    )));
                }
                if team.is_full() {
                    return Err(StoreError::CapacityExceeded(format!(
                        "Team {} is full",
                        team.name
                    )));
                }
                if team.pending_invitation_for(&invitee.username).is_some() {
                    return Ok(Outcome::Unchanged((team.clone(), false)));
                }

                team.invitations.push(Invitation {
                    username: invitee.username.clone(),
                    invited_at: now_rfc3339(),
                    status: InvitationStatus::Pending,
                });
                Ok(Outcome::Changed((team.clone(), true)))
            })
            .await?;

        if created {
            tracing::info!(team = %team.name, user = %invitee.username, "Invitation sent");
            self.email_user(
                &invitee.username,
                &format!("You're invited to join {}", team.name),
                &format!(
                    "{} invited you to their team. Accept from your dashboard or use invite code {}.",
                    team.name, team.invite_code
                ),
            )
            .await;
        }
        Ok(team)
    }

    /// Accept or decline the logged-in user's pending invitation to a team.
    pub async fn respond_to_invitation(
        &self,
        team_id: &str,
        accept: bool,
    ) -> Result<Team, StoreError> {
        let current = self.require_current_user().await?;

        let team = self
            .mutate::<Team, _, _>(|teams| {
                let team = find_team_mut(teams, team_id)?;
                let index = team
                    .invitations
                    .iter()
                    .position(|i| {
                        i.status == InvitationStatus::Pending
                            && i.username.eq_ignore_ascii_case(&current.username)
                    })
                    .ok_or_else(|| {
                        StoreError::NotFound(format!("No pending invitation to {}", team.name))
                    })?;

                if accept {
                    team.add_member(TeamMember::new(
                        &current.id,
                        &current.username,
                        MEMBER_ROLE,
                    ))?;
                    team.join_requests.retain(|r| r.user_id != current.id);
                    team.invitations[index].status = InvitationStatus::Accepted;
                } else {
                    team.invitations[index].status = InvitationStatus::Declined;
                }
                Ok(Outcome::Changed(team.clone()))
            })
            .await?;

        if accept {
            self.adjust_team_count(&current.id, 1).await;
        }

        tracing::info!(team = %team.name, user = %current.username, accept, "Invitation answered");
        Ok(team)
    }

    /// Leave a team. A departing leader hands leadership to the longest-standing member.
    pub async fn leave_team(&self, team_id: &str) -> Result<Team, StoreError> {
        let current = self.require_current_user().await?;
        let team = self.take_member_out(team_id, &current.id).await?;

        tracing::info!(team = %team.name, user = %current.username, "Left team");
        Ok(team)
    }

    /// Remove someone else from a team.
    pub async fn remove_member(&self, team_id: &str, member_id: &str) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        let team = self.take_member_out(team_id, member_id).await?;

        tracing::info!(team = %team.name, member_id, "Member removed");
        Ok(team)
    }

    async fn take_member_out(&self, team_id: &str, member_id: &str) -> Result<Team, StoreError> {
        let team = self
            .mutate::<Team, _, _>(|teams| {
                let team = find_team_mut(teams, team_id)?;
                let was_leader = team
                    .members
                    .iter()
                    .find(|m| m.id == member_id)
                    .map(|m| m.is_leader())
                    .ok_or_else(|| {
                        StoreError::NotFound(format!(
                            "{} is not a member of {}",
                            member_id, team.name
                        ))
                    })?;

                team.remove_member(member_id);
                if was_leader && team.leader().is_none() {
                    if let Some(successor) = team.members.first_mut() {
                        successor.role = LEADER_ROLE.to_string();
                    }
                }
                Ok(Outcome::Changed(team.clone()))
            })
            .await?;

        self.adjust_team_count(member_id, -1).await;
        Ok(team)
    }

    /// Replace the team's invite code; the old code stops working.
    pub async fn regenerate_invite_code(&self, team_id: &str) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        self.mutate::<Team, _, _>(|teams| {
            let code = generate_invite_code(teams);
            let team = find_team_mut(teams, team_id)?;
            team.invite_code = code;
            Ok(Outcome::Changed(team.clone()))
        })
        .await
    }

    pub async fn update_project_idea(
        &self,
        team_id: &str,
        idea: ProjectIdea,
    ) -> Result<Team, StoreError> {
        self.require_current_user().await?;
        if idea.title.trim().is_empty() {
            return Err(StoreError::Validation(
                "Project title is required".to_string(),
            ));
        }
        if idea.progress > 100 {
            return Err(StoreError::Validation(format!(
                "Progress must be between 0 and 100, got {}",
                idea.progress
            )));
        }

        self.update_record::<Team, _>(team_id, |t| {
            let mut t = t.clone();
            t.project_idea = Some(idea.clone());
            t.sync_members_count();
            Ok(t)
        })
        .await
    }

    pub async fn teams_for_hackathon(&self, hackathon_id: &str) -> Result<Vec<Team>, StoreError> {
        self.find_all::<Team, _>(|t| t.hackathon_id.as_deref() == Some(hackathon_id))
            .await
    }

    pub async fn teams_for_user(&self, user_id: &str) -> Result<Vec<Team>, StoreError> {
        self.find_all::<Team, _>(|t| t.has_member(user_id)).await
    }
}
