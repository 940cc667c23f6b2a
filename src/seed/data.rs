//! Built-in sample records.
//!
//! Some entries use the older prize and organizer shapes on purpose; they are
//! normalized on the way in like any other stored document.

use serde_json::json;

use crate::errors::StoreError;
use crate::models::{Hackathon, Idea, Team, User};

pub fn sample_hackathons() -> Result<Vec<Hackathon>, StoreError> {
    Ok(serde_json::from_value(json!([
        {
            "id": "hack-ai-2026",
            "title": "AI Innovation Challenge",
            "theme": "Artificial Intelligence",
            "description": "Build practical AI tools that help people learn, work or stay healthy.",
            "startDate": "2026-11-14T09:00:00Z",
            "endDate": "2026-11-16T18:00:00Z",
            "registrationDeadline": "2026-11-07T23:59:59Z",
            "location": "San Francisco, CA",
            "tags": ["AI", "Machine Learning", "Python"],
            "prizes": [
                { "place": "1st", "reward": "$10,000" },
                { "place": "2nd", "reward": "$5,000" },
                { "place": "3rd", "reward": "$2,500" }
            ],
            "sponsors": ["OpenCompute", "DataWorks"],
            "organizer": { "id": "user-organizer", "username": "techorganizer" },
            "participants": 128,
            "schedule": [
                {
                    "date": "2026-11-14",
                    "events": [
                        { "time": "09:00", "title": "Check-in" },
                        { "time": "10:00", "title": "Opening keynote" },
                        { "time": "11:00", "title": "Hacking begins" }
                    ]
                },
                {
                    "date": "2026-11-16",
                    "events": [
                        { "time": "14:00", "title": "Demos" },
                        { "time": "17:00", "title": "Awards" }
                    ]
                }
            ]
        },
        {
            "id": "hack-green-2026",
            "title": "Green Tech Hackathon",
            "theme": "Sustainability",
            "description": "Software for cleaner energy, smarter recycling and lower emissions.",
            "startDate": "2026-12-05",
            "endDate": "2026-12-06",
            "location": "Berlin, Germany",
            "tags": ["Climate", "IoT", "Data"],
            "prizes": ["$3,000 grand prize", "Mentorship program"],
            "sponsors": ["EcoFund"],
            "organizer": "greenfuture",
            "participants": 64
        },
        {
            "id": "hack-web3-2027",
            "title": "Open Web Sprint",
            "theme": "Decentralized Web",
            "description": "A remote weekend of building on open protocols.",
            "startDate": "2027-01-23T15:00:00Z",
            "endDate": "2027-01-25T15:00:00Z",
            "registrationDeadline": "2027-01-20T00:00:00Z",
            "location": "Online",
            "tags": ["Web", "Rust", "Protocols"],
            "prizes": [{ "place": "1st", "reward": "$4,000" }, "Conference tickets"],
            "sponsors": ["Ferrous Labs", "Packet Co"],
            "organizer": { "username": "techorganizer" },
            "participants": 42
        }
    ]))?)
}

pub fn sample_teams() -> Result<Vec<Team>, StoreError> {
    Ok(serde_json::from_value(json!([
        {
            "id": "team-neural",
            "name": "Neural Navigators",
            "hackathonId": "hack-ai-2026",
            "hackathonName": "AI Innovation Challenge",
            "description": "Accessible study assistants powered by small language models.",
            "members": [
                { "id": "user-sarah", "username": "sarahchen", "role": "leader" },
                { "id": "user-mike", "username": "mikej", "role": "ML Engineer" }
            ],
            "membersCount": 2,
            "maxMembers": 4,
            "skills": ["Python", "PyTorch", "React"],
            "inviteCode": "NEUR42",
            "joinRequests": [],
            "invitations": [],
            "projectIdea": {
                "title": "StudyBuddy",
                "description": "Turns lecture notes into spaced-repetition quizzes.",
                "techStack": ["Python", "FastAPI", "React"],
                "progress": 35
            },
            "createdAt": "2026-10-01T12:00:00Z"
        },
        {
            "id": "team-solar",
            "name": "Solar Coders",
            "hackathonId": "hack-green-2026",
            "hackathonName": "Green Tech Hackathon",
            "description": "Forecasting rooftop solar output for neighbourhood grids.",
            "members": [
                { "id": "user-emma", "name": "emmaw", "role": "Team Lead" }
            ],
            "membersCount": 1,
            "maxMembers": 3,
            "skills": ["Data Science", "IoT"],
            "inviteCode": "SUN777",
            "joinRequests": [
                {
                    "id": "req-1",
                    "userId": "user-mike",
                    "username": "mikej",
                    "requestDate": "2026-10-05T08:30:00Z"
                }
            ],
            "invitations": [],
            "createdAt": "2026-10-03T16:45:00Z"
        }
    ]))?)
}

pub fn sample_users() -> Result<Vec<User>, StoreError> {
    Ok(serde_json::from_value(json!([
        {
            "id": "user-organizer",
            "username": "techorganizer",
            "email": "events@techorg.example",
            "role": "organizer",
            "bio": "Running community hackathons since 2015.",
            "createdHackathons": ["hack-ai-2026", "hack-web3-2027"],
            "createdAt": "2026-01-10T10:00:00Z"
        },
        {
            "id": "user-sarah",
            "username": "sarahchen",
            "email": "sarah@example.com",
            "role": "attendee",
            "skills": ["Python", "PyTorch"],
            "links": { "github": "https://github.com/sarahchen" },
            "registeredHackathons": ["hack-ai-2026"],
            "hackathonCount": 1,
            "teamCount": 1,
            "createdAt": "2026-02-02T09:15:00Z"
        },
        {
            "id": "user-mike",
            "username": "mikej",
            "email": "mike@example.com",
            "role": "attendee",
            "skills": ["Machine Learning", "Go"],
            "registeredHackathons": ["hack-ai-2026"],
            "hackathonCount": 1,
            "teamCount": 1,
            "createdAt": "2026-03-12T18:20:00Z"
        },
        {
            "id": "user-emma",
            "username": "emmaw",
            "email": "emma@example.com",
            "role": "attendee",
            "skills": ["IoT", "Data Science"],
            "registeredHackathons": ["hack-green-2026"],
            "hackathonCount": 1,
            "teamCount": 1,
            "createdAt": "2026-04-21T07:05:00Z"
        }
    ]))?)
}

pub fn sample_ideas() -> Result<Vec<Idea>, StoreError> {
    Ok(serde_json::from_value(json!([
        {
            "id": "idea-1",
            "title": "Carbon footprint browser extension",
            "description": "Estimate the emissions of online purchases at checkout.",
            "author": "emmaw",
            "date": "2026-09-28",
            "tags": ["Climate", "Browser"],
            "likes": 24,
            "comments": 6
        },
        {
            "id": "idea-2",
            "title": "Sign language tutor",
            "description": "Real-time hand pose feedback for sign language learners.",
            "author": "sarahchen",
            "date": "2026-10-02",
            "tags": ["AI", "Accessibility"],
            "likes": 41,
            "comments": 11
        },
        {
            "id": "idea-3",
            "title": "Hackathon team matcher",
            "description": "Suggest teammates from complementary skills.",
            "author": "mikej",
            "date": "2026-10-09",
            "tags": ["Matching", "Community"],
            "likes": 9,
            "comments": 2
        }
    ]))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_teams_hold_invariants() {
        for team in sample_teams().unwrap() {
            assert_eq!(team.members_count as usize, team.members.len());
            assert!(team.members.len() as u32 <= team.max_members);
            assert!(team.leader().is_some());
        }
    }

    #[test]
    fn test_sample_users_are_unique() {
        let users = sample_users().unwrap();
        for (i, a) in users.iter().enumerate() {
            for b in &users[i + 1..] {
                assert!(!a.has_username(&b.username));
                assert!(!a.has_email(&b.email));
            }
        }
    }
}
