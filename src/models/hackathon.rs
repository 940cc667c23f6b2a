//! Hackathon model.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::{string_or_number, OrganizerRef, Prize};
use super::{Collection, Record};

/// One timed entry in a schedule day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub time: String,
    pub title: String,
}

/// The events of one hackathon day, in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub date: String,
    #[serde(default)]
    pub events: Vec<ScheduleEvent>,
}

/// A hackathon listed in the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hackathon {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registration_deadline: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub prizes: Vec<Prize>,
    #[serde(default)]
    pub sponsors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organizer: Option<OrganizerRef>,
    #[serde(default)]
    pub participants: u32,
    #[serde(default)]
    pub schedule: Vec<ScheduleDay>,
}

impl Record for Hackathon {
    const COLLECTION: Collection = Collection::Hackathons;

    fn id(&self) -> &str {
        &self.id
    }
}

impl Hackathon {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.start_date)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.end_date)
    }

    /// Registration is open until the deadline, or until the start when no deadline is set.
    pub fn registration_open(&self, now: DateTime<Utc>) -> bool {
        let closes = self
            .registration_deadline
            .as_deref()
            .and_then(parse_timestamp)
            .or_else(|| self.starts_at());
        closes.map_or(true, |closes| now <= closes)
    }
}

/// Parse either an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Payload for an organizer creating a hackathon.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHackathon {
    pub title: String,
    #[serde(default)]
    pub theme: String,
    #[serde(default)]
    pub description: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub registration_deadline: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub prizes: Vec<Prize>,
    #[serde(default)]
    pub sponsors: Vec<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleDay>,
}
