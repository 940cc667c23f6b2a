//! Coercion of legacy record shapes into their canonical form.
//!
//! Older producers wrote prizes as bare strings, organizers as bare usernames
//! and identifiers as numbers. Reads accept every shape; writes always emit the
//! canonical one, so the polymorphism never leaks past this module.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Text(String),
    Number(serde_json::Number),
}

impl From<IdRepr> for String {
    fn from(repr: IdRepr) -> Self {
        match repr {
            IdRepr::Text(s) => s,
            IdRepr::Number(n) => n.to_string(),
        }
    }
}

/// Read an identifier that may be a JSON string or number.
pub fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    IdRepr::deserialize(deserializer).map(String::from)
}

/// Optional variant of [`string_or_number`]; use together with `#[serde(default)]`.
pub fn option_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<IdRepr>::deserialize(deserializer).map(|id| id.map(String::from))
}

/// Sequence variant of [`string_or_number`]; use together with `#[serde(default)]`.
pub fn vec_string_or_number<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Vec::<IdRepr>::deserialize(deserializer).map(|ids| ids.into_iter().map(String::from).collect())
}

/// A hackathon prize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PrizeRepr")]
pub struct Prize {
    pub place: Option<String>,
    pub reward: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PrizeRepr {
    Plain(String),
    Placed {
        #[serde(default)]
        place: Option<String>,
        reward: String,
    },
}

impl From<PrizeRepr> for Prize {
    fn from(repr: PrizeRepr) -> Self {
        match repr {
            PrizeRepr::Plain(reward) => Prize {
                place: None,
                reward,
            },
            PrizeRepr::Placed { place, reward } => Prize { place, reward },
        }
    }
}

/// The organizer of a hackathon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OrganizerRepr")]
pub struct OrganizerRef {
    pub id: Option<String>,
    pub username: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OrganizerRepr {
    Name(String),
    Full {
        #[serde(default, deserialize_with = "option_string_or_number")]
        id: Option<String>,
        username: String,
    },
}

impl From<OrganizerRepr> for OrganizerRef {
    fn from(repr: OrganizerRepr) -> Self {
        match repr {
            OrganizerRepr::Name(username) => OrganizerRef { id: None, username },
            OrganizerRepr::Full { id, username } => OrganizerRef { id, username },
        }
    }
}
