//! Shared project idea model.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::normalize::string_or_number;
use super::{Collection, Record};

/// A project idea posted to the shared idea board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub author: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub likes: u32,
    #[serde(default)]
    pub comments: u32,
}

impl Record for Idea {
    const COLLECTION: Collection = Collection::SharedIdeas;

    fn id(&self) -> &str {
        &self.id
    }
}

/// Payload for sharing an idea.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewIdea {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}
