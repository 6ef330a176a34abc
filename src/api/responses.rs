// src/api/responses.rs
//! Wire shapes of the remote source's JSON payloads.

use indexmap::IndexMap;
use serde::Deserialize;

/// A user object as returned by the metadata and listing endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUser {
    pub id: u64,
    pub screen_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub followers_count: Option<u64>,
}

/// One page of a follower listing.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUserPage {
    #[serde(default)]
    pub users: Vec<WireUser>,
    pub next_cursor_str: String,
}

/// A post object inside a timeline payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WirePost {
    pub id_str: String,
    pub user_id_str: String,
    #[serde(default)]
    pub full_text: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    #[serde(default)]
    pub retweeted_status_id_str: Option<String>,
}

/// Objects referenced by a timeline, keyed by their id strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WireGlobalObjects {
    #[serde(default)]
    pub tweets: IndexMap<String, WirePost>,
    #[serde(default)]
    pub users: IndexMap<String, WireUser>,
}

/// One page of a profile timeline.
#[derive(Debug, Clone, Deserialize)]
pub struct WireTimeline {
    #[serde(rename = "globalObjects", default)]
    pub global_objects: WireGlobalObjects,
}
