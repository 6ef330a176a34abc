//! Domain model of the crawled social graph: entities, their pagination
//! state, the directed edges discovered while paginating, and the posts of
//! downloaded timelines.

use crate::types::{EntityId, EntityKey, PostId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where an entity's related-items listing stands.
///
/// Three explicit states instead of one overloaded cursor string: "no
/// page fetched yet" and "no more pages" are different values, never two
/// magic tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "token", rename_all = "snake_case")]
pub enum PageCursor {
    NotStarted,
    InProgress(String),
    Complete,
}

impl PageCursor {
    /// Token to send with the next page request, `None` for the first page.
    pub fn token(&self) -> Option<&str> {
        match self {
            PageCursor::InProgress(token) => Some(token),
            PageCursor::NotStarted | PageCursor::Complete => None,
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, PageCursor::Complete)
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageCursor::NotStarted => write!(f, "not-started"),
            PageCursor::InProgress(token) => write!(f, "at {}", token),
            PageCursor::Complete => write!(f, "complete"),
        }
    }
}

/// The cursor a page response points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextCursor {
    /// Another page exists at this token
    More(String),
    /// The listing is exhausted
    End,
}

/// Whether the remote source lets us read an entity's listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Reachability {
    #[default]
    Reachable,
    /// Access was denied. Terminal: the entity is never scheduled again.
    Inaccessible,
}

/// Descriptive fields of an entity as reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub id: EntityId,
    pub key: EntityKey,
    #[serde(default)]
    pub name: Option<String>,
    /// How many related items the remote source claims the entity has.
    #[serde(default)]
    pub related_count: Option<u64>,
}

/// A crawled subject with its pagination and reachability state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(flatten)]
    pub metadata: EntityMetadata,
    pub cursor: PageCursor,
    #[serde(default)]
    pub reachability: Reachability,
    pub last_changed: DateTime<Utc>,
}

/// Error for a cursor transition that would move pagination backward.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cursor of entity {id} cannot move from {from} to {to}")]
pub struct CursorRegression {
    pub id: EntityId,
    pub from: PageCursor,
    pub to: PageCursor,
}

impl Entity {
    /// A freshly discovered entity whose listing has not been fetched.
    pub fn discovered(metadata: EntityMetadata) -> Self {
        Self {
            metadata,
            cursor: PageCursor::NotStarted,
            reachability: Reachability::Reachable,
            last_changed: Utc::now(),
        }
    }

    pub fn id(&self) -> EntityId {
        self.metadata.id
    }

    pub fn key(&self) -> &EntityKey {
        &self.metadata.key
    }

    /// Eligible for scheduling: reachable and not yet fully paginated.
    pub fn is_pending(&self) -> bool {
        self.reachability == Reachability::Reachable && !self.cursor.is_complete()
    }

    /// Applies the next-cursor of a fetched page.
    ///
    /// Pagination only moves forward; a complete entity never returns to
    /// an in-progress state.
    pub fn advance(&mut self, next: NextCursor) -> Result<(), CursorRegression> {
        let to = match next {
            NextCursor::More(token) => PageCursor::InProgress(token),
            NextCursor::End => PageCursor::Complete,
        };
        if self.cursor.is_complete() {
            return Err(CursorRegression {
                id: self.id(),
                from: self.cursor.clone(),
                to,
            });
        }
        self.cursor = to;
        self.last_changed = Utc::now();
        Ok(())
    }

    /// Marks the entity as permanently inaccessible.
    pub fn mark_inaccessible(&mut self) {
        self.reachability = Reachability::Inaccessible;
        self.last_changed = Utc::now();
    }
}

/// A directed relation `source -> target` discovered during pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub source: EntityId,
    pub target: EntityId,
}

impl Edge {
    pub fn new(source: EntityId, target: EntityId) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// A post from an entity's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub author: EntityId,
    pub text: String,
    /// Creation time as the remote source reports it.
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub lang: Option<String>,
    /// The post this one reshares, if any.
    #[serde(default)]
    pub reshare_of: Option<PostId>,
}
