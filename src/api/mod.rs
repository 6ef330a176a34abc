// src/api/mod.rs
//! Remote social-graph source: the ability to resolve entities and page
//! through their related-items listings.
//!
//! Business logic depends on [`RemoteSource`], never on HTTP details.

pub mod client;
pub mod parser;
mod responses;

use crate::error::CrawlError;
use crate::model::{EntityMetadata, NextCursor, Post};
use crate::types::{EntityId, EntityKey};

/// One page of an entity's related-items listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub items: Vec<EntityMetadata>,
    pub next: NextCursor,
}

/// The most recent posts of one entity's timeline, with the authors they
/// mention (reshared posts carry their original author).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timeline {
    pub posts: Vec<Post>,
    pub authors: Vec<EntityMetadata>,
}

/// The ability to read the remote social graph.
///
/// Failures come back classified (see [`CrawlError::class`]): rate limits,
/// access denial, and everything else.
#[async_trait::async_trait]
pub trait RemoteSource: Send + Sync {
    /// Resolves an entity's metadata from its human-readable key.
    async fn resolve_entity(&self, key: &EntityKey) -> Result<EntityMetadata, CrawlError>;

    /// Fetches one page of an entity's listing. `cursor` is `None` for the
    /// first page.
    async fn fetch_page(
        &self,
        entity: EntityId,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, CrawlError>;

    /// Fetches the latest page of an entity's timeline.
    async fn fetch_timeline(&self, entity: EntityId) -> Result<Timeline, CrawlError>;
}

pub use client::HttpRemoteSource;
