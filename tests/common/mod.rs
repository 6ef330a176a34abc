// tests/common/mod.rs
//! Shared fixtures: a scripted remote source and entity builders.

#![allow(dead_code)]

use parking_lot::Mutex;
use socialgraph_crawler::{
    CrawlError, Entity, EntityId, EntityKey, EntityMetadata, FetchedPage, NextCursor, Post, PostId,
    RemoteSource, Timeline,
};
use std::collections::{HashMap, VecDeque};

pub fn key(s: &str) -> EntityKey {
    EntityKey::parse(s).unwrap()
}

pub fn meta(id: u64, name: &str) -> EntityMetadata {
    EntityMetadata {
        id: EntityId::new(id),
        key: key(name),
        name: Some(name.to_string()),
        related_count: None,
    }
}

pub fn pending(id: u64, name: &str) -> Entity {
    Entity::discovered(meta(id, name))
}

pub fn page(items: Vec<EntityMetadata>, next: Option<&str>) -> FetchedPage {
    FetchedPage {
        items,
        next: match next {
            Some(token) => NextCursor::More(token.to_string()),
            None => NextCursor::End,
        },
    }
}

pub fn post(id: u64, author: u64, text: &str) -> Post {
    Post {
        id: PostId::new(id),
        author: EntityId::new(author),
        text: text.to_string(),
        created_at: None,
        lang: None,
        reshare_of: None,
    }
}

/// A remote source answering from per-entity scripts.
///
/// Entities without a script answer with one empty, final page. Entities
/// registered with [`ScriptedRemote::always_fail`] answer every page
/// request with that HTTP status. Timelines default to empty.
#[derive(Default)]
pub struct ScriptedRemote {
    metadata: Mutex<HashMap<EntityKey, EntityMetadata>>,
    pages: Mutex<HashMap<EntityId, VecDeque<FetchedPage>>>,
    failing: Mutex<HashMap<EntityId, u16>>,
    timelines: Mutex<HashMap<EntityId, Timeline>>,
    calls: Mutex<Vec<(EntityId, Option<String>)>>,
    timeline_calls: Mutex<Vec<EntityId>>,
}

impl ScriptedRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metadata(self, metadata: EntityMetadata) -> Self {
        self.metadata.lock().insert(metadata.key.clone(), metadata);
        self
    }

    pub fn with_pages(self, id: u64, pages: Vec<FetchedPage>) -> Self {
        self.pages.lock().insert(EntityId::new(id), pages.into());
        self
    }

    pub fn always_fail(self, id: u64, status: u16) -> Self {
        self.failing.lock().insert(EntityId::new(id), status);
        self
    }

    pub fn with_timeline(self, id: u64, timeline: Timeline) -> Self {
        self.timelines.lock().insert(EntityId::new(id), timeline);
        self
    }

    pub fn timeline_calls(&self) -> Vec<EntityId> {
        self.timeline_calls.lock().clone()
    }

    /// Page requests made so far, in order.
    pub fn calls(&self) -> Vec<(EntityId, Option<String>)> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, id: u64) -> Vec<Option<String>> {
        self.calls
            .lock()
            .iter()
            .filter(|(entity, _)| entity.get() == id)
            .map(|(_, cursor)| cursor.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl RemoteSource for ScriptedRemote {
    async fn resolve_entity(&self, key: &EntityKey) -> Result<EntityMetadata, CrawlError> {
        self.metadata
            .lock()
            .get(key)
            .cloned()
            .ok_or_else(|| CrawlError::from_status(404, key.as_str(), "users/show.json", None))
    }

    async fn fetch_page(
        &self,
        entity: EntityId,
        cursor: Option<&str>,
    ) -> Result<FetchedPage, CrawlError> {
        self.calls.lock().push((entity, cursor.map(str::to_string)));

        if let Some(status) = self.failing.lock().get(&entity) {
            return Err(CrawlError::from_status(
                *status,
                &entity.to_string(),
                "followers/list.json",
                None,
            ));
        }

        let next = self
            .pages
            .lock()
            .get_mut(&entity)
            .and_then(|script| script.pop_front());
        Ok(next.unwrap_or_else(|| page(Vec::new(), None)))
    }

    async fn fetch_timeline(&self, entity: EntityId) -> Result<Timeline, CrawlError> {
        self.timeline_calls.lock().push(entity);

        if let Some(status) = self.failing.lock().get(&entity) {
            return Err(CrawlError::from_status(
                *status,
                &entity.to_string(),
                "timeline/profile",
                None,
            ));
        }
        Ok(self
            .timelines
            .lock()
            .get(&entity)
            .cloned()
            .unwrap_or_default())
    }
}
