// src/storage/memory.rs
//! In-process graph store with optional JSON snapshots.
//!
//! Entities keep insertion order, so pending entities come back in the order
//! they were discovered. A snapshot file lets a crawl resume where it stopped
//! and lets the extractor read what a crawl stored.

use super::GraphStore;
use crate::error::StoreError;
use crate::model::{Edge, Entity, PageCursor, Post, Reachability};
use crate::types::{EntityId, EntityKey, PostId};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
struct GraphState {
    entities: IndexMap<EntityId, Entity>,
    keys: HashMap<EntityKey, EntityId>,
    edges: IndexMap<EntityId, IndexSet<EntityId>>,
    edge_count: usize,
    posts: IndexMap<PostId, Post>,
}

impl GraphState {
    fn upsert_entity(&mut self, entity: &Entity) {
        let id = entity.id();
        match self.entities.get_mut(&id) {
            Some(existing) => {
                // Descriptive fields refresh, pagination state is preserved.
                if existing.metadata.key != entity.metadata.key {
                    self.keys.remove(&existing.metadata.key);
                }
                existing.metadata = entity.metadata.clone();
            }
            None => {
                self.entities.insert(id, entity.clone());
            }
        }
        self.keys.insert(entity.key().clone(), id);
    }

    fn upsert_edge(&mut self, edge: &Edge) {
        if self.edges.entry(edge.source).or_default().insert(edge.target) {
            self.edge_count += 1;
        }
    }

    /// Merges an entity's state. The cursor only moves forward
    /// (`NotStarted` -> `InProgress` -> `Complete`) and an inaccessible
    /// entity stays inaccessible.
    fn merge_state(&mut self, entity: &Entity) {
        let id = entity.id();
        let Some(existing) = self.entities.get_mut(&id) else {
            self.upsert_entity(entity);
            return;
        };

        if cursor_stage(&entity.cursor) >= cursor_stage(&existing.cursor) {
            existing.cursor = entity.cursor.clone();
        } else {
            log::debug!(
                "Ignoring backward cursor move for {}: {} -> {}",
                id,
                existing.cursor,
                entity.cursor
            );
        }
        if existing.reachability != Reachability::Inaccessible {
            existing.reachability = entity.reachability;
        }
        existing.last_changed = existing.last_changed.max(entity.last_changed);
    }
}

/// On-disk form of a [`MemoryStore`].
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    entities: Vec<Entity>,
    edges: Vec<Edge>,
    #[serde(default)]
    posts: Vec<Post>,
}

/// Thread-safe in-memory implementation of [`GraphStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<GraphState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a store from a snapshot file. A missing file yields an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if !path.exists() {
            log::info!("No snapshot at {}, starting empty", path.display());
            return Ok(Self::new());
        }

        let text = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let snapshot: Snapshot = serde_json::from_str(&text)?;

        let mut state = GraphState::default();
        for entity in &snapshot.entities {
            state.upsert_entity(entity);
            state.merge_state(entity);
        }
        for edge in &snapshot.edges {
            state.upsert_edge(edge);
        }
        for post in snapshot.posts {
            state.posts.insert(post.id, post);
        }

        log::info!(
            "Loaded snapshot {}: {} entities, {} edges",
            path.display(),
            state.entities.len(),
            state.edge_count
        );

        Ok(Self {
            state: RwLock::new(state),
        })
    }

    /// Writes the store to `path`, replacing it atomically.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        let path = path.as_ref();
        let snapshot = {
            let state = self.state.read();
            Snapshot {
                entities: state.entities.values().cloned().collect(),
                edges: state
                    .edges
                    .iter()
                    .flat_map(|(source, targets)| {
                        targets.iter().map(move |target| Edge::new(*source, *target))
                    })
                    .collect(),
                posts: state.posts.values().cloned().collect(),
            }
        };

        let text = serde_json::to_string(&snapshot)?;
        let tmp_path = temporary_sibling(path);
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        fs::write(&tmp_path, text).map_err(io_err)?;
        fs::rename(&tmp_path, path).map_err(io_err)?;

        log::info!(
            "Saved snapshot {}: {} entities, {} edges",
            path.display(),
            snapshot.entities.len(),
            snapshot.edges.len()
        );
        Ok(())
    }

    pub fn entity_count(&self) -> usize {
        self.state.read().entities.len()
    }

    pub fn edge_count(&self) -> usize {
        self.state.read().edge_count
    }

    pub fn get_entity(&self, id: EntityId) -> Option<Entity> {
        self.state.read().entities.get(&id).cloned()
    }

    pub fn post_count(&self) -> usize {
        self.state.read().posts.len()
    }
}

fn cursor_stage(cursor: &PageCursor) -> u8 {
    match cursor {
        PageCursor::NotStarted => 0,
        PageCursor::InProgress(_) => 1,
        PageCursor::Complete => 2,
    }
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[async_trait::async_trait]
impl GraphStore for MemoryStore {
    async fn add_entities(&self, batch: &[Entity]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for entity in batch {
            state.upsert_entity(entity);
        }
        Ok(())
    }

    async fn add_edges(&self, batch: &[Edge]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for edge in batch {
            state.upsert_edge(edge);
        }
        Ok(())
    }

    async fn update_entity_state(&self, entity: &Entity) -> Result<(), StoreError> {
        self.state.write().merge_state(entity);
        Ok(())
    }

    async fn get_entity_by_key(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError> {
        let state = self.state.read();
        Ok(state
            .keys
            .get(key)
            .and_then(|id| state.entities.get(id))
            .cloned())
    }

    async fn list_pending_entities(&self, limit: usize) -> Result<Vec<Entity>, StoreError> {
        let state = self.state.read();
        Ok(state
            .entities
            .values()
            .filter(|entity| entity.is_pending())
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_outgoing_edges(&self, id: EntityId) -> Result<Vec<Edge>, StoreError> {
        let state = self.state.read();
        Ok(state
            .edges
            .get(&id)
            .map(|targets| targets.iter().map(|target| Edge::new(id, *target)).collect())
            .unwrap_or_default())
    }

    async fn add_posts(&self, batch: &[Post]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for post in batch {
            state.posts.insert(post.id, post.clone());
        }
        Ok(())
    }

    async fn get_posts(&self, author: EntityId) -> Result<Vec<Post>, StoreError> {
        let state = self.state.read();
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|post| post.author == author)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(posts)
    }

    async fn record_page(&self, entities: &[Entity], edges: &[Edge]) -> Result<(), StoreError> {
        let mut state = self.state.write();
        for entity in entities {
            state.upsert_entity(entity);
        }
        for edge in edges {
            state.upsert_edge(edge);
        }
        Ok(())
    }
}
