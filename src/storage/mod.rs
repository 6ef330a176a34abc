//! Persistence of the crawled graph: the store every task and the
//! extractor share.
//!
//! The core depends on the [`GraphStore`] capability only. Conflict
//! resolution belongs to the store: writes are idempotent upserts keyed by
//! entity id, so a task that is retried wholesale can replay pages safely.

mod memory;

pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::model::{Edge, Entity, Post};
use crate::types::{EntityId, EntityKey};

/// The ability to persist and query the crawled graph.
///
/// Every method is one atomic logical operation and must be safe under
/// concurrent calls from different tasks.
#[async_trait::async_trait]
pub trait GraphStore: Send + Sync {
    /// Upserts entities. Existing entities keep their pagination state.
    async fn add_entities(&self, batch: &[Entity]) -> Result<(), StoreError>;

    /// Upserts edges. Re-adding an existing edge is a no-op.
    async fn add_edges(&self, batch: &[Edge]) -> Result<(), StoreError>;

    /// Persists cursor and reachability changes of one entity.
    async fn update_entity_state(&self, entity: &Entity) -> Result<(), StoreError>;

    async fn get_entity_by_key(&self, key: &EntityKey) -> Result<Option<Entity>, StoreError>;

    /// Up to `limit` entities that are reachable and not fully paginated.
    async fn list_pending_entities(&self, limit: usize) -> Result<Vec<Entity>, StoreError>;

    async fn get_outgoing_edges(&self, id: EntityId) -> Result<Vec<Edge>, StoreError>;

    /// Upserts posts keyed by post id.
    async fn add_posts(&self, batch: &[Post]) -> Result<(), StoreError>;

    /// Stored posts authored by `author`, newest first.
    async fn get_posts(&self, author: EntityId) -> Result<Vec<Post>, StoreError>;

    /// Persists one fetched page: the related entities and the edges to
    /// them, as one unit.
    async fn record_page(&self, entities: &[Entity], edges: &[Edge]) -> Result<(), StoreError> {
        self.add_entities(entities).await?;
        self.add_edges(edges).await
    }
}
