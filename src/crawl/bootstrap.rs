// src/crawl/bootstrap.rs
//! First contact with an entity the store does not know by key yet.

use crate::api::RemoteSource;
use crate::error::CrawlError;
use crate::model::Entity;
use crate::storage::GraphStore;
use crate::types::EntityKey;

/// Resolves `key` on the remote source and persists the entity.
///
/// The id may already be stored under an older key. In that case the
/// stored entity is returned with its progress intact, refreshed to the
/// new key.
pub(super) async fn bootstrap_entity(
    key: &EntityKey,
    remote: &dyn RemoteSource,
    store: &dyn GraphStore,
) -> Result<Entity, CrawlError> {
    let metadata = remote.resolve_entity(key).await?;
    let discovered = Entity::discovered(metadata);
    store
        .add_entities(std::slice::from_ref(&discovered))
        .await?;

    let stored = store.get_entity_by_key(discovered.key()).await?;
    Ok(stored.unwrap_or(discovered))
}
