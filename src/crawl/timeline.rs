// src/crawl/timeline.rs
//! Download of one entity's latest timeline page.

use super::bootstrap::bootstrap_entity;
use super::task::{CrawlTask, TaskKind, TaskOutcome};
use crate::api::RemoteSource;
use crate::error::{CrawlError, FailureClass, StoreError};
use crate::logging::Logger;
use crate::model::{Entity, Post, Reachability};
use crate::storage::GraphStore;
use crate::types::EntityKey;
use std::sync::Arc;

/// Fetches an entity's timeline and stores its posts and their authors.
///
/// The entity is resolved and persisted first if the store does not know
/// it. Pagination state is never touched.
pub struct TimelineTask {
    key: EntityKey,
    remote: Arc<dyn RemoteSource>,
    log: Logger,
}

impl TimelineTask {
    pub fn new(key: EntityKey, remote: Arc<dyn RemoteSource>, log: &Logger) -> Self {
        let log = log.child(format_args!("TimelineTask '{}'", key));
        Self { key, remote, log }
    }

    async fn download(
        &self,
        mut entity: Entity,
        store: &dyn GraphStore,
    ) -> Result<TaskOutcome, CrawlError> {
        let timeline = match self.remote.fetch_timeline(entity.id()).await {
            Ok(timeline) => timeline,
            Err(err) if err.class() == FailureClass::AccessDenied => {
                self.log.warn(format_args!("timeline access denied: {}", err));
                entity.mark_inaccessible();
                store.update_entity_state(&entity).await?;
                return Ok(TaskOutcome::Terminal);
            }
            Err(err) => return Ok(self.abort(&err)),
        };

        let authors: Vec<Entity> = timeline
            .authors
            .into_iter()
            .map(Entity::discovered)
            .collect();
        if let Err(err) = persist(&authors, &timeline.posts, store).await {
            return Ok(self.abort(&CrawlError::from(err)));
        }
        self.log.debug(format_args!(
            "stored {} posts and {} authors",
            timeline.posts.len(),
            authors.len()
        ));

        Ok(TaskOutcome::Downloaded {
            posts: timeline.posts.len(),
        })
    }

    fn abort(&self, err: &CrawlError) -> TaskOutcome {
        self.log.warn(format_args!("aborting: {}", err));
        TaskOutcome::aborted(err)
    }
}

async fn persist(
    authors: &[Entity],
    posts: &[Post],
    store: &dyn GraphStore,
) -> Result<(), StoreError> {
    store.add_entities(authors).await?;
    store.add_posts(posts).await
}

#[async_trait::async_trait]
impl CrawlTask for TimelineTask {
    fn entity_key(&self) -> &EntityKey {
        &self.key
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Timeline
    }

    async fn execute(&self, store: &dyn GraphStore) -> Result<TaskOutcome, CrawlError> {
        let entity = match store.get_entity_by_key(&self.key).await {
            Ok(Some(entity)) => entity,
            Ok(None) => match bootstrap_entity(&self.key, self.remote.as_ref(), store).await {
                Ok(entity) => entity,
                Err(err) if err.class() == FailureClass::AccessDenied => {
                    self.log.warn(format_args!("metadata access denied: {}", err));
                    return Ok(TaskOutcome::Terminal);
                }
                Err(err) => return Ok(self.abort(&err)),
            },
            Err(err) => return Ok(self.abort(&CrawlError::from(err))),
        };

        let outcome = if entity.reachability == Reachability::Inaccessible {
            self.log.debug(format_args!("entity is inaccessible, skipping"));
            TaskOutcome::Skipped
        } else {
            self.download(entity, store).await?
        };
        self.log.info(format_args!("{}", outcome));
        Ok(outcome)
    }
}
