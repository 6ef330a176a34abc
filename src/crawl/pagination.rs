// src/crawl/pagination.rs
//! Cursor-driven pagination of one entity's related-items listing.
//!
//! A [`PaginationTask`] walks an explicit [`PaginationState`] machine:
//!
//! ```text
//! NotStarted -> Bootstrapping -> Fetching(cursor) -> Fetching(next) ...
//!                                        \-> Complete | Terminal | Aborted
//! ```
//!
//! Pages are requested strictly one after another: page N is persisted and
//! its next-cursor known before page N+1 is requested. The task never
//! retries on its own. An aborted entity stays pending and a later
//! scheduling cycle picks it up again.

use super::bootstrap::bootstrap_entity;
use super::task::{CrawlTask, TaskKind, TaskOutcome};
use crate::api::{FetchedPage, RemoteSource};
use crate::error::{CrawlError, FailureClass};
use crate::logging::Logger;
use crate::model::{Edge, Entity};
use crate::storage::GraphStore;
use crate::types::EntityKey;
use std::sync::Arc;
use std::time::Duration;

/// Where one pagination run stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationState {
    /// The entity is unknown to persistence.
    NotStarted,
    /// Resolving the entity's metadata before the first page.
    Bootstrapping,
    /// Requesting the page at the entity's current cursor.
    Fetching(Entity),
    /// The listing is exhausted and the entity is marked complete.
    Complete,
    /// Access was denied; the entity is persisted as inaccessible.
    Terminal,
    /// Stopped early; the entity's pending status is unchanged.
    Aborted {
        class: FailureClass,
        retry_after: Option<Duration>,
    },
}

impl PaginationState {
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            PaginationState::Complete | PaginationState::Terminal | PaginationState::Aborted { .. }
        )
    }

    fn name(&self) -> &'static str {
        match self {
            PaginationState::NotStarted => "NotStarted",
            PaginationState::Bootstrapping => "Bootstrapping",
            PaginationState::Fetching(_) => "Fetching",
            PaginationState::Complete => "Complete",
            PaginationState::Terminal => "Terminal",
            PaginationState::Aborted { .. } => "Aborted",
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    pages: usize,
    edges: usize,
}

/// Fetches every page of one entity's listing and persists each page.
pub struct PaginationTask {
    key: EntityKey,
    remote: Arc<dyn RemoteSource>,
    log: Logger,
}

impl PaginationTask {
    pub fn new(key: EntityKey, remote: Arc<dyn RemoteSource>, log: &Logger) -> Self {
        let log = log.child(format_args!("PaginationTask '{}'", key));
        Self { key, remote, log }
    }

    pub fn key(&self) -> &EntityKey {
        &self.key
    }

    /// Performs one transition of the state machine.
    pub async fn step(
        &self,
        state: PaginationState,
        store: &dyn GraphStore,
    ) -> Result<PaginationState, CrawlError> {
        let mut progress = Progress::default();
        self.transition(state, store, &mut progress).await
    }

    async fn transition(
        &self,
        state: PaginationState,
        store: &dyn GraphStore,
        progress: &mut Progress,
    ) -> Result<PaginationState, CrawlError> {
        match state {
            PaginationState::NotStarted => Ok(PaginationState::Bootstrapping),
            PaginationState::Bootstrapping => Ok(self.bootstrap(store).await),
            PaginationState::Fetching(entity) => self.fetch_next_page(entity, store, progress).await,
            done => Ok(done),
        }
    }

    /// Resolves the entity's metadata and persists it with no pages fetched.
    async fn bootstrap(&self, store: &dyn GraphStore) -> PaginationState {
        let entity = match bootstrap_entity(&self.key, self.remote.as_ref(), store).await {
            Ok(entity) => entity,
            Err(err) if err.class() == FailureClass::AccessDenied => {
                // Nothing persisted yet, so there is no entity to mark.
                self.log.warn(format_args!("metadata access denied: {}", err));
                return PaginationState::Terminal;
            }
            Err(err) => return self.abort(&err),
        };

        self.log.debug(format_args!(
            "resolved to id {} ({} related items reported)",
            entity.id(),
            entity
                .metadata
                .related_count
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unknown".into())
        ));

        // A known id under a new key keeps the progress already stored.
        if entity.cursor.is_complete() {
            PaginationState::Complete
        } else if !entity.is_pending() {
            PaginationState::Terminal
        } else {
            PaginationState::Fetching(entity)
        }
    }

    async fn fetch_next_page(
        &self,
        mut entity: Entity,
        store: &dyn GraphStore,
        progress: &mut Progress,
    ) -> Result<PaginationState, CrawlError> {
        let page = match self
            .remote
            .fetch_page(entity.id(), entity.cursor.token())
            .await
        {
            Ok(page) => page,
            Err(err) if err.class() == FailureClass::AccessDenied => {
                self.log.warn(format_args!("listing access denied: {}", err));
                entity.mark_inaccessible();
                store.update_entity_state(&entity).await?;
                return Ok(PaginationState::Terminal);
            }
            Err(err) => return Ok(self.abort(&err)),
        };

        match self.persist_page(&mut entity, page, store).await {
            Ok(edges) => {
                progress.pages += 1;
                progress.edges += edges;
            }
            Err(err) => return Ok(self.abort(&err)),
        }

        if entity.cursor.is_complete() {
            Ok(PaginationState::Complete)
        } else {
            Ok(PaginationState::Fetching(entity))
        }
    }

    /// Persists one page's related entities and edges as a unit, then
    /// moves the cursor forward. Returns the number of edges written.
    async fn persist_page(
        &self,
        entity: &mut Entity,
        page: FetchedPage,
        store: &dyn GraphStore,
    ) -> Result<usize, CrawlError> {
        let owner = entity.id();
        let edges: Vec<Edge> = page
            .items
            .iter()
            .map(|item| Edge::new(owner, item.id))
            .collect();
        let related: Vec<Entity> = page.items.into_iter().map(Entity::discovered).collect();

        store.record_page(&related, &edges).await?;

        entity.advance(page.next).map_err(|e| CrawlError::Internal {
            message: e.to_string(),
            source: Some(Box::new(e)),
        })?;
        store.update_entity_state(entity).await?;

        self.log.debug(format_args!(
            "page persisted: {} edges, cursor {}",
            edges.len(),
            entity.cursor
        ));
        Ok(edges.len())
    }

    fn abort(&self, err: &CrawlError) -> PaginationState {
        self.log.warn(format_args!("aborting: {}", err));
        PaginationState::Aborted {
            class: err.class(),
            retry_after: err.retry_after(),
        }
    }
}

#[async_trait::async_trait]
impl CrawlTask for PaginationTask {
    fn entity_key(&self) -> &EntityKey {
        &self.key
    }

    fn kind(&self) -> TaskKind {
        TaskKind::Followers
    }

    async fn execute(&self, store: &dyn GraphStore) -> Result<TaskOutcome, CrawlError> {
        let mut state = match store.get_entity_by_key(&self.key).await {
            Ok(Some(entity)) if !entity.is_pending() => {
                self.log.debug(format_args!("already settled ({}), skipping", entity.cursor));
                return Ok(TaskOutcome::Skipped);
            }
            Ok(Some(entity)) => PaginationState::Fetching(entity),
            Ok(None) => PaginationState::NotStarted,
            Err(err) => return Ok(TaskOutcome::aborted(&CrawlError::from(err))),
        };

        let mut progress = Progress::default();
        while !state.is_final() {
            let from = state.name();
            state = self.transition(state, store, &mut progress).await?;
            self.log.debug(format_args!("{} -> {}", from, state.name()));
        }

        let outcome = match state {
            PaginationState::Complete => TaskOutcome::Complete {
                pages: progress.pages,
                edges: progress.edges,
            },
            PaginationState::Terminal => TaskOutcome::Terminal,
            PaginationState::Aborted { class, retry_after } => {
                TaskOutcome::Aborted { class, retry_after }
            }
            other => {
                return Err(CrawlError::Internal {
                    message: format!("pagination stopped in non-final state {}", other.name()),
                    source: None,
                })
            }
        };
        self.log.info(format_args!("{}", outcome));
        Ok(outcome)
    }
}
