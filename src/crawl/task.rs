// src/crawl/task.rs
//! The unit of work workers execute.

use crate::error::{CrawlError, FailureClass};
use crate::storage::GraphStore;
use crate::types::EntityKey;
use std::fmt;
use std::time::Duration;

/// What a task downloads for its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    /// The paginated follower listing.
    Followers,
    /// The latest timeline page.
    Timeline,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Followers => write!(f, "followers"),
            TaskKind::Timeline => write!(f, "timeline"),
        }
    }
}

/// How a task invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The entity's listing was fully paginated.
    Complete { pages: usize, edges: usize },
    /// The entity's timeline was downloaded.
    Downloaded { posts: usize },
    /// Access was denied; the entity is now permanently inaccessible.
    Terminal,
    /// The task stopped early. The entity stays pending for a later cycle.
    Aborted {
        class: FailureClass,
        retry_after: Option<Duration>,
    },
    /// The entity was already complete or inaccessible; nothing was fetched.
    Skipped,
}

impl TaskOutcome {
    /// Builds the aborted outcome for an error, keeping its class and any
    /// back-off hint.
    pub fn aborted(err: &CrawlError) -> Self {
        TaskOutcome::Aborted {
            class: err.class(),
            retry_after: err.retry_after(),
        }
    }
}

impl fmt::Display for TaskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskOutcome::Complete { pages, edges } => {
                write!(f, "complete ({} pages, {} edges)", pages, edges)
            }
            TaskOutcome::Downloaded { posts } => write!(f, "downloaded ({} posts)", posts),
            TaskOutcome::Terminal => write!(f, "terminal"),
            TaskOutcome::Aborted { class, .. } => write!(f, "aborted ({})", class),
            TaskOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// A unit of crawl work, executed by exactly one worker.
///
/// `execute` is given the shared persistence handle; the task must not
/// assume any other task observes its writes until they are durable.
/// Errors are reported through the outcome; an `Err` means the task could
/// not even decide an outcome (e.g. persistence refused the final write).
#[async_trait::async_trait]
pub trait CrawlTask: Send + Sync {
    /// The entity this task works on.
    fn entity_key(&self) -> &EntityKey;

    fn kind(&self) -> TaskKind;

    async fn execute(&self, store: &dyn GraphStore) -> Result<TaskOutcome, CrawlError>;
}
