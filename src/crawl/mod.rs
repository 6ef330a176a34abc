// src/crawl/mod.rs
//! The crawl engine: a scheduler keeping a bounded task queue topped up
//! from the store, a fixed pool of workers draining it, and the tasks they
//! run (follower pagination and timeline downloads).

mod bootstrap;
pub mod ledger;
pub mod pagination;
pub mod queue;
pub mod scheduler;
pub mod task;
pub mod timeline;
pub mod worker;

pub use ledger::{CrawlLedger, OutcomeCounts, TaskResult};
pub use pagination::{PaginationState, PaginationTask};
pub use queue::{QueueClosed, QueuedTask, TaskQueue};
pub use scheduler::{CrawlSummary, Scheduler, SchedulerSettings};
pub use task::{CrawlTask, TaskKind, TaskOutcome};
pub use timeline::TimelineTask;
pub use worker::{WorkerContext, WorkerPool};
