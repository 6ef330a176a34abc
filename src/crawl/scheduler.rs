// src/crawl/scheduler.rs
//! The crawl's control loop.
//!
//! The scheduler owns the task queue and the worker pool. It waits for
//! worker completion signals with a fixed timeout; each timeout is a tick on
//! which it inspects the queue and, below the low-water mark, refills it
//! from the store's pending entities. In a finite run the queue is closed
//! once a refill finds nothing new and no task is in flight; the run ends
//! when every worker has reported completion.
//!
//! Timeline downloads are seeded once per run and never refilled.

use super::ledger::{CrawlLedger, OutcomeCounts};
use super::pagination::PaginationTask;
use super::queue::{QueuedTask, TaskQueue};
use super::task::TaskKind;
use super::timeline::TimelineTask;
use super::worker::{WorkerContext, WorkerPool};
use crate::api::RemoteSource;
use crate::constants::{
    DEFAULT_LOW_WATER_MARK, DEFAULT_MAX_ATTEMPTS_PER_RUN, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_REFILL_INTERVAL, DEFAULT_WORKER_COUNT,
};
use crate::error::CrawlError;
use crate::error_recovery::CooldownPolicy;
use crate::logging::Logger;
use crate::storage::GraphStore;
use crate::types::EntityKey;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Tuning of one crawl run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub low_water_mark: usize,
    pub refill_interval: Duration,
    /// Aborts an entity may accumulate before a finite run stops selecting it.
    pub max_attempts: u32,
    /// Keep polling for pending entities forever instead of closing the
    /// queue once the pending set is exhausted.
    pub continuous: bool,
    pub cooldown: CooldownPolicy,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKER_COUNT,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            low_water_mark: DEFAULT_LOW_WATER_MARK,
            refill_interval: DEFAULT_REFILL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS_PER_RUN,
            continuous: false,
            cooldown: CooldownPolicy::default(),
        }
    }
}

/// What a finished crawl run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlSummary {
    pub outcomes: OutcomeCounts,
    pub workers_finished: usize,
    pub elapsed: Duration,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let o = &self.outcomes;
        write!(
            f,
            "{} complete, {} terminal, {} aborted, {} failed, {} skipped; {} workers finished in {}",
            o.completed,
            o.terminal,
            o.aborted,
            o.failed,
            o.skipped,
            self.workers_finished,
            format_elapsed(self.elapsed)
        )
    }
}

pub struct Scheduler {
    settings: SchedulerSettings,
    store: Arc<dyn GraphStore>,
    remote: Arc<dyn RemoteSource>,
    queue: Arc<TaskQueue>,
    ledger: Arc<CrawlLedger>,
    timelines: Vec<EntityKey>,
    log: Logger,
}

impl Scheduler {
    pub fn new(
        settings: SchedulerSettings,
        store: Arc<dyn GraphStore>,
        remote: Arc<dyn RemoteSource>,
        log: &Logger,
    ) -> Self {
        let queue = Arc::new(TaskQueue::new(settings.queue_capacity));
        Self {
            settings,
            store,
            remote,
            queue,
            ledger: Arc::new(CrawlLedger::new()),
            timelines: Vec::new(),
            log: log.child("Scheduler"),
        }
    }

    /// Also downloads the timelines of `keys` during the run.
    pub fn with_timelines(mut self, keys: Vec<EntityKey>) -> Self {
        self.timelines = keys;
        self
    }

    pub fn queue(&self) -> &TaskQueue {
        &self.queue
    }

    pub fn ledger(&self) -> &CrawlLedger {
        &self.ledger
    }

    /// Enqueues a follower task for each seed key, waiting for space as
    /// needed. Returns how many were enqueued.
    pub async fn seed(&self, keys: &[EntityKey]) -> usize {
        self.seed_kind(TaskKind::Followers, keys).await
    }

    /// Enqueues a timeline task for each key. Returns how many were enqueued.
    pub async fn seed_timelines(&self, keys: &[EntityKey]) -> usize {
        self.seed_kind(TaskKind::Timeline, keys).await
    }

    async fn seed_kind(&self, kind: TaskKind, keys: &[EntityKey]) -> usize {
        let mut enqueued = 0;
        for key in keys {
            if !self.ledger.claim(kind, key) {
                self.log.debug(format_args!("{} seed '{}' already in flight", kind, key));
                continue;
            }
            if !self.enqueue(kind, key.clone()).await {
                break;
            }
            enqueued += 1;
        }
        if enqueued > 0 {
            self.log.info(format_args!("seeded {} {} tasks", enqueued, kind));
        }
        enqueued
    }

    /// Tops the queue up from the store's pending entities.
    ///
    /// Enqueues at most one task per free slot, skipping entities that
    /// already have a task in flight and, in a finite run, entities that
    /// used up their attempt budget. Returns how many tasks were enqueued.
    pub async fn refill(&self) -> Result<usize, CrawlError> {
        let room = self.queue.available();
        if room == 0 {
            return Ok(0);
        }

        let exhausted = if self.settings.continuous {
            0
        } else {
            self.ledger
                .exhausted_count(TaskKind::Followers, self.settings.max_attempts)
        };
        // Entities we will skip still occupy the head of the listing.
        let limit = room + self.ledger.in_flight_count() + exhausted;
        let pending = self.store.list_pending_entities(limit).await?;

        let mut enqueued = 0;
        for entity in pending {
            if enqueued == room {
                break;
            }
            let key = entity.key();
            if self.is_exhausted(key) || !self.ledger.claim(TaskKind::Followers, key) {
                continue;
            }
            if !self.enqueue(TaskKind::Followers, key.clone()).await {
                break;
            }
            enqueued += 1;
        }
        Ok(enqueued)
    }

    fn is_exhausted(&self, key: &EntityKey) -> bool {
        !self.settings.continuous
            && self.ledger.attempts(TaskKind::Followers, key) >= self.settings.max_attempts
    }

    /// Pushes a `kind` task for an already claimed key. `false` if the
    /// queue closed.
    async fn enqueue(&self, kind: TaskKind, key: EntityKey) -> bool {
        let remote = Arc::clone(&self.remote);
        let task: QueuedTask = match kind {
            TaskKind::Followers => Box::new(PaginationTask::new(key.clone(), remote, &self.log)),
            TaskKind::Timeline => Box::new(TimelineTask::new(key.clone(), remote, &self.log)),
        };
        match self.queue.push(task).await {
            Ok(()) => true,
            Err(_) => {
                self.ledger.unclaim(kind, &key);
                false
            }
        }
    }

    /// Runs the crawl until every worker has finished.
    pub async fn run(self, seeds: &[EntityKey]) -> Result<CrawlSummary, CrawlError> {
        let started = Instant::now();
        let mut pool = WorkerPool::spawn(
            self.settings.workers,
            WorkerContext {
                queue: Arc::clone(&self.queue),
                store: Arc::clone(&self.store),
                ledger: Arc::clone(&self.ledger),
                cooldown: self.settings.cooldown,
            },
            &self.log,
        );
        self.log.info(format_args!(
            "started {} workers (queue capacity {}, low-water mark {})",
            pool.size(),
            self.queue.capacity(),
            self.settings.low_water_mark
        ));

        self.seed(seeds).await;
        self.seed_timelines(&self.timelines).await;

        let mut workers_finished = 0;
        while workers_finished < pool.size() {
            match tokio::time::timeout(self.settings.refill_interval, pool.next_finished()).await {
                Ok(Some(id)) => {
                    workers_finished += 1;
                    self.log.info(format_args!(
                        "worker {} finished ({}/{})",
                        id,
                        workers_finished,
                        pool.size()
                    ));
                }
                Ok(None) => break,
                Err(_) => self.tick(started).await,
            }
        }
        pool.join().await;

        let summary = CrawlSummary {
            outcomes: self.ledger.counts(),
            workers_finished,
            elapsed: started.elapsed(),
        };
        self.log.info(format_args!("crawl finished: {}", summary));
        Ok(summary)
    }

    /// One timer tick: report progress, refill below the low-water mark and
    /// close the queue once a finite run has nothing left to do.
    async fn tick(&self, started: Instant) {
        if self.queue.is_closed() {
            self.log.debug(format_args!(
                "{} elapsed, draining {} queued tasks",
                format_elapsed(started.elapsed()),
                self.queue.depth()
            ));
            return;
        }

        // An empty queue always refills, whatever the low-water mark.
        let depth = self.queue.depth();
        if depth > 0 && depth >= self.settings.low_water_mark {
            self.log.info(format_args!(
                "{} elapsed, queue depth {} at or above low-water mark",
                format_elapsed(started.elapsed()),
                depth
            ));
            return;
        }

        match self.refill().await {
            Ok(enqueued) => {
                self.log.info(format_args!(
                    "{} elapsed, enqueued {} new tasks (depth was {}, {} in flight)",
                    format_elapsed(started.elapsed()),
                    enqueued,
                    depth,
                    self.ledger.in_flight_count()
                ));
                if enqueued == 0 && !self.settings.continuous && self.ledger.in_flight_count() == 0 {
                    self.log.info(format_args!("pending set exhausted, closing queue"));
                    self.queue.close();
                }
            }
            Err(err) => {
                self.log.error(format_args!("refill failed, retrying next tick: {}", err));
            }
        }
    }
}

/// Formats a duration as `1h 02m 03s`, dropping leading zero units.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h {:02}m {:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m {:02}s", m, s)
    } else {
        format!("{}.{:01}s", s, elapsed.subsec_millis() / 100)
    }
}
