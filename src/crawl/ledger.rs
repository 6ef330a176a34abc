// src/crawl/ledger.rs
//! Bookkeeping shared by the scheduler and the workers: which entities have
//! a task of each kind in flight, how often each aborted during this run,
//! and outcome counters for the run summary.

use super::task::{TaskKind, TaskOutcome};
use crate::error::FailureClass;
use crate::types::EntityKey;
use dashmap::{DashMap, DashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

/// What a worker observed when a task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResult {
    /// The task decided an outcome.
    Finished(TaskOutcome),
    /// The task returned an error or panicked.
    Failed(FailureClass),
}

impl TaskResult {
    /// Whether this result counts against the entity's attempt budget.
    ///
    /// Rate limits say nothing about the entity, so they never count.
    fn consumes_attempt(&self) -> bool {
        match self {
            TaskResult::Finished(TaskOutcome::Aborted { class, .. }) | TaskResult::Failed(class) => {
                *class != FailureClass::RateLimited
            }
            TaskResult::Finished(_) => false,
        }
    }
}

/// Outcome counters of one crawl run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub completed: usize,
    pub terminal: usize,
    pub aborted: usize,
    pub failed: usize,
    pub skipped: usize,
}

type Claim = (TaskKind, EntityKey);

#[derive(Debug, Default)]
pub struct CrawlLedger {
    in_flight: DashSet<Claim>,
    attempts: DashMap<Claim, u32>,
    completed: AtomicUsize,
    terminal: AtomicUsize,
    aborted: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
}

impl CrawlLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a `kind` task for `key` as in flight. `false` if one already is.
    pub fn claim(&self, kind: TaskKind, key: &EntityKey) -> bool {
        self.in_flight.insert((kind, key.clone()))
    }

    /// Drops a claim whose task never made it into the queue.
    pub fn unclaim(&self, kind: TaskKind, key: &EntityKey) {
        self.in_flight.remove(&(kind, key.clone()));
    }

    pub fn is_in_flight(&self, kind: TaskKind, key: &EntityKey) -> bool {
        self.in_flight.contains(&(kind, key.clone()))
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Records how a `kind` task for `key` ended and releases its claim.
    pub fn release(&self, kind: TaskKind, key: &EntityKey, result: &TaskResult) {
        let counter = match result {
            TaskResult::Finished(TaskOutcome::Complete { .. })
            | TaskResult::Finished(TaskOutcome::Downloaded { .. }) => &self.completed,
            TaskResult::Finished(TaskOutcome::Terminal) => &self.terminal,
            TaskResult::Finished(TaskOutcome::Aborted { .. }) => &self.aborted,
            TaskResult::Finished(TaskOutcome::Skipped) => &self.skipped,
            TaskResult::Failed(_) => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let claim = (kind, key.clone());
        if result.consumes_attempt() {
            *self.attempts.entry(claim.clone()).or_insert(0) += 1;
        }
        self.in_flight.remove(&claim);
    }

    /// Failed attempts recorded for `kind` tasks of `key` in this run.
    pub fn attempts(&self, kind: TaskKind, key: &EntityKey) -> u32 {
        self.attempts
            .get(&(kind, key.clone()))
            .map(|n| *n)
            .unwrap_or(0)
    }

    /// Number of `kind` claims that used up a budget of `max_attempts`.
    pub fn exhausted_count(&self, kind: TaskKind, max_attempts: u32) -> usize {
        self.attempts
            .iter()
            .filter(|entry| entry.key().0 == kind && *entry.value() >= max_attempts)
            .count()
    }

    pub fn counts(&self) -> OutcomeCounts {
        OutcomeCounts {
            completed: self.completed.load(Ordering::Relaxed),
            terminal: self.terminal.load(Ordering::Relaxed),
            aborted: self.aborted.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }
}
