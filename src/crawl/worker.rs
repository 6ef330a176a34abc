// src/crawl/worker.rs
//! Fixed-size pool of workers draining the task queue.
//!
//! Each worker claims one task at a time and runs it to completion. A task
//! that errors or panics is logged and counted, and the worker moves on.
//! When the queue is closed and drained, the worker reports its id on the
//! completion channel and exits.

use super::ledger::{CrawlLedger, TaskResult};
use super::queue::TaskQueue;
use super::task::TaskOutcome;
use crate::error::FailureClass;
use crate::error_recovery::CooldownPolicy;
use crate::logging::Logger;
use crate::storage::GraphStore;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Shared resources every worker runs against.
#[derive(Clone)]
pub struct WorkerContext {
    pub queue: Arc<TaskQueue>,
    pub store: Arc<dyn GraphStore>,
    pub ledger: Arc<CrawlLedger>,
    pub cooldown: CooldownPolicy,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    finished: mpsc::UnboundedReceiver<usize>,
}

impl WorkerPool {
    /// Starts `size` workers. Worker ids run from 1 to `size`.
    pub fn spawn(size: usize, context: WorkerContext, log: &Logger) -> Self {
        let (done_tx, finished) = mpsc::unbounded_channel();

        let handles = (1..=size)
            .map(|id| {
                let worker = Worker {
                    id,
                    context: context.clone(),
                    log: log.child(format_args!("Worker {}", id)),
                };
                let done_tx = done_tx.clone();
                tokio::spawn(async move {
                    worker.run().await;
                    // The pool may already be gone during shutdown.
                    let _ = done_tx.send(id);
                })
            })
            .collect();

        Self { handles, finished }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Waits for the next worker to report completion. `None` once every
    /// worker has exited.
    pub async fn next_finished(&mut self) -> Option<usize> {
        self.finished.recv().await
    }

    /// Waits until all worker tasks have ended.
    pub async fn join(self) {
        for result in futures::future::join_all(self.handles).await {
            if let Err(err) = result {
                log::error!("Worker task ended abnormally: {}", err);
            }
        }
    }
}

struct Worker {
    id: usize,
    context: WorkerContext,
    log: Logger,
}

impl Worker {
    async fn run(self) {
        self.log.debug(format_args!("started"));
        let mut handled = 0usize;

        while let Some(task) = self.context.queue.pop().await {
            let (kind, key) = (task.kind(), task.entity_key().clone());
            let execution = AssertUnwindSafe(task.execute(self.context.store.as_ref()))
                .catch_unwind()
                .await;

            let result = match execution {
                Ok(Ok(outcome)) => TaskResult::Finished(outcome),
                Ok(Err(err)) => {
                    self.log
                        .error(format_args!("{} task for '{}' failed: {}", kind, key, err));
                    TaskResult::Failed(err.class())
                }
                Err(panic) => {
                    self.log.error(format_args!(
                        "{} task for '{}' panicked: {}",
                        kind,
                        key,
                        panic_message(panic.as_ref())
                    ));
                    TaskResult::Failed(FailureClass::Transient)
                }
            };
            self.context.ledger.release(kind, &key, &result);
            handled += 1;

            if let Some(pause) = self.cooldown_after(&result) {
                self.log.info(format_args!("cooling down for {:?}", pause));
                tokio::time::sleep(pause).await;
            }
        }

        self.log.debug(format_args!(
            "queue closed after {} tasks, worker {} exiting",
            handled, self.id
        ));
    }

    fn cooldown_after(&self, result: &TaskResult) -> Option<std::time::Duration> {
        match result {
            TaskResult::Finished(TaskOutcome::Aborted { class, retry_after }) => {
                self.context.cooldown.cooldown_for(*class, *retry_after)
            }
            TaskResult::Failed(class) => self.context.cooldown.cooldown_for(*class, None),
            TaskResult::Finished(_) => None,
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
