// src/crawl/queue.rs
//! Bounded FIFO of pending crawl tasks.
//!
//! Producers wait for space when the queue is full; nothing is dropped and
//! nothing errors. Consumers wait when it is empty. Once closed, the queue
//! drains and then yields `None` to every consumer.

use super::task::CrawlTask;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// A task as it travels through the queue.
pub type QueuedTask = Box<dyn CrawlTask>;

/// Returned when pushing onto a closed queue. Carries the rejected task.
#[derive(thiserror::Error)]
#[error("task queue is closed")]
pub struct QueueClosed(pub QueuedTask);

impl std::fmt::Debug for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("QueueClosed")
            .field(&self.0.entity_key().as_str())
            .finish()
    }
}

pub struct TaskQueue {
    sender: Mutex<Option<mpsc::Sender<QueuedTask>>>,
    receiver: tokio::sync::Mutex<mpsc::Receiver<QueuedTask>>,
    /// Tasks pushed and not yet popped. Counted when space is reserved, so
    /// it never trails the channel's real content.
    depth: AtomicUsize,
    capacity: usize,
}

impl TaskQueue {
    /// Creates an open queue holding at most `capacity` tasks.
    pub fn new(capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        Self {
            sender: Mutex::new(Some(sender)),
            receiver: tokio::sync::Mutex::new(receiver),
            depth: AtomicUsize::new(0),
            capacity: capacity.max(1),
        }
    }

    /// Appends a task, waiting for space while the queue is full.
    pub async fn push(&self, task: QueuedTask) -> Result<(), QueueClosed> {
        let Some(sender) = self.sender.lock().clone() else {
            return Err(QueueClosed(task));
        };
        let Ok(permit) = sender.reserve().await else {
            return Err(QueueClosed(task));
        };
        self.depth.fetch_add(1, Ordering::SeqCst);
        permit.send(task);
        Ok(())
    }

    /// Takes the oldest task, waiting while the queue is empty and open.
    /// `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<QueuedTask> {
        let task = self.receiver.lock().await.recv().await?;
        self.depth.fetch_sub(1, Ordering::SeqCst);
        Some(task)
    }

    /// Number of tasks waiting to be claimed.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Free slots right now.
    pub fn available(&self) -> usize {
        self.capacity.saturating_sub(self.depth())
    }

    /// Stops accepting new tasks. Queued tasks are still handed out.
    pub fn close(&self) {
        self.sender.lock().take();
    }

    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}
