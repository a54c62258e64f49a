//! Progress notifications emitted while a synthesis task is still running.
//!
//! Purely informational: a sink never influences the poll loop, and the
//! default sink discards everything.

use super::types::{TaskId, TaskStatus};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// One non-terminal poll result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    pub task_id: TaskId,
    /// 1-based number of the query that produced `status`.
    pub attempt: u32,
    pub max_attempts: u32,
    pub status: TaskStatus,
}

#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn on_progress(&self, progress: &PollProgress);
}

pub struct NoopProgressSink;

#[async_trait]
impl ProgressSink for NoopProgressSink {
    async fn on_progress(&self, _progress: &PollProgress) {}
}

pub fn noop_sink() -> Arc<dyn ProgressSink> {
    Arc::new(NoopProgressSink)
}

/// Records every notification; handy in tests and for post-mortem inspection.
#[derive(Default)]
pub struct InMemoryProgressSink {
    events: Mutex<Vec<PollProgress>>,
}

impl InMemoryProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PollProgress> {
        self.events
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProgressSink for InMemoryProgressSink {
    async fn on_progress(&self, progress: &PollProgress) {
        if let Ok(mut events) = self.events.lock() {
            events.push(progress.clone());
        }
    }
}

/// Forwards notifications to a closure.
pub struct FnProgressSink<F>(pub F);

#[async_trait]
impl<F> ProgressSink for FnProgressSink<F>
where
    F: Fn(&PollProgress) + Send + Sync,
{
    async fn on_progress(&self, progress: &PollProgress) {
        (self.0)(progress)
    }
}
