//! Task data structures: priority, status, and the type-erased operation.

use std::any::Any;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use thiserror::Error;
use uuid::Uuid;

pub type TaskId = Uuid;

/// Dispatch priority. Ordered `Urgent > High > Normal > Low`; the derived
/// `Ord` gives that ordering directly since variants are declared low-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskPriority {
    Low,
    Normal,
    High,
    Urgent,
}

impl Default for TaskPriority {
    fn default() -> Self {
        TaskPriority::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Errors a task operation can fail with, as observed by the scheduler.
#[derive(Debug, Error, Clone)]
pub enum TaskError {
    #[error("task failed: {0}")]
    Failed(String),
    #[error("task timed out after {0:?}")]
    Timeout(Duration),
    #[error("task was cancelled")]
    Cancelled,
}

pub(crate) type BoxedValue = Box<dyn Any + Send + Sync>;
pub(crate) type OperationFuture = Pin<Box<dyn Future<Output = Result<BoxedValue, TaskError>> + Send>>;
pub(crate) type Operation = Box<dyn Fn() -> OperationFuture + Send + Sync>;

/// Wrap a typed async closure into the scheduler's type-erased operation.
pub(crate) fn box_operation<T, Fut, F>(f: F) -> Operation
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    T: Send + Sync + 'static,
{
    Box::new(move || {
        let fut = f();
        Box::pin(async move { fut.await.map(|v| Box::new(v) as BoxedValue) })
    })
}

/// A task waiting in the pending queue.
pub(crate) struct PendingTask {
    pub id: TaskId,
    pub priority: TaskPriority,
    pub seq: u64,
    pub operation: Operation,
    pub timeout: Option<Duration>,
    pub max_retries: u32,
    pub retry_count: u32,
    pub created_at: Instant,
}

impl PartialEq for PendingTask {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for PendingTask {}

impl PartialOrd for PendingTask {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingTask {
    /// `BinaryHeap` is a max-heap: higher priority pops first; within equal
    /// priority, the *smaller* sequence number (submitted earlier) pops
    /// first, so we reverse the seq comparison.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// A task that has reached a terminal state.
pub struct CompletedTask {
    pub id: TaskId,
    pub status: TaskStatus,
    pub result: Option<BoxedValue>,
    pub error: Option<TaskError>,
    pub completed_at: Instant,
}
