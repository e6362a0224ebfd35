//! The scheduler loop: priority dispatch, bounded concurrency, retry.
//!
//! Grounded on `original_source/crawler_engine/core/scheduler.py`'s
//! `TaskScheduler`: two queues (a priority-ordered pending list and a
//! running map), a single loop that garbage-collects, admits, and sleeps.

use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::stats::SchedulerStats;
use crate::task::{box_operation, CompletedTask, PendingTask, TaskError, TaskId, TaskPriority, TaskStatus};

const LOOP_INTERVAL: Duration = Duration::from_millis(100);
const COMPLETED_CAP: usize = 1000;
const MAX_RETRY_BACKOFF_SECS: u64 = 60;

struct RunningEntry {
    handle: JoinHandle<()>,
}

struct CompletedStore {
    order: VecDeque<TaskId>,
    by_id: HashMap<TaskId, CompletedTask>,
}

impl CompletedStore {
    fn new() -> Self {
        Self {
            order: VecDeque::new(),
            by_id: HashMap::new(),
        }
    }

    fn insert(&mut self, task: CompletedTask) {
        let id = task.id;
        self.order.push_back(id);
        self.by_id.insert(id, task);
        while self.order.len() > COMPLETED_CAP {
            if let Some(oldest) = self.order.pop_front() {
                self.by_id.remove(&oldest);
            }
        }
    }
}

struct Inner {
    max_concurrent: usize,
    pending: Mutex<BinaryHeap<PendingTask>>,
    running: Mutex<HashMap<TaskId, RunningEntry>>,
    completed: Mutex<CompletedStore>,
    seq: AtomicU64,
    total_submitted: AtomicU64,
    total_completed: AtomicU64,
    total_failed: AtomicU64,
    total_cancelled: AtomicU64,
    shutdown: AtomicBool,
}

/// Admission-controlled, priority-ordered, concurrency-limited async job
/// runner. See module docs for the algorithm.
pub struct Scheduler {
    inner: Arc<Inner>,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                max_concurrent,
                pending: Mutex::new(BinaryHeap::new()),
                running: Mutex::new(HashMap::new()),
                completed: Mutex::new(CompletedStore::new()),
                seq: AtomicU64::new(0),
                total_submitted: AtomicU64::new(0),
                total_completed: AtomicU64::new(0),
                total_failed: AtomicU64::new(0),
                total_cancelled: AtomicU64::new(0),
                shutdown: AtomicBool::new(false),
            }),
            loop_handle: Mutex::new(None),
        }
    }

    /// Submit a task. `f` is retried up to `max_retries` times on failure
    /// before the task is marked `Failed`.
    pub fn submit<T, Fut, F>(
        &self,
        priority: TaskPriority,
        timeout: Option<Duration>,
        max_retries: u32,
        f: F,
    ) -> TaskId
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
        T: Send + Sync + 'static,
    {
        let id = Uuid::new_v4();
        let seq = self.inner.seq.fetch_add(1, Ordering::SeqCst);
        let task = PendingTask {
            id,
            priority,
            seq,
            operation: box_operation(f),
            timeout,
            max_retries,
            retry_count: 0,
            created_at: Instant::now(),
        };
        self.inner.pending.lock().unwrap().push(task);
        self.inner.total_submitted.fetch_add(1, Ordering::SeqCst);
        tracing::info!(task_id = %id, ?priority, "task submitted");
        id
    }

    pub fn status(&self, id: TaskId) -> Option<TaskStatus> {
        if self.inner.running.lock().unwrap().contains_key(&id) {
            return Some(TaskStatus::Running);
        }
        if let Some(task) = self.inner.completed.lock().unwrap().by_id.get(&id) {
            return Some(task.status);
        }
        if self.inner.pending.lock().unwrap().iter().any(|t| t.id == id) {
            return Some(TaskStatus::Pending);
        }
        None
    }

    /// Downcast a completed task's boxed result into `T`.
    pub fn result<T: 'static + Clone>(&self, id: TaskId) -> Option<Result<T, TaskError>> {
        let completed = self.inner.completed.lock().unwrap();
        let task = completed.by_id.get(&id)?;
        match task.status {
            TaskStatus::Completed => {
                let value = task.result.as_ref()?.downcast_ref::<T>()?.clone();
                Some(Ok(value))
            }
            TaskStatus::Failed => Some(Err(task.error.clone().unwrap_or(TaskError::Failed("unknown".into())))),
            TaskStatus::Cancelled => Some(Err(TaskError::Cancelled)),
            _ => None,
        }
    }

    /// Cancel a task. Pending cancellation is synchronous; a running
    /// task's operation is aborted at its next suspension point.
    pub fn cancel(&self, id: TaskId) -> bool {
        {
            let mut pending = self.inner.pending.lock().unwrap();
            if pending.iter().any(|t| t.id == id) {
                let items: Vec<PendingTask> = std::mem::take(&mut *pending).into_vec();
                let mut rebuilt = BinaryHeap::new();
                for item in items {
                    if item.id != id {
                        rebuilt.push(item);
                    }
                }
                *pending = rebuilt;
                drop(pending);
                self.record_terminal(CompletedTask {
                    id,
                    status: TaskStatus::Cancelled,
                    result: None,
                    error: Some(TaskError::Cancelled),
                    completed_at: Instant::now(),
                });
                self.inner.total_cancelled.fetch_add(1, Ordering::SeqCst);
                return true;
            }
        }

        let mut running = self.inner.running.lock().unwrap();
        if let Some(entry) = running.remove(&id) {
            entry.handle.abort();
            drop(running);
            self.record_terminal(CompletedTask {
                id,
                status: TaskStatus::Cancelled,
                result: None,
                error: Some(TaskError::Cancelled),
                completed_at: Instant::now(),
            });
            self.inner.total_cancelled.fetch_add(1, Ordering::SeqCst);
            return true;
        }
        false
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            total_submitted: self.inner.total_submitted.load(Ordering::SeqCst),
            total_completed: self.inner.total_completed.load(Ordering::SeqCst),
            total_failed: self.inner.total_failed.load(Ordering::SeqCst),
            total_cancelled: self.inner.total_cancelled.load(Ordering::SeqCst),
            pending: self.inner.pending.lock().unwrap().len(),
            running: self.inner.running.lock().unwrap().len(),
            max_concurrent: self.inner.max_concurrent,
        }
    }

    /// Start the scheduler loop. A no-op if already started.
    pub fn start(&self) {
        let mut handle = self.loop_handle.lock().unwrap();
        if handle.is_some() {
            tracing::warn!("scheduler already running");
            return;
        }
        self.inner.shutdown.store(false, Ordering::SeqCst);
        let inner = self.inner.clone();
        *handle = Some(tokio::spawn(run_loop(inner)));
        tracing::info!(max_concurrent = self.inner.max_concurrent, "scheduler started");
    }

    /// Stop the loop and abort any still-running tasks, mirroring the
    /// Python original's `stop()`: signal shutdown, await the loop, then
    /// cancel everything still in flight.
    pub async fn stop(&self) {
        self.inner.shutdown.store(true, Ordering::SeqCst);
        let handle = self.loop_handle.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        let running_ids: Vec<TaskId> = self.inner.running.lock().unwrap().keys().copied().collect();
        for id in running_ids {
            self.cancel(id);
        }
        tracing::info!("scheduler stopped");
    }

    fn record_terminal(&self, task: CompletedTask) {
        self.inner.completed.lock().unwrap().insert(task);
    }
}

async fn run_loop(inner: Arc<Inner>) {
    tracing::info!("scheduler loop started");
    loop {
        if inner.shutdown.load(Ordering::SeqCst) {
            break;
        }

        let to_start = {
            let running_len = inner.running.lock().unwrap().len();
            let capacity = inner.max_concurrent.saturating_sub(running_len);
            if capacity == 0 {
                Vec::new()
            } else {
                let mut pending = inner.pending.lock().unwrap();
                let mut started = Vec::with_capacity(capacity);
                for _ in 0..capacity {
                    match pending.pop() {
                        Some(task) => started.push(task),
                        None => break,
                    }
                }
                started
            }
        };

        for task in to_start {
            spawn_task(inner.clone(), task);
        }

        tokio::time::sleep(LOOP_INTERVAL).await;
    }
    tracing::info!("scheduler loop exited");
}

fn spawn_task(inner: Arc<Inner>, task: PendingTask) {
    let id = task.id;
    let PendingTask {
        operation,
        timeout,
        max_retries,
        retry_count,
        priority,
        ..
    } = task;

    let inner_for_task = inner.clone();
    let handle = tokio::spawn(async move {
        let outcome = match timeout {
            Some(d) => match tokio::time::timeout(d, operation()).await {
                Ok(result) => result,
                Err(_) => Err(TaskError::Timeout(d)),
            },
            None => operation().await,
        };

        // If we're not still the owner of our running slot, we were
        // cancelled out from under us — don't overwrite that verdict.
        let still_owned = inner_for_task.running.lock().unwrap().remove(&id).is_some();
        if !still_owned {
            return;
        }

        match outcome {
            Ok(value) => {
                inner_for_task.total_completed.fetch_add(1, Ordering::SeqCst);
                inner_for_task.completed.lock().unwrap().insert(CompletedTask {
                    id,
                    status: TaskStatus::Completed,
                    result: Some(value),
                    error: None,
                    completed_at: Instant::now(),
                });
            }
            Err(err) => {
                if retry_count < max_retries {
                    let backoff_secs = 2u64.saturating_pow(retry_count).min(MAX_RETRY_BACKOFF_SECS);
                    tracing::warn!(task_id = %id, retry_count, backoff_secs, error = %err, "task failed, retrying");
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    let seq = inner_for_task.seq.fetch_add(1, Ordering::SeqCst);
                    inner_for_task.pending.lock().unwrap().push(PendingTask {
                        id,
                        priority,
                        seq,
                        operation,
                        timeout,
                        max_retries,
                        retry_count: retry_count + 1,
                        created_at: Instant::now(),
                    });
                } else {
                    tracing::error!(task_id = %id, error = %err, "task failed permanently");
                    inner_for_task.total_failed.fetch_add(1, Ordering::SeqCst);
                    inner_for_task.completed.lock().unwrap().insert(CompletedTask {
                        id,
                        status: TaskStatus::Failed,
                        result: None,
                        error: Some(err),
                        completed_at: Instant::now(),
                    });
                }
            }
        }
    });

    inner.running.lock().unwrap().insert(id, RunningEntry { handle });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::time::Duration as StdDuration;

    async fn settle(scheduler: &Scheduler, id: TaskId, max_wait: StdDuration) {
        let start = Instant::now();
        loop {
            match scheduler.status(id) {
                Some(TaskStatus::Completed) | Some(TaskStatus::Failed) | Some(TaskStatus::Cancelled) => return,
                _ => {
                    if start.elapsed() > max_wait {
                        panic!("task {id} did not settle in time");
                    }
                    tokio::time::sleep(StdDuration::from_millis(20)).await;
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn higher_priority_runs_first_under_concurrency_limit() {
        let scheduler = Scheduler::new(1);
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut ids = Vec::new();
        for (priority, tag) in [
            (TaskPriority::Low, 1u32),
            (TaskPriority::Urgent, 2u32),
            (TaskPriority::Normal, 3u32),
            (TaskPriority::High, 4u32),
        ] {
            let order = order.clone();
            let id = scheduler.submit(priority, None, 0, move || {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push(tag);
                    Ok::<u32, TaskError>(tag)
                }
            });
            ids.push(id);
        }

        scheduler.start();
        for id in &ids {
            settle(&scheduler, *id, StdDuration::from_secs(5)).await;
        }
        scheduler.stop().await;

        // Urgent, High, Normal, Low: priority order, not submission order.
        assert_eq!(*order.lock().unwrap(), vec![2, 4, 3, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn respects_max_concurrent() {
        let scheduler = Scheduler::new(2);
        let active = Arc::new(AtomicU32::new(0));
        let peak = Arc::new(AtomicU32::new(0));

        let mut ids = Vec::new();
        for _ in 0..5 {
            let active = active.clone();
            let peak = peak.clone();
            let id = scheduler.submit(TaskPriority::Normal, None, 0, move || {
                let active = active.clone();
                let peak = peak.clone();
                async move {
                    let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(StdDuration::from_millis(200)).await;
                    active.fetch_sub(1, Ordering::SeqCst);
                    Ok::<(), TaskError>(())
                }
            });
            ids.push(id);
        }

        scheduler.start();
        for id in &ids {
            settle(&scheduler, *id, StdDuration::from_secs(10)).await;
        }
        scheduler.stop().await;

        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_task_retries_then_succeeds() {
        let scheduler = Scheduler::new(1);
        let attempts = Arc::new(AtomicU32::new(0));
        let attempts_clone = attempts.clone();

        let id = scheduler.submit(TaskPriority::Normal, None, 2, move || {
            let attempts = attempts_clone.clone();
            async move {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(TaskError::Failed("not yet".into()))
                } else {
                    Ok::<u32, TaskError>(n)
                }
            }
        });

        scheduler.start();
        settle(&scheduler, id, StdDuration::from_secs(120)).await;
        scheduler.stop().await;

        assert_eq!(scheduler.status(id), Some(TaskStatus::Completed));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_pending_task_marks_it_cancelled() {
        let scheduler = Scheduler::new(0);
        let id = scheduler.submit(TaskPriority::Normal, None, 0, || async { Ok::<(), TaskError>(()) });

        assert_eq!(scheduler.status(id), Some(TaskStatus::Pending));
        assert!(scheduler.cancel(id));
        assert_eq!(scheduler.status(id), Some(TaskStatus::Cancelled));
    }
}
