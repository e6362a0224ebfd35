/// Scheduler-wide counters, safe to read without locking the queues.
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    pub total_submitted: u64,
    pub total_completed: u64,
    pub total_failed: u64,
    pub total_cancelled: u64,
    pub pending: usize,
    pub running: usize,
    pub max_concurrent: usize,
}
