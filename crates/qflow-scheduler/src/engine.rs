use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use qflow_queue::QueueClient;
use tokio::task::AbortHandle;
use tracing::{debug, info};

use crate::{
    error::{Result, SchedulerError},
    executor::JobExecutor,
    types::{JobInfo, JobPayload, JobState, JOB_GROUP},
};

/// A job waiting in the registry: its payload plus the handle that disarms
/// its timer task.
struct PendingJob {
    payload: JobPayload,
    execute_at: DateTime<Utc>,
    /// Which incarnation of this name the entry belongs to. A timer may
    /// wake after its job was cancelled and the name reused; the token lets
    /// the firing path tell its own entry from a successor's.
    generation: u64,
    timer: AbortHandle,
}

struct Inner {
    /// Pending registry, keyed by job name. The sharded map gives per-key
    /// serialisation; operations on distinct names never contend on the
    /// same lock.
    registry: DashMap<String, PendingJob>,
    executor: JobExecutor,
    /// Source of generation tokens, one per accepted job.
    generation: AtomicU64,
}

/// One-shot job scheduler.
///
/// Cheap to clone; all clones share one registry. `schedule` and `cancel`
/// return as soon as the registry mutation is committed — no operation on
/// the scheduling path ever waits on network I/O.
///
/// Must be used from within a Tokio runtime: each accepted job spawns one
/// timer task.
#[derive(Clone)]
pub struct Scheduler {
    inner: Arc<Inner>,
}

impl Scheduler {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: DashMap::new(),
                executor: JobExecutor::new(client),
                generation: AtomicU64::new(0),
            }),
        }
    }

    /// Register `name` to fire once at `execute_at`.
    ///
    /// A target time at or before now is not rejected: the timer is armed
    /// with zero delay and the job fires immediately, still without
    /// blocking this call. Fails with [`SchedulerError::DuplicateJob`] if a
    /// pending job already holds the name; the existing job and its timer
    /// are left untouched.
    pub fn schedule(
        &self,
        name: &str,
        payload: JobPayload,
        execute_at: DateTime<Utc>,
    ) -> Result<()> {
        // Entry keeps the duplicate check and the insert atomic: two
        // concurrent schedules for one name cannot both pass the check.
        match self.inner.registry.entry(name.to_string()) {
            Entry::Occupied(_) => Err(SchedulerError::DuplicateJob {
                name: name.to_string(),
            }),
            Entry::Vacant(slot) => {
                let delay = (execute_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
                let inner = Arc::clone(&self.inner);
                let job_name = name.to_string();
                let timer = tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    fire(inner, job_name, generation).await;
                });

                // A zero-delay timer can reach its removal before this
                // insert; the shard lock held by the entry guard makes it
                // wait until the entry exists.
                slot.insert(PendingJob {
                    payload,
                    execute_at,
                    generation,
                    timer: timer.abort_handle(),
                });
                info!(job = %name, group = JOB_GROUP, %execute_at, "job scheduled");
                Ok(())
            }
        }
    }

    /// Cancel the pending job `name` and disarm its timer.
    ///
    /// Returns [`SchedulerError::JobNotFound`] when the name is not pending
    /// (never scheduled, already fired, or already cancelled); the registry
    /// is untouched in that case.
    pub fn cancel(&self, name: &str) -> Result<()> {
        match self.inner.registry.remove(name) {
            Some((_, job)) => {
                // Removal above already decided the cancel/fire race in our
                // favour; the abort is just cleanup and is a no-op if the
                // timer task has started running.
                job.timer.abort();
                info!(job = %name, state = %JobState::Cancelled, "job cancelled");
                Ok(())
            }
            None => Err(SchedulerError::JobNotFound {
                name: name.to_string(),
            }),
        }
    }

    /// Snapshot of all pending jobs, ordered by target time.
    pub fn pending(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<JobInfo> = self
            .inner
            .registry
            .iter()
            .map(|entry| JobInfo {
                name: entry.key().clone(),
                group: JOB_GROUP,
                payload: entry.value().payload.clone(),
                execute_at: entry.value().execute_at,
                state: JobState::Pending,
            })
            .collect();
        jobs.sort_by_key(|j| j.execute_at);
        jobs
    }

    /// Number of pending jobs.
    pub fn len(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.is_empty()
    }
}

/// Timer expiry path. The registry removal is the single point of truth for
/// the cancel/fire race: whichever side removes the entry first wins, so a
/// timer that loses simply finds nothing and exits. The executor runs here,
/// on the timer's own task, after the entry is out — no registry lock is
/// held across the network call.
///
/// The removal is conditioned on `generation`: an abort can land after the
/// sleep has already returned, and by then the name may have been cancelled
/// and reused. A stale timer must not extract the successor's entry.
async fn fire(inner: Arc<Inner>, name: String, generation: u64) {
    let removed = inner
        .registry
        .remove_if(&name, |_, job| job.generation == generation);
    let Some((_, job)) = removed else {
        debug!(job = %name, "timer fired after cancellation, ignoring");
        return;
    };
    info!(job = %name, state = %JobState::Fired, queue_id = job.payload.queue_id, "job fired");
    inner.executor.execute(&name, &job.payload).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Duration as ChronoDuration;
    use qflow_queue::QueueError;
    use std::sync::Mutex;

    /// Recording double for the queue collaborator. `fail` makes every call
    /// return a status error after recording it.
    struct RecordingClient {
        calls: Mutex<Vec<(i64, String, Option<String>)>>,
        fail: bool,
    }

    impl RecordingClient {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            })
        }

        fn calls(&self) -> Vec<(i64, String, Option<String>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueueClient for RecordingClient {
        async fn join_queue(
            &self,
            queue_id: i64,
            group_code: &str,
            slot_time: Option<&str>,
        ) -> qflow_queue::Result<()> {
            self.calls.lock().unwrap().push((
                queue_id,
                group_code.to_string(),
                slot_time.map(str::to_string),
            ));
            if self.fail {
                Err(QueueError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn payload(queue_id: i64) -> JobPayload {
        JobPayload::new(queue_id, "G1", None)
    }

    fn in_secs(secs: i64) -> DateTime<Utc> {
        Utc::now() + ChronoDuration::seconds(secs)
    }

    // Paused-clock tests: sleeps auto-advance, so "waiting out" a timer is
    // instant and deterministic.

    #[tokio::test(start_paused = true)]
    async fn future_job_fires_once_with_payload() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("job1", payload(42), in_secs(2)).unwrap();
        assert_eq!(scheduler.len(), 1);

        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(client.calls(), vec![(42, "G1".to_string(), None)]);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn past_execute_at_fires_immediately() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("late", payload(7), in_secs(-30)).unwrap();

        // Only yields, no nominal delay: the zero-delay timer must run now.
        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(client.calls().len(), 1);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_fire_prevents_execution() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("job2", payload(1), in_secs(10)).unwrap();
        scheduler.cancel("job2").unwrap();
        assert!(scheduler.is_empty());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_name_rejected_and_original_intact() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("dup", payload(5), in_secs(1)).unwrap();
        let err = scheduler.schedule("dup", payload(99), in_secs(1)).unwrap_err();
        assert_eq!(
            err,
            SchedulerError::DuplicateJob {
                name: "dup".to_string()
            }
        );

        tokio::time::sleep(Duration::from_secs(3)).await;

        // The first job's timer fired exactly once, with the first payload.
        assert_eq!(client.calls(), vec![(5, "G1".to_string(), None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_unknown_name_returns_not_found() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        let err = scheduler.cancel("ghost").unwrap_err();
        assert_eq!(
            err,
            SchedulerError::JobNotFound {
                name: "ghost".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_after_fire_returns_not_found() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("gone", payload(3), in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The fire won the race; exactly one of {cancel Ok, executor call}.
        assert_eq!(client.calls().len(), 1);
        let err = scheduler.cancel("gone").unwrap_err();
        assert_eq!(
            err,
            SchedulerError::JobNotFound {
                name: "gone".to_string()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_is_not_repeatable() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("once", payload(3), in_secs(60)).unwrap();
        scheduler.cancel("once").unwrap();
        assert!(scheduler.cancel("once").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn distinct_names_are_independent() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("a", payload(1), in_secs(5)).unwrap();
        scheduler.schedule("b", payload(2), in_secs(5)).unwrap();
        scheduler.cancel("a").unwrap();

        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(client.calls(), vec![(2, "G1".to_string(), None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn collaborator_failure_is_confined() {
        let client = RecordingClient::failing();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("bad", payload(9), in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // The call happened, the error was swallowed, and the scheduler
        // still accepts and fires new jobs.
        assert_eq!(client.calls().len(), 1);
        assert!(scheduler.is_empty());

        scheduler.schedule("next", payload(10), in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slot_time_is_passed_through() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        let p = JobPayload::new(11, "G2", Some("10:30".to_string()));
        scheduler.schedule("slotted", p, in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            client.calls(),
            vec![(11, "G2".to_string(), Some("10:30".to_string()))]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn name_reusable_after_fire_and_after_cancel() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("reuse", payload(1), in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.schedule("reuse", payload(2), in_secs(1)).unwrap();
        scheduler.cancel("reuse").unwrap();
        scheduler.schedule("reuse", payload(3), in_secs(1)).unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(
            client.calls(),
            vec![(1, "G1".to_string(), None), (3, "G1".to_string(), None)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn stale_timer_cannot_remove_successor_entry() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        // First incarnation of "x" takes generation 0, then is cancelled
        // and the name reused for generation 1.
        scheduler.schedule("x", payload(1), in_secs(60)).unwrap();
        scheduler.cancel("x").unwrap();
        scheduler.schedule("x", payload(2), in_secs(60)).unwrap();

        // A timer whose abort landed after its sleep returned would run the
        // expiry path with the old generation. It must leave the successor
        // untouched.
        fire(Arc::clone(&scheduler.inner), "x".to_string(), 0).await;

        assert!(client.calls().is_empty());
        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.pending()[0].payload, payload(2));

        // The successor still fires normally with its own payload.
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(client.calls(), vec![(2, "G1".to_string(), None)]);
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduled_name_fires_only_at_its_own_target_time() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client.clone());

        scheduler.schedule("x", payload(1), in_secs(5)).unwrap();
        scheduler.cancel("x").unwrap();
        scheduler.schedule("x", payload(2), in_secs(60)).unwrap();

        // Past the first job's target: nothing may fire yet.
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(client.calls().is_empty());
        assert_eq!(scheduler.len(), 1);

        // Past the second job's target: exactly one fire, second payload.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.calls(), vec![(2, "G1".to_string(), None)]);
        assert!(scheduler.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn pending_snapshot_is_ordered_by_target_time() {
        let client = RecordingClient::new();
        let scheduler = Scheduler::new(client);

        scheduler.schedule("later", payload(2), in_secs(120)).unwrap();
        scheduler.schedule("sooner", payload(1), in_secs(60)).unwrap();

        let pending = scheduler.pending();
        let names: Vec<&str> = pending.iter().map(|j| j.name.as_str()).collect();
        assert_eq!(names, vec!["sooner", "later"]);
        assert!(pending.iter().all(|j| j.state == JobState::Pending));
        assert!(pending.iter().all(|j| j.group == JOB_GROUP));
    }
}
