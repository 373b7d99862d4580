use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Namespace label shared by every job in this deployment. All jobs live in
/// one group today; the field exists so identities stay forward-compatible
/// with a partitioned scheduler.
pub const JOB_GROUP: &str = "queue-jobs";

/// Payload forwarded unchanged to the queue client when the job fires.
/// Opaque to the scheduler itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    pub queue_id: i64,
    pub group_code: String,
    /// Optional slot; blank values are normalised to `None` at construction
    /// and omitted from the outbound call.
    pub slot_time: Option<String>,
}

impl JobPayload {
    pub fn new(queue_id: i64, group_code: impl Into<String>, slot_time: Option<String>) -> Self {
        Self {
            queue_id,
            group_code: group_code.into(),
            slot_time: slot_time.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// Lifecycle state of a job.
///
/// Only `Pending` jobs are held in the registry; `Fired` and `Cancelled`
/// are terminal and coincide with removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    /// Waiting in the registry for its timer.
    Pending,
    /// The timer elapsed and the payload was handed to the executor.
    Fired,
    /// Explicitly cancelled before firing; the executor never ran.
    Cancelled,
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobState::Pending => "pending",
            JobState::Fired => "fired",
            JobState::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// Read-only snapshot of a pending job, as returned by
/// [`Scheduler::pending`](crate::engine::Scheduler::pending).
#[derive(Debug, Clone, Serialize)]
pub struct JobInfo {
    pub name: String,
    pub group: &'static str,
    pub payload: JobPayload,
    pub execute_at: DateTime<Utc>,
    pub state: JobState,
}
