use std::sync::Arc;

use qflow_queue::QueueClient;
use tracing::{error, info};

use crate::types::JobPayload;

/// Turns a fired job's payload into a queue-join call and isolates failures.
///
/// The executor is the end of the line for a job: by the time it runs, the
/// scheduler has already forgotten the job, so a failed join is logged and
/// dropped. There is no retry and no dead-letter path.
pub struct JobExecutor {
    client: Arc<dyn QueueClient>,
}

impl JobExecutor {
    pub fn new(client: Arc<dyn QueueClient>) -> Self {
        Self { client }
    }

    /// Execute the join call for a fired job. Never returns an error and
    /// never panics across the firing boundary: the outcome is observable
    /// only through the log.
    pub async fn execute(&self, name: &str, payload: &JobPayload) {
        let result = self
            .client
            .join_queue(
                payload.queue_id,
                &payload.group_code,
                payload.slot_time.as_deref(),
            )
            .await;

        match result {
            Ok(()) => {
                info!(job = %name, queue_id = payload.queue_id, "joined queue");
            }
            Err(e) => {
                error!(job = %name, queue_id = payload.queue_id, error = %e, "failed to join queue");
            }
        }
    }
}
