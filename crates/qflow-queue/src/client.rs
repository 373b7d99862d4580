use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{QueueError, Result};

/// Interface to the external queue service.
///
/// Implementations must be `Send + Sync` so the executor can call them from
/// independently spawned firing tasks.
#[async_trait]
pub trait QueueClient: Send + Sync {
    /// Join queue `queue_id` on behalf of `group_code`, optionally for a
    /// specific slot. `slot_time` of `None` is omitted from the request
    /// entirely, never sent as an empty value.
    async fn join_queue(
        &self,
        queue_id: i64,
        group_code: &str,
        slot_time: Option<&str>,
    ) -> Result<()>;
}

/// JSON body for `POST /queues/{id}/join`.
#[derive(Debug, Serialize)]
struct JoinQueueBody<'a> {
    group_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    slot_time: Option<&'a str>,
}

/// Production [`QueueClient`] over HTTP.
pub struct HttpQueueClient {
    client: reqwest::Client,
    /// Queue-service base URL without a trailing slash.
    base_url: String,
}

impl HttpQueueClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

}

#[async_trait]
impl QueueClient for HttpQueueClient {
    async fn join_queue(
        &self,
        queue_id: i64,
        group_code: &str,
        slot_time: Option<&str>,
    ) -> Result<()> {
        let url = format!("{}/queues/{}/join", self.base_url, queue_id);
        let body = JoinQueueBody {
            group_code,
            slot_time: slot_time.filter(|s| !s.trim().is_empty()),
        };

        debug!(queue_id, %group_code, "joining queue");

        let resp = self.client.post(&url).json(&body).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(QueueError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let text = resp.text().await.unwrap_or_default();
        info!(queue_id, status = status.as_u16(), body = %text, "join queue response");
        Ok(())
    }
}
