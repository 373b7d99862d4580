use thiserror::Error;

/// Errors that can occur while talking to the external queue service.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The request never completed (connect failure, timeout, DNS, …).
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The queue service answered with a non-success status.
    #[error("Queue service returned {status}: {body}")]
    Status { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, QueueError>;
