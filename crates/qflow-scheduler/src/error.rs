use thiserror::Error;

/// Errors returned by the scheduling operations.
///
/// Collaborator failures never appear here: the executor confines them to
/// the firing path (see [`crate::executor::JobExecutor`]).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchedulerError {
    /// A job with this name is already pending. The existing job and its
    /// timer are left untouched.
    #[error("Job already pending: {name}")]
    DuplicateJob { name: String },

    /// No pending job with this name (never scheduled, already fired, or
    /// already cancelled).
    #[error("Job not found: {name}")]
    JobNotFound { name: String },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
