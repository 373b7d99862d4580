//! `qflow-scheduler` — in-memory one-shot job scheduler.
//!
//! # Overview
//!
//! A job is a named, single-fire unit of work with an absolute UTC target
//! time. The [`engine::Scheduler`] keeps every pending job in a sharded
//! in-memory registry and arms one cancellable Tokio timer per job. When a
//! timer fires, the job is removed from the registry and its payload is
//! handed to the [`executor::JobExecutor`], which performs the queue-join
//! call and swallows any failure.
//!
//! The registry lives for the lifetime of the process: a restart silently
//! drops all pending jobs. Callers only ever learn that a job was
//! *accepted*; the outcome of the downstream join is visible in the log and
//! nowhere else.

pub mod engine;
pub mod error;
pub mod executor;
pub mod types;

pub use engine::Scheduler;
pub use error::{Result, SchedulerError};
pub use executor::JobExecutor;
pub use types::{JobInfo, JobPayload, JobState, JOB_GROUP};
