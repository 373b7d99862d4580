//! `qflow-queue` — the outbound queue-service collaborator.
//!
//! The scheduler core never talks HTTP directly: it depends on the
//! [`QueueClient`] trait only. [`HttpQueueClient`] is the production
//! implementation; tests substitute their own recording doubles.

pub mod client;
pub mod error;

pub use client::{HttpQueueClient, QueueClient};
pub use error::{QueueError, Result};
