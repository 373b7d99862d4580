//! `qflow-core` — shared configuration and constants for the QFlow workspace.

pub mod config;
pub mod error;

pub use config::QflowConfig;
pub use error::{QflowError, Result};
