//! Errors surfaced by the queue controller to its callers.
//!
//! Transfer failures are not errors here: they are captured into the job's
//! `error` field and published as events.

use crate::agent::TransferError;
use crate::job::InvalidTransition;

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The request is missing a required field (url, name, series name).
    #[error("invalid download request: {0}")]
    InvalidRequest(String),
    /// The job store rejected a write. In-memory state stays authoritative.
    #[error("job store: {0:#}")]
    Store(#[source] anyhow::Error),
    #[error(transparent)]
    InvalidTransition(#[from] InvalidTransition),
    /// A direct agent call (storage info, open folder) failed.
    #[error("transfer agent: {0}")]
    Agent(#[from] TransferError),
}

pub type Result<T, E = ControllerError> = std::result::Result<T, E>;
