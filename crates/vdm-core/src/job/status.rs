//! Job lifecycle status and the transitions the controller may apply.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a download job, stored as a string in the database.
///
/// Permitted transitions:
/// `pending → downloading → {completed | failed | paused}`,
/// `paused → pending`, `failed → pending`. Removal is not a status; a removed
/// job simply disappears from the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Downloading,
    Paused,
    Completed,
    Failed,
}

/// Returned when a transition outside the state machine is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid job transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: JobStatus,
    pub to: JobStatus,
}

impl JobStatus {
    pub const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::Downloading,
        JobStatus::Paused,
        JobStatus::Completed,
        JobStatus::Failed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Downloading => "downloading",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Parse a stored status. Unknown values map to `Failed` so the job stays
    /// visible with a resume affordance instead of silently vanishing.
    pub fn from_str(s: &str) -> Self {
        match s {
            "pending" => JobStatus::Pending,
            "downloading" => JobStatus::Downloading,
            "paused" => JobStatus::Paused,
            "completed" => JobStatus::Completed,
            _ => JobStatus::Failed,
        }
    }

    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Downloading)
                | (Downloading, Completed)
                | (Downloading, Failed)
                | (Downloading, Paused)
                | (Paused, Pending)
                | (Failed, Pending)
        )
    }

    /// Completed jobs accept no further transitions (only deletion).
    pub fn is_terminal(self) -> bool {
        self == JobStatus::Completed
    }

    /// Jobs that still occupy or wait for a transfer slot.
    pub fn is_outstanding(self) -> bool {
        matches!(self, JobStatus::Pending | JobStatus::Downloading)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
