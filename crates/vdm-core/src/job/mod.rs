//! Download job model: media classification, lifecycle status, id derivation,
//! and the request callers submit to the queue controller.

mod id;
mod request;
mod status;
mod types;

pub use id::{derive_job_id, normalize_name};
pub use request::DownloadRequest;
pub use status::{InvalidTransition, JobStatus};
pub use types::{EpisodeRef, Job, JobId, JobKind, MediaKind, MediaMetadata, ProgressUpdate};

pub(crate) use id::unix_millis;
pub(crate) use types::percent_of;
