pub mod config;
pub mod logging;

pub mod agent;
pub mod control;
pub mod controller;
pub mod error;
pub mod events;
pub mod job;
pub mod store;
pub mod view;

pub use agent::{CurlAgent, StorageInfo, TransferAgent};
pub use controller::{ControllerConfig, QueueController};
pub use error::ControllerError;
pub use events::{DownloadEvent, EventReceiver};
pub use job::{DownloadRequest, EpisodeRef, Job, JobKind, JobStatus, MediaKind, MediaMetadata};
pub use view::{GroupedView, SeasonGroup, SeriesGroup};
