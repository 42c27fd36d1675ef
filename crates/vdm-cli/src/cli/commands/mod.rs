//! CLI command handlers.

mod add;
mod control;
mod docs;
mod run;
mod status;

pub use add::run_add;
pub use control::{run_control, ControlAction};
pub use docs::{run_completions, run_man};
pub use run::run_foreground;
pub use status::{run_open_storage, run_status, run_storage, run_tree};
#[cfg(test)]
pub(crate) use status::stored_jobs;
