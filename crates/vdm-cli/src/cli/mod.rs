//! CLI for the VDM offline download manager.

mod commands;
mod control_socket;

use anyhow::{bail, Result};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::sync::Arc;
use vdm_core::config::{self, VdmConfig};
use vdm_core::store::JobStore;
use vdm_core::{ControllerConfig, CurlAgent, JobStatus, QueueController};

use commands::{
    run_add, run_completions, run_control, run_foreground, run_man, run_open_storage,
    run_status, run_storage, run_tree, ControlAction,
};

/// Top-level CLI for the VDM download manager.
#[derive(Debug, Parser)]
#[command(name = "vdm")]
#[command(about = "VDM: offline downloads of IPTV movies and series", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Queue a movie or episode and download it in the foreground.
    #[command(subcommand)]
    Add(AddCommand),

    /// Download queued jobs in the foreground until none are left.
    Run,

    /// List jobs, newest first.
    Status {
        /// Only show jobs in this status.
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show movies and the series/season/episode tree.
    Tree {
        #[arg(long)]
        json: bool,
    },

    /// Pause a downloading job.
    Pause {
        /// Job identifier.
        id: String,
    },

    /// Resume a paused or failed job.
    Resume {
        /// Job identifier.
        id: String,
    },

    /// Cancel an unfinished job and discard its partial data.
    Cancel {
        /// Job identifier.
        id: String,
    },

    /// Delete a job in any state, including its downloaded file.
    Delete {
        /// Job identifier.
        id: String,
    },

    /// Delete every episode of a series and the series folder.
    DeleteSeries {
        /// Series name as shown by `vdm tree`.
        name: String,
    },

    /// Show disk usage of the download folder.
    Storage {
        #[arg(long)]
        json: bool,
    },

    /// Open the download folder in the file manager.
    OpenStorage,

    /// Print shell completions.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Print the man page.
    Man,
}

#[derive(Debug, Subcommand)]
pub enum AddCommand {
    /// Queue a movie.
    Movie {
        /// Resolved stream URL.
        url: String,
        /// Display name (also used for the file name).
        #[arg(long)]
        name: String,
        #[command(flatten)]
        meta: MetadataArgs,
    },

    /// Queue one episode of a series.
    Episode {
        /// Resolved stream URL.
        url: String,
        /// Episode title.
        #[arg(long)]
        name: String,
        /// Series name (groups episodes and their cover).
        #[arg(long)]
        series: String,
        #[arg(long)]
        series_id: Option<String>,
        #[arg(long)]
        season: u32,
        #[arg(long)]
        episode: u32,
        #[command(flatten)]
        meta: MetadataArgs,
    },
}

/// Optional display metadata for `vdm add`.
#[derive(Debug, Default, Args)]
pub struct MetadataArgs {
    /// Cover image URL.
    #[arg(long)]
    pub cover: Option<String>,
    #[arg(long)]
    pub plot: Option<String>,
    #[arg(long)]
    pub rating: Option<f64>,
    #[arg(long)]
    pub year: Option<u32>,
    /// Genre (repeatable).
    #[arg(long = "genre")]
    pub genres: Vec<String>,
    /// Duration in seconds.
    #[arg(long, value_name = "SECS")]
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Downloading,
    Paused,
    Completed,
    Failed,
}

impl From<StatusArg> for JobStatus {
    fn from(s: StatusArg) -> Self {
        match s {
            StatusArg::Pending => JobStatus::Pending,
            StatusArg::Downloading => JobStatus::Downloading,
            StatusArg::Paused => JobStatus::Paused,
            StatusArg::Completed => JobStatus::Completed,
            StatusArg::Failed => JobStatus::Failed,
        }
    }
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();

        match cli.command {
            CliCommand::Completions { shell } => return run_completions(shell),
            CliCommand::Man => return run_man(),
            command => {
                let cfg = config::load_or_init()?;
                tracing::debug!("loaded config: {:?}", cfg);
                command.run(&cfg).await
            }
        }
    }

    async fn run(self, cfg: &VdmConfig) -> Result<()> {
        match self {
            CliCommand::Add(add) => {
                if control_socket::runner_active().await {
                    bail!("another vdm is downloading; add the job once it has finished");
                }
                run_add(&open_controller(cfg).await?, add).await?
            }
            CliCommand::Run => {
                if control_socket::runner_active().await {
                    bail!("another vdm is already running");
                }
                run_foreground(&open_controller(cfg).await?).await?
            }
            CliCommand::Status { status, json } => {
                run_status(status.map(JobStatus::from), json).await?
            }
            CliCommand::Tree { json } => run_tree(json).await?,
            CliCommand::Pause { id } => run_control(cfg, ControlAction::Pause, &id).await?,
            CliCommand::Resume { id } => run_control(cfg, ControlAction::Resume, &id).await?,
            CliCommand::Cancel { id } => run_control(cfg, ControlAction::Cancel, &id).await?,
            CliCommand::Delete { id } => run_control(cfg, ControlAction::Delete, &id).await?,
            CliCommand::DeleteSeries { name } => {
                run_control(cfg, ControlAction::DeleteSeries, &name).await?
            }
            CliCommand::Storage { json } => run_storage(cfg, json).await?,
            CliCommand::OpenStorage => run_open_storage(cfg).await?,
            CliCommand::Completions { .. } | CliCommand::Man => {}
        }
        Ok(())
    }
}

/// Controller over the default store and the curl agent.
///
/// Loading marks jobs left downloading as paused, so this process must be the
/// only one driving the queue: check `control_socket::runner_active` first.
pub(crate) async fn open_controller(cfg: &VdmConfig) -> Result<QueueController> {
    let store = JobStore::open_default().await?;
    let agent = Arc::new(CurlAgent::from_config(cfg)?);
    QueueController::load(store, agent, ControllerConfig::from(cfg)).await
}

pub(crate) fn command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests;
