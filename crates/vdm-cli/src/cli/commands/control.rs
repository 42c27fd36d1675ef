//! `vdm pause|resume|cancel|delete|delete-series`.
//!
//! Forwarded to a foreground `vdm` over the control socket when one is
//! running; otherwise this process loads the queue and applies them itself.

use anyhow::{bail, Result};
use vdm_core::config::VdmConfig;
use vdm_core::QueueController;

use super::run::run_foreground;
use crate::cli::{control_socket, open_controller};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
    Delete,
    DeleteSeries,
}

impl ControlAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Cancel => "cancel",
            ControlAction::Delete => "delete",
            ControlAction::DeleteSeries => "delete-series",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "pause" => ControlAction::Pause,
            "resume" => ControlAction::Resume,
            "cancel" => ControlAction::Cancel,
            "delete" => ControlAction::Delete,
            "delete-series" => ControlAction::DeleteSeries,
            _ => return None,
        })
    }

    /// Apply to `ctrl`; returns a one-line description of what happened.
    pub async fn apply(self, ctrl: &QueueController, target: &str) -> Result<String> {
        let message = match self {
            ControlAction::DeleteSeries => {
                let n = ctrl.delete_series(target).await?;
                format!("deleted {n} episode(s) of {target}")
            }
            action => {
                let applied = match action {
                    ControlAction::Pause => ctrl.pause(target).await?,
                    ControlAction::Resume => ctrl.resume(target).await?,
                    ControlAction::Cancel => ctrl.cancel(target).await?,
                    _ => ctrl.delete(target).await?,
                };
                if applied {
                    format!("{} {}", past_tense(action), target)
                } else {
                    match ctrl.get(target).await {
                        Some(job) => format!("{} is {}; nothing to {}", target, job.status, action.as_str()),
                        None => format!("no job {}", target),
                    }
                }
            }
        };
        Ok(message)
    }
}

fn past_tense(action: ControlAction) -> &'static str {
    match action {
        ControlAction::Pause => "paused",
        ControlAction::Resume => "resumed",
        ControlAction::Cancel => "cancelled",
        ControlAction::Delete => "deleted",
        ControlAction::DeleteSeries => "deleted series",
    }
}

pub async fn run_control(cfg: &VdmConfig, action: ControlAction, target: &str) -> Result<()> {
    if let Some(reply) = control_socket::send(action, target).await? {
        return match reply.split_once(' ') {
            Some(("ok", message)) => {
                println!("{message}");
                Ok(())
            }
            Some(("error", message)) => bail!("{message}"),
            _ => bail!("unexpected reply from running vdm: {reply}"),
        };
    }

    let ctrl = open_controller(cfg).await?;
    let message = action.apply(&ctrl, target).await?;
    println!("{message}");
    if action == ControlAction::Resume && message.starts_with("resumed") {
        run_foreground(&ctrl).await?;
    }
    Ok(())
}
