//! Abort tokens for running transfers, and where the control socket lives.
//!
//! The controller creates one token per dispatch and hands it to the agent
//! with the transfer, so a pause or cancel that lands before the agent has
//! started still sticks. Agents also register running transfers by job id for
//! direct `pause`/`cancel` calls. The transfer loop checks the token between
//! writes and stops. The token also remembers whether the partial data should
//! be kept (pause) or discarded (cancel).

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, RwLock};

/// Control socket of a foreground `vdm` process:
/// `~/.local/state/vdm/control.sock`.
pub fn default_control_socket_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("vdm")?;
    Ok(xdg_dirs.get_state_home().join("control.sock"))
}

const RUNNING: u8 = 0;
const PAUSE: u8 = 1;
const CANCEL: u8 = 2;

/// What a running transfer has been asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortKind {
    Pause,
    Cancel,
}

/// Shared per-transfer abort flag.
#[derive(Debug, Default)]
pub struct AbortToken(AtomicU8);

impl AbortToken {
    pub fn requested(&self) -> Option<AbortKind> {
        match self.0.load(Ordering::Relaxed) {
            PAUSE => Some(AbortKind::Pause),
            CANCEL => Some(AbortKind::Cancel),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::Relaxed) != RUNNING
    }

    pub fn request(&self, kind: AbortKind) {
        let v = match kind {
            AbortKind::Pause => PAUSE,
            AbortKind::Cancel => CANCEL,
        };
        // Cancel wins over pause if both arrive.
        self.0.fetch_max(v, Ordering::Relaxed);
    }
}

/// Registry of job id -> abort token for transfers currently running.
#[derive(Default)]
pub struct AbortRegistry {
    jobs: RwLock<HashMap<String, Arc<AbortToken>>>,
}

impl AbortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a running transfer under the token its loop polls.
    pub fn register(&self, job_id: &str, token: &Arc<AbortToken>) {
        self.write().insert(job_id.to_string(), Arc::clone(token));
    }

    /// Unregister a transfer (call when it finishes, success or failure).
    /// Only removes the entry if it still holds `token`, so a newer attempt for
    /// the same job is left alone.
    pub fn unregister(&self, job_id: &str, token: &Arc<AbortToken>) {
        let mut jobs = self.write();
        if jobs.get(job_id).is_some_and(|t| Arc::ptr_eq(t, token)) {
            jobs.remove(job_id);
        }
    }

    /// Signal a running transfer. Returns false if no transfer is registered.
    pub fn request_abort(&self, job_id: &str, kind: AbortKind) -> bool {
        match self.read().get(job_id) {
            Some(token) => {
                token.request(kind);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.read().contains_key(job_id)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<AbortToken>>> {
        self.jobs.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<AbortToken>>> {
        self.jobs.write().unwrap_or_else(|p| p.into_inner())
    }
}
