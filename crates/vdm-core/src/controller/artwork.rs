//! Cover-image cache: one fetch per key, shared by concurrent requesters.
//!
//! Each key has an async slot. Fetching a cover and releasing it both hold the
//! slot, so a cover is never handed out while its file is being deleted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::agent::{TransferAgent, TransferError};

type Slot = Arc<tokio::sync::Mutex<Option<PathBuf>>>;

#[derive(Default)]
pub(crate) struct ArtworkCache {
    entries: Mutex<HashMap<String, Slot>>,
}

impl ArtworkCache {
    /// Local path for `key`, fetching `url` through the agent the first time.
    /// Concurrent callers for the same key wait on a single fetch; a failed
    /// fetch leaves the slot empty so a later request can retry.
    pub async fn resolve(
        &self,
        agent: &dyn TransferAgent,
        url: &str,
        key: &str,
    ) -> Result<PathBuf, TransferError> {
        let slot = self.slot(key);
        let mut cached = slot.lock().await;
        if let Some(path) = cached.as_ref() {
            return Ok(path.clone());
        }
        tracing::debug!(key, url, "caching cover");
        let path = agent.cache_image(url, key).await?;
        *cached = Some(path.clone());
        Ok(path)
    }

    /// True when `key` currently maps to `path` and no fetch or release of it
    /// is in flight.
    pub fn holds(&self, key: &str, path: &Path) -> bool {
        let slot = self.slot(key);
        let held = match slot.try_lock() {
            Ok(cached) => cached.as_deref() == Some(path),
            Err(_) => false,
        };
        held
    }

    /// The slot for `key`. Hold its lock across an in-use check and the file
    /// removal when releasing a cover.
    pub fn slot(&self, key: &str) -> Slot {
        Arc::clone(self.lock().entry(key.to_string()).or_default())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }
}
