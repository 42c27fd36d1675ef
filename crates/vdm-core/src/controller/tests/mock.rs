//! Scripted transfer agent: transfers block until the test finishes them.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{oneshot, Notify};

use crate::agent::{
    ProgressSink, StorageInfo, TransferAgent, TransferError, TransferOutcome, TransferRequest,
};
use crate::job::ProgressUpdate;

type Reply = oneshot::Sender<Result<TransferOutcome, TransferError>>;

#[derive(Default)]
pub struct MockAgent {
    running: Mutex<HashMap<String, (Reply, ProgressSink)>>,
    pub started: Mutex<Vec<TransferRequest>>,
    pub paused: Mutex<Vec<String>>,
    pub cancelled: Mutex<Vec<String>>,
    pub deleted_files: Mutex<Vec<PathBuf>>,
    pub deleted_folders: Mutex<Vec<String>>,
    pub cache_calls: Mutex<Vec<(String, String)>>,
    /// Cover files currently on "disk".
    pub cached_files: Mutex<HashSet<PathBuf>>,
    pub fail_cache: AtomicBool,
    /// When set, `start` waits for a notification before doing anything.
    pub start_gate: Mutex<Option<Arc<Notify>>>,
    /// Jobs whose abort token was already set when `start` got to run.
    pub aborted_before_start: Mutex<Vec<String>>,
}

impl MockAgent {
    pub fn started_count(&self) -> usize {
        self.started.lock().unwrap().len()
    }

    pub fn is_running(&self, job_id: &str) -> bool {
        self.running.lock().unwrap().contains_key(job_id)
    }

    pub fn progress(&self, job_id: &str, downloaded_bytes: u64, total_bytes: u64) {
        let running = self.running.lock().unwrap();
        let (_, sink) = running.get(job_id).expect("transfer not running");
        sink.report(ProgressUpdate {
            progress: crate::job::percent_of(downloaded_bytes, total_bytes),
            downloaded_bytes,
            total_bytes,
        });
    }

    pub fn complete(&self, job_id: &str, size: u64) {
        self.reply(
            job_id,
            Ok(TransferOutcome {
                file_path: PathBuf::from(format!("/library/{job_id}.mp4")),
                size,
            }),
        );
    }

    pub fn fail(&self, job_id: &str, message: &str) {
        self.reply(job_id, Err(TransferError::Failed(message.to_string())));
    }

    fn reply(&self, job_id: &str, result: Result<TransferOutcome, TransferError>) {
        let (tx, _) = self
            .running
            .lock()
            .unwrap()
            .remove(job_id)
            .expect("transfer not running");
        let _ = tx.send(result);
    }

    fn abort(&self, job_id: &str) {
        if let Some((tx, _)) = self.running.lock().unwrap().remove(job_id) {
            let _ = tx.send(Err(TransferError::Aborted));
        }
    }
}

#[async_trait]
impl TransferAgent for MockAgent {
    async fn start(
        &self,
        request: TransferRequest,
        progress: ProgressSink,
    ) -> Result<TransferOutcome, TransferError> {
        let gate = self.start_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if progress.abort_token().is_aborted() {
            self.aborted_before_start
                .lock()
                .unwrap()
                .push(request.job_id.clone());
            return Err(TransferError::Aborted);
        }
        let (tx, rx) = oneshot::channel();
        self.running
            .lock()
            .unwrap()
            .insert(request.job_id.clone(), (tx, progress));
        self.started.lock().unwrap().push(request);
        rx.await.unwrap_or(Err(TransferError::Aborted))
    }

    async fn pause(&self, job_id: &str) -> Result<(), TransferError> {
        self.paused.lock().unwrap().push(job_id.to_string());
        self.abort(job_id);
        Ok(())
    }

    async fn cancel(&self, request: &TransferRequest) -> Result<(), TransferError> {
        self.cancelled.lock().unwrap().push(request.job_id.clone());
        self.abort(&request.job_id);
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<(), TransferError> {
        tokio::task::yield_now().await;
        self.cached_files.lock().unwrap().remove(path);
        self.deleted_files.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn delete_folder(&self, series_name: &str) -> Result<(), TransferError> {
        self.deleted_folders
            .lock()
            .unwrap()
            .push(series_name.to_string());
        Ok(())
    }

    async fn storage_info(&self) -> Result<StorageInfo, TransferError> {
        Ok(StorageInfo {
            used: 10,
            total: 100,
            available: 90,
            root_path: PathBuf::from("/library"),
        })
    }

    async fn open_storage_folder(&self) -> Result<(), TransferError> {
        Ok(())
    }

    async fn cache_image(&self, url: &str, key: &str) -> Result<PathBuf, TransferError> {
        self.cache_calls
            .lock()
            .unwrap()
            .push((url.to_string(), key.to_string()));
        if self.fail_cache.load(Ordering::SeqCst) {
            return Err(TransferError::Failed("image fetch failed".into()));
        }
        tokio::task::yield_now().await;
        let path = PathBuf::from(format!("/library/.covers/{key}.jpg"));
        self.cached_files.lock().unwrap().insert(path.clone());
        Ok(path)
    }
}
