//! In-process event bus for job lifecycle notifications.
//!
//! Every subscriber gets its own unbounded channel. Publishing pushes the
//! event into each channel synchronously, in registration order; there is no
//! backlog, so late subscribers only see events emitted after they subscribed.

use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::job::Job;

/// Lifecycle event carrying the job snapshot at the moment of emission.
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Added(Job),
    Started(Job),
    Progress(Job),
    Paused(Job),
    Cancelled(Job),
    Completed(Job),
    Deleted(Job),
    Error(Job),
}

impl DownloadEvent {
    pub fn job(&self) -> &Job {
        match self {
            DownloadEvent::Added(j)
            | DownloadEvent::Started(j)
            | DownloadEvent::Progress(j)
            | DownloadEvent::Paused(j)
            | DownloadEvent::Cancelled(j)
            | DownloadEvent::Completed(j)
            | DownloadEvent::Deleted(j)
            | DownloadEvent::Error(j) => j,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DownloadEvent::Added(_) => "added",
            DownloadEvent::Started(_) => "started",
            DownloadEvent::Progress(_) => "progress",
            DownloadEvent::Paused(_) => "paused",
            DownloadEvent::Cancelled(_) => "cancelled",
            DownloadEvent::Completed(_) => "completed",
            DownloadEvent::Deleted(_) => "deleted",
            DownloadEvent::Error(_) => "error",
        }
    }
}

/// Receiving half handed to a subscriber. Dropping it unsubscribes.
pub type EventReceiver = mpsc::UnboundedReceiver<DownloadEvent>;

#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<DownloadEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> EventReceiver {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().push(tx);
        rx
    }

    /// Deliver `event` to all current subscribers; closed receivers are pruned.
    pub fn publish(&self, event: DownloadEvent) {
        tracing::trace!(event = event.name(), job_id = %event.job().id, "publish");
        self.lock().retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<mpsc::UnboundedSender<DownloadEvent>>> {
        // A panic while holding this lock cannot leave the Vec half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{Job, JobStatus, MediaKind, MediaMetadata};

    fn job(id: &str) -> Job {
        Job {
            id: id.to_string(),
            name: id.to_string(),
            media: MediaKind::Movie,
            url: "http://x".into(),
            cover: None,
            local_cover: None,
            metadata: MediaMetadata::default(),
            size: 0,
            downloaded_bytes: 0,
            progress: 0,
            status: JobStatus::Pending,
            file_path: None,
            error: None,
            created_at: 0,
            completed_at: None,
        }
    }

    #[test]
    fn delivers_to_all_subscribers_in_order() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        bus.publish(DownloadEvent::Added(job("1")));
        bus.publish(DownloadEvent::Started(job("1")));
        for rx in [&mut a, &mut b] {
            assert_eq!(rx.try_recv().unwrap().name(), "added");
            assert_eq!(rx.try_recv().unwrap().name(), "started");
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn late_subscriber_gets_no_backlog() {
        let bus = EventBus::new();
        bus.publish(DownloadEvent::Added(job("1")));
        let mut late = bus.subscribe();
        assert!(late.try_recv().is_err());
        bus.publish(DownloadEvent::Deleted(job("1")));
        assert_eq!(late.try_recv().unwrap().job().id, "1");
    }

    #[test]
    fn dropped_receivers_are_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let _keep = bus.subscribe();
        drop(rx);
        bus.publish(DownloadEvent::Progress(job("1")));
        assert_eq!(bus.subscriber_count(), 1);
    }
}
