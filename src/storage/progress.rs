//! Typed upload progress channel
//!
//! Replaces the callback-style progress hook: the uploader owns a
//! `ProgressSender`, the UI holds the matching `ProgressStream`. A stream
//! yields zero or more `Progress` events, then exactly one terminal event
//! (`Completed` or `Failed`), then ends.

use std::sync::Mutex;
use tokio::sync::mpsc;

/// One event on an upload's progress stream
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    /// Percentage of bytes transferred, within [0, 100]
    Progress(f64),
    /// Upload finished and the download URL is resolved
    Completed { url: String },
    /// Upload failed; the stream ends after this event
    Failed { error: String },
}

impl UploadEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress(_))
    }
}

/// Create a connected sender/stream pair for one upload
pub fn progress_channel() -> (ProgressSender, ProgressStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender {
            tx: Some(tx),
            last: Mutex::new(None),
        },
        ProgressStream { rx },
    )
}

/// Producer side of the progress channel
///
/// Values are clamped to [0, 100] and never go backwards, regardless of what
/// the store backend reports.
#[derive(Debug)]
pub struct ProgressSender {
    tx: Option<mpsc::UnboundedSender<UploadEvent>>,
    last: Mutex<Option<f64>>,
}

impl ProgressSender {
    /// Sender with no subscriber; every event is dropped
    pub fn disconnected() -> Self {
        Self {
            tx: None,
            last: Mutex::new(None),
        }
    }

    /// Report `transferred` of `total` bytes
    ///
    /// An empty body counts as fully transferred.
    pub fn report(&self, transferred: u64, total: u64) {
        let percent = if total == 0 {
            100.0
        } else {
            transferred as f64 / total as f64 * 100.0
        };
        self.report_percent(percent);
    }

    /// Report a raw percentage
    pub fn report_percent(&self, percent: f64) {
        let percent = if percent.is_nan() { 0.0 } else { percent.clamp(0.0, 100.0) };

        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let next = match *last {
            Some(prev) if percent <= prev => {
                // Stale or repeated value
                return;
            }
            _ => percent,
        };
        *last = Some(next);
        drop(last);

        self.send(UploadEvent::Progress(next));
    }

    /// Last progress value delivered, if any
    pub fn last_percent(&self) -> Option<f64> {
        match self.last.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Terminate the stream with the resolved download URL
    pub fn complete(self, url: &str) {
        self.send(UploadEvent::Completed {
            url: url.to_string(),
        });
    }

    /// Terminate the stream with an error description
    pub fn fail(self, error: &str) {
        self.send(UploadEvent::Failed {
            error: error.to_string(),
        });
    }

    fn send(&self, event: UploadEvent) {
        if let Some(tx) = &self.tx {
            // Receiver may be gone; progress is best-effort
            let _ = tx.send(event);
        }
    }
}

/// Consumer side of the progress channel
#[derive(Debug)]
pub struct ProgressStream {
    rx: mpsc::UnboundedReceiver<UploadEvent>,
}

impl ProgressStream {
    /// Wait for the next event; `None` once the sender is gone
    pub async fn next(&mut self) -> Option<UploadEvent> {
        self.rx.recv().await
    }

    /// Take the next already-delivered event without waiting
    pub fn try_next(&mut self) -> Option<UploadEvent> {
        self.rx.try_recv().ok()
    }

    /// Drain the stream until it closes and return every event seen
    pub async fn collect(mut self) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.next().await {
            events.push(event);
        }
        events
    }
}
