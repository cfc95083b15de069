use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Holds at most one pending reconnect.
///
/// Scheduling aborts whatever was pending before, so two reconnects can
/// never race each other.
#[derive(Default)]
pub struct ReconnectTimer {
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl ReconnectTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `wake` after `delay`, replacing any pending reconnect.
    pub fn schedule(&self, delay: Duration, wake: mpsc::Sender<()>) {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = wake.send(()).await;
        });
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(previous) = pending.replace(task) {
                debug!("gateway: replacing pending reconnect");
                previous.abort();
            }
        }
    }

    pub fn cancel(&self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(task) = pending.take() {
                task.abort();
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .map(|p| p.as_ref().is_some_and(|t| !t.is_finished()))
            .unwrap_or(false)
    }
}

impl Drop for ReconnectTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
