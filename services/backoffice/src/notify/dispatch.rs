//! Best-effort hand-off from domain mutations to the notification center.
//!
//! Callers enqueue with a non-blocking `try_send` and never observe the
//! outcome. A single worker drains the queue in FIFO order, so `flush`
//! resolves only after everything queued before it has been processed.
use super::NotificationCenter;
use crate::model::DomainEvent;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

enum Command {
    Event(DomainEvent),
    Flush(oneshot::Sender<()>),
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    sender: mpsc::Sender<Command>,
}

impl NotificationDispatcher {
    /// Start the worker. It exits once every dispatcher clone is dropped.
    pub fn spawn(center: NotificationCenter, capacity: usize) -> (Self, JoinHandle<()>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(center, receiver));
        (Self { sender }, worker)
    }

    /// Enqueue `event`. Returns `false` when it was dropped.
    pub fn dispatch(&self, event: DomainEvent) -> bool {
        let name = event.name();
        match self.sender.try_send(Command::Event(event)) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                metrics::counter!("realty_notification_dispatch_dropped_total").increment(1);
                tracing::warn!(event = name, "notification queue full; event dropped");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                metrics::counter!("realty_notification_dispatch_dropped_total").increment(1);
                tracing::warn!(event = name, "notification worker stopped; event dropped");
                false
            }
        }
    }

    /// Wait until every event queued before this call has been handled.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.sender.send(Command::Flush(done)).await.is_err() {
            return;
        }
        let _ = wait.await;
    }
}

async fn run_worker(center: NotificationCenter, mut receiver: mpsc::Receiver<Command>) {
    while let Some(command) = receiver.recv().await {
        match command {
            Command::Event(event) => {
                if let Err(err) = center.publish_from_event(&event).await {
                    metrics::counter!("realty_notification_dispatch_failures_total").increment(1);
                    tracing::warn!(
                        event = event.name(),
                        error = %err,
                        "notification generation failed"
                    );
                }
            }
            Command::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    tracing::debug!("notification dispatcher stopped");
}
