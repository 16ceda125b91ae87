//! Notification dispatch for admitted RSVPs.
//!
//! The admission engine publishes an [`RsvpCreated`] event onto a bounded
//! queue after a successful insert. A single worker drains the queue into a
//! [`NotificationDispatcher`]. Dispatch outcomes never flow back into
//! admission.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::models::{EventId, RsvpId};

/// Domain event emitted once per admitted RSVP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsvpCreated {
    pub rsvp_id: RsvpId,
    pub event_id: EventId,
    pub name: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// Notification was sent successfully.
    Sent,
    /// Nothing to send (e.g. notifications disabled).
    Skipped,
    /// Sending failed. Logged only.
    Failed(String),
}

/// Consumer of [`RsvpCreated`] events.
#[async_trait::async_trait]
pub trait NotificationDispatcher: Send + Sync {
    /// Name used in logs and metrics.
    fn name(&self) -> &'static str;

    async fn dispatch(&self, event: &RsvpCreated) -> NotificationResult;
}

/// Why an event could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    #[error("Notification queue is full")]
    QueueFull,
    #[error("Notification queue is closed")]
    Closed,
}

/// Producer side of the notification queue.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    sender: mpsc::Sender<RsvpCreated>,
}

impl NotificationQueue {
    /// Creates a bounded queue and returns both ends.
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<RsvpCreated>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }

    /// Queues an event without waiting.
    pub fn publish(&self, event: RsvpCreated) -> Result<(), PublishError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => PublishError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
        })
    }
}

/// Spawns the worker that drains `receiver` into `dispatcher`.
///
/// Each dispatch runs on its own task so a panicking dispatcher loses one
/// notification, not the worker. The worker exits once every
/// [`NotificationQueue`] handle is dropped and the queue is empty.
pub fn spawn_notification_worker(
    mut receiver: mpsc::Receiver<RsvpCreated>,
    dispatcher: Arc<dyn NotificationDispatcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(dispatcher = dispatcher.name(), "Notification worker started");

        while let Some(event) = receiver.recv().await {
            let rsvp_id = event.rsvp_id;
            let event_id = event.event_id;
            let task_dispatcher = Arc::clone(&dispatcher);
            let outcome =
                tokio::spawn(async move { task_dispatcher.dispatch(&event).await }).await;

            match outcome {
                Ok(NotificationResult::Sent) => {
                    tracing::debug!(%rsvp_id, %event_id, "RSVP notification sent");
                }
                Ok(NotificationResult::Skipped) => {
                    tracing::debug!(%rsvp_id, %event_id, "RSVP notification skipped");
                }
                Ok(NotificationResult::Failed(reason)) => {
                    tracing::warn!(
                        %rsvp_id,
                        %event_id,
                        dispatcher = dispatcher.name(),
                        reason = %reason,
                        "RSVP notification failed"
                    );
                }
                Err(join_error) => {
                    tracing::error!(
                        %rsvp_id,
                        %event_id,
                        dispatcher = dispatcher.name(),
                        error = %join_error,
                        "RSVP notification task panicked"
                    );
                }
            }
        }

        tracing::info!(dispatcher = dispatcher.name(), "Notification worker stopped");
    })
}

/// Mock dispatcher for development and testing.
///
/// Records every event it receives.
#[derive(Debug, Clone, Default)]
pub struct MockNotificationDispatcher {
    /// Whether to simulate failures for testing.
    pub simulate_failure: bool,
    delivered: Arc<Mutex<Vec<RsvpCreated>>>,
}

impl MockNotificationDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock dispatcher that simulates failures.
    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Events received so far.
    pub fn delivered(&self) -> Vec<RsvpCreated> {
        self.delivered
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl NotificationDispatcher for MockNotificationDispatcher {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn dispatch(&self, event: &RsvpCreated) -> NotificationResult {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.push(event.clone());
        }

        if self.simulate_failure {
            tracing::warn!(rsvp_id = %event.rsvp_id, "Mock dispatcher simulating failure");
            return NotificationResult::Failed("Simulated failure".to_string());
        }

        tracing::info!(
            rsvp_id = %event.rsvp_id,
            event_id = %event.event_id,
            "Mock: Would send RSVP notifications"
        );
        NotificationResult::Sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn created(id: i64) -> RsvpCreated {
        RsvpCreated {
            rsvp_id: RsvpId(id),
            event_id: EventId(1),
            name: "Alice".to_string(),
            email: "alice@x.com".to_string(),
            occurred_at: Utc::now(),
        }
    }

    struct PanickingDispatcher;

    #[async_trait::async_trait]
    impl NotificationDispatcher for PanickingDispatcher {
        fn name(&self) -> &'static str {
            "panicking"
        }

        async fn dispatch(&self, event: &RsvpCreated) -> NotificationResult {
            if event.rsvp_id == RsvpId(1) {
                panic!("dispatcher blew up");
            }
            NotificationResult::Sent
        }
    }

    #[test]
    fn test_publish_reports_full_queue() {
        let (queue, _receiver) = NotificationQueue::bounded(1);
        assert_eq!(queue.publish(created(1)), Ok(()));
        assert_eq!(queue.publish(created(2)), Err(PublishError::QueueFull));
    }

    #[test]
    fn test_publish_reports_closed_queue() {
        let (queue, receiver) = NotificationQueue::bounded(4);
        drop(receiver);
        assert_eq!(queue.publish(created(1)), Err(PublishError::Closed));
    }

    #[tokio::test]
    async fn test_worker_delivers_in_order() {
        let dispatcher = MockNotificationDispatcher::new();
        let (queue, receiver) = NotificationQueue::bounded(8);
        let worker = spawn_notification_worker(receiver, Arc::new(dispatcher.clone()));

        queue.publish(created(1)).unwrap();
        queue.publish(created(2)).unwrap();
        drop(queue);
        worker.await.unwrap();

        let ids: Vec<_> = dispatcher.delivered().iter().map(|e| e.rsvp_id).collect();
        assert_eq!(ids, vec![RsvpId(1), RsvpId(2)]);
    }

    #[tokio::test]
    async fn test_worker_survives_failures() {
        let dispatcher = MockNotificationDispatcher::failing();
        let (queue, receiver) = NotificationQueue::bounded(8);
        let worker = spawn_notification_worker(receiver, Arc::new(dispatcher.clone()));

        queue.publish(created(1)).unwrap();
        queue.publish(created(2)).unwrap();
        drop(queue);
        tokio::time::timeout(Duration::from_secs(2), worker)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(dispatcher.delivered().len(), 2);
    }

    #[tokio::test]
    async fn test_worker_survives_panicking_dispatcher() {
        let (queue, receiver) = NotificationQueue::bounded(8);
        let worker = spawn_notification_worker(receiver, Arc::new(PanickingDispatcher));

        queue.publish(created(1)).unwrap();
        queue.publish(created(2)).unwrap();
        drop(queue);

        let result = tokio::time::timeout(Duration::from_secs(2), worker).await.unwrap();
        assert!(result.is_ok());
    }

    #[test]
    fn test_rsvp_created_serialization() {
        let json = serde_json::to_value(created(4)).unwrap();
        assert_eq!(json["rsvp_id"], 4);
        assert_eq!(json["event_id"], 1);
        assert_eq!(json["email"], "alice@x.com");
    }
}
