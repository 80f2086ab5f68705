//! Sidecar-side notification service.
//!
//! Drawing is someone else's job; this module only decides whether a
//! notification is accepted, hands out ids, and tracks what is live.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;
use tokio::time::Instant;
use uuid::Uuid;

use slumber_core::NotificationId;

use crate::protocol::{AddNotificationResponse, RpcRequest, RpcResponse};
use crate::server::RpcService;

pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

pub trait NotificationOverlay: Send + Sync {
    /// Queue a notification. `None` means the overlay declined it.
    fn add_notification(&self, message: &str, duration: Duration) -> Option<NotificationId>;
    /// Remove a notification early. Unknown ids are ignored.
    fn clear_notification(&self, id: &NotificationId);
}

#[derive(Debug, Clone)]
struct Queued {
    id: NotificationId,
    message: String,
    expires_at: Instant,
}

/// Bounded in-memory notification queue.
#[derive(Debug)]
pub struct NotificationQueue {
    capacity: usize,
    entries: Mutex<VecDeque<Queued>>,
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Live notifications, oldest first.
    pub fn active(&self) -> Vec<(NotificationId, String)> {
        let mut entries = self.lock();
        prune_expired(&mut entries);
        entries
            .iter()
            .map(|entry| (entry.id.clone(), entry.message.clone()))
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Queued>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationOverlay for NotificationQueue {
    fn add_notification(&self, message: &str, duration: Duration) -> Option<NotificationId> {
        if message.trim().is_empty() || duration.is_zero() {
            return None;
        }
        let mut entries = self.lock();
        prune_expired(&mut entries);
        if entries.len() >= self.capacity {
            tracing::debug!(capacity = self.capacity, "notification queue full, declining");
            return None;
        }

        let id = NotificationId(Uuid::new_v4().to_string());
        entries.push_back(Queued {
            id: id.clone(),
            message: message.to_string(),
            expires_at: Instant::now() + duration,
        });
        Some(id)
    }

    fn clear_notification(&self, id: &NotificationId) {
        self.lock().retain(|entry| &entry.id != id);
    }
}

fn prune_expired(entries: &mut VecDeque<Queued>) {
    let now = Instant::now();
    entries.retain(|entry| entry.expires_at > now);
}

/// RPC service the sidecar exposes to the main process.
pub struct OverlayService {
    overlay: Arc<dyn NotificationOverlay>,
}

impl OverlayService {
    pub fn new(overlay: Arc<dyn NotificationOverlay>) -> Self {
        Self { overlay }
    }
}

impl RpcService for OverlayService {
    fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::AddNotification {
                message,
                duration_ms,
            } => {
                let notification_id = self
                    .overlay
                    .add_notification(&message, Duration::from_millis(u64::from(duration_ms)));
                RpcResponse::ok(json!(AddNotificationResponse { notification_id }))
            }
            RpcRequest::ClearNotification { notification_id } => {
                self.overlay.clear_notification(&notification_id);
                RpcResponse::empty()
            }
            other => RpcResponse::unsupported(&other, "overlay sidecar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn queue_declines_when_full_and_frees_on_expiry() {
        let queue = NotificationQueue::new(2);
        let first = queue.add_notification("one", Duration::from_secs(1));
        let second = queue.add_notification("two", Duration::from_secs(5));
        assert!(first.is_some() && second.is_some());
        assert_ne!(first, second);
        assert_eq!(queue.add_notification("three", Duration::from_secs(5)), None);

        tokio::time::advance(Duration::from_millis(1001)).await;
        assert!(queue.add_notification("three", Duration::from_secs(5)).is_some());
        assert_eq!(queue.active().len(), 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let queue = NotificationQueue::default();
        let id = queue
            .add_notification("Low battery", Duration::from_secs(5))
            .expect("queued");
        queue.clear_notification(&id);
        queue.clear_notification(&id);
        assert!(queue.active().is_empty());
    }

    #[test]
    fn service_rejects_core_only_requests() {
        let service = OverlayService::new(Arc::new(NotificationQueue::default()));
        let response = service.handle(RpcRequest::Status);
        assert!(!response.ok);
        assert!(response.error.unwrap_or_default().contains("status"));
    }
}
