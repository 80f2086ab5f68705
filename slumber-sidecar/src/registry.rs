//! Main-process side of the handshake.
//!
//! [`SidecarRegistry`] stores one [`RegistrationRecord`] per sidecar pid and
//! owns a long-lived [`RpcClient`] per sidecar for outbound notification
//! calls. A record is dropped when a call to its sidecar fails even after
//! reconnecting; there is no liveness check.

use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use slumber_core::{NotificationId, RegistrationRecord};

use crate::client::RpcClient;
use crate::error::SidecarError;
use crate::protocol::{AddNotificationResponse, RpcRequest, RpcResponse};
use crate::server::RpcService;

#[derive(Debug, Default)]
pub struct SidecarRegistry {
    records: RwLock<HashMap<u32, RegistrationRecord>>,
    clients: Mutex<HashMap<u32, RpcClient>>,
}

impl SidecarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sidecar's RPC endpoint. A repeated pid replaces its endpoint.
    pub fn register(&self, pid: u32, port: u32) -> Result<RegistrationRecord, SidecarError> {
        let port = u16::try_from(port)
            .ok()
            .filter(|port| *port != 0)
            .ok_or_else(|| SidecarError::Protocol(format!("invalid sidecar port {port}")))?;

        let record = RegistrationRecord {
            pid,
            endpoint: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            registered_at: Utc::now(),
        };
        self.write_records().insert(pid, record.clone());
        tracing::info!(pid, port, "overlay sidecar registered");
        Ok(record)
    }

    pub fn record(&self, pid: u32) -> Option<RegistrationRecord> {
        self.read_records().get(&pid).cloned()
    }

    /// All records, ordered by pid.
    pub fn records(&self) -> Vec<RegistrationRecord> {
        let mut records: Vec<_> = self.read_records().values().cloned().collect();
        records.sort_by_key(|record| record.pid);
        records
    }

    /// The most recently registered sidecar; outbound calls go here.
    pub fn active(&self) -> Option<RegistrationRecord> {
        self.read_records()
            .values()
            .max_by_key(|record| record.registered_at)
            .cloned()
    }

    pub fn invalidate(&self, pid: u32) {
        if self.write_records().remove(&pid).is_some() {
            tracing::info!(pid, "overlay sidecar registration invalidated");
        }
    }

    /// Drop `record` only if it is still the one stored for its pid.
    ///
    /// Returns `false` when the sidecar re-registered in the meantime.
    pub fn invalidate_if_current(&self, record: &RegistrationRecord) -> bool {
        let mut records = self.write_records();
        if records.get(&record.pid) != Some(record) {
            return false;
        }
        records.remove(&record.pid);
        tracing::info!(pid = record.pid, endpoint = %record.endpoint, "overlay sidecar registration invalidated");
        true
    }

    /// Post a notification to the active sidecar, best-effort.
    ///
    /// Failures are logged and reported as `None`, same as a declined
    /// notification.
    pub async fn add_notification(&self, message: &str, duration: Duration) -> Option<NotificationId> {
        match self.try_add_notification(message, duration).await {
            Ok(id) => id,
            Err(SidecarError::NotRegistered) => {
                tracing::debug!("no overlay sidecar registered, notification dropped");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to post overlay notification");
                None
            }
        }
    }

    pub async fn try_add_notification(
        &self,
        message: &str,
        duration: Duration,
    ) -> Result<Option<NotificationId>, SidecarError> {
        let duration_ms = u32::try_from(duration.as_millis()).unwrap_or(u32::MAX);
        let data = self
            .call_active(RpcRequest::AddNotification {
                message: message.to_string(),
                duration_ms,
            })
            .await?;
        if data.is_null() {
            return Ok(None);
        }
        let response: AddNotificationResponse = serde_json::from_value(data)?;
        Ok(response.notification_id)
    }

    /// Ask the active sidecar to drop a notification, best-effort.
    pub async fn clear_notification(&self, id: &NotificationId) {
        let request = RpcRequest::ClearNotification {
            notification_id: id.clone(),
        };
        if let Err(err) = self.call_active(request).await {
            tracing::warn!(error = %err, "failed to clear overlay notification");
        }
    }

    async fn call_active(&self, request: RpcRequest) -> Result<Value, SidecarError> {
        let record = self.active().ok_or(SidecarError::NotRegistered)?;

        let mut clients = self.clients.lock().await;
        let client = clients
            .entry(record.pid)
            .or_insert_with(|| RpcClient::new(record.endpoint));
        if client.addr() != record.endpoint {
            *client = RpcClient::new(record.endpoint);
        }

        let result = client.call(&request).await;
        if let Err(err) = &result {
            if err.is_connection_failure() && self.invalidate_if_current(&record) {
                clients.remove(&record.pid);
            }
        }
        result
    }

    fn read_records(&self) -> std::sync::RwLockReadGuard<'_, HashMap<u32, RegistrationRecord>> {
        self.records.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_records(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<u32, RegistrationRecord>> {
        self.records.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Extra state the main process reports on `status`.
pub trait StatusProvider: Send + Sync {
    fn status(&self) -> Value;
}

/// RPC service the main process exposes to sidecars and local tools.
pub struct CoreEndpoint {
    registry: Arc<SidecarRegistry>,
    status: Option<Arc<dyn StatusProvider>>,
}

impl CoreEndpoint {
    pub fn new(registry: Arc<SidecarRegistry>) -> Self {
        Self {
            registry,
            status: None,
        }
    }

    pub fn with_status(mut self, status: Arc<dyn StatusProvider>) -> Self {
        self.status = Some(status);
        self
    }
}

impl RpcService for CoreEndpoint {
    fn handle(&self, request: RpcRequest) -> RpcResponse {
        match request {
            RpcRequest::OnOverlaySidecarStart { pid, port } => {
                match self.registry.register(pid, port) {
                    Ok(_) => RpcResponse::empty(),
                    Err(err) => RpcResponse::error(err.to_string()),
                }
            }
            RpcRequest::Status => {
                let mut payload = self
                    .status
                    .as_ref()
                    .map(|status| status.status())
                    .unwrap_or_else(|| json!({}));
                if let Value::Object(map) = &mut payload {
                    map.insert("sidecars".to_string(), json!(self.registry.records()));
                }
                RpcResponse::ok(payload)
            }
            other => RpcResponse::unsupported(&other, "main process"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_registration_for_a_pid_wins() {
        let registry = SidecarRegistry::new();
        registry.register(4821, 53211).expect("register");
        registry.register(4821, 53999).expect("re-register");

        let record = registry.record(4821).expect("record");
        assert_eq!(record.endpoint, SocketAddr::from((Ipv4Addr::LOCALHOST, 53999)));
        assert_eq!(registry.records().len(), 1);
    }

    #[test]
    fn out_of_range_port_is_rejected() {
        let registry = SidecarRegistry::new();
        assert!(registry.register(1, 70_000).is_err());
        assert!(registry.register(1, 0).is_err());
        assert!(registry.record(1).is_none());
    }

    #[test]
    fn stale_invalidation_keeps_newer_registration() {
        let registry = SidecarRegistry::new();
        let old = registry.register(42, 53211).expect("register");
        std::thread::sleep(std::time::Duration::from_millis(2));
        let new = registry.register(42, 50123).expect("re-register");

        assert!(!registry.invalidate_if_current(&old));
        assert_eq!(registry.record(42), Some(new.clone()));

        assert!(registry.invalidate_if_current(&new));
        assert!(registry.record(42).is_none());
    }

    #[tokio::test]
    async fn notifications_without_sidecar_are_dropped() {
        let registry = SidecarRegistry::new();
        assert!(matches!(
            registry
                .try_add_notification("hello", Duration::from_secs(1))
                .await,
            Err(SidecarError::NotRegistered)
        ));
        assert_eq!(registry.add_notification("hello", Duration::from_secs(1)).await, None);
    }

    #[test]
    fn core_endpoint_reports_sidecars_in_status() {
        let registry = Arc::new(SidecarRegistry::new());
        let endpoint = CoreEndpoint::new(registry.clone());

        let response = endpoint.handle(RpcRequest::OnOverlaySidecarStart { pid: 7, port: 40000 });
        assert!(response.ok);

        let status = endpoint.handle(RpcRequest::Status);
        let sidecars = status.data.expect("data")["sidecars"].clone();
        assert_eq!(sidecars[0]["pid"], json!(7));
        assert_eq!(sidecars[0]["endpoint"], json!("127.0.0.1:40000"));
    }
}
