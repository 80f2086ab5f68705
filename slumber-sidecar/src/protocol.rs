use serde::{Deserialize, Serialize};
use serde_json::Value;

use slumber_core::NotificationId;

/// JSON newline-delimited request.
///
/// `on_overlay_sidecar_start` and `status` are served by the main process;
/// `add_notification` and `clear_notification` by the sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum RpcRequest {
    OnOverlaySidecarStart { pid: u32, port: u32 },
    AddNotification { message: String, duration_ms: u32 },
    ClearNotification { notification_id: NotificationId },
    Status,
}

impl RpcRequest {
    pub fn name(&self) -> &'static str {
        match self {
            RpcRequest::OnOverlaySidecarStart { .. } => "on_overlay_sidecar_start",
            RpcRequest::AddNotification { .. } => "add_notification",
            RpcRequest::ClearNotification { .. } => "clear_notification",
            RpcRequest::Status => "status",
        }
    }
}

/// JSON newline-delimited response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn empty() -> Self {
        Self {
            ok: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(message.into()),
        }
    }

    pub fn unsupported(request: &RpcRequest, endpoint: &str) -> Self {
        Self::error(format!("'{}' is not served by the {endpoint}", request.name()))
    }
}

/// Payload of a successful `add_notification` call.
///
/// `notification_id` is absent when the overlay declined the notification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddNotificationResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_id: Option<NotificationId>,
}
