//! Response DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carelink_core::metrics::CounterSnapshot;

/// Standard success response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T: Serialize> {
    /// Whether the request was successful.
    pub success: bool,
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Creates a successful response.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// RPC result wrapper. Lookups that miss report `ok: false` with a
/// message: a structured negative result, never a transport fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse<T: Serialize> {
    /// Whether the operation found/produced a result.
    pub ok: bool,
    /// Failure or status detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Result payload when `ok`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> RpcResponse<T> {
    /// Successful result.
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            message: None,
            data: Some(data),
        }
    }

    /// Successful result with a status message.
    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }

    /// Structured negative result.
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Paginated response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginatedResponse<T: Serialize> {
    /// Items in this page.
    pub items: Vec<T>,
    /// Total item count.
    pub total: u64,
    /// Current page.
    pub page: u64,
    /// Items per page.
    pub per_page: u64,
    /// Total pages.
    pub total_pages: u64,
}

impl<T: Serialize> PaginatedResponse<T> {
    /// Assemble a page.
    pub fn new(items: Vec<T>, total: u64, page: u64, per_page: u64) -> Self {
        let total_pages = if per_page == 0 {
            0
        } else {
            total.div_ceil(per_page)
        };
        Self {
            items,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

/// Acknowledgement carrying the durably queued event's reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnqueuedResponse {
    /// Outbox row ID.
    pub event_id: Uuid,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: String,
    /// Crate version.
    pub version: String,
    /// Database connectivity.
    pub database: String,
    /// Pipeline counters.
    pub counters: CounterSnapshot,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_rounds_total_pages_up() {
        let page = PaginatedResponse::new(vec![1, 2, 3], 7, 1, 3);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn missing_rpc_result_serializes_without_data() {
        let resp: RpcResponse<u32> = RpcResponse::missing("user not found");
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["ok"], false);
        assert_eq!(json["message"], "user not found");
        assert!(json.get("data").is_none());
    }
}
