//! Node inventory rows.

use npuwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `nodes` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub node_id: String,
    pub host_id: Option<String>,
    pub hostname: Option<String>,
    pub ip_address: Option<String>,
    pub npu_count: Option<i32>,
    /// `online`, `offline` or `error` as reported by the collector.
    pub status: Option<String>,
    pub last_heartbeat: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
