//! NPU telemetry and process-to-card association rows.

use npuwatch_core::prompt::{CardFacts, ChipFacts};
use npuwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// A sample from the `npu_metrics` time series. Cards with several chips
/// report one row per chip, distinguished by `bus_id`.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuMetric {
    pub id: i64,
    pub node_id: Option<String>,
    pub npu_id: Option<i32>,
    pub name: Option<String>,
    pub health: Option<String>,
    pub power_w: Option<f64>,
    pub temp_c: Option<f64>,
    pub aicore_usage_percent: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub memory_total_mb: Option<f64>,
    pub hbm_usage_mb: Option<f64>,
    pub hbm_total_mb: Option<f64>,
    pub bus_id: Option<String>,
    pub timestamp: Timestamp,
}

/// A row from `npu_processes`. Only `status = 'running'` rows describe
/// current occupancy.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuProcess {
    pub id: i64,
    pub node_id: Option<String>,
    pub npu_id: Option<i32>,
    pub pid: Option<i64>,
    pub process_name: Option<String>,
    pub memory_usage_mb: Option<f64>,
    pub status: Option<String>,
}

/// `(pid, npu_id)` pair from the batched occupancy lookup.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct PidCard {
    pub pid: i64,
    pub npu_id: i32,
}

/// One card held by a job, with the latest sample of each of its chips.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NpuCard {
    pub npu_id: i32,
    /// Largest per-process memory footprint seen on this card.
    pub memory_usage_mb: Option<f64>,
    pub metrics: Vec<NpuMetric>,
}

impl From<&NpuCard> for CardFacts {
    fn from(card: &NpuCard) -> Self {
        CardFacts {
            npu_id: card.npu_id,
            memory_usage_mb: card.memory_usage_mb,
            chips: card
                .metrics
                .iter()
                .map(|m| ChipFacts {
                    aicore_usage_percent: m.aicore_usage_percent,
                    hbm_usage_mb: m.hbm_usage_mb,
                    hbm_total_mb: m.hbm_total_mb,
                    power_w: m.power_w,
                    temp_c: m.temp_c,
                })
                .collect(),
        }
    }
}
