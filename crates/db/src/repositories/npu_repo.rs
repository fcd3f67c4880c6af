//! Repository for NPU occupancy (`npu_processes`) and telemetry
//! (`npu_metrics`).

use std::collections::{BTreeSet, HashMap};

use sqlx::PgPool;

use crate::models::npu::{NpuMetric, NpuProcess, PidCard};

const PROCESS_COLUMNS: &str = "id, node_id, npu_id, pid, process_name, memory_usage_mb, status";

const METRIC_COLUMNS: &str = "id, node_id, npu_id, name, health, power_w, temp_c, \
                              aicore_usage_percent, memory_usage_mb, memory_total_mb, \
                              hbm_usage_mb, hbm_total_mb, bus_id, timestamp";

pub struct NpuRepo;

impl NpuRepo {
    /// Cards currently held by each of `pids` on one node.
    ///
    /// Only `running` rows count. Pids without any card are absent from the
    /// returned map.
    pub async fn cards_by_pids(
        pool: &PgPool,
        node_id: &str,
        pids: &[i64],
    ) -> Result<HashMap<i64, BTreeSet<i32>>, sqlx::Error> {
        if pids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<_, PidCard>(
            "SELECT DISTINCT pid, npu_id FROM npu_processes \
             WHERE node_id = $1 AND pid = ANY($2) AND status = 'running' \
               AND pid IS NOT NULL AND npu_id IS NOT NULL",
        )
        .bind(node_id)
        .bind(pids)
        .fetch_all(pool)
        .await?;

        let mut cards: HashMap<i64, BTreeSet<i32>> = HashMap::new();
        for row in rows {
            cards.entry(row.pid).or_default().insert(row.npu_id);
        }
        Ok(cards)
    }

    /// Running occupancy rows for `pids` on one node, ordered by card.
    pub async fn processes_by_pids(
        pool: &PgPool,
        node_id: &str,
        pids: &[i64],
    ) -> Result<Vec<NpuProcess>, sqlx::Error> {
        if pids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT {PROCESS_COLUMNS} FROM npu_processes \
             WHERE node_id = $1 AND pid = ANY($2) AND status = 'running' \
             ORDER BY npu_id, pid"
        );
        sqlx::query_as::<_, NpuProcess>(&query)
            .bind(node_id)
            .bind(pids)
            .fetch_all(pool)
            .await
    }

    /// Newest sample per chip for the given cards on one node.
    ///
    /// Uses `DISTINCT ON (npu_id, bus_id)` so a dual-chip card yields two rows.
    pub async fn latest_metrics(
        pool: &PgPool,
        node_id: &str,
        npu_ids: &[i32],
    ) -> Result<Vec<NpuMetric>, sqlx::Error> {
        if npu_ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = format!(
            "SELECT DISTINCT ON (npu_id, bus_id) {METRIC_COLUMNS} FROM npu_metrics \
             WHERE node_id = $1 AND npu_id = ANY($2) \
             ORDER BY npu_id, bus_id, timestamp DESC"
        );
        sqlx::query_as::<_, NpuMetric>(&query)
            .bind(node_id)
            .bind(npu_ids)
            .fetch_all(pool)
            .await
    }
}
