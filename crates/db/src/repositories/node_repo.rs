//! Repository for the `nodes` table.

use sqlx::PgPool;

use crate::models::node::Node;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "node_id, host_id, hostname, ip_address, npu_count, status, \
                       last_heartbeat, created_at, updated_at";

pub struct NodeRepo;

impl NodeRepo {
    pub async fn find_by_id(pool: &PgPool, node_id: &str) -> Result<Option<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes WHERE node_id = $1");
        sqlx::query_as::<_, Node>(&query)
            .bind(node_id)
            .fetch_optional(pool)
            .await
    }

    /// All nodes, ordered by id for a stable listing.
    pub async fn list(pool: &PgPool) -> Result<Vec<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes ORDER BY node_id");
        sqlx::query_as::<_, Node>(&query).fetch_all(pool).await
    }

    pub async fn list_by_status(pool: &PgPool, status: &str) -> Result<Vec<Node>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM nodes WHERE status = $1 ORDER BY node_id");
        sqlx::query_as::<_, Node>(&query)
            .bind(status)
            .fetch_all(pool)
            .await
    }
}
