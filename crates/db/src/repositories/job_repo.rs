//! Repository for the `jobs` table.
//!
//! Every listing takes a [`JobFilter`]; the WHERE clause is built from the
//! filter with numbered placeholders and the values are bound in the same
//! order. Ordering comes from [`JobSort`], whose columns are whitelisted.

use npuwatch_core::filters::{JobFilter, JobSort};
use sqlx::postgres::PgArguments;
use sqlx::{PgPool, Postgres};

use crate::models::job::Job;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "job_id, node_id, host_id, job_name, job_type, pid, ppid, pgid, \
                       process_name, command_line, framework, model_format, status, \
                       start_time, end_time, cwd, created_at, updated_at";

pub struct JobRepo;

impl JobRepo {
    pub async fn find_by_id(pool: &PgPool, job_id: &str) -> Result<Option<Job>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM jobs WHERE job_id = $1");
        sqlx::query_as::<_, Job>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Exact number of rows matching `filter`.
    pub async fn count(pool: &PgPool, filter: &JobFilter) -> Result<i64, sqlx::Error> {
        let (where_clause, _) = where_clause(filter);
        let query = format!("SELECT COUNT(*) FROM jobs {where_clause}");
        let (count,): (i64,) = bind_filter(sqlx::query_as(&query), filter)
            .fetch_one(pool)
            .await?;
        Ok(count)
    }

    /// One page of rows matching `filter`.
    pub async fn find(
        pool: &PgPool,
        filter: &JobFilter,
        sort: &JobSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let (where_clause, next_idx) = where_clause(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM jobs {where_clause} ORDER BY {} LIMIT ${next_idx} OFFSET ${}",
            sort.order_by(),
            next_idx + 1,
        );
        let q = bind_filter(sqlx::query_as::<_, Job>(&query), filter);
        q.bind(limit).bind(offset).fetch_all(pool).await
    }

    /// Every row matching `filter`, for in-memory grouping.
    pub async fn find_filtered(
        pool: &PgPool,
        filter: &JobFilter,
        sort: &JobSort,
    ) -> Result<Vec<Job>, sqlx::Error> {
        let (where_clause, _) = where_clause(filter);
        let query = format!(
            "SELECT {COLUMNS} FROM jobs {where_clause} ORDER BY {}",
            sort.order_by()
        );
        let q = bind_filter(sqlx::query_as::<_, Job>(&query), filter);
        q.fetch_all(pool).await
    }

    /// Every job observed on one node, in start order.
    pub async fn list_by_node(pool: &PgPool, node_id: &str) -> Result<Vec<Job>, sqlx::Error> {
        let filter = JobFilter {
            node_id: Some(node_id.to_string()),
            ..Default::default()
        };
        Self::find_filtered(pool, &filter, &JobSort::default()).await
    }
}

/// Build the WHERE clause for `filter`. Returns the clause (empty when the
/// filter is empty) and the next free placeholder index.
fn where_clause(filter: &JobFilter) -> (String, u32) {
    let mut conditions: Vec<String> = Vec::new();
    let mut bind_idx: u32 = 1;

    if filter.node_id.is_some() {
        conditions.push(format!("node_id = ${bind_idx}"));
        bind_idx += 1;
    }
    for (column, values) in [
        ("status", &filter.statuses),
        ("job_type", &filter.job_types),
        ("framework", &filter.frameworks),
    ] {
        if !values.is_empty() {
            conditions.push(format!("{column} = ANY(${bind_idx})"));
            bind_idx += 1;
        }
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };
    (clause, bind_idx)
}

type PgQueryAs<'q, O> = sqlx::query::QueryAs<'q, Postgres, O, PgArguments>;

/// Bind filter values in the order [`where_clause`] numbered them.
fn bind_filter<'q, O>(mut q: PgQueryAs<'q, O>, filter: &JobFilter) -> PgQueryAs<'q, O> {
    if let Some(node_id) = &filter.node_id {
        q = q.bind(node_id.clone());
    }
    for values in [&filter.statuses, &filter.job_types, &filter.frameworks] {
        if !values.is_empty() {
            q = q.bind(values.clone());
        }
    }
    q
}
