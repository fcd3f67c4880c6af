//! Repository for the `job_analysis` cache.

use sqlx::PgPool;

use crate::models::job_analysis::JobAnalysisRecord;

const COLUMNS: &str = "id, job_id, status, result, created_at, updated_at";

pub struct JobAnalysisRepo;

impl JobAnalysisRepo {
    pub async fn find_by_job(
        pool: &PgPool,
        job_id: &str,
    ) -> Result<Option<JobAnalysisRecord>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM job_analysis WHERE job_id = $1");
        sqlx::query_as::<_, JobAnalysisRecord>(&query)
            .bind(job_id)
            .fetch_optional(pool)
            .await
    }

    /// Insert or replace the cached result for a job. Exactly one row per
    /// `job_id` ever exists.
    pub async fn upsert(
        pool: &PgPool,
        job_id: &str,
        status: &str,
        result: &str,
    ) -> Result<JobAnalysisRecord, sqlx::Error> {
        let query = format!(
            "INSERT INTO job_analysis (job_id, status, result) VALUES ($1, $2, $3) \
             ON CONFLICT (job_id) DO UPDATE SET \
                status = EXCLUDED.status, \
                result = EXCLUDED.result, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, JobAnalysisRecord>(&query)
            .bind(job_id)
            .bind(status)
            .bind(result)
            .fetch_one(pool)
            .await
    }
}
