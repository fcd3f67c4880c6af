//! Repository for the `parameters` table.

use sqlx::PgPool;

use crate::models::parameter::Parameter;

const COLUMNS: &str = "id, job_id, parameter_raw, parameter_data, parameter_source, \
                       config_file_path, config_file_content, env_vars, timestamp";

pub struct ParameterRepo;

impl ParameterRepo {
    /// Snapshots for a job, newest first.
    pub async fn by_job(pool: &PgPool, job_id: &str) -> Result<Vec<Parameter>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM parameters WHERE job_id = $1 ORDER BY timestamp DESC, id DESC"
        );
        sqlx::query_as::<_, Parameter>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
