//! Repository for the `code` table.

use sqlx::PgPool;

use crate::models::code::Code;

const COLUMNS: &str = "id, job_id, script_path, script_content, imported_libraries, \
                       config_files, sh_script_path, sh_script_content, timestamp";

pub struct CodeRepo;

impl CodeRepo {
    /// Snapshots for a job, newest first.
    pub async fn by_job(pool: &PgPool, job_id: &str) -> Result<Vec<Code>, sqlx::Error> {
        let query =
            format!("SELECT {COLUMNS} FROM code WHERE job_id = $1 ORDER BY timestamp DESC, id DESC");
        sqlx::query_as::<_, Code>(&query)
            .bind(job_id)
            .fetch_all(pool)
            .await
    }
}
