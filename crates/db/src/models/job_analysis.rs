use npuwatch_core::types::Timestamp;
use sqlx::FromRow;

/// Cached LLM analysis, one row per job. `result` is the serialized
/// [`npuwatch_core::analysis::JobAnalysis`].
#[derive(Debug, Clone, FromRow)]
pub struct JobAnalysisRecord {
    pub id: i64,
    pub job_id: String,
    pub status: String,
    pub result: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
