use npuwatch_core::prompt::CodeFacts;
use npuwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// Entry script and shell wrapper captured for a job.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Code {
    pub id: i64,
    pub job_id: Option<String>,
    pub script_path: Option<String>,
    pub script_content: Option<String>,
    pub imported_libraries: Option<String>,
    pub config_files: Option<String>,
    pub sh_script_path: Option<String>,
    pub sh_script_content: Option<String>,
    pub timestamp: Timestamp,
}

impl From<&Code> for CodeFacts {
    fn from(c: &Code) -> Self {
        CodeFacts {
            script_path: c.script_path.clone(),
            script_content: c.script_content.clone(),
            sh_script_path: c.sh_script_path.clone(),
            sh_script_content: c.sh_script_content.clone(),
        }
    }
}
