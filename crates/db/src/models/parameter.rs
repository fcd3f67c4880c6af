use npuwatch_core::prompt::ParameterFacts;
use npuwatch_core::types::Timestamp;
use serde::Serialize;
use sqlx::FromRow;

/// Launch parameters captured for a job. `parameter_data` and `env_vars`
/// hold JSON text.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub id: i64,
    pub job_id: Option<String>,
    pub parameter_raw: Option<String>,
    pub parameter_data: Option<String>,
    pub parameter_source: Option<String>,
    pub config_file_path: Option<String>,
    pub config_file_content: Option<String>,
    pub env_vars: Option<String>,
    pub timestamp: Timestamp,
}

impl From<&Parameter> for ParameterFacts {
    fn from(p: &Parameter) -> Self {
        ParameterFacts {
            parameter_data: p.parameter_data.clone(),
            config_file_path: p.config_file_path.clone(),
            config_file_content: p.config_file_content.clone(),
            env_vars: p.env_vars.clone(),
        }
    }
}
