//! LLM analysis of a single job.
//!
//! The pipeline: load the job's detail (cards and related processes), its
//! newest parameter and code snapshots, assemble the prompt, call the model,
//! then cache the parsed result. A cache write failure is only logged; the
//! caller still receives the analysis.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use npuwatch_core::analysis::JobAnalysis;
use npuwatch_core::error::CoreError;
use npuwatch_core::prompt::{build_prompt, PromptInput};
use npuwatch_db::repositories::{CodeRepo, JobAnalysisRepo, JobGroupRepo, ParameterRepo};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, AppResult};
use crate::llm::client::{self, LlmError};
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;
use crate::state::AppState;

pub const ANALYSIS_STATUS_COMPLETED: &str = "completed";

/// Optional body of `POST /jobs/{job_id}/analyze`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub model_id: Option<String>,
}

impl AnalyzeRequest {
    /// An empty body selects the default model.
    pub fn from_body(body: &[u8]) -> AppResult<Self> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body)
            .map_err(|e| AppError::BadRequest(format!("invalid request body: {e}")))
    }
}

/// POST /api/v1/jobs/{job_id}/analyze
///
/// Body `{"modelId": "..."}` picks a configured model; without it the
/// default is used. Model selection is checked before any database access.
pub async fn analyze(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(job_id): Path<String>,
    body: Bytes,
) -> AppResult<Json<ApiResponse<JobAnalysis>>> {
    let request = AnalyzeRequest::from_body(&body)?;
    let (config, http) = state.llm.snapshot().await;
    if !config.enabled {
        return Err(LlmError::Disabled.into());
    }
    let model_id = request.model_id.as_deref();
    client::resolve_target(&config, model_id)?;

    let detail = JobGroupRepo::detail(&state.pool, &job_id, true)
        .await?
        .ok_or_else(|| CoreError::not_found("Job", &job_id))?;
    let parameter = ParameterRepo::by_job(&state.pool, &job_id).await?;
    let code = CodeRepo::by_job(&state.pool, &job_id).await?;

    let input = PromptInput {
        job: (&detail.job).into(),
        cards: detail.npu_cards.iter().map(Into::into).collect(),
        related: detail.related_jobs.iter().map(Into::into).collect(),
        parameter: parameter.first().map(Into::into),
        code: code.first().map(Into::into),
    };
    let prompt = build_prompt(&input);

    tracing::info!(
        job_id = %job_id,
        user_id = auth.user_id,
        cards = input.cards.len(),
        "Analyzing job"
    );
    let analysis = client::analyze_with_model(&http, &config, model_id, &prompt).await?;

    match serde_json::to_string(&analysis) {
        Ok(result) => {
            if let Err(e) =
                JobAnalysisRepo::upsert(&state.pool, &job_id, ANALYSIS_STATUS_COMPLETED, &result)
                    .await
            {
                tracing::warn!(job_id = %job_id, error = %e, "Failed to cache job analysis");
            }
        }
        Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Failed to serialize job analysis"),
    }

    Ok(Json(ApiResponse::ok(analysis)))
}

/// GET /api/v1/jobs/{job_id}/analysis
///
/// The cached analysis, or `null` when the job was never analyzed. The cached
/// text is returned as stored JSON so older result shapes still load.
pub async fn get_analysis(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(job_id): Path<String>,
) -> AppResult<Json<ApiResponse<Option<Value>>>> {
    let cached = JobAnalysisRepo::find_by_job(&state.pool, &job_id).await?;
    let value = cached.and_then(|row| match serde_json::from_str(&row.result) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(job_id = %job_id, error = %e, "Cached analysis is not valid JSON");
            None
        }
    });
    Ok(Json(ApiResponse::ok(value)))
}
