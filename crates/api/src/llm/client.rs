//! OpenAI-compatible chat-completions client.
//!
//! One request per analysis: the system prompt fixes the response schema and
//! the user message carries the assembled job prompt. The reply content is
//! handed to [`parse_analysis`], which tolerates markdown around the JSON.

use npuwatch_core::analysis::{parse_analysis, JobAnalysis, SchemaError, SYSTEM_PROMPT};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

pub const TEMPERATURE: f32 = 0.3;

/// Upstream error bodies are cut to this many characters.
pub const ERROR_BODY_LIMIT: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM service is not enabled")]
    Disabled,

    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM API returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("LLM returned an empty response")]
    Empty,

    #[error("failed to parse LLM response: {0}")]
    Schema(#[from] SchemaError),

    #[error("model not found: {0}")]
    UnknownModel(String),

    #[error("model is not enabled: {0}")]
    ModelDisabled(String),
}

/// Where one request goes: the top-level block or a selected model entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmTarget {
    /// `None` for the top-level block.
    pub model_id: Option<String>,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

/// Pick the target for a request.
///
/// A requested id must name an enabled entry. Without one the configured
/// default entry is used when it exists and is enabled, else the top-level
/// block. Empty entry fields inherit from the top-level block.
pub fn resolve_target(config: &LlmConfig, requested: Option<&str>) -> Result<LlmTarget, LlmError> {
    let requested = requested.map(str::trim).filter(|id| !id.is_empty());

    let entry = match requested {
        Some(id) => {
            let entry = config
                .find_model(id)
                .ok_or_else(|| LlmError::UnknownModel(id.to_string()))?;
            if !entry.enabled {
                return Err(LlmError::ModelDisabled(id.to_string()));
            }
            Some(entry)
        }
        None if !config.default_model_id.is_empty() => config
            .find_model(&config.default_model_id)
            .filter(|entry| entry.enabled),
        None => None,
    };

    let inherit = |own: &str, fallback: &str| -> String {
        let value = if own.is_empty() { fallback } else { own };
        value.to_string()
    };
    Ok(match entry {
        Some(entry) => LlmTarget {
            model_id: Some(entry.id.clone()),
            endpoint: inherit(&entry.endpoint, &config.endpoint),
            api_key: inherit(&entry.api_key, &config.api_key),
            model: inherit(&entry.model, &config.model),
        },
        None => LlmTarget {
            model_id: None,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        },
    })
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

/// `{endpoint}/chat/completions`, tolerating a trailing slash.
pub fn completions_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

/// Send one system + user exchange and return the first choice's content.
///
/// Only `200 OK` is a success. A reply without a first choice, message or
/// non-blank content is [`LlmError::Empty`].
pub async fn complete(
    client: &reqwest::Client,
    target: &LlmTarget,
    system: &str,
    user: &str,
) -> Result<String, LlmError> {
    let body = ChatRequest {
        model: &target.model,
        messages: [
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: user,
            },
        ],
        temperature: TEMPERATURE,
    };

    let mut request = client.post(completions_url(&target.endpoint)).json(&body);
    if !target.api_key.is_empty() {
        request = request.bearer_auth(&target.api_key);
    }

    let response = request.send().await?;
    let status = response.status();
    if status != StatusCode::OK {
        let text = response.text().await.unwrap_or_default();
        return Err(LlmError::Upstream {
            status: status.as_u16(),
            body: text.chars().take(ERROR_BODY_LIMIT).collect(),
        });
    }

    let reply: ChatResponse = response.json().await?;
    reply
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(LlmError::Empty)
}

/// Run a job prompt through the default model and decode the structured
/// analysis.
pub async fn analyze(
    client: &reqwest::Client,
    config: &LlmConfig,
    prompt: &str,
) -> Result<JobAnalysis, LlmError> {
    analyze_with_model(client, config, None, prompt).await
}

/// Same as [`analyze`] on the entry named by `model_id`.
pub async fn analyze_with_model(
    client: &reqwest::Client,
    config: &LlmConfig,
    model_id: Option<&str>,
    prompt: &str,
) -> Result<JobAnalysis, LlmError> {
    if !config.enabled {
        return Err(LlmError::Disabled);
    }
    let target = resolve_target(config, model_id)?;

    tracing::info!(
        model = %target.model,
        model_id = target.model_id.as_deref().unwrap_or("-"),
        prompt_chars = prompt.chars().count(),
        "Requesting LLM analysis"
    );
    let content = complete(client, &target, SYSTEM_PROMPT, prompt).await?;
    let analysis = parse_analysis(&content)?;
    tracing::info!(issues = analysis.issues.len(), "LLM analysis parsed");
    Ok(analysis)
}
