//! Structured job analysis returned by the LLM.
//!
//! The model is asked for a single JSON object (see [`SYSTEM_PROMPT`]). Models
//! routinely wrap that object in markdown fences or chatter, so the content is
//! first narrowed with [`extract_json`] and then decoded strictly: required
//! fields must be present, optional blocks may be `null` or missing.

use serde::{Deserialize, Serialize};

/// Prompt revision the schema below belongs to.
pub const SYSTEM_PROMPT_VERSION: &str = "2";

pub const SYSTEM_PROMPT: &str = r#"You are an analysis assistant for machine-learning jobs running on Huawei Ascend NPUs. Analyse the job described by the user and reply with exactly one JSON object in the following shape and nothing else:

{
  "summary": "at most 200 words: job type, model, runtime, resource usage",
  "taskType": {
    "category": "training | inference | unknown",
    "subCategory": "pre-training | fine-tuning | rlhf | evaluation | serving | batch-inference | null",
    "inferenceFramework": "vLLM | TGI | MindIE | Triton | null",
    "evidence": "what the classification is based on"
  },
  "modelInfo": {
    "modelName": "model name or null",
    "modelSize": "7B | 13B | 70B ... or null",
    "precision": "fp16 | bf16 | int8 | int4 or null",
    "parallelStrategy": "e.g. TP=8/PP=2 or null"
  },
  "runtimeAnalysis": {
    "duration": "human readable runtime",
    "status": "normal | long-running | just-started | completed",
    "description": "whether the runtime is reasonable"
  },
  "parameterCheck": {
    "status": "normal | warning | abnormal",
    "items": [
      {"parameter": "name", "value": "current value", "assessment": "normal | warning | abnormal", "reason": "why"}
    ]
  },
  "resourceAssessment": {
    "npuUtilization": "high | medium | low | idle",
    "hbmUtilization": "high | medium | low",
    "description": "short description of resource usage"
  },
  "issues": [
    {"severity": "critical | warning | info", "category": "category", "description": "what is wrong", "suggestion": "how to fix it"}
  ],
  "suggestions": ["overall recommendation"]
}

Guidelines:
1. Classify training versus inference from the command line, process name, scripts, framework and environment, and state the evidence.
2. Extract model name, size, precision and parallel strategy (TP/PP/DP) from the command line, script paths, configuration and environment.
3. Judge the runtime against the job type: long-lived inference services are normal, training time depends on model size.
4. Check parameters: learning rate, batch size against memory, warmup, gradient accumulation for training; max tokens, tensor_parallel_size against the chip count, memory utilisation for inference; leftover debug options and HCCL settings for both.
5. Assess AI core usage, HBM usage, balance across cards, and whether power draw matches utilisation.

Rules:
- A card may contain several chips. Power is a card-level metric reported on Chip0 only; 0 W on Chip1 is expected and is not an issue.
- Ascend 910 cards carry two chips each, so parallel sizes align with the chip count, not the card count. TP=16 on 8 cards is correct.
- Use null when information is missing; never guess. modelInfo may be null as a whole.
- issues, suggestions and parameterCheck.items may be empty arrays but never null.
- If scripts or parameters are missing, say in the summary that the analysis may be incomplete."#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobAnalysis {
    pub summary: String,
    pub task_type: TaskType,
    #[serde(default)]
    pub model_info: Option<ModelInfo>,
    #[serde(default)]
    pub runtime_analysis: Option<RuntimeAnalysis>,
    #[serde(default)]
    pub parameter_check: Option<ParameterCheck>,
    pub resource_assessment: ResourceAssessment,
    pub issues: Vec<Issue>,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskType {
    pub category: TaskCategory,
    #[serde(default)]
    pub sub_category: Option<String>,
    #[serde(default)]
    pub inference_framework: Option<String>,
    #[serde(default)]
    pub evidence: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskCategory {
    Training,
    Inference,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    #[serde(default)]
    pub model_name: Option<String>,
    #[serde(default)]
    pub model_size: Option<String>,
    #[serde(default)]
    pub precision: Option<String>,
    #[serde(default)]
    pub parallel_strategy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeAnalysis {
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCheck {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<ParameterCheckItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterCheckItem {
    pub parameter: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub assessment: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAssessment {
    pub npu_utilization: NpuUtilization,
    pub hbm_utilization: HbmUtilization,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NpuUtilization {
    High,
    Medium,
    Low,
    Idle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HbmUtilization {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

/// The model's reply did not match the schema.
#[derive(Debug, thiserror::Error)]
#[error("{message} (raw: {raw})")]
pub struct SchemaError {
    pub message: String,
    /// First [`RAW_PREFIX_LIMIT`] characters of the reply.
    pub raw: String,
}

pub const RAW_PREFIX_LIMIT: usize = 500;

/// Narrow an LLM reply down to the JSON it carries.
///
/// Tried in order: a ```` ```json ```` fence, any other fence (dropping a
/// language tag line), the span from the first `{` to the last `}`, and
/// finally the whole reply. The result is whitespace-trimmed.
pub fn extract_json(content: &str) -> &str {
    if let Some(start) = content.find("```json") {
        let body = &content[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return body[..end].trim();
        }
    }

    if let Some(start) = content.find("```") {
        let body = &content[start + 3..];
        if let Some(end) = body.find("```") {
            return skip_language_tag(&body[..end]).trim();
        }
    }

    if let (Some(open), Some(close)) = (content.find('{'), content.rfind('}')) {
        if open < close {
            return content[open..=close].trim();
        }
    }

    content.trim()
}

/// Drop the first line of a fence body when it reads like a language tag.
fn skip_language_tag(body: &str) -> &str {
    match body.split_once('\n') {
        Some((first, rest)) if !first.trim_start().starts_with(|c| c == '{' || c == '[') => rest,
        _ => body,
    }
}

/// Extract and decode an analysis from raw model output.
pub fn parse_analysis(content: &str) -> Result<JobAnalysis, SchemaError> {
    serde_json::from_str(extract_json(content)).map_err(|err| SchemaError {
        message: err.to_string(),
        raw: content.chars().take(RAW_PREFIX_LIMIT).collect(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const VALID: &str = r#"{
        "summary": "Fine-tuning a 7B model on 8 cards.",
        "taskType": {"category": "training", "subCategory": "fine-tuning", "inferenceFramework": null},
        "modelInfo": null,
        "resourceAssessment": {"npuUtilization": "high", "hbmUtilization": "medium", "description": "busy"},
        "issues": [{"severity": "info", "category": "config", "description": "d", "suggestion": "s"}],
        "suggestions": ["raise batch size"]
    }"#;

    #[test]
    fn json_fence_wins() {
        let content = format!("Here you go:\n```json\n{VALID}\n```\nanything else");
        assert_eq!(extract_json(&content), VALID.trim());
    }

    #[test]
    fn bare_fence_drops_language_line() {
        let content = "```javascript\n{\"a\": 1}\n```";
        assert_eq!(extract_json(content), "{\"a\": 1}");
        let content = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json(content), "{\"a\": 1}");
        let content = "```{\"a\": 1}\n```";
        assert_eq!(extract_json(content), "{\"a\": 1}");
    }

    #[test]
    fn brace_span_is_the_third_choice() {
        let content = "Sure! {\"a\": {\"b\": 2}} Hope that helps.";
        assert_eq!(extract_json(content), "{\"a\": {\"b\": 2}}");
    }

    #[test]
    fn raw_content_is_the_last_resort() {
        assert_eq!(extract_json("  no json here  "), "no json here");
    }

    #[test]
    fn fenced_reply_decodes() {
        let analysis = parse_analysis(&format!("```json\n{VALID}\n```")).unwrap();
        assert_eq!(analysis.task_type.category, TaskCategory::Training);
        assert_eq!(analysis.resource_assessment.npu_utilization, NpuUtilization::High);
        assert_eq!(analysis.issues[0].severity, Severity::Info);
        assert_eq!(analysis.suggestions, vec!["raise batch size".to_string()]);
        assert!(analysis.model_info.is_none());
        assert!(analysis.runtime_analysis.is_none());
    }

    #[test]
    fn missing_required_field_is_a_schema_error() {
        let without_suggestions = VALID.replace(
            "],\n        \"suggestions\": [\"raise batch size\"]",
            "]",
        );
        let err = parse_analysis(&without_suggestions).unwrap_err();
        assert!(err.message.contains("suggestions"), "{}", err.message);
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let content = VALID.replace("\"high\", \"hbm", "\"extreme\", \"hbm");
        assert_matches!(parse_analysis(&content), Err(SchemaError { .. }));
    }

    #[test]
    fn raw_prefix_is_bounded() {
        let garbage = "z".repeat(2_000);
        let err = parse_analysis(&garbage).unwrap_err();
        assert_eq!(err.raw.chars().count(), RAW_PREFIX_LIMIT);
    }

    #[test]
    fn optional_blocks_decode_when_present() {
        let content = VALID.replace(
            "\"modelInfo\": null,",
            r#""modelInfo": {"modelName": "qwen", "modelSize": "7B", "precision": null, "parallelStrategy": null},
               "runtimeAnalysis": {"duration": "2h", "status": "normal", "description": "ok"},
               "parameterCheck": {"status": "normal", "items": [{"parameter": "lr", "value": "1e-4", "assessment": "normal", "reason": "typical"}]},"#,
        );
        let analysis = parse_analysis(&content).unwrap();
        assert_eq!(analysis.model_info.unwrap().model_name.as_deref(), Some("qwen"));
        assert_eq!(analysis.parameter_check.unwrap().items.len(), 1);
    }
}
