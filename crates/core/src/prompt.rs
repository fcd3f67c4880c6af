//! Prompt assembly for job analysis.
//!
//! Turns the aggregated picture of one job group into a bounded markdown
//! document. The output depends only on the input, so identical facts always
//! yield byte-identical prompts.

use std::fmt::Write as _;

use chrono::DateTime;

/// Character budgets per section.
pub const PARAMETER_DATA_LIMIT: usize = 3000;
pub const CONFIG_FILE_LIMIT: usize = 3000;
pub const SCRIPT_LIMIT: usize = 5000;
pub const SHELL_SCRIPT_LIMIT: usize = 3000;

pub const TRUNCATION_MARKER: &str = "... (content truncated)";

/// Substrings that mark an environment variable as sensitive.
pub const SENSITIVE_ENV_MARKERS: [&str; 6] =
    ["PASSWORD", "SECRET", "TOKEN", "KEY", "CREDENTIAL", "AUTH"];

/// Substrings that mark an environment variable as relevant to training or
/// inference. Only these reach the prompt.
#[rustfmt::skip]
pub const RELEVANT_ENV_MARKERS: &[&str] = &[
    "MASTER", "WORLD_SIZE", "RANK", "LOCAL_RANK", "NPROC",
    "CUDA", "NVIDIA", "GPU",
    "ASCEND", "HCCL", "NPU",
    "OMP_NUM_THREADS", "MKL",
    "TORCH", "NCCL", "GLOO",
    "TP_SIZE", "PP_SIZE", "DP_SIZE",
    "DEEPSPEED", "FSDP", "ACCELERATE",
    "HF_", "HUGGING", "TRANSFORMERS",
    "MODEL", "CHECKPOINT", "CKPT",
    "BATCH", "LR", "LEARNING_RATE", "EPOCH",
    "MINDSPORE", "MS_",
    "VLLM", "MINDIE", "TGI",
];

/// Printed in place of a sensitive value.
pub const WITHHELD_VALUE: &str = "***";

// ---------------------------------------------------------------------------
// Input facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct JobFacts {
    pub job_id: String,
    pub job_name: Option<String>,
    pub job_type: Option<String>,
    pub framework: Option<String>,
    pub status: Option<String>,
    pub process_name: Option<String>,
    pub command_line: Option<String>,
    pub cwd: Option<String>,
    pub node_id: Option<String>,
    pub pid: Option<i64>,
    /// Epoch seconds.
    pub start_time: Option<i64>,
    /// Epoch seconds.
    pub end_time: Option<i64>,
}

/// Latest telemetry of one chip on a card.
#[derive(Debug, Clone, Default)]
pub struct ChipFacts {
    pub aicore_usage_percent: Option<f64>,
    pub hbm_usage_mb: Option<f64>,
    pub hbm_total_mb: Option<f64>,
    pub power_w: Option<f64>,
    pub temp_c: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct CardFacts {
    pub npu_id: i32,
    /// Memory held by the job's processes on this card.
    pub memory_usage_mb: Option<f64>,
    pub chips: Vec<ChipFacts>,
}

#[derive(Debug, Clone, Default)]
pub struct RelatedProcess {
    pub pid: Option<i64>,
    pub process_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ParameterFacts {
    pub parameter_data: Option<String>,
    pub config_file_path: Option<String>,
    pub config_file_content: Option<String>,
    pub env_vars: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CodeFacts {
    pub script_path: Option<String>,
    pub script_content: Option<String>,
    pub sh_script_path: Option<String>,
    pub sh_script_content: Option<String>,
}

/// Everything the assembler knows about one job.
#[derive(Debug, Clone, Default)]
pub struct PromptInput {
    pub job: JobFacts,
    pub cards: Vec<CardFacts>,
    pub related: Vec<RelatedProcess>,
    /// Newest parameter snapshot, if any.
    pub parameter: Option<ParameterFacts>,
    /// Newest code snapshot, if any.
    pub code: Option<CodeFacts>,
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Render the user prompt for one job.
pub fn build_prompt(input: &PromptInput) -> String {
    let mut out = String::new();
    write_basic_info(&mut out, &input.job);
    write_cards(&mut out, &input.cards);
    write_related(&mut out, &input.related);

    if let Some(param) = &input.parameter {
        if let Some(data) = non_empty(&param.parameter_data) {
            out.push_str("\n## Parameters\n");
            write_fenced(&mut out, "json", data, PARAMETER_DATA_LIMIT);
        }
        if let Some(content) = non_empty(&param.config_file_content) {
            out.push_str("\n## Config File\n");
            write_path(&mut out, &param.config_file_path);
            write_fenced(&mut out, "", content, CONFIG_FILE_LIMIT);
        }
        if let Some(raw) = non_empty(&param.env_vars) {
            out.push_str("\n## Environment Variables\n");
            out.push_str(&render_env_vars(raw));
        }
    }

    if let Some(code) = &input.code {
        if let Some(script) = non_empty(&code.script_content) {
            out.push_str("\n## Entry Script\n");
            write_path(&mut out, &code.script_path);
            write_fenced(&mut out, "python", script, SCRIPT_LIMIT);
        }
        if let Some(script) = non_empty(&code.sh_script_content) {
            out.push_str("\n## Shell Script\n");
            write_path(&mut out, &code.sh_script_path);
            write_fenced(&mut out, "bash", script, SHELL_SCRIPT_LIMIT);
        }
    }

    out
}

fn write_basic_info(out: &mut String, job: &JobFacts) {
    out.push_str("## Job\n");
    let _ = writeln!(out, "- Job ID: {}", job.job_id);
    let fields = [
        ("Name", &job.job_name),
        ("Type", &job.job_type),
        ("Framework", &job.framework),
        ("Status", &job.status),
        ("Process", &job.process_name),
        ("Command line", &job.command_line),
        ("Working directory", &job.cwd),
        ("Node", &job.node_id),
    ];
    for (label, value) in fields {
        if let Some(value) = value {
            let _ = writeln!(out, "- {label}: {value}");
        }
    }
    if let Some(pid) = job.pid {
        let _ = writeln!(out, "- PID: {pid}");
    }
    if let Some(start) = job.start_time {
        let _ = writeln!(out, "- Started: {}", format_epoch(start));
        if let Some(end) = job.end_time.filter(|end| *end > 0) {
            let _ = writeln!(out, "- Ended: {}", format_epoch(end));
            let _ = writeln!(out, "- Duration: {}", format_duration(end - start));
        }
    }
}

fn write_cards(out: &mut String, cards: &[CardFacts]) {
    if cards.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## NPU Cards ({} total)", cards.len());
    for card in cards {
        let _ = write!(out, "- NPU {}", card.npu_id);
        if let Some(mem) = card.memory_usage_mb {
            let _ = write!(out, ": process memory {mem:.1} MB");
        }
        for (idx, chip) in card.chips.iter().enumerate() {
            if idx > 0 {
                let _ = write!(out, "\n  Chip{idx}:");
            }
            if let Some(usage) = chip.aicore_usage_percent {
                let _ = write!(out, ", AI core {usage:.1}%");
            }
            if let (Some(used), Some(total)) = (chip.hbm_usage_mb, chip.hbm_total_mb) {
                let _ = write!(out, ", HBM {used:.0}/{total:.0} MB");
            }
            if let Some(power) = chip.power_w {
                let _ = write!(out, ", power {power:.1} W");
            }
            if let Some(temp) = chip.temp_c {
                let _ = write!(out, ", temperature {temp:.1} C");
            }
        }
        out.push('\n');
    }
}

fn write_related(out: &mut String, related: &[RelatedProcess]) {
    if related.is_empty() {
        return;
    }
    let _ = writeln!(out, "\n## Related Processes ({} total)", related.len());
    for proc in related {
        let pid = proc.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string());
        let name = proc.process_name.as_deref().unwrap_or("-");
        let _ = writeln!(out, "- PID {pid}, process: {name}");
    }
}

fn write_path(out: &mut String, path: &Option<String>) {
    if let Some(path) = non_empty(path) {
        let _ = writeln!(out, "Path: {path}");
    }
}

fn write_fenced(out: &mut String, lang: &str, body: &str, limit: usize) {
    let _ = writeln!(out, "```{lang}");
    out.push_str(&truncate_chars(body, limit));
    out.push_str("\n```\n");
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn format_epoch(secs: i64) -> String {
    DateTime::from_timestamp(secs, 0)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn format_duration(secs: i64) -> String {
    if secs < 0 {
        return "unknown".to_string();
    }
    let (days, rem) = (secs / 86_400, secs % 86_400);
    let (hours, rem) = (rem / 3_600, rem % 3_600);
    let (mins, secs) = (rem / 60, rem % 60);
    if days > 0 {
        format!("{days}d {hours}h {mins}m")
    } else if hours > 0 {
        format!("{hours}h {mins}m")
    } else if mins > 0 {
        format!("{mins}m {secs}s")
    } else {
        format!("{secs}s")
    }
}

/// Clip `text` to `limit` characters, marking the cut. Never splits a code
/// point.
pub fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((byte_idx, _)) => format!("{}\n{TRUNCATION_MARKER}", &text[..byte_idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Environment variables
// ---------------------------------------------------------------------------

/// Environment variables split into what may be shown and what is withheld.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvView {
    /// Non-sensitive entries, sorted by key.
    pub visible: Vec<(String, String)>,
    /// Sensitive keys, sorted. Their values are never kept.
    pub withheld: Vec<String>,
}

impl EnvView {
    /// Narrow to keys relevant to training or inference.
    pub fn relevant(mut self) -> Self {
        self.visible.retain(|(key, _)| is_relevant_env(key));
        self.withheld.retain(|key| is_relevant_env(key));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.withheld.is_empty()
    }

    /// All entries in key order, withheld values shown as [`WITHHELD_VALUE`].
    pub fn lines(&self) -> Vec<(&str, &str)> {
        let mut lines: Vec<(&str, &str)> = self
            .visible
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .chain(self.withheld.iter().map(|key| (key.as_str(), WITHHELD_VALUE)))
            .collect();
        lines.sort_by(|a, b| a.0.cmp(b.0));
        lines
    }
}

pub fn is_sensitive_env(key: &str) -> bool {
    let upper = key.to_uppercase();
    SENSITIVE_ENV_MARKERS.iter().any(|marker| upper.contains(marker))
}

pub fn is_relevant_env(key: &str) -> bool {
    let upper = key.to_uppercase();
    RELEVANT_ENV_MARKERS.iter().any(|marker| upper.contains(marker))
}

/// Decode a JSON object of environment variables and withhold sensitive
/// values.
///
/// Keys are emitted in ascending order. Non-string values are rendered as
/// compact JSON.
pub fn filter_env_vars(raw: &str) -> Result<EnvView, serde_json::Error> {
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(raw)?;
    let mut view = EnvView::default();
    for (key, value) in map {
        if is_sensitive_env(&key) {
            view.withheld.push(key);
            continue;
        }
        let value = match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        view.visible.push((key, value));
    }
    view.visible.sort_by(|a, b| a.0.cmp(&b.0));
    view.withheld.sort();
    Ok(view)
}

fn render_env_vars(raw: &str) -> String {
    let Ok(view) = filter_env_vars(raw) else {
        return "(unparseable)\n".to_string();
    };
    let view = view.relevant();
    if view.is_empty() {
        return "(no training or inference variables)\n".to_string();
    }
    let mut out = String::new();
    for (key, value) in view.lines() {
        let _ = writeln!(out, "- {key}={value}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_input() -> PromptInput {
        PromptInput {
            job: JobFacts {
                job_id: "job-1".into(),
                job_name: Some("llama-train".into()),
                framework: Some("pytorch".into()),
                status: Some("running".into()),
                command_line: Some("python train.py --lr 1e-4".into()),
                ..Default::default()
            },
            cards: vec![CardFacts {
                npu_id: 0,
                memory_usage_mb: Some(2048.0),
                chips: vec![
                    ChipFacts {
                        aicore_usage_percent: Some(87.5),
                        hbm_usage_mb: Some(30000.0),
                        hbm_total_mb: Some(65536.0),
                        power_w: Some(310.0),
                        temp_c: Some(61.0),
                    },
                    ChipFacts {
                        aicore_usage_percent: Some(80.0),
                        ..Default::default()
                    },
                ],
            }],
            related: vec![RelatedProcess {
                pid: Some(42),
                process_name: Some("python".into()),
            }],
            parameter: Some(ParameterFacts {
                parameter_data: Some(r#"{"lr":"1e-4"}"#.into()),
                config_file_path: Some("/etc/train.yaml".into()),
                config_file_content: Some("epochs: 3".into()),
                env_vars: Some(r#"{"HCCL_TIMEOUT":"600","HF_TOKEN":"abc","ASCEND_HOME":"/usr/local"}"#.into()),
            }),
            code: Some(CodeFacts {
                script_path: Some("/work/train.py".into()),
                script_content: Some("print('hi')".into()),
                sh_script_path: None,
                sh_script_content: Some("torchrun train.py".into()),
            }),
        }
    }

    #[test]
    fn sections_appear_in_fixed_order() {
        let prompt = build_prompt(&make_input());
        let order = [
            "## Job",
            "## NPU Cards (1 total)",
            "## Related Processes (1 total)",
            "## Parameters",
            "## Config File",
            "## Environment Variables",
            "## Entry Script",
            "## Shell Script",
        ];
        let positions: Vec<usize> = order
            .iter()
            .map(|h| prompt.find(h).unwrap_or_else(|| panic!("missing {h}")))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(prompt.contains("```python\nprint('hi')\n```"));
        assert!(prompt.contains("```bash\ntorchrun train.py\n```"));
        assert!(prompt.contains("Path: /etc/train.yaml"));
        assert!(prompt.contains("AI core 87.5%"));
        assert!(prompt.contains("HBM 30000/65536 MB"));
        assert!(prompt.contains("\n  Chip1:, AI core 80.0%"));
    }

    #[test]
    fn assembly_is_deterministic() {
        assert_eq!(build_prompt(&make_input()), build_prompt(&make_input()));
    }

    #[test]
    fn absent_data_emits_no_section() {
        let input = PromptInput {
            job: JobFacts {
                job_id: "bare".into(),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(build_prompt(&input), "## Job\n- Job ID: bare\n");
    }

    #[test]
    fn sensitive_env_values_never_leak() {
        let prompt = build_prompt(&make_input());
        assert!(prompt.contains(
            "## Environment Variables\n- ASCEND_HOME=/usr/local\n- HCCL_TIMEOUT=600\n- HF_TOKEN=***\n"
        ));
        assert!(!prompt.contains("abc"));
    }

    #[test]
    fn only_relevant_env_vars_reach_the_prompt() {
        let mut input = make_input();
        if let Some(param) = input.parameter.as_mut() {
            param.env_vars = Some(
                r#"{"PATH":"/bin","HOME":"/root","DB_PASSWORD":"p","RANK":"0","vllm_port":"8000"}"#
                    .into(),
            );
        }
        let prompt = build_prompt(&input);
        assert!(prompt.contains("## Environment Variables\n- RANK=0\n- vllm_port=8000\n"));
        assert!(!prompt.contains("PATH"));
        assert!(!prompt.contains("HOME"));
        assert!(!prompt.contains("DB_PASSWORD"));

        if let Some(param) = input.parameter.as_mut() {
            param.env_vars = Some(r#"{"PATH":"/bin"}"#.into());
        }
        assert!(build_prompt(&input)
            .contains("## Environment Variables\n(no training or inference variables)\n"));
    }

    #[test]
    fn env_filter_matches_markers_case_insensitively() {
        let view = filter_env_vars(
            r#"{"db_password":"x","Api_Key":"y","PATH":"/bin","AUTHOR":"me","RANK":3}"#,
        )
        .unwrap();
        assert_eq!(
            view.visible,
            vec![
                ("PATH".to_string(), "/bin".to_string()),
                ("RANK".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(view.withheld, ["AUTHOR", "Api_Key", "db_password"]);
        assert!(view.lines().contains(&("Api_Key", WITHHELD_VALUE)));
    }

    #[test]
    fn unparseable_env_is_reported() {
        let mut input = make_input();
        if let Some(param) = input.parameter.as_mut() {
            param.env_vars = Some("not json".into());
        }
        assert!(build_prompt(&input).contains("## Environment Variables\n(unparseable)\n"));
    }

    #[test]
    fn truncation_marks_the_cut() {
        assert_eq!(truncate_chars("short", 10), "short");
        let clipped = truncate_chars("abcdef", 3);
        assert_eq!(clipped, format!("abc\n{TRUNCATION_MARKER}"));
    }

    #[test]
    fn truncation_respects_code_points() {
        let clipped = truncate_chars("训练脚本内容", 2);
        assert!(clipped.starts_with("训练\n"));
    }

    #[test]
    fn long_script_is_clipped_to_budget() {
        let mut input = make_input();
        if let Some(code) = input.code.as_mut() {
            code.script_content = Some("x".repeat(SCRIPT_LIMIT + 10));
        }
        let prompt = build_prompt(&input);
        let expected = format!("```python\n{}\n{TRUNCATION_MARKER}\n```", "x".repeat(SCRIPT_LIMIT));
        assert!(prompt.contains(&expected));
    }

    #[test]
    fn finished_job_reports_duration() {
        let mut input = make_input();
        input.job.start_time = Some(0);
        input.job.end_time = Some(3_720);
        let prompt = build_prompt(&input);
        assert!(prompt.contains("- Started: 1970-01-01 00:00:00 UTC"));
        assert!(prompt.contains("- Duration: 1h 2m"));
    }
}
