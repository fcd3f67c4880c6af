//! Runtime-mutable LLM settings.
//!
//! Readers take a consistent `(config, client)` snapshot under a read lock.
//! Writers are serialized through the document mutex: they build the new
//! block and client, swap them in, then rewrite the whole YAML document. A
//! failed write leaves the in-memory update committed and is reported as
//! [`SettingsError::Persist`].

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use npuwatch_core::secrets::is_masked_or_empty;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};

use crate::config::{AppConfig, ConfigError, LlmConfig, LlmModelConfig};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("{0}")]
    Invalid(String),

    #[error("failed to build LLM HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("config updated in memory but failed to save to file: {0}")]
    Persist(#[from] ConfigError),
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LlmConfigPatch {
    pub enabled: Option<bool>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub timeout: Option<i64>,
    pub default_model_id: Option<String>,
    /// Replaces the whole list. Masked keys keep the stored key of the entry
    /// with the same id.
    pub models: Option<Vec<LlmModelConfig>>,
}

struct Current {
    config: LlmConfig,
    client: reqwest::Client,
}

pub struct LlmSettings {
    path: PathBuf,
    current: RwLock<Current>,
    document: Mutex<AppConfig>,
}

/// Client whose timeout follows the block (0 means the default).
pub fn build_client(config: &LlmConfig) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs()))
        .build()
}

impl LlmSettings {
    /// Take ownership of the loaded document; `path` is where updates are
    /// written back.
    pub fn new(document: AppConfig, path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let config = document.llm.clone();
        let client = build_client(&config)?;
        Ok(Self {
            path: path.into(),
            current: RwLock::new(Current { config, client }),
            document: Mutex::new(document),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current block with the API key masked.
    pub async fn get(&self) -> LlmConfig {
        self.current.read().await.config.masked()
    }

    /// Unmasked block and the client built for it, for issuing requests.
    pub async fn snapshot(&self) -> (LlmConfig, reqwest::Client) {
        let current = self.current.read().await;
        (current.config.clone(), current.client.clone())
    }

    /// Apply `patch`, swap in a rebuilt client, then persist. Returns the
    /// masked result.
    pub async fn update(&self, patch: LlmConfigPatch) -> Result<LlmConfig, SettingsError> {
        let mut document = self.document.lock().await;

        let previous = self.current.read().await.config.clone();
        let next = apply_patch(&previous, patch)?;
        let client = build_client(&next)?;

        {
            let mut current = self.current.write().await;
            current.config = next.clone();
            current.client = client;
        }
        document.llm = next.clone();

        tracing::info!(
            enabled = next.enabled,
            endpoint = %next.endpoint,
            model = %next.model,
            timeout = next.timeout,
            "LLM configuration updated"
        );

        document.save(&self.path).await?;
        Ok(next.masked())
    }
}

/// Merge a patch into the stored block. A masked or empty key leaves the
/// stored key alone so a GET-then-PUT round trip cannot clobber it.
fn apply_patch(current: &LlmConfig, patch: LlmConfigPatch) -> Result<LlmConfig, SettingsError> {
    let mut next = current.clone();

    if let Some(enabled) = patch.enabled {
        next.enabled = enabled;
    }
    if let Some(endpoint) = patch.endpoint {
        next.endpoint = endpoint.trim().to_string();
    }
    if let Some(model) = patch.model {
        next.model = model.trim().to_string();
    }
    if let Some(api_key) = patch.api_key {
        if !is_masked_or_empty(&api_key, &current.api_key) {
            next.api_key = api_key;
        }
    }
    if let Some(timeout) = patch.timeout {
        let timeout = u64::try_from(timeout)
            .ok()
            .filter(|t| *t >= 1)
            .ok_or_else(|| SettingsError::Invalid("timeout must be at least 1 second".into()))?;
        next.timeout = timeout;
    }
    if let Some(models) = patch.models {
        next.models = merge_models(models, &current.models)?;
    }
    if let Some(default_model_id) = patch.default_model_id {
        next.default_model_id = default_model_id.trim().to_string();
    }

    validate_default_model(&next)?;
    Ok(next)
}

fn merge_models(
    submitted: Vec<LlmModelConfig>,
    stored: &[LlmModelConfig],
) -> Result<Vec<LlmModelConfig>, SettingsError> {
    let stored_keys: HashMap<&str, &str> = stored
        .iter()
        .map(|m| (m.id.as_str(), m.api_key.as_str()))
        .collect();
    let mut seen = HashSet::new();
    let mut merged = Vec::with_capacity(submitted.len());

    for mut model in submitted {
        model.id = model.id.trim().to_string();
        model.name = model.name.trim().to_string();
        model.endpoint = model.endpoint.trim().to_string();
        model.model = model.model.trim().to_string();

        if model.id.is_empty() {
            return Err(SettingsError::Invalid("model id is required".into()));
        }
        if !seen.insert(model.id.clone()) {
            return Err(SettingsError::Invalid(format!(
                "duplicate model id: {}",
                model.id
            )));
        }
        if let Some(old_key) = stored_keys.get(model.id.as_str()) {
            if is_masked_or_empty(&model.api_key, old_key) {
                model.api_key = old_key.to_string();
            }
        }
        merged.push(model);
    }
    Ok(merged)
}

/// A non-empty default must name an enabled entry whenever entries exist.
fn validate_default_model(config: &LlmConfig) -> Result<(), SettingsError> {
    if config.default_model_id.is_empty() || config.models.is_empty() {
        return Ok(());
    }
    match config.find_model(&config.default_model_id) {
        Some(model) if model.enabled => Ok(()),
        Some(_) => Err(SettingsError::Invalid(
            "default model must be enabled".into(),
        )),
        None => Err(SettingsError::Invalid("default model not found".into())),
    }
}
