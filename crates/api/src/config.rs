//! YAML configuration document.
//!
//! The whole file is modelled so it can be written back verbatim when the
//! LLM block changes at runtime. Every field has a default, and top-level
//! blocks this service does not know about are carried through untouched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use npuwatch_core::secrets::mask_secret;
use serde::{Deserialize, Serialize};

/// Used when neither `--config` nor `API_SERVER_CONFIG` is given.
pub const DEFAULT_CONFIG_PATH: &str = "configs/api-server.yaml";

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "API_SERVER_CONFIG";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub log: LogConfig,
    pub llm: LlmConfig,
    pub jwt: JwtSection,
    /// Top-level blocks owned by other tools sharing this file.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
    /// Values taken from the environment. Never written back to disk.
    #[serde(skip)]
    pub overrides: EnvOverrides,
}

#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub database_url: Option<String>,
    pub jwt_secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `debug` or `release`; informational only.
    pub mode: String,
    pub cors_origins: Vec<String>,
    /// Generous by default so an LLM analysis can complete.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            mode: "release".into(),
            cors_origins: vec!["http://localhost:5173".into()],
            request_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub max_open_conns: u32,
    pub max_idle_conns: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            user: "postgres".into(),
            password: String::new(),
            database: "npu_monitor".into(),
            max_open_conns: 20,
            max_idle_conns: 5,
        }
    }
}

/// Carried for the collectors that share this file; the API does not use it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub password: String,
    pub db: i64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: "localhost".into(),
            port: 6379,
            password: String::new(),
            db: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    /// Extra log file; empty means stdout only.
    pub file: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: String::new(),
        }
    }
}

/// The runtime-mutable LLM block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub enabled: bool,
    /// OpenAI-compatible base URL, e.g. `https://host/v1`.
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// Request timeout in seconds; 0 means [`DEFAULT_LLM_TIMEOUT_SECS`].
    pub timeout: u64,
    /// Entry of `models` used when a request names none. Empty means the
    /// top-level block.
    pub default_model_id: String,
    pub models: Vec<LlmModelConfig>,
}

pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 60;

/// A selectable model. Empty `endpoint`, `api_key` or `model` fall back to
/// the top-level block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmModelConfig {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: String::new(),
            api_key: String::new(),
            model: String::new(),
            timeout: DEFAULT_LLM_TIMEOUT_SECS,
            default_model_id: String::new(),
            models: Vec::new(),
        }
    }
}

impl LlmConfig {
    pub fn timeout_secs(&self) -> u64 {
        if self.timeout == 0 {
            DEFAULT_LLM_TIMEOUT_SECS
        } else {
            self.timeout
        }
    }

    /// Copy with every API key masked for display.
    pub fn masked(&self) -> Self {
        Self {
            api_key: mask_secret(&self.api_key),
            models: self
                .models
                .iter()
                .map(|m| LlmModelConfig {
                    api_key: mask_secret(&m.api_key),
                    ..m.clone()
                })
                .collect(),
            ..self.clone()
        }
    }

    pub fn find_model(&self, id: &str) -> Option<&LlmModelConfig> {
        self.models.iter().find(|m| m.id == id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSection {
    pub secret: String,
    pub expire_hour: i64,
}

impl Default for JwtSection {
    fn default() -> Self {
        Self {
            secret: String::new(),
            expire_hour: 24,
        }
    }
}

impl AppConfig {
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        // An empty file deserializes to unit, not a map.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Read and parse the document at `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Rewrite the whole document at `path`.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = self.to_yaml()?;
        tokio::fs::write(path, text)
            .await
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Pick up `DATABASE_URL` and `JWT_SECRET` from the environment.
    pub fn apply_env_overrides(&mut self) {
        self.overrides = EnvOverrides {
            database_url: non_empty_env("DATABASE_URL"),
            jwt_secret: non_empty_env("JWT_SECRET"),
        };
    }

    pub fn database_url(&self) -> String {
        if let Some(url) = &self.overrides.database_url {
            return url.clone();
        }
        let db = &self.database;
        format!(
            "postgres://{}:{}@{}:{}/{}",
            db.user, db.password, db.host, db.port, db.database
        )
    }

    pub fn jwt_secret(&self) -> &str {
        self.overrides
            .jwt_secret
            .as_deref()
            .unwrap_or(&self.jwt.secret)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve the config path: `--config <path>` (or `--config=<path>`) wins,
/// then `env_path`, then [`DEFAULT_CONFIG_PATH`].
pub fn resolve_config_path<I>(args: I, env_path: Option<String>) -> PathBuf
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-config" {
            if let Some(path) = args.next() {
                return PathBuf::from(path);
            }
        } else if let Some(path) = arg.strip_prefix("--config=") {
            return PathBuf::from(path);
        }
    }
    env_path
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
