//! Persisted pipeline settings in the app data directory.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::app_data;
use crate::batch::DEFAULT_CONCURRENCY_LIMIT;
use crate::chunks::{ChunkSizePolicy, DEFAULT_MAX_WORDS};
use crate::dedup::DEFAULT_DUPLICATE_THRESHOLD;
use crate::merge::DEFAULT_TAG_LIMIT;
use crate::ollama::{DEFAULT_BASE_URL, DEFAULT_EMBED_MODEL, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT};

const CONFIG_FILENAME: &str = "config.toml";

/// What the model is given for each unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// OCR text is extracted, optionally cleaned, and chunked.
    #[default]
    OcrText,
    /// Raw items are grouped and serialized into the prompt.
    StructuredItems,
}

/// Which model capability produces notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationBackend {
    #[default]
    Structured,
    Chat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub mode: PipelineMode,
    pub chunk_size_policy: ChunkSizePolicy,
    pub max_chunk_size: usize,
    /// Generation calls in flight at once.
    pub concurrency_limit: usize,
    pub duplicate_threshold: f32,
    pub deduplication_enabled: bool,
    /// Lowercase and drop punctuation and stopwords before chunking (OCR mode).
    pub clean_ocr_text: bool,
    pub tag_limit: usize,
    pub generation: GenerationBackend,
    pub ollama_url: String,
    pub model: String,
    pub embed_model: String,
    /// Per-request limit for Ollama calls, in seconds.
    pub request_timeout_secs: u64,
    /// Used when no prompt is given on the command line.
    pub custom_prompt: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: PipelineMode::default(),
            chunk_size_policy: ChunkSizePolicy::default(),
            max_chunk_size: DEFAULT_MAX_WORDS,
            concurrency_limit: DEFAULT_CONCURRENCY_LIMIT,
            duplicate_threshold: DEFAULT_DUPLICATE_THRESHOLD,
            deduplication_enabled: true,
            clean_ocr_text: true,
            tag_limit: DEFAULT_TAG_LIMIT,
            generation: GenerationBackend::default(),
            ollama_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            embed_model: DEFAULT_EMBED_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT.as_secs(),
            custom_prompt: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chunk_size == 0 {
            return Err(ConfigError::Invalid("max_chunk_size must be at least 1".into()));
        }
        if self.concurrency_limit == 0 {
            return Err(ConfigError::Invalid("concurrency_limit must be at least 1".into()));
        }
        if self.tag_limit == 0 {
            return Err(ConfigError::Invalid("tag_limit must be at least 1".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid("request_timeout_secs must be at least 1".into()));
        }
        if !(-1.0..=1.0).contains(&self.duplicate_threshold) {
            return Err(ConfigError::Invalid(format!(
                "duplicate_threshold must be within [-1, 1], got {}",
                self.duplicate_threshold
            )));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Load config from the app data directory. Returns default config if missing or invalid.
pub fn load_config() -> PipelineConfig {
    let Some(data_dir) = app_data::app_data_dir() else {
        return PipelineConfig::default();
    };
    load_config_from(&data_dir.join(CONFIG_FILENAME))
}

/// Load config from `path`. Returns default config if missing or invalid.
pub fn load_config_from(path: &Path) -> PipelineConfig {
    let Ok(s) = std::fs::read_to_string(path) else {
        return PipelineConfig::default();
    };
    toml::from_str(&s).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "invalid config, using defaults");
        PipelineConfig::default()
    })
}

/// Save config to the app data directory.
pub fn save_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    let data_dir = app_data::app_data_dir().ok_or(ConfigError::NoDataDir)?;
    save_config_to(config, &data_dir.join(CONFIG_FILENAME))
}

pub fn save_config_to(config: &PipelineConfig, path: &Path) -> Result<(), ConfigError> {
    config.validate()?;
    let s = config.to_toml()?;
    std::fs::write(path, s).map_err(ConfigError::Write)
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine app data directory")]
    NoDataDir,
    #[error("failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("failed to write config: {0}")]
    Write(std::io::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}
