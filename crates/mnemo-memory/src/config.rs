use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::eviction;
use crate::index::SimilarityMetric;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MemoryConfig {
    /// Required embedding vector length; mismatched vectors are rejected.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    /// Minimum similarity for a search hit to be returned.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Similarity metric, fixed for the lifetime of one store instance.
    #[serde(default)]
    pub metric: SimilarityMetric,
    /// Hard cap on stored record count.
    #[serde(default = "default_max_memories")]
    pub max_memories: usize,
    /// Fraction of `max_memories` that triggers eviction.
    #[serde(default = "default_clean_threshold")]
    pub clean_threshold: f64,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub memory_filter: FilterConfig,
}

fn default_dimension() -> usize {
    1024
}

fn default_similarity_threshold() -> f32 {
    0.65
}

fn default_max_memories() -> usize {
    5000
}

fn default_clean_threshold() -> f64 {
    0.9
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub api_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Max texts embedded per upstream call; larger requests are split.
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

fn default_model() -> String {
    "embedding-3".into()
}

fn default_max_batch_size() -> usize {
    8
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            model: default_model(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
    #[serde(default = "default_metadata_path")]
    pub metadata_path: PathBuf,
}

fn default_index_path() -> PathBuf {
    "data/memory/index.json".into()
}

fn default_metadata_path() -> PathBuf {
    "data/memory/records.json".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            metadata_path: default_metadata_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,
    /// Importance floor; 0 disables the importance gate and leaves eviction
    /// on its internal default partition floor.
    #[serde(default)]
    pub min_importance: u8,
    #[serde(default = "default_min_text_length")]
    pub min_text_length: usize,
    #[serde(default = "default_max_text_length")]
    pub max_text_length: usize,
    #[serde(default)]
    pub keywords: Vec<String>,
}

fn default_filter_enabled() -> bool {
    true
}

fn default_min_text_length() -> usize {
    10
}

fn default_max_text_length() -> usize {
    3000
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
            min_importance: 0,
            min_text_length: default_min_text_length(),
            max_text_length: default_max_text_length(),
            keywords: Vec::new(),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            dimension: default_dimension(),
            similarity_threshold: default_similarity_threshold(),
            metric: SimilarityMetric::default(),
            max_memories: default_max_memories(),
            clean_threshold: default_clean_threshold(),
            embedding: EmbeddingConfig::default(),
            storage: StorageConfig::default(),
            memory_filter: FilterConfig::default(),
        }
    }
}

impl MemoryConfig {
    /// Load configuration from a TOML file with env var overrides.
    ///
    /// Falls back to full defaults when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str::<Self>(&content).context("failed to parse config file")?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("MNEMO_EMBED_API_URL") {
            self.embedding.api_url = v;
        }
        if let Ok(v) = std::env::var("MNEMO_EMBED_API_KEY") {
            self.embedding.api_key = v;
        }
        if let Ok(v) = std::env::var("MNEMO_EMBED_MODEL") {
            self.embedding.model = v;
        }
    }

    /// Importance floor used for eviction's "never forget" partition.
    #[must_use]
    pub fn retain_floor(&self) -> u8 {
        if self.memory_filter.min_importance > 0 {
            self.memory_filter.min_importance
        } else {
            eviction::DEFAULT_RETAIN_FLOOR
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_when_file_missing() {
        let config = MemoryConfig::load(Path::new("/nonexistent/mnemo.toml")).unwrap();
        assert_eq!(config.dimension, 1024);
        assert!((config.similarity_threshold - 0.65).abs() < f32::EPSILON);
        assert_eq!(config.metric, SimilarityMetric::Cosine);
        assert_eq!(config.max_memories, 5000);
        assert!((config.clean_threshold - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.embedding.model, "embedding-3");
        assert_eq!(config.embedding.max_batch_size, 8);
        assert!(config.memory_filter.enabled);
        assert_eq!(config.memory_filter.min_text_length, 10);
        assert_eq!(config.memory_filter.max_text_length, 3000);
        assert!(config.memory_filter.keywords.is_empty());
    }

    #[test]
    fn parse_valid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mnemo.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"
dimension = 4
similarity_threshold = 0.5
metric = "dot"
max_memories = 100
clean_threshold = 0.8

[embedding]
api_url = "http://localhost:9999"
model = "custom-embed"
max_batch_size = 2

[storage]
index_path = "/tmp/idx.json"
metadata_path = "/tmp/meta.json"

[memory_filter]
enabled = false
min_importance = 5
keywords = ["light", "scene"]
"#
        )
        .unwrap();

        let config = MemoryConfig::load(&path).unwrap();
        assert_eq!(config.dimension, 4);
        assert_eq!(config.metric, SimilarityMetric::Dot);
        assert_eq!(config.max_memories, 100);
        assert_eq!(config.embedding.api_url, "http://localhost:9999");
        assert_eq!(config.embedding.model, "custom-embed");
        assert_eq!(config.embedding.max_batch_size, 2);
        assert_eq!(config.storage.index_path, PathBuf::from("/tmp/idx.json"));
        assert!(!config.memory_filter.enabled);
        assert_eq!(config.memory_filter.keywords.len(), 2);
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mnemo.toml");
        std::fs::write(&path, "dimension = ").unwrap();
        assert!(MemoryConfig::load(&path).is_err());
    }

    #[test]
    fn retain_floor_prefers_configured_min_importance() {
        let mut config = MemoryConfig::default();
        assert_eq!(config.retain_floor(), 3);
        config.memory_filter.min_importance = 7;
        assert_eq!(config.retain_floor(), 7);
    }
}
