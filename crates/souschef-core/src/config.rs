//! YAML configuration for the assistant. Secrets come in through
//! `${ENV_VAR}` placeholders resolved at load time.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use souschef_ranking::{RankingConfig, RestrictionTable};

fn default_catalog_path() -> String {
    "data/recipes.json".to_string()
}

fn default_top_k() -> usize {
    5
}

fn default_context_turns() -> usize {
    5
}

fn default_embedding_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_embedding_dimensions() -> usize {
    1536
}

fn default_embedding_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_nlp_base_url() -> String {
    "https://api.deepseek.com/v1".to_string()
}

fn default_nlp_model() -> String {
    "deepseek-chat".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
    #[serde(default = "default_embedding_base_url")]
    pub base_url: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
            base_url: default_embedding_base_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NlpConfig {
    pub enabled: bool,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_nlp_base_url")]
    pub base_url: String,
    #[serde(default = "default_nlp_model")]
    pub model: String,
}

impl Default for NlpConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: default_nlp_base_url(),
            model: default_nlp_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub nlp: NlpConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub restrictions: RestrictionTable,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            catalog_path: default_catalog_path(),
            top_k: default_top_k(),
            context_turns: default_context_turns(),
            embedding: EmbeddingConfig::default(),
            nlp: NlpConfig::default(),
            ranking: RankingConfig::default(),
            restrictions: RestrictionTable::default(),
        }
    }
}

pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

pub fn load_config(path: &Path) -> Result<AssistantConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let mut config: AssistantConfig = serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))?;

    config.catalog_path = resolve_env_var(&config.catalog_path);
    config.embedding.api_key = resolve_env_var(&config.embedding.api_key);
    config.embedding.base_url = resolve_env_var(&config.embedding.base_url);
    config.nlp.api_key = resolve_env_var(&config.nlp.api_key);
    config.nlp.base_url = resolve_env_var(&config.nlp.base_url);

    Ok(config)
}
