use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    /// Directory holding the persisted vector index artifact.
    pub dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    800
}
fn default_chunk_overlap() -> usize {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Results kept per retrieval leg.
    #[serde(default = "default_k")]
    pub k: usize,
    /// Nearest-neighbor candidate pool before trimming to `k`.
    #[serde(default = "default_fetch_k")]
    pub fetch_k: usize,
    #[serde(default = "default_weight")]
    pub vector_weight: f64,
    #[serde(default = "default_weight")]
    pub keyword_weight: f64,
    /// Fused chunks passed to the generator as grounding context.
    #[serde(default = "default_context_chunks")]
    pub context_chunks: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: default_k(),
            fetch_k: default_fetch_k(),
            vector_weight: default_weight(),
            keyword_weight: default_weight(),
            context_chunks: default_context_chunks(),
        }
    }
}

fn default_k() -> usize {
    3
}
fn default_fetch_k() -> usize {
    20
}
fn default_weight() -> f64 {
    0.5
}
fn default_context_chunks() -> usize {
    6
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// One of `ollama`, `openai`, `disabled`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    #[serde(default = "default_embedding_dims")]
    pub dims: usize,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dims: default_embedding_dims(),
            url: default_ollama_url(),
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_embed_timeout_secs(),
        }
    }
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

fn default_embedding_provider() -> String {
    "ollama".to_string()
}
fn default_embedding_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_embedding_dims() -> usize {
    768
}
fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_generation_model")]
    pub model: String,
    #[serde(default = "default_ollama_url")]
    pub url: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_generate_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_generation_model(),
            url: default_ollama_url(),
            temperature: default_temperature(),
            max_retries: default_max_retries(),
            timeout_secs: default_generate_timeout_secs(),
        }
    }
}

fn default_generation_model() -> String {
    "llama3.2:latest".to_string()
}
fn default_temperature() -> f64 {
    0.2
}
fn default_generate_timeout_secs() -> u64 {
    120
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate chunking
    if config.chunking.chunk_size == 0 {
        anyhow::bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.chunk_overlap >= config.chunking.chunk_size {
        anyhow::bail!("chunking.chunk_overlap must be smaller than chunking.chunk_size");
    }

    // Validate retrieval
    if config.retrieval.k < 1 {
        anyhow::bail!("retrieval.k must be >= 1");
    }
    if config.retrieval.fetch_k < config.retrieval.k {
        anyhow::bail!("retrieval.fetch_k must be >= retrieval.k");
    }
    if config.retrieval.context_chunks < 1 {
        anyhow::bail!("retrieval.context_chunks must be >= 1");
    }
    for (name, w) in [
        ("retrieval.vector_weight", config.retrieval.vector_weight),
        ("retrieval.keyword_weight", config.retrieval.keyword_weight),
    ] {
        if !(0.0..=1.0).contains(&w) {
            anyhow::bail!("{} must be in [0.0, 1.0]", name);
        }
    }
    let weight_sum = config.retrieval.vector_weight + config.retrieval.keyword_weight;
    if (weight_sum - 1.0).abs() > 1e-6 {
        anyhow::bail!(
            "retrieval.vector_weight and retrieval.keyword_weight must sum to 1.0 (got {})",
            weight_sum
        );
    }

    // Validate embedding
    match config.embedding.provider.as_str() {
        "disabled" | "openai" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be disabled, openai, or ollama.",
            other
        ),
    }
    if config.embedding.is_enabled() {
        if config.embedding.dims == 0 {
            anyhow::bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.model.is_empty() {
            anyhow::bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    // Validate generation
    if config.generation.model.is_empty() {
        anyhow::bail!("generation.model must not be empty");
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("docqa.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
root = "docs/"

[index]
dir = "vectors_store"
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.chunking.chunk_size, 800);
        assert_eq!(cfg.chunking.chunk_overlap, 300);
        assert_eq!(cfg.retrieval.k, 3);
        assert_eq!(cfg.retrieval.fetch_k, 20);
        assert!((cfg.retrieval.vector_weight - 0.5).abs() < 1e-9);
        assert_eq!(cfg.embedding.provider, "ollama");
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
root = "docs/"

[index]
dir = "vectors_store"

[chunking]
chunk_size = 100
chunk_overlap = 100
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
root = "docs/"

[index]
dir = "vectors_store"

[retrieval]
vector_weight = 0.8
keyword_weight = 0.8
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn test_fetch_k_must_cover_k() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
root = "docs/"

[index]
dir = "vectors_store"

[retrieval]
k = 10
fetch_k = 5
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("fetch_k"));
    }

    #[test]
    fn test_unknown_embedding_provider_rejected() {
        let (_tmp, path) = write_config(
            r#"
[corpus]
root = "docs/"

[index]
dir = "vectors_store"

[embedding]
provider = "quantum"
"#,
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }
}
