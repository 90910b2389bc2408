//! TOML configuration with environment overrides.
//!
//! Connection settings and tuning knobs come from the config file. The
//! index host, port, and protocol may be overridden with `TYPESENSE_HOST`,
//! `TYPESENSE_PORT`, and `TYPESENSE_PROTOCOL`. Credentials are read only
//! from the environment (`TYPESENSE_API_KEY`, `GITHUB_TOKEN`,
//! `OPENAI_API_KEY`) and never appear in the file.

use anyhow::{bail, Context, Result};
use discussion_harness_core::evaluate::Approach;
use discussion_harness_core::models::{IdentityScheme, RepoRef};
use discussion_harness_core::search::MAX_TYPOS;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Largest page Typesense will return for one search.
pub const MAX_PER_PAGE: usize = 250;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_protocol")]
    pub protocol: String,
    #[serde(default = "default_collection")]
    pub collection: String,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            protocol: default_protocol(),
            collection: default_collection(),
            connection_timeout_secs: default_connection_timeout(),
        }
    }
}

impl IndexConfig {
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }
}

fn default_host() -> String {
    "localhost".to_string()
}
fn default_port() -> u16 {
    8108
}
fn default_protocol() -> String {
    "http".to_string()
}
fn default_collection() -> String {
    "ai_related_discussions".to_string()
}
fn default_connection_timeout() -> u64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_source_timeout")]
    pub connection_timeout_secs: u64,
    #[serde(default)]
    pub repositories: Vec<RepoRef>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            connection_timeout_secs: default_source_timeout(),
            repositories: Vec::new(),
        }
    }
}

fn default_endpoint() -> String {
    "https://api.github.com/graphql".to_string()
}
fn default_source_timeout() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_words")]
    pub max_words: usize,
    #[serde(default)]
    pub identity: IdentityScheme,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_words: default_max_words(),
            identity: IdentityScheme::default(),
        }
    }
}

fn default_max_words() -> usize {
    discussion_harness_core::chunk::DEFAULT_MAX_WORDS
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    #[serde(default = "default_query_by")]
    pub query_by: Vec<String>,
    #[serde(default = "default_typo_candidates")]
    pub typo_candidates: Vec<u8>,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            query_by: default_query_by(),
            typo_candidates: default_typo_candidates(),
            limit: default_limit(),
        }
    }
}

impl RetrievalConfig {
    /// The candidate approaches, in evaluation order.
    pub fn approaches(&self) -> Vec<Approach> {
        Approach::typo_variants(&self.query_by, &self.typo_candidates, self.limit)
    }
}

fn default_query_by() -> Vec<String> {
    vec![
        "title".to_string(),
        "bodyText".to_string(),
        "comments".to_string(),
    ]
}
fn default_typo_candidates() -> Vec<u8> {
    vec![2, 1]
}
fn default_limit() -> usize {
    10
}

/// Token encoding used to measure context size.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenEncoding {
    #[default]
    Cl100kBase,
    O200kBase,
    P50kBase,
    Heuristic,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ContextConfig {
    #[serde(default = "default_context_tokens")]
    pub max_tokens: usize,
    #[serde(default)]
    pub encoding: TokenEncoding,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_tokens: default_context_tokens(),
            encoding: TokenEncoding::default(),
        }
    }
}

fn default_context_tokens() -> usize {
    3000
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_generation_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_endpoint_openai")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            temperature: 0.0,
            max_tokens: default_generation_tokens(),
            endpoint: default_endpoint_openai(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo-instruct".to_string()
}
fn default_generation_tokens() -> u32 {
    256
}
fn default_endpoint_openai() -> String {
    "https://api.openai.com/v1/completions".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}

/// Target of `dh load-docs` when `--collection` is not given.
#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    #[serde(default = "default_knowledge_collection")]
    pub collection: String,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            collection: default_knowledge_collection(),
        }
    }
}

fn default_knowledge_collection() -> String {
    discussion_harness_core::knowledge::DEFAULT_COLLECTION.to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    #[serde(default = "default_log_path")]
    pub path: PathBuf,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: default_log_path(),
        }
    }
}

fn default_log_path() -> PathBuf {
    PathBuf::from("./data/responses.sqlite")
}

/// Read, override, and validate the configuration at `path`.
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config: Config =
        toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate(&config)?;
    Ok(config)
}

/// Apply `TYPESENSE_*` connection overrides looked up through `var`.
pub fn apply_env_overrides<F>(config: &mut Config, var: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(host) = var("TYPESENSE_HOST") {
        config.index.host = host;
    }
    if let Some(port) = var("TYPESENSE_PORT") {
        config.index.port = port
            .parse()
            .with_context(|| format!("TYPESENSE_PORT is not a valid port: '{}'", port))?;
    }
    if let Some(protocol) = var("TYPESENSE_PROTOCOL") {
        config.index.protocol = protocol;
    }
    Ok(())
}

pub fn validate(config: &Config) -> Result<()> {
    match config.index.protocol.as_str() {
        "http" | "https" => {}
        other => bail!("index.protocol must be http or https, got '{}'", other),
    }
    if config.index.collection.trim().is_empty() {
        bail!("index.collection must not be empty");
    }
    if config.knowledge.collection.trim().is_empty() {
        bail!("knowledge.collection must not be empty");
    }

    for repo in &config.source.repositories {
        if repo.owner.is_empty() || repo.name.is_empty() {
            bail!("source.repositories entries need both owner and name");
        }
    }

    if config.chunking.max_words == 0 {
        bail!("chunking.max_words must be > 0");
    }

    if config.retrieval.query_by.is_empty() {
        bail!("retrieval.query_by must list at least one field");
    }
    if config.retrieval.typo_candidates.is_empty() {
        bail!("retrieval.typo_candidates must list at least one value");
    }
    if let Some(t) = config
        .retrieval
        .typo_candidates
        .iter()
        .find(|&&t| t > MAX_TYPOS)
    {
        bail!(
            "retrieval.typo_candidates values must be <= {}, got {}",
            MAX_TYPOS,
            t
        );
    }
    if config.retrieval.limit < 1 {
        bail!("retrieval.limit must be >= 1");
    }
    if config.retrieval.limit > MAX_PER_PAGE {
        bail!(
            "retrieval.limit must be <= {}, got {}",
            MAX_PER_PAGE,
            config.retrieval.limit
        );
    }

    if !(0.0..=2.0).contains(&config.generation.temperature) {
        bail!("generation.temperature must be in [0.0, 2.0]");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Config {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_defaults_from_empty_file() {
        let config = parse("");
        assert_eq!(config.index.base_url(), "http://localhost:8108");
        assert_eq!(config.index.collection, "ai_related_discussions");
        assert_eq!(config.index.connection_timeout_secs, 2);
        assert_eq!(config.chunking.max_words, 200);
        assert_eq!(config.chunking.identity, IdentityScheme::Legacy);
        assert_eq!(config.retrieval.typo_candidates, vec![2, 1]);
        assert_eq!(config.context.max_tokens, 3000);
        assert_eq!(config.context.encoding, TokenEncoding::Cl100kBase);
        assert_eq!(config.source.connection_timeout_secs, 10);
        assert_eq!(config.knowledge.collection, "typesense_docs");
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_full_file() {
        let config = parse(
            r#"
            [index]
            host = "typesense"
            collection = "discussions"

            [source]
            connection_timeout_secs = 3

            [[source.repositories]]
            owner = "crewAIInc"
            name = "crewAI"

            [knowledge]
            collection = "kb"

            [chunking]
            max_words = 120
            identity = "content-hash"

            [retrieval]
            typo_candidates = [0, 1, 2]
            limit = 5

            [context]
            encoding = "heuristic"
            "#,
        );
        assert_eq!(config.index.host, "typesense");
        assert_eq!(config.source.repositories[0].full_name(), "crewAIInc/crewAI");
        assert_eq!(config.source.connection_timeout_secs, 3);
        assert_eq!(config.knowledge.collection, "kb");
        assert_eq!(config.chunking.identity, IdentityScheme::ContentHash);
        assert_eq!(config.context.encoding, TokenEncoding::Heuristic);

        let approaches = config.retrieval.approaches();
        assert_eq!(approaches.len(), 3);
        assert_eq!(approaches[2].num_typos, 2);
        assert_eq!(approaches[2].limit, 5);
    }

    #[test]
    fn test_env_overrides() {
        let mut config = parse("");
        apply_env_overrides(&mut config, |key| match key {
            "TYPESENSE_HOST" => Some("search.internal".to_string()),
            "TYPESENSE_PORT" => Some("443".to_string()),
            "TYPESENSE_PROTOCOL" => Some("https".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.index.base_url(), "https://search.internal:443");
    }

    #[test]
    fn test_bad_port_override() {
        let mut config = parse("");
        let result = apply_env_overrides(&mut config, |key| {
            (key == "TYPESENSE_PORT").then(|| "eighty".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failures() {
        let cases = [
            "[chunking]\nmax_words = 0",
            "[retrieval]\ntypo_candidates = []",
            "[retrieval]\ntypo_candidates = [3]",
            "[retrieval]\nquery_by = []",
            "[retrieval]\nlimit = 0",
            "[retrieval]\nlimit = 251",
            "[knowledge]\ncollection = \"\"",
            "[index]\nprotocol = \"ftp\"",
        ];
        for case in cases {
            assert!(validate(&parse(case)).is_err(), "expected failure for {:?}", case);
        }
    }

    #[test]
    fn test_example_config_is_valid() {
        let config = parse(include_str!("../config/dh.example.toml"));
        assert!(validate(&config).is_ok());
        let repos: Vec<String> = config
            .source
            .repositories
            .iter()
            .map(RepoRef::full_name)
            .collect();
        assert_eq!(
            repos,
            vec![
                "keras-team/keras",
                "explosion/spacy",
                "allenai/allennlp",
                "crewAIInc/crewAI"
            ]
        );
    }

    #[test]
    fn test_load_config_missing_file() {
        let err = load_config(Path::new("/nonexistent/dh.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
