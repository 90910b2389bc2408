//! Answer generation.
//!
//! The [`Generator`] trait is the seam between the retrieval pipeline and
//! the language model. [`OpenAIGenerator`] calls the OpenAI completions
//! API with the question and the assembled context.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::GenerationConfig;

/// Reply used when retrieval produced nothing usable.
pub const INSUFFICIENT_INFORMATION: &str =
    "I don't have enough information from the available discussions to answer that question.";

/// Produces an answer from a question and its context.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> Result<String>;
}

/// Fill the answer prompt.
pub fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "You are a helpful AI assistant answering questions about open-source projects.\n\
         Use ONLY the following context from GitHub discussions to answer the user's question.\n\
         The context contains titles, body text, and comments from relevant discussions.\n\
         If the context doesn't contain relevant information to answer the question, say that \
         you don't have enough information from the available discussions.\n\
         \n\
         Context:\n\
         {context}\n\
         \n\
         User's Question: {question}\n\
         \n\
         Answer based ONLY on the above context. If the information is not in the context, \
         say you don't have enough information:"
    )
}

/// Generator backed by the OpenAI completions API.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIGenerator {
    config: GenerationConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow::anyhow!("OPENAI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            config: config.clone(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    async fn generate(&self, question: &str, context: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.config.model,
            "prompt": build_prompt(question, context),
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
        });

        let mut last_err = None;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!("retrying completion in {:?}", delay);
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(&self.config.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response.json().await?;
                        return parse_completion(&json);
                    }

                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        warn!("OpenAI API error {}, will retry", status);
                        last_err = Some(anyhow::anyhow!(
                            "OpenAI API error {}: {}",
                            status,
                            body_text
                        ));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("OpenAI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Completion failed after retries")))
    }
}

/// Extract `choices[0].text` from a completions response.
fn parse_completion(json: &serde_json::Value) -> Result<String> {
    json.pointer("/choices/0/text")
        .and_then(|t| t.as_str())
        .map(|t| t.trim().to_string())
        .ok_or_else(|| anyhow::anyhow!("Invalid OpenAI response: missing choices[0].text"))
}
