// Generative model client
// Talks to a llama.cpp server; tokenizer and completion stay behind one
// trait so context trimming always uses the generation model's own tokenizer


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::LlamaConfig;
use crate::{RagError, Result};

const DEFAULT_TIMEOUT_SECONDS: u64 = 120;

/// Sampling settings for one completion call.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingParams {
    /// Hard cap on generated tokens; matches the reserved output budget.
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub stop: Vec<String>,
}

impl SamplingParams {
    #[inline]
    pub fn from_config(config: &LlamaConfig) -> Self {
        Self {
            max_tokens: config.reserved_output_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            stop: config.stop.clone(),
        }
    }
}

/// A generative model paired with its own tokenizer.
///
/// Token counts only hold when trimming and generation share one tokenizer,
/// so both sides live behind this single trait.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn tokenize(&self, text: &str) -> Result<Vec<i32>>;

    /// Reassemble text from a token prefix. Implementations must tolerate a
    /// cut that lands mid-character and drop the trailing partial sequence.
    async fn detokenize(&self, tokens: &[i32]) -> Result<String>;

    async fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String>;
}

/// HTTP client for a llama.cpp `llama-server` instance.
#[derive(Debug, Clone)]
pub struct LlamaClient {
    base_url: Url,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct TokenizeRequest<'a> {
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenizeResponse {
    tokens: Vec<i32>,
}

#[derive(Debug, Serialize)]
struct DetokenizeRequest<'a> {
    tokens: &'a [i32],
}

#[derive(Debug, Deserialize)]
struct DetokenizeResponse {
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    n_predict: u32,
    temperature: f32,
    top_p: f32,
    stop: &'a [String],
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    content: String,
}

impl LlamaClient {
    #[inline]
    pub fn new(config: &LlamaConfig) -> Result<Self> {
        let base_url = config
            .url()
            .map_err(|e| RagError::Config(format!("Invalid llama.cpp server URL: {e}")))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self { base_url, agent })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// POST a JSON body to an endpoint and return the raw response text
    fn post_json(&self, endpoint: &str, body: &str) -> Result<String> {
        let url = self
            .base_url
            .join(endpoint)
            .map_err(|e| RagError::Generation(format!("Failed to build {endpoint} URL: {e}")))?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(body)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| RagError::Generation(format!("Request to {endpoint} failed: {e}")))
    }
}

#[async_trait]
impl LanguageModel for LlamaClient {
    #[inline]
    async fn tokenize(&self, text: &str) -> Result<Vec<i32>> {
        let body = serde_json::to_string(&TokenizeRequest { content: text })
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {e}")))?;

        let response_text = self.post_json("/tokenize", &body)?;
        let response: TokenizeResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Generation(format!("Failed to parse tokenize response: {e}")))?;

        debug!("Tokenized {} chars to {} tokens", text.len(), response.tokens.len());
        Ok(response.tokens)
    }

    #[inline]
    async fn detokenize(&self, tokens: &[i32]) -> Result<String> {
        let body = serde_json::to_string(&DetokenizeRequest { tokens })
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {e}")))?;

        let response_text = self.post_json("/detokenize", &body)?;
        let response: DetokenizeResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Generation(format!("Failed to parse detokenize response: {e}"))
        })?;

        Ok(response.content)
    }

    #[inline]
    async fn complete(&self, prompt: &str, params: &SamplingParams) -> Result<String> {
        let request = CompletionRequest {
            prompt,
            n_predict: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stop: &params.stop,
        };
        let body = serde_json::to_string(&request)
            .map_err(|e| RagError::Generation(format!("Failed to serialize request: {e}")))?;

        debug!(
            "Requesting completion for {} char prompt (n_predict = {})",
            prompt.len(),
            params.max_tokens
        );

        let response_text = self.post_json("/completion", &body)?;
        let response: CompletionResponse = serde_json::from_str(&response_text).map_err(|e| {
            RagError::Generation(format!("Failed to parse completion response: {e}"))
        })?;

        Ok(response.content)
    }
}
