pub mod client;
pub mod stub;

pub use client::LlmEngine;
pub use stub::{StubEngine, StubReply};

use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use async_trait::async_trait;
use ollama_rs::Ollama;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::config::EngineConfig;
use crate::{LLMClient, LLMParams, WorkerDetail, TARGET_LLM_REQUEST};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EngineError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("empty response from model")]
    EmptyResponse,
    #[error("no scripted response left")]
    Exhausted,
}

static THINKING_TAGS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<think>.*?</think>").expect("thinking tag pattern is valid"));
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*\})\s*```").expect("code fence pattern is valid")
});

/// Strips <think>...</think> blocks emitted by reasoning models.
/// Returns the original text if nothing would be left.
pub fn strip_thinking_tags(text: &str) -> String {
    let result = THINKING_TAGS.replace_all(text, "").trim().to_string();
    if result.is_empty() {
        return text.to_string();
    }
    result
}

/// Finds the JSON object in a model response: inside a code fence if there
/// is one, otherwise from the first `{` to the last `}`.
pub fn extract_json_object(response: &str) -> Option<String> {
    let text = strip_thinking_tags(response);

    if let Some(captures) = CODE_FENCE.captures(&text) {
        if let Some(body) = captures.get(1) {
            return Some(body.as_str().to_string());
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(text[start..=end].to_string())
}

/// The AI synthesis backend, treated as an opaque fallible function from
/// prompt to raw text. One call is one attempt; retries belong to the caller.
#[async_trait]
pub trait SynthesisEngine: Send + Sync {
    /// Label used in logs.
    fn name(&self) -> &str;

    async fn invoke(&self, prompt: &str) -> Result<String, EngineError>;
}

/// Builds the engine selected by `config`. Nothing here looks at the process
/// environment; that happens once in [`crate::environment`].
pub fn build_engine(config: &EngineConfig) -> Arc<dyn SynthesisEngine> {
    match config {
        EngineConfig::Stub { responses } => {
            if responses.is_empty() {
                Arc::new(StubEngine::canned())
            } else {
                Arc::new(StubEngine::cycling(responses.clone()))
            }
        }
        EngineConfig::Ollama {
            host,
            port,
            model,
            temperature,
        } => {
            info!(target: TARGET_LLM_REQUEST, "Connecting to Ollama at {}:{}", host, port);
            let params = LLMParams {
                llm_client: LLMClient::Ollama(Ollama::new(host.clone(), *port)),
                model: model.clone(),
                temperature: *temperature,
            };
            Arc::new(LlmEngine::new(params, worker_detail(model, format!("{}:{}", host, port))))
        }
        EngineConfig::OpenAI {
            api_key,
            model,
            temperature,
        } => {
            let client = OpenAIClient::with_config(OpenAIConfig::new().with_api_key(api_key));
            let params = LLMParams {
                llm_client: LLMClient::OpenAI(client),
                model: model.clone(),
                temperature: *temperature,
            };
            Arc::new(LlmEngine::new(params, worker_detail(model, "OpenAI API".to_string())))
        }
    }
}

fn worker_detail(model: &str, connection_info: String) -> WorkerDetail {
    WorkerDetail {
        name: "synthesis engine".to_string(),
        id: 0,
        model: model.to_string(),
        connection_info,
    }
}
