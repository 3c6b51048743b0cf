use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs, ResponseFormat,
};
use async_trait::async_trait;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::generation::options::GenerationOptions;
use tracing::{debug, warn};

use super::{EngineError, SynthesisEngine};
use crate::{LLMClient, LLMParams, WorkerDetail, TARGET_LLM_REQUEST};

/// Live engine talking to Ollama or OpenAI over HTTP.
pub struct LlmEngine {
    params: LLMParams,
    worker_detail: WorkerDetail,
    label: String,
}

impl LlmEngine {
    pub fn new(params: LLMParams, worker_detail: WorkerDetail) -> Self {
        let label = match params.llm_client {
            LLMClient::Ollama(_) => format!("ollama/{}", params.model),
            LLMClient::OpenAI(_) => format!("openai/{}", params.model),
        };
        LlmEngine {
            params,
            worker_detail,
            label,
        }
    }

    async fn generate_ollama(
        &self,
        ollama: &ollama_rs::Ollama,
        prompt: &str,
    ) -> Result<String, EngineError> {
        let mut request = GenerationRequest::new(self.params.model.clone(), prompt.to_string());
        request.options = Some(GenerationOptions::default().temperature(self.params.temperature));

        ollama
            .generate(request)
            .await
            .map(|response| response.response)
            .map_err(|e| classify_error(e.to_string()))
    }

    async fn generate_openai(
        &self,
        client: &async_openai::Client<async_openai::config::OpenAIConfig>,
        prompt: &str,
    ) -> Result<String, EngineError> {
        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt)
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;
        let messages: Vec<ChatCompletionRequestMessage> = vec![message.into()];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.params.model.clone())
            .temperature(self.params.temperature)
            .response_format(ResponseFormat::JsonObject)
            .messages(messages)
            .build()
            .map_err(|e| EngineError::Request(e.to_string()))?;

        let response = client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_error(e.to_string()))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

/// Rate limiting is reported separately so it shows up distinctly in logs.
fn classify_error(message: String) -> EngineError {
    let lowered = message.to_lowercase();
    if lowered.contains("429") || lowered.contains("rate limit") {
        EngineError::RateLimited(message)
    } else {
        EngineError::Request(message)
    }
}

#[async_trait]
impl SynthesisEngine for LlmEngine {
    fn name(&self) -> &str {
        &self.label
    }

    async fn invoke(&self, prompt: &str) -> Result<String, EngineError> {
        let wd = &self.worker_detail;
        debug!(target: TARGET_LLM_REQUEST, "[{} {} {}]: sending {} character prompt via {}", wd.name, wd.id, wd.model, prompt.len(), wd.connection_info);

        let result = match &self.params.llm_client {
            LLMClient::Ollama(ollama) => self.generate_ollama(ollama, prompt).await,
            LLMClient::OpenAI(client) => self.generate_openai(client, prompt).await,
        };

        match result {
            Ok(text) if text.trim().is_empty() => {
                warn!(target: TARGET_LLM_REQUEST, "[{} {} {}]: model returned an empty response", wd.name, wd.id, wd.model);
                Err(EngineError::EmptyResponse)
            }
            Ok(text) => {
                debug!(target: TARGET_LLM_REQUEST, "[{} {} {}]: LLM response received: {}", wd.name, wd.id, wd.model, text);
                Ok(text)
            }
            Err(e) => {
                warn!(target: TARGET_LLM_REQUEST, "[{} {} {}]: Error generating response: {}", wd.name, wd.id, wd.model, e);
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error("HTTP 429 Too Many Requests".to_string()),
            EngineError::RateLimited(_)
        ));
        assert!(matches!(
            classify_error("connection refused".to_string()),
            EngineError::Request(_)
        ));
    }

    #[test]
    fn test_engine_label_names_provider_and_model() {
        let params = LLMParams {
            llm_client: LLMClient::Ollama(ollama_rs::Ollama::new(
                "http://localhost".to_string(),
                11434,
            )),
            model: "llama3".to_string(),
            temperature: 0.0,
        };
        let detail = WorkerDetail {
            name: "synthesis engine".to_string(),
            id: 0,
            model: "llama3".to_string(),
            connection_info: "localhost:11434".to_string(),
        };
        assert_eq!(LlmEngine::new(params, detail).name(), "ollama/llama3");
    }
}
