use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::LlmError;
use crate::http_client::build_http_client_with_timeout;

/// Sampling parameters for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
    pub context_window: u32,
}

/// Chat-style completion endpoint. The generator only depends on this seam.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    num_predict: u32,
    temperature: f32,
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Message,
}

/// Client for a local Ollama server's `/api/chat` endpoint.
#[derive(Clone)]
pub struct OllamaClient {
    api_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OllamaClient {
    pub fn new(api_url: String, model: String, timeout: Duration) -> Self {
        Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
            timeout,
            client: build_http_client_with_timeout(Some(timeout)),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn map_transport_error(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if error.is_connect() {
            LlmError::Unavailable {
                url: self.api_url.clone(),
            }
        } else {
            LlmError::Request {
                details: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl LanguageModel for OllamaClient {
    async fn complete(
        &self,
        system_prompt: &str,
        prompt: &str,
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        let url = format!("{}/api/chat", self.api_url);

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system".to_string(),
                    content: system_prompt.to_string(),
                },
                Message {
                    role: "user".to_string(),
                    content: prompt.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions {
                num_predict: params.max_tokens,
                temperature: params.temperature,
                num_ctx: params.context_window,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport_error(e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read body".to_string());
            return Err(LlmError::Status { status, body });
        }

        let completion: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| LlmError::InvalidResponse {
                    details: e.to_string(),
                })?;

        let content = completion.message.content;
        if content.trim().is_empty() {
            return Err(LlmError::Empty);
        }

        if looks_truncated(&content) {
            let tail: String = content
                .chars()
                .rev()
                .take(20)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            tracing::warn!(
                "Response may be truncated ({} chars, ends with: ...{:?})",
                content.len(),
                tail
            );
        }

        Ok(content)
    }
}

fn looks_truncated(text: &str) -> bool {
    let trimmed = text.trim_end();
    !trimmed.is_empty()
        && !trimmed.ends_with(['.', '!', '?', '"', '\'', ')', ']', '—', '*'])
}
