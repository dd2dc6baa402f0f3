use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use super::{CapabilityHint, Message, ModelIdentity, ModelPort, ModelReply, ModelRequest, Usage};
use crate::config::{ModelConfig, RequestConfig};
use crate::error::{ModelError, ModelResult};

/// Model port backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct HttpModelPort {
    client: Client,
    base_url: String,
    api_key: String,
    chat_model: String,
    reasoning_model: String,
    request_config: RequestConfig,
}

/// Wire request for /v1/chat/completions
#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Wire response for /v1/chat/completions
#[derive(Debug, Deserialize)]
struct CompletionResponse {
    model: Option<String>,
    choices: Vec<CompletionChoice>,
    usage: Option<CompletionUsage>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CompletionUsage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
    total_tokens: Option<u32>,
}

impl HttpModelPort {
    /// Create a new HTTP model port
    pub fn new(config: &ModelConfig, request_config: RequestConfig) -> ModelResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ModelError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            chat_model: config.chat_model.clone(),
            reasoning_model: config.reasoning_model.clone(),
            request_config,
        })
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a capability hint to a concrete model id.
    fn resolve_model(&self, hint: CapabilityHint) -> &str {
        match hint {
            CapabilityHint::Reasoning => &self.reasoning_model,
            CapabilityHint::Chat => &self.chat_model,
        }
    }

    /// Execute a single request (internal)
    async fn execute_request(
        &self,
        url: &str,
        model: &str,
        request: &ModelRequest,
    ) -> ModelResult<ModelReply> {
        debug!(
            model = %model,
            messages = request.messages.len(),
            "Calling model backend"
        );

        let body = CompletionRequest {
            model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ModelError::Timeout {
                        timeout_ms: self.request_config.timeout_ms,
                    }
                } else {
                    ModelError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        let completion: CompletionResponse =
            response.json().await.map_err(|e| ModelError::InvalidResponse {
                message: format!("Failed to parse response: {}", e),
            })?;

        let content = completion
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| ModelError::InvalidResponse {
                message: "Response contained no choices".to_string(),
            })?;

        Ok(ModelReply {
            content,
            identity: Some(ModelIdentity {
                model_id: completion.model.unwrap_or_else(|| model.to_string()),
                provider_id: "openai-compatible".to_string(),
                provider_name: self.base_url.clone(),
            }),
            usage: completion.usage.map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
        })
    }
}

#[async_trait]
impl ModelPort for HttpModelPort {
    async fn invoke(&self, request: ModelRequest) -> ModelResult<ModelReply> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let hint = request.primary_hint();
        let model = self.resolve_model(hint).to_string();

        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    model = %model,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying model request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(&url, &model, &request).await {
                Ok(reply) => {
                    let latency = start.elapsed();
                    info!(
                        hint = %hint,
                        model = %model,
                        latency_ms = latency.as_millis(),
                        "Model call succeeded"
                    );
                    return Ok(reply);
                }
                Err(e) => {
                    let latency = start.elapsed();
                    error!(
                        hint = %hint,
                        model = %model,
                        error = %e,
                        latency_ms = latency.as_millis(),
                        retry = retries,
                        "Model call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(ModelError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }
}
