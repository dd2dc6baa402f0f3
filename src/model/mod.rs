//! Model Invocation Port.
//!
//! The orchestration core never selects a concrete model or provider. It
//! builds a message list, attaches capability hints (`chat` for turn-based
//! dialogue, `reasoning` for heavier analytical steps) and lets the port
//! resolve the hints to a concrete backend. Any retry/timeout policy lives
//! entirely inside the port implementation.

mod client;

pub use client::HttpModelPort;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ModelResult;

/// Message in a model conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Message role
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl Message {
    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Capability hint influencing backend/model selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityHint {
    /// Turn-based dialogue generation.
    Chat,
    /// Heavier analytical/iterative reasoning steps.
    Reasoning,
}

impl CapabilityHint {
    /// Get the hint name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityHint::Chat => "chat",
            CapabilityHint::Reasoning => "reasoning",
        }
    }
}

impl std::fmt::Display for CapabilityHint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CapabilityHint {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(CapabilityHint::Chat),
            "reasoning" => Ok(CapabilityHint::Reasoning),
            _ => Err(format!("Unknown capability hint: {}", s)),
        }
    }
}

/// Request to the Model Invocation Port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Capability hints; the port resolves these to a concrete model.
    pub capability_hints: Vec<CapabilityHint>,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl ModelRequest {
    /// Create a new request with a single capability hint
    pub fn new(hint: CapabilityHint, messages: Vec<Message>) -> Self {
        Self {
            capability_hints: vec![hint],
            messages,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Set the sampling temperature
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the token budget
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// The primary capability hint (first in the list, `Chat` when empty).
    pub fn primary_hint(&self) -> CapabilityHint {
        self.capability_hints
            .first()
            .copied()
            .unwrap_or(CapabilityHint::Chat)
    }
}

/// Identity of the concrete backend that served a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub model_id: String,
    pub provider_id: String,
    pub provider_name: String,
}

/// Token usage information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
    pub total_tokens: Option<u32>,
}

/// Successful reply from the Model Invocation Port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelReply {
    /// Generated text.
    pub content: String,
    /// Which model/provider actually served the call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<ModelIdentity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// Port through which all generation flows.
///
/// Implementations own the full failure policy (timeouts, retries); callers
/// treat a returned error as a single failed call and substitute a
/// placeholder rather than retrying.
#[async_trait]
pub trait ModelPort: Send + Sync {
    /// Invoke the backend once with the given request.
    async fn invoke(&self, request: ModelRequest) -> ModelResult<ModelReply>;
}
