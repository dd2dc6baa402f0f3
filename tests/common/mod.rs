//! Shared test fixtures: a scripted model port and a collecting event sink.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use mcp_agentic_reasoning::config::{Config, LogFormat, LoggingConfig, ModelConfig, RequestConfig, StoreConfig};
use mcp_agentic_reasoning::error::{EventError, ModelError, ModelResult};
use mcp_agentic_reasoning::events::{EventSink, ProgressEvent};
use mcp_agentic_reasoning::model::{ModelPort, ModelReply, ModelRequest};

/// Model port that replays a scripted queue of replies and records every
/// request it receives. When the queue is empty it serves the fallback.
pub struct ScriptedPort {
    script: Mutex<VecDeque<Result<String, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    fallback: String,
}

impl ScriptedPort {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback: "scripted reply".to_string(),
        }
    }

    pub fn with_fallback(fallback: impl Into<String>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback: fallback.into(),
        }
    }

    /// Queue a successful reply.
    pub fn push_reply(&self, content: impl Into<String>) {
        self.script.lock().unwrap().push_back(Ok(content.into()));
    }

    /// Queue a failure.
    pub fn push_error(&self, error: ModelError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of calls made.
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelPort for ScriptedPort {
    async fn invoke(&self, request: ModelRequest) -> ModelResult<ModelReply> {
        self.requests.lock().unwrap().push(request);
        match self.script.lock().unwrap().pop_front() {
            Some(Ok(content)) => Ok(ModelReply {
                content,
                identity: None,
                usage: None,
            }),
            Some(Err(e)) => Err(e),
            None => Ok(ModelReply {
                content: self.fallback.clone(),
                identity: None,
                usage: None,
            }),
        }
    }
}

/// Sink that records every broadcast event.
#[derive(Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn broadcast(&self, event: ProgressEvent) -> Result<(), EventError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

/// Sink that always fails, for exercising fire-and-forget emission.
pub struct FailingSink;

impl EventSink for FailingSink {
    fn broadcast(&self, _event: ProgressEvent) -> Result<(), EventError> {
        Err(EventError::Broadcast {
            message: "sink offline".to_string(),
        })
    }
}

/// Config that never touches the network or the environment.
pub fn test_config() -> Config {
    Config {
        model: ModelConfig {
            api_key: "test-key".to_string(),
            base_url: "http://localhost:0".to_string(),
            chat_model: "chat-model".to_string(),
            reasoning_model: "reasoning-model".to_string(),
        },
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: LogFormat::Pretty,
        },
        request: RequestConfig::default(),
        store: StoreConfig::default(),
    }
}

pub fn shared(port: ScriptedPort) -> Arc<ScriptedPort> {
    Arc::new(port)
}
