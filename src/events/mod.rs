//! Best-effort progress event sink.
//!
//! Chain and cluster runs emit structured `META_THINKING_CHAIN` events so an
//! external consumer can render per-stage progress. Broadcasting is
//! fire-and-forget: a sink failure is caught and logged at the emission site
//! and never alters the caller's result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::EventError;

/// Event type tag for chain/cluster progress broadcasts.
pub const META_THINKING_CHAIN: &str = "META_THINKING_CHAIN";

/// Maximum characters of stage text carried in an event.
pub const STAGE_TEXT_LIMIT: usize = 500;

/// One result row within a stage report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub text: String,
    pub score: f64,
    pub source: String,
}

/// Progress for a single stage (one cluster, or one chain phase).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    /// 1-based stage index.
    pub stage: usize,
    #[serde(rename = "clusterName")]
    pub cluster_name: String,
    #[serde(rename = "resultCount")]
    pub result_count: usize,
    pub results: Vec<StageResult>,
}

/// Structured progress event broadcast to the external consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(rename = "chainName")]
    pub chain_name: String,
    pub query: String,
    pub stages: Vec<StageReport>,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    /// Create a chain-progress event stamped with the current time.
    pub fn chain(
        chain_name: impl Into<String>,
        query: impl Into<String>,
        stages: Vec<StageReport>,
    ) -> Self {
        Self {
            event_type: META_THINKING_CHAIN.to_string(),
            chain_name: chain_name.into(),
            query: query.into(),
            stages,
            timestamp: Utc::now(),
        }
    }
}

/// Truncate text for embedding in a stage report.
pub fn truncate_stage_text(text: &str) -> String {
    if text.chars().count() <= STAGE_TEXT_LIMIT {
        text.to_string()
    } else {
        text.chars().take(STAGE_TEXT_LIMIT).collect()
    }
}

/// Sink consuming progress events, best-effort.
pub trait EventSink: Send + Sync {
    /// Deliver one event. Callers swallow and log any error.
    fn broadcast(&self, event: ProgressEvent) -> Result<(), EventError>;
}

/// Default sink that surfaces events through tracing.
///
/// No outward transport is wired in, so observability goes to the log
/// stream instead.
#[derive(Debug, Default, Clone)]
pub struct LogSink;

impl EventSink for LogSink {
    fn broadcast(&self, event: ProgressEvent) -> Result<(), EventError> {
        info!(
            event_type = %event.event_type,
            chain = %event.chain_name,
            stages = event.stages.len(),
            "Progress event"
        );
        Ok(())
    }
}
