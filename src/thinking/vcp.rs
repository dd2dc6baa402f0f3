//! Cluster Engine: sequential multi-cluster deliberation (ThinkVCP).

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::configs::{cluster_preset_keys, find_cluster_preset, find_cluster_spec};
use super::types::ClusterSpec;
use crate::error::{AppError, AppResult};
use crate::events::{truncate_stage_text, EventSink, ProgressEvent, StageReport, StageResult};
use crate::model::{CapabilityHint, Message, ModelPort, ModelRequest};
use crate::prompts::VCP_CLUSTER_FRAMING;

use super::configs::DEFAULT_CLUSTER_PRESET_KEY;

/// Literal content recorded for a cluster iteration whose model call failed.
pub const ITERATION_FAILURE_PLACEHOLDER: &str = "[该轮迭代调用失败，未产生内容]";

/// Token budget for one iteration when the cluster runs more than once.
const ITERATED_MAX_TOKENS: u32 = 800;

/// Token budget for a cluster's single iteration.
const SINGLE_MAX_TOKENS: u32 = 1200;

/// Divider between cluster sections in the combined answer.
const SECTION_DIVIDER: &str = "\n\n---\n\n";

/// Input parameters for a cluster deliberation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcpParams {
    /// The topic to deliberate on
    pub topic: String,
    /// Cluster preset key (defaults to the standard preset)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Optional extra context given to every cluster
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl VcpParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            chain: None,
            context: None,
        }
    }

    /// Select a cluster preset
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    /// Attach extra context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// One cluster's combined contribution to a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterContribution {
    /// Cluster name
    pub cluster: String,
    /// Number of iterations executed
    pub iterations: usize,
    /// Combined iteration output (labelled per iteration when > 1)
    pub content: String,
}

/// Result of a cluster deliberation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VcpResult {
    /// Preset that was run
    pub preset: String,
    /// Per-cluster contributions, in execution order
    pub contributions: Vec<ClusterContribution>,
    /// All contributions rendered as one sectioned answer
    pub combined: String,
}

/// Cluster Engine running preset-defined stances sequentially, each seeing
/// the accumulated output of the stances before it.
pub struct VcpEngine {
    port: Arc<dyn ModelPort>,
    sink: Arc<dyn EventSink>,
}

impl VcpEngine {
    /// Create a new cluster engine
    pub fn new(port: Arc<dyn ModelPort>, sink: Arc<dyn EventSink>) -> Self {
        Self { port, sink }
    }

    /// Run the selected cluster preset over a topic.
    pub async fn think_vcp(&self, params: VcpParams) -> AppResult<VcpResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let key = params.chain.as_deref().unwrap_or(DEFAULT_CLUSTER_PRESET_KEY);
        let preset = find_cluster_preset(key).ok_or_else(|| {
            AppError::validation(
                "chain",
                format!(
                    "Unknown cluster preset '{}'. Available: {}",
                    key,
                    cluster_preset_keys().join(", ")
                ),
            )
        })?;

        info!(
            preset = %preset.key,
            clusters = preset.clusters.len(),
            "Cluster deliberation started"
        );

        let mut contributions: Vec<ClusterContribution> = Vec::new();
        let mut stages: Vec<StageReport> = Vec::new();
        // Accumulated transcript every later cluster sees.
        let mut cross_context = String::new();

        for (index, cluster_name) in preset.clusters.iter().enumerate() {
            let spec = match find_cluster_spec(cluster_name) {
                Some(s) => s,
                None => {
                    warn!(cluster = %cluster_name, "Preset references unknown cluster, skipping");
                    continue;
                }
            };

            let k = preset.iterations_for(index);
            let content = self
                .run_cluster(&params, &spec, k, &cross_context)
                .await;

            cross_context.push_str(&format!("\n\n【{}】\n{}", spec.name, content));

            stages.push(StageReport {
                stage: contributions.len() + 1,
                cluster_name: spec.name.clone(),
                result_count: k,
                results: vec![StageResult {
                    text: truncate_stage_text(&content),
                    score: 0.0,
                    source: "vcp".to_string(),
                }],
            });

            contributions.push(ClusterContribution {
                cluster: spec.name.clone(),
                iterations: k,
                content,
            });
        }

        let combined = contributions
            .iter()
            .map(|c| format!("## {}\n\n{}", c.cluster, c.content))
            .collect::<Vec<_>>()
            .join(SECTION_DIVIDER);

        // Observability only; a sink failure never reaches the caller.
        let event = ProgressEvent::chain(preset.key.clone(), params.topic.clone(), stages);
        if let Err(e) = self.sink.broadcast(event) {
            warn!(error = %e, "Failed to broadcast cluster progress event");
        }

        Ok(VcpResult {
            preset: preset.key,
            contributions,
            combined,
        })
    }

    /// Run one cluster for `k` iterations, combining the iteration outputs.
    ///
    /// Each iteration sees the previous iterations of its own cluster; a
    /// failed iteration contributes a placeholder and the run continues.
    async fn run_cluster(
        &self,
        params: &VcpParams,
        spec: &ClusterSpec,
        k: usize,
        cross_context: &str,
    ) -> String {
        let mut outputs: Vec<String> = Vec::new();

        for round in 0..k {
            let mut system = format!(
                "{}\n\n簇名称：{}\n簇立场：{}",
                VCP_CLUSTER_FRAMING, spec.name, spec.guidance
            );
            if k > 1 {
                system.push_str(&format!(
                    "\n\n这是第 {} 轮迭代（共 {} 轮）。在前几轮的基础上深化，不要重复已有内容。",
                    round + 1,
                    k
                ));
            }

            let mut user = format!("主题：{}", params.topic);
            if let Some(context) = &params.context {
                user.push_str(&format!("\n\n补充背景：{}", context));
            }
            if !cross_context.is_empty() {
                user.push_str(&format!("\n\n此前各簇的输出：{}", cross_context));
            }
            if !outputs.is_empty() {
                user.push_str(&format!(
                    "\n\n本簇此前迭代的输出：\n{}",
                    outputs.join("\n\n")
                ));
            }

            let max_tokens = if k > 1 {
                ITERATED_MAX_TOKENS
            } else {
                SINGLE_MAX_TOKENS
            };
            let request = ModelRequest::new(
                CapabilityHint::Reasoning,
                vec![Message::system(system), Message::user(user)],
            )
            .with_temperature(0.7)
            .with_max_tokens(max_tokens);

            match self.port.invoke(request).await {
                Ok(reply) => outputs.push(reply.content),
                Err(e) => {
                    warn!(
                        cluster = %spec.name,
                        round = round + 1,
                        error = %e,
                        "Cluster iteration failed, recording placeholder"
                    );
                    outputs.push(ITERATION_FAILURE_PLACEHOLDER.to_string());
                }
            }
        }

        if k > 1 {
            outputs
                .iter()
                .enumerate()
                .map(|(i, o)| format!("【迭代 {}】\n{}", i + 1, o))
                .collect::<Vec<_>>()
                .join("\n\n")
        } else {
            outputs.pop().unwrap_or_default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_builders() {
        let params = VcpParams::new("topic").with_chain("deep").with_context("c");
        assert_eq!(params.chain.as_deref(), Some("deep"));
        assert_eq!(params.context.as_deref(), Some("c"));
    }

    #[test]
    fn test_section_divider_is_visible() {
        assert!(SECTION_DIVIDER.contains("---"));
    }
}
