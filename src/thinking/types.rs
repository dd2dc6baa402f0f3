//! Data types for thinking chains and cluster presets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a thinking chain.
///
/// Chains only ever move from `Active` to `Completed`; `Paused` and `Failed`
/// round out the taxonomy reported in status overviews but no command
/// currently produces them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    /// Chain is accepting steps.
    #[default]
    Active,
    /// Chain is suspended; steps are rejected until resumed.
    Paused,
    /// Chain finished its last phase; `final_conclusion` is set.
    Completed,
    /// Chain was abandoned after an unrecoverable error.
    Failed,
}

impl std::fmt::Display for ChainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChainStatus::Active => write!(f, "active"),
            ChainStatus::Paused => write!(f, "paused"),
            ChainStatus::Completed => write!(f, "completed"),
            ChainStatus::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for ChainStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ChainStatus::Active),
            "paused" => Ok(ChainStatus::Paused),
            "completed" => Ok(ChainStatus::Completed),
            "failed" => Ok(ChainStatus::Failed),
            _ => Err(format!("Unknown chain status: {}", s)),
        }
    }
}

/// One LLM call's output within a chain. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingStep {
    /// Unique step identifier.
    pub id: String,
    /// Phase name, reused as the step-kind tag.
    pub step_type: String,
    /// Model output, or the failure placeholder.
    pub content: String,
    /// Gating confidence (0.0-1.0). Currently a fixed placeholder constant.
    pub confidence: f64,
    /// When the step was appended.
    pub created_at: DateTime<Utc>,
    /// Optional metadata (model identity etc.).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ThinkingStep {
    /// Create a new step for the given phase.
    pub fn new(step_type: impl Into<String>, content: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: format!("step-{}", Uuid::new_v4()),
            step_type: step_type.into(),
            content: content.into(),
            confidence,
            created_at: Utc::now(),
            metadata: None,
        }
    }

    /// Attach metadata to the step.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// One self-reflection run: an append-only step transcript walked through
/// the phases of its originating config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingChain {
    /// Unique chain identifier.
    pub id: String,
    /// Free-text topic under consideration.
    pub topic: String,
    /// Key of the originating chain config, stored at creation.
    pub config_key: String,
    /// Ordered steps; insertion order is the sole audit trail.
    pub steps: Vec<ThinkingStep>,
    /// Name of the active phase; always a phase of the originating config.
    pub current_phase: String,
    /// Lifecycle state.
    pub status: ChainStatus,
    /// When the chain was started.
    pub started_at: DateTime<Utc>,
    /// When the chain reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Set once, when the last phase completes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_conclusion: Option<String>,
}

impl ThinkingChain {
    /// Create a new active chain positioned at the first phase.
    pub fn new(
        topic: impl Into<String>,
        config_key: impl Into<String>,
        first_phase: impl Into<String>,
    ) -> Self {
        Self {
            id: format!("chain-{}", Uuid::new_v4()),
            topic: topic.into(),
            config_key: config_key.into(),
            steps: Vec::new(),
            current_phase: first_phase.into(),
            status: ChainStatus::Active,
            started_at: Utc::now(),
            completed_at: None,
            final_conclusion: None,
        }
    }

    /// Steps belonging to the given phase, in insertion order.
    pub fn phase_steps(&self, phase: &str) -> Vec<&ThinkingStep> {
        self.steps.iter().filter(|s| s.step_type == phase).collect()
    }

    /// Append a step to the transcript.
    pub fn append_step(&mut self, step: ThinkingStep) {
        self.steps.push(step);
    }

    /// Mark the chain completed with the given conclusion.
    pub fn complete(&mut self, conclusion: impl Into<String>) {
        self.status = ChainStatus::Completed;
        self.final_conclusion = Some(conclusion.into());
        self.completed_at = Some(Utc::now());
    }
}

/// Configuration for one phase of a chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseConfig {
    /// Phase name (doubles as the step-kind tag).
    pub name: String,
    /// Guidance text appended to the step system prompt.
    pub prompt: String,
    /// Minimum steps before the phase may advance.
    #[serde(default = "default_min_steps")]
    pub min_steps: usize,
    /// Steps at which the phase advances unconditionally.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

fn default_min_steps() -> usize {
    1
}

fn default_max_steps() -> usize {
    3
}

impl PhaseConfig {
    /// Create a phase with default step bounds (min 1, max 3).
    pub fn new(name: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prompt: prompt.into(),
            min_steps: default_min_steps(),
            max_steps: default_max_steps(),
        }
    }

    /// Override the step bounds.
    pub fn with_bounds(mut self, min_steps: usize, max_steps: usize) -> Self {
        self.min_steps = min_steps;
        self.max_steps = max_steps;
        self
    }
}

/// A compiled-in single-chain preset: an ordered phase list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Preset key (e.g. "problem_solving").
    pub key: String,
    /// Human-readable name.
    pub name: String,
    /// What the chain is for.
    pub description: String,
    /// Ordered phases; the chain walks these strictly forward.
    pub phases: Vec<PhaseConfig>,
}

impl ChainConfig {
    /// Find a phase by name.
    pub fn phase(&self, name: &str) -> Option<&PhaseConfig> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// The phase after `name`, or None when `name` is last (or unknown).
    pub fn next_phase(&self, name: &str) -> Option<&PhaseConfig> {
        let idx = self.phases.iter().position(|p| p.name == name)?;
        self.phases.get(idx + 1)
    }

    /// Whether `name` is the final configured phase.
    pub fn is_last_phase(&self, name: &str) -> bool {
        self.phases.last().map(|p| p.name == name).unwrap_or(false)
    }
}

/// A named reasoning stance available to cluster presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterSpec {
    /// Cluster name (Chinese, matching the shipped preset catalog).
    pub name: String,
    /// Stance guidance appended to the iteration system prompt.
    pub guidance: String,
}

/// A compiled-in cluster preset: ordered cluster names with a paired
/// per-cluster iteration count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterPreset {
    /// Preset key (e.g. "quick", "deep").
    pub key: String,
    /// What the preset is for.
    pub description: String,
    /// Ordered cluster names.
    pub clusters: Vec<String>,
    /// Iteration count per cluster, positionally paired with `clusters`.
    /// Missing positions default to 1.
    pub k_sequence: Vec<usize>,
}

impl ClusterPreset {
    /// Iteration count for the cluster at `index` (default 1 when the
    /// k-sequence is shorter than the cluster list).
    pub fn iterations_for(&self, index: usize) -> usize {
        self.k_sequence.get(index).copied().unwrap_or(1).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_status_roundtrip() {
        for status in [
            ChainStatus::Active,
            ChainStatus::Paused,
            ChainStatus::Completed,
            ChainStatus::Failed,
        ] {
            let parsed: ChainStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("unknown".parse::<ChainStatus>().is_err());
    }

    #[test]
    fn test_chain_new_is_active_at_first_phase() {
        let chain = ThinkingChain::new("topic", "general", "observation");
        assert_eq!(chain.status, ChainStatus::Active);
        assert_eq!(chain.current_phase, "observation");
        assert_eq!(chain.config_key, "general");
        assert!(chain.steps.is_empty());
        assert!(chain.id.starts_with("chain-"));
    }

    #[test]
    fn test_phase_steps_filters_by_phase() {
        let mut chain = ThinkingChain::new("t", "general", "a");
        chain.append_step(ThinkingStep::new("a", "1", 0.7));
        chain.append_step(ThinkingStep::new("b", "2", 0.7));
        chain.append_step(ThinkingStep::new("a", "3", 0.7));

        let a_steps = chain.phase_steps("a");
        assert_eq!(a_steps.len(), 2);
        assert_eq!(a_steps[0].content, "1");
        assert_eq!(a_steps[1].content, "3");
    }

    #[test]
    fn test_complete_sets_conclusion_once() {
        let mut chain = ThinkingChain::new("t", "general", "a");
        chain.complete("the answer");
        assert_eq!(chain.status, ChainStatus::Completed);
        assert_eq!(chain.final_conclusion.as_deref(), Some("the answer"));
        assert!(chain.completed_at.is_some());
    }

    #[test]
    fn test_chain_config_phase_navigation() {
        let config = ChainConfig {
            key: "k".to_string(),
            name: "n".to_string(),
            description: String::new(),
            phases: vec![PhaseConfig::new("first", "p1"), PhaseConfig::new("second", "p2")],
        };

        assert!(config.phase("first").is_some());
        assert_eq!(config.next_phase("first").unwrap().name, "second");
        assert!(config.next_phase("second").is_none());
        assert!(config.is_last_phase("second"));
        assert!(!config.is_last_phase("first"));
        assert!(config.next_phase("missing").is_none());
    }

    #[test]
    fn test_cluster_preset_iteration_defaults() {
        let preset = ClusterPreset {
            key: "p".to_string(),
            description: String::new(),
            clusters: vec!["a".to_string(), "b".to_string(), "c".to_string()],
            k_sequence: vec![2],
        };
        assert_eq!(preset.iterations_for(0), 2);
        // k_sequence shorter than cluster list falls back to 1
        assert_eq!(preset.iterations_for(1), 1);
        assert_eq!(preset.iterations_for(2), 1);
    }

    #[test]
    fn test_phase_config_defaults() {
        let phase = PhaseConfig::new("analysis", "analyze");
        assert_eq!(phase.min_steps, 1);
        assert_eq!(phase.max_steps, 3);

        let bounded = phase.with_bounds(2, 5);
        assert_eq!(bounded.min_steps, 2);
        assert_eq!(bounded.max_steps, 5);
    }
}
