//! Chain Orchestrator: Start / Step / Think / Reflect over thinking chains.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::configs::{chain_config_keys, find_chain_config, DEFAULT_CHAIN_KEY};
use super::policy::should_advance;
use super::types::{ChainConfig, ChainStatus, PhaseConfig, ThinkingChain, ThinkingStep};
use crate::error::{AppError, AppResult};
use crate::events::{truncate_stage_text, EventSink, ProgressEvent, StageReport, StageResult};
use crate::model::{CapabilityHint, Message, ModelPort, ModelRequest};
use crate::prompts::{CHAIN_STEP_FRAMING, REFLECT_FRAMING, THINK_ONE_SHOT_FRAMING};
use crate::store::SessionStore;

/// Placeholder confidence stamped on every step.
///
/// This is an explicit gap, not a measured signal: no confidence estimator
/// exists yet, so the `> 0.8` early-advance arm of the policy stays latent
/// and phases advance on their step counts. Kept as a named constant so a
/// real estimator can replace it in one place.
pub const STEP_CONFIDENCE: f64 = 0.7;

/// Literal content recorded for a step whose model call failed.
pub const STEP_FAILURE_PLACEHOLDER: &str =
    "[model invocation failed - step recorded without content]";

/// How many prior steps a step prompt carries (sliding window).
const STEP_CONTEXT_WINDOW: usize = 3;

/// Token budget for one chain step.
const STEP_MAX_TOKENS: u32 = 1000;

/// Requested depth for the one-shot Think command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThinkDepth {
    Quick,
    #[default]
    Normal,
    Deep,
}

impl ThinkDepth {
    /// Requested items per phase heading.
    pub fn items_per_phase(&self) -> usize {
        match self {
            ThinkDepth::Quick => 2,
            ThinkDepth::Normal => 3,
            ThinkDepth::Deep => 5,
        }
    }

    /// Token budget for the single completion.
    pub fn max_tokens(&self) -> u32 {
        match self {
            ThinkDepth::Quick => 800,
            ThinkDepth::Normal => 1500,
            ThinkDepth::Deep => 2500,
        }
    }

    /// Get the depth name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ThinkDepth::Quick => "quick",
            ThinkDepth::Normal => "normal",
            ThinkDepth::Deep => "deep",
        }
    }
}

impl std::str::FromStr for ThinkDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quick" => Ok(ThinkDepth::Quick),
            "normal" => Ok(ThinkDepth::Normal),
            "deep" => Ok(ThinkDepth::Deep),
            _ => Err(format!("Unknown think depth: {}", s)),
        }
    }
}

/// Input parameters for starting a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartParams {
    /// The topic to reason about
    pub topic: String,
    /// Chain preset key (defaults to the general chain)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Optional extra context folded into the first step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl StartParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            chain: None,
            context: None,
        }
    }

    /// Select a chain preset
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

/// Input parameters for advancing a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepParams {
    /// The chain to advance
    pub chain_id: String,
    /// Optional extra input folded into this step's prompt
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<String>,
}

impl StepParams {
    /// Create new params for a chain
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            input: None,
        }
    }

    /// Attach extra input
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self
    }
}

/// Input parameters for the stateless one-shot Think command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkParams {
    /// The topic to reason about
    pub topic: String,
    /// Chain preset key whose phases structure the response
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    /// Requested depth (scales items-per-phase and token budget only)
    #[serde(default)]
    pub depth: ThinkDepth,
}

impl ThinkParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            chain: None,
            depth: ThinkDepth::default(),
        }
    }

    /// Select a chain preset
    pub fn with_chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    /// Set the depth
    pub fn with_depth(mut self, depth: ThinkDepth) -> Self {
        self.depth = depth;
        self
    }
}

/// Input parameters for reflecting over a chain
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReflectParams {
    /// Chain to reflect over (defaults to the most recently started)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<String>,
    /// Optional aspect to focus the review on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
}

/// Result of starting a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartResult {
    pub chain_id: String,
    pub config_key: String,
    pub current_phase: String,
    pub status: ChainStatus,
    pub step: ThinkingStep,
}

/// Result of one Step command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub chain_id: String,
    /// Phase the step was executed in.
    pub phase: String,
    /// Whether the policy advanced (or completed) the chain.
    pub advanced: bool,
    /// Phase the chain sits at after the step.
    pub current_phase: String,
    pub status: ChainStatus,
    pub step: ThinkingStep,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_conclusion: Option<String>,
}

/// Result of the one-shot Think command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkResult {
    pub chain_key: String,
    pub depth: ThinkDepth,
    pub content: String,
}

/// Result of reflecting over a chain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflectResult {
    pub chain_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
    pub content: String,
}

/// Snapshot of one chain for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSummary {
    pub id: String,
    pub topic: String,
    pub config_key: String,
    pub status: ChainStatus,
    pub current_phase: String,
    pub step_count: usize,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_conclusion: Option<String>,
}

impl ChainSummary {
    fn from_chain(chain: &ThinkingChain) -> Self {
        Self {
            id: chain.id.clone(),
            topic: chain.topic.clone(),
            config_key: chain.config_key.clone(),
            status: chain.status,
            current_phase: chain.current_phase.clone(),
            step_count: chain.steps.len(),
            started_at: chain.started_at,
            completed_at: chain.completed_at,
            final_conclusion: chain.final_conclusion.clone(),
        }
    }
}

/// Status report: a single chain, or an overview of all chains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusReport {
    Chain(ChainSummary),
    Overview {
        total: usize,
        active: usize,
        paused: usize,
        completed: usize,
        failed: usize,
    },
}

/// Chain Orchestrator driving single-agent multi-phase reasoning.
pub struct ChainEngine {
    port: Arc<dyn ModelPort>,
    sink: Arc<dyn EventSink>,
    chains: Arc<SessionStore<ThinkingChain>>,
}

impl ChainEngine {
    /// Create a new chain engine
    pub fn new(
        port: Arc<dyn ModelPort>,
        sink: Arc<dyn EventSink>,
        chains: Arc<SessionStore<ThinkingChain>>,
    ) -> Self {
        Self { port, sink, chains }
    }

    /// Start a new chain and execute its first step.
    ///
    /// `Start` records the first step but does not evaluate the advancement
    /// policy; only `Step` advances phases.
    pub async fn start(&self, params: StartParams) -> AppResult<StartResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let key = params.chain.as_deref().unwrap_or(DEFAULT_CHAIN_KEY);
        let config = find_chain_config(key).ok_or_else(|| {
            AppError::validation(
                "chain",
                format!(
                    "Unknown chain '{}'. Available: {}",
                    key,
                    chain_config_keys().join(", ")
                ),
            )
        })?;

        let first_phase = config
            .phases
            .first()
            .ok_or_else(|| AppError::Internal {
                message: format!("Chain config '{}' has no phases", key),
            })?
            .clone();

        let mut chain = ThinkingChain::new(&params.topic, &config.key, &first_phase.name);
        let step = self
            .execute_step(&chain, &first_phase, params.context.as_deref())
            .await;
        chain.append_step(step.clone());

        info!(
            chain_id = %chain.id,
            config = %config.key,
            phase = %first_phase.name,
            "Chain started"
        );

        let result = StartResult {
            chain_id: chain.id.clone(),
            config_key: chain.config_key.clone(),
            current_phase: chain.current_phase.clone(),
            status: chain.status,
            step,
        };
        self.chains.insert(chain.id.clone(), chain);
        Ok(result)
    }

    /// Execute one step on an existing chain and apply the phase policy.
    pub async fn step(&self, params: StepParams) -> AppResult<StepResult> {
        let mut chain = self
            .chains
            .get(&params.chain_id)
            .ok_or_else(|| AppError::not_found("Chain", &params.chain_id))?;

        if chain.status != ChainStatus::Active {
            return Err(AppError::validation(
                "chain_id",
                format!("Chain is {}, not active", chain.status),
            ));
        }

        let config = self.resolve_config(&chain)?;
        let phase = match config.phase(&chain.current_phase) {
            Some(p) => p.clone(),
            None => {
                // Stored phase no longer resolves (config fallback kicked
                // in); restart the walk at the config's first phase.
                let first = config.phases.first().ok_or_else(|| AppError::Internal {
                    message: format!("Chain config '{}' has no phases", config.key),
                })?;
                warn!(
                    chain_id = %chain.id,
                    phase = %chain.current_phase,
                    fallback = %first.name,
                    "Current phase not in resolved config, falling back to first phase"
                );
                chain.current_phase = first.name.clone();
                first.clone()
            }
        };

        let executed_phase = phase.name.clone();
        let step = self
            .execute_step(&chain, &phase, params.input.as_deref())
            .await;
        chain.append_step(step.clone());

        let phase_steps = chain.phase_steps(&phase.name);
        let advanced = should_advance(&phase_steps, &phase);

        if advanced {
            if config.is_last_phase(&phase.name) {
                let conclusion = step.content.clone();
                chain.complete(conclusion);
                info!(chain_id = %chain.id, "Chain completed");
            } else if let Some(next) = config.next_phase(&phase.name) {
                debug!(
                    chain_id = %chain.id,
                    from = %phase.name,
                    to = %next.name,
                    "Phase advanced"
                );
                chain.current_phase = next.name.clone();
            }
        }

        let result = StepResult {
            chain_id: chain.id.clone(),
            phase: executed_phase,
            advanced,
            current_phase: chain.current_phase.clone(),
            status: chain.status,
            step,
            final_conclusion: chain.final_conclusion.clone(),
        };

        let id = chain.id.clone();
        if !self.chains.update(&id, |c| *c = chain) {
            return Err(AppError::not_found("Chain", &id));
        }
        Ok(result)
    }

    /// Stateless one-shot reasoning: one call addressing every phase.
    pub async fn think(&self, params: ThinkParams) -> AppResult<ThinkResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let key = params.chain.as_deref().unwrap_or(DEFAULT_CHAIN_KEY);
        let config = find_chain_config(key).ok_or_else(|| {
            AppError::validation(
                "chain",
                format!(
                    "Unknown chain '{}'. Available: {}",
                    key,
                    chain_config_keys().join(", ")
                ),
            )
        })?;

        let phase_listing: Vec<String> = config
            .phases
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{}. {} - {}", i + 1, p.name, p.prompt))
            .collect();
        let system = format!(
            "{}\n\nPhases:\n{}\n\nAddress roughly {} points per phase.",
            THINK_ONE_SHOT_FRAMING,
            phase_listing.join("\n"),
            params.depth.items_per_phase()
        );

        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![Message::system(system), Message::user(params.topic.clone())],
        )
        .with_temperature(0.7)
        .with_max_tokens(params.depth.max_tokens());

        let reply = self.port.invoke(request).await?;

        info!(
            chain = %config.key,
            depth = %params.depth.as_str(),
            "One-shot think completed"
        );

        // Observability only; a sink failure never reaches the caller.
        let event = ProgressEvent::chain(
            config.key.clone(),
            params.topic.clone(),
            vec![StageReport {
                stage: 1,
                cluster_name: config.key.clone(),
                result_count: 1,
                results: vec![StageResult {
                    text: truncate_stage_text(&reply.content),
                    score: 0.0,
                    source: "think".to_string(),
                }],
            }],
        );
        if let Err(e) = self.sink.broadcast(event) {
            warn!(error = %e, "Failed to broadcast think progress event");
        }

        Ok(ThinkResult {
            chain_key: config.key,
            depth: params.depth,
            content: reply.content,
        })
    }

    /// Read-only meta-review of a chain's step transcript.
    pub async fn reflect(&self, params: ReflectParams) -> AppResult<ReflectResult> {
        let chain = match &params.chain_id {
            Some(id) => self
                .chains
                .get(id)
                .ok_or_else(|| AppError::not_found("Chain", id))?,
            None => self
                .chains
                .values()
                .into_iter()
                .max_by_key(|c| c.started_at)
                .ok_or_else(|| AppError::validation("chain_id", "No chains to reflect on"))?,
        };

        if chain.steps.is_empty() {
            return Err(AppError::validation("chain_id", "Chain has no steps yet"));
        }

        let mut system = REFLECT_FRAMING.to_string();
        if let Some(aspect) = &params.aspect {
            system.push_str(&format!("\n\nFocus the review on: {}", aspect));
        }

        let transcript: Vec<String> = chain
            .steps
            .iter()
            .enumerate()
            .map(|(i, s)| format!("Step {} [{}]: {}", i + 1, s.step_type, s.content))
            .collect();
        let user = format!(
            "Topic: {}\n\nTranscript:\n{}",
            chain.topic,
            transcript.join("\n\n")
        );

        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![Message::system(system), Message::user(user)],
        )
        .with_temperature(0.7)
        .with_max_tokens(STEP_MAX_TOKENS);

        let reply = self.port.invoke(request).await?;

        Ok(ReflectResult {
            chain_id: chain.id,
            aspect: params.aspect,
            content: reply.content,
        })
    }

    /// Summaries of all live chains.
    pub fn list(&self) -> Vec<ChainSummary> {
        let mut chains = self.chains.values();
        chains.sort_by_key(|c| c.started_at);
        chains.iter().map(ChainSummary::from_chain).collect()
    }

    /// Status of one chain, or an overview of all chains.
    pub fn status(&self, chain_id: Option<&str>) -> AppResult<StatusReport> {
        match chain_id {
            Some(id) => {
                let chain = self
                    .chains
                    .get(id)
                    .ok_or_else(|| AppError::not_found("Chain", id))?;
                Ok(StatusReport::Chain(ChainSummary::from_chain(&chain)))
            }
            None => {
                let chains = self.chains.values();
                let count = |s: ChainStatus| chains.iter().filter(|c| c.status == s).count();
                Ok(StatusReport::Overview {
                    total: chains.len(),
                    active: count(ChainStatus::Active),
                    paused: count(ChainStatus::Paused),
                    completed: count(ChainStatus::Completed),
                    failed: count(ChainStatus::Failed),
                })
            }
        }
    }

    /// Drop all chains (explicit shutdown path).
    pub fn clear(&self) {
        self.chains.clear();
    }

    /// Resolve a chain's originating config, falling back to the default
    /// config when the stored key no longer resolves.
    fn resolve_config(&self, chain: &ThinkingChain) -> AppResult<ChainConfig> {
        if let Some(config) = find_chain_config(&chain.config_key) {
            return Ok(config);
        }
        warn!(
            chain_id = %chain.id,
            config_key = %chain.config_key,
            fallback = DEFAULT_CHAIN_KEY,
            "Stored chain config not found, falling back to default"
        );
        find_chain_config(DEFAULT_CHAIN_KEY).ok_or_else(|| AppError::Internal {
            message: "Default chain config missing".to_string(),
        })
    }

    /// Execute one model call for a phase and wrap it as a step.
    ///
    /// A port failure still produces a step: the placeholder content is
    /// recorded and the narrative moves on (partial-failure tolerance).
    async fn execute_step(
        &self,
        chain: &ThinkingChain,
        phase: &PhaseConfig,
        extra: Option<&str>,
    ) -> ThinkingStep {
        let system = format!(
            "{}\n\nCurrent phase: {}\n{}",
            CHAIN_STEP_FRAMING, phase.name, phase.prompt
        );

        let mut user = format!("Topic: {}", chain.topic);
        // The window keeps chronological order: the most recent step is the
        // last line the model reads before its own turn.
        let window_start = chain.steps.len().saturating_sub(STEP_CONTEXT_WINDOW);
        let window = &chain.steps[window_start..];
        if !window.is_empty() {
            let prior: Vec<String> = window
                .iter()
                .map(|s| format!("[{}] {}", s.step_type, s.content))
                .collect();
            user.push_str(&format!("\n\nPrevious steps:\n{}", prior.join("\n")));
        }
        if let Some(extra) = extra {
            user.push_str(&format!("\n\nAdditional input: {}", extra));
        }

        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![Message::system(system), Message::user(user)],
        )
        .with_temperature(0.7)
        .with_max_tokens(STEP_MAX_TOKENS);

        match self.port.invoke(request).await {
            Ok(reply) => {
                let mut step = ThinkingStep::new(&phase.name, reply.content, STEP_CONFIDENCE);
                if let Some(identity) = reply.identity {
                    step = step.with_metadata(serde_json::json!({
                        "model_id": identity.model_id,
                        "provider_id": identity.provider_id,
                    }));
                }
                step
            }
            Err(e) => {
                warn!(
                    chain_id = %chain.id,
                    phase = %phase.name,
                    error = %e,
                    "Step model call failed, recording placeholder"
                );
                ThinkingStep::new(&phase.name, STEP_FAILURE_PLACEHOLDER, STEP_CONFIDENCE)
            }
        }
    }
}
