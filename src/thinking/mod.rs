//! Single-agent reasoning: thinking chains, cluster deliberation and the
//! topic router.

pub mod chain;
pub mod configs;
pub mod policy;
pub mod router;
pub mod types;
pub mod vcp;

pub use chain::{
    ChainEngine, ChainSummary, ReflectParams, ReflectResult, StartParams, StartResult,
    StatusReport, StepParams, StepResult, ThinkDepth, ThinkParams, ThinkResult,
};
pub use configs::{DEFAULT_CHAIN_KEY, DEFAULT_CLUSTER_PRESET_KEY};
pub use router::{select_route, AutoRouteParams, AutoRouteResult, RouteDecision, TopicRouter};
pub use types::{ChainConfig, ChainStatus, ClusterPreset, PhaseConfig, ThinkingChain, ThinkingStep};
pub use vcp::{VcpEngine, VcpParams, VcpResult};
