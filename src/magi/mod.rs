//! Multi-persona deliberation: templates, sessions, voting and consensus.

pub mod consensus;
pub mod debate;
pub mod templates;
pub mod types;

pub use consensus::{classify_vote, tally};
pub use debate::{
    ConveneParams, ConveneResult, DebateEngine, DiscussParams, DiscussResult,
    QuickDecisionParams, QuickDecisionResult, SummaryFormat, VoteResult,
};
pub use templates::{TemplateRegistry, DEFAULT_TEMPLATE_ID};
pub use types::{
    Conclusion, DebateSession, Decision, SageTemplate, SessionStatus, Statement, Vote, WiseAgent,
};
