//! Data types for multi-persona deliberation sessions.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a deliberation session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Accepting discussion rounds and a vote call.
    #[default]
    Active,
    /// Vote in progress.
    Voting,
    /// Vote finished; the conclusion is frozen.
    Concluded,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Voting => write!(f, "voting"),
            SessionStatus::Concluded => write!(f, "concluded"),
        }
    }
}

/// One agent's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vote {
    Approve,
    Reject,
    Abstain,
}

impl std::fmt::Display for Vote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Vote::Approve => write!(f, "approve"),
            Vote::Reject => write!(f, "reject"),
            Vote::Abstain => write!(f, "abstain"),
        }
    }
}

/// Collective outcome of a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    Undecided,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approved => write!(f, "approved"),
            Decision::Rejected => write!(f, "rejected"),
            Decision::Undecided => write!(f, "undecided"),
        }
    }
}

/// One debate persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WiseAgent {
    /// Stable agent identifier within its template.
    pub id: String,
    /// Display name.
    pub name: String,
    /// The viewpoint the agent argues from.
    pub perspective: String,
    /// Tone and temperament directive.
    pub personality: String,
    /// Optional per-agent model override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_override: Option<String>,
}

impl WiseAgent {
    /// Create a new agent persona.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        perspective: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            perspective: perspective.into(),
            personality: personality.into(),
            model_override: None,
        }
    }

    /// Persona block injected into this agent's system prompts.
    pub fn persona_prompt(&self) -> String {
        format!(
            "Your name: {}\nYour perspective: {}\nYour personality: {}",
            self.name, self.perspective, self.personality
        )
    }
}

/// A named roster of personas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SageTemplate {
    /// Template identifier (e.g. "magi").
    pub id: String,
    /// Display name.
    pub name: String,
    /// What the roster is suited for.
    pub description: String,
    /// The personas, in speaking order.
    pub agents: Vec<WiseAgent>,
}

/// One statement in a deliberation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub agent_id: String,
    pub agent_name: String,
    pub content: String,
    /// Set only on statements recorded during the vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vote: Option<Vote>,
    pub confidence: f64,
    pub created_at: DateTime<Utc>,
}

/// Frozen outcome of a concluded session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conclusion {
    pub decision: Decision,
    /// Per-agent votes keyed by agent id.
    pub votes: HashMap<String, Vote>,
    pub summary: String,
    pub approve_count: usize,
    pub reject_count: usize,
    pub abstain_count: usize,
}

/// One multi-persona deliberation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateSession {
    pub id: String,
    pub topic: String,
    /// Template the roster came from.
    pub template_id: String,
    /// Roster snapshot taken at convene time; later template edits do not
    /// reach a live session.
    pub agents: Vec<WiseAgent>,
    /// Append-only transcript.
    pub statements: Vec<Statement>,
    pub status: SessionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<Conclusion>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl DebateSession {
    /// Create a new active session with a roster snapshot.
    pub fn new(topic: impl Into<String>, template: &SageTemplate) -> Self {
        Self {
            id: format!("magi-{}", Uuid::new_v4()),
            topic: topic.into(),
            template_id: template.id.clone(),
            agents: template.agents.clone(),
            statements: Vec::new(),
            status: SessionStatus::Active,
            conclusion: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a statement to the transcript.
    pub fn append_statement(&mut self, statement: Statement) {
        self.statements.push(statement);
    }
}
