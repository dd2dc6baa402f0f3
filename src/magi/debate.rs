//! Debate Orchestrator: convene, discuss, vote, summarize.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::consensus::{classify_vote, tally};
use super::templates::{TemplateRegistry, DEFAULT_TEMPLATE_ID};
use super::types::{
    Conclusion, DebateSession, Decision, SageTemplate, SessionStatus, Statement, Vote, WiseAgent,
};
use crate::error::{AppError, AppResult};
use crate::model::{CapabilityHint, Message, ModelPort, ModelRequest};
use crate::prompts::{
    DEBATE_DISCUSSION_FRAMING, DEBATE_OPENING_FRAMING, DEBATE_SUMMARY_PROMPT,
    QUICK_DECISION_FRAMING, VOTE_CLASSIFICATION_PROMPT,
};
use crate::store::SessionStore;
use crate::thinking::ThinkDepth;

/// Placeholder confidence stamped on every statement. No estimator exists;
/// kept as a named constant so one can be wired in later.
pub const STATEMENT_CONFIDENCE: f64 = 0.7;

/// Literal content recorded for a statement whose model call failed.
pub const STATEMENT_FAILURE_PLACEHOLDER: &str =
    "[model invocation failed - statement recorded without content]";

/// Token budget for one opening or discussion statement.
const STATEMENT_MAX_TOKENS: u32 = 600;

/// Token budget for the one-word-plus-justification vote reply.
const VOTE_MAX_TOKENS: u32 = 60;

/// Token budget for the post-vote summary.
const SUMMARY_MAX_TOKENS: u32 = 800;

/// Input parameters for convening a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConveneParams {
    /// The proposal or question to deliberate
    pub topic: String,
    /// Explicit template id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Theme keyword resolved to a builtin template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Optional background given to every opening statement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl ConveneParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            template: None,
            theme: None,
            context: None,
        }
    }

    /// Select an explicit template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Select a template by theme keyword
    pub fn with_theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = Some(theme.into());
        self
    }

    /// Attach background context
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// Input parameters for a discussion round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussParams {
    /// The session to advance
    pub session_id: String,
    /// Optional focus steering the round
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus: Option<String>,
}

impl DiscussParams {
    /// Create new params for a session
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            focus: None,
        }
    }

    /// Attach a focus for the round
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }
}

/// Input parameters for the stateless quick decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickDecisionParams {
    /// The proposal to decide on
    pub topic: String,
    /// Explicit template id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Theme keyword resolved to a builtin template
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    /// Requested depth (scales the token budget)
    #[serde(default)]
    pub depth: ThinkDepth,
}

impl QuickDecisionParams {
    /// Create new params with just a topic
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            template: None,
            theme: None,
            depth: ThinkDepth::default(),
        }
    }

    /// Select an explicit template
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Set the depth
    pub fn with_depth(mut self, depth: ThinkDepth) -> Self {
        self.depth = depth;
        self
    }
}

/// Rendering format for session summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryFormat {
    #[default]
    Text,
    Markdown,
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(SummaryFormat::Text),
            "markdown" | "md" => Ok(SummaryFormat::Markdown),
            "json" => Ok(SummaryFormat::Json),
            _ => Err(format!("Unknown summary format: {}", s)),
        }
    }
}

/// Result of convening a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConveneResult {
    pub session_id: String,
    pub template_id: String,
    pub agents: Vec<WiseAgent>,
    /// Opening statements, in speaking order
    pub statements: Vec<Statement>,
}

/// Result of one discussion round
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscussResult {
    pub session_id: String,
    /// This round's statements, in speaking order
    pub statements: Vec<Statement>,
    /// Total transcript length after the round
    pub statement_count: usize,
}

/// Result of the vote
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResult {
    pub session_id: String,
    pub conclusion: Conclusion,
}

/// Result of the stateless quick decision
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuickDecisionResult {
    pub template_id: String,
    pub content: String,
}

/// Debate Orchestrator driving multi-persona sessions toward a vote.
pub struct DebateEngine {
    port: Arc<dyn ModelPort>,
    sessions: Arc<SessionStore<DebateSession>>,
    templates: Arc<TemplateRegistry>,
}

impl DebateEngine {
    /// Create a new debate engine
    pub fn new(
        port: Arc<dyn ModelPort>,
        sessions: Arc<SessionStore<DebateSession>>,
        templates: Arc<TemplateRegistry>,
    ) -> Self {
        Self {
            port,
            sessions,
            templates,
        }
    }

    /// Access the template registry.
    pub fn templates(&self) -> &TemplateRegistry {
        &self.templates
    }

    /// Convene a session: snapshot the roster and collect opening statements.
    pub async fn convene(&self, params: ConveneParams) -> AppResult<ConveneResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let template = self.resolve_template(params.template.as_deref(), params.theme.as_deref())?;
        let mut session = DebateSession::new(&params.topic, &template);

        info!(
            session_id = %session.id,
            template = %template.id,
            agents = template.agents.len(),
            "Session convened"
        );

        // Sequential fold: each opener sees the openers before it.
        for agent in session.agents.clone() {
            let mut user = format!("Topic: {}", session.topic);
            if let Some(context) = &params.context {
                user.push_str(&format!("\n\nBackground: {}", context));
            }
            if !session.statements.is_empty() {
                user.push_str(&format!(
                    "\n\nOpening statements so far:\n{}",
                    render_transcript(&session.statements)
                ));
            }
            let statement = self
                .agent_statement(&agent, DEBATE_OPENING_FRAMING, user)
                .await;
            session.append_statement(statement);
        }

        let result = ConveneResult {
            session_id: session.id.clone(),
            template_id: session.template_id.clone(),
            agents: session.agents.clone(),
            statements: session.statements.clone(),
        };
        self.sessions.insert(session.id.clone(), session);
        Ok(result)
    }

    /// Run one discussion round: every agent speaks once, in roster order.
    pub async fn discuss(&self, params: DiscussParams) -> AppResult<DiscussResult> {
        let mut session = self
            .sessions
            .get(&params.session_id)
            .ok_or_else(|| AppError::not_found("Session", &params.session_id))?;

        if session.status != SessionStatus::Active {
            return Err(AppError::validation(
                "session_id",
                format!("Session is {}, not active", session.status),
            ));
        }

        let window = session.agents.len() * 2;
        let round_start = session.statements.len();

        for agent in session.agents.clone() {
            // The window is taken per speaker, so later agents see the
            // same-round statements made before theirs.
            let start = session.statements.len().saturating_sub(window);
            let recent = &session.statements[start..];

            let mut user = format!(
                "Topic: {}\n\nRecent discussion:\n{}",
                session.topic,
                render_transcript(recent)
            );
            if let Some(focus) = &params.focus {
                user.push_str(&format!("\n\nFocus for this round: {}", focus));
            }

            let statement = self
                .agent_statement(&agent, DEBATE_DISCUSSION_FRAMING, user)
                .await;
            session.append_statement(statement);
        }

        let result = DiscussResult {
            session_id: session.id.clone(),
            statements: session.statements[round_start..].to_vec(),
            statement_count: session.statements.len(),
        };

        let id = session.id.clone();
        if !self.sessions.update(&id, |s| *s = session) {
            return Err(AppError::not_found("Session", &id));
        }
        Ok(result)
    }

    /// Call the vote, tally it and freeze the conclusion.
    ///
    /// The optional `proposal` restates what is being voted on; absent, the
    /// session topic stands in.
    pub async fn vote(&self, session_id: &str, proposal: Option<&str>) -> AppResult<VoteResult> {
        let mut session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| AppError::not_found("Session", session_id))?;

        if session.status != SessionStatus::Active {
            return Err(AppError::validation(
                "session_id",
                format!("Session is {}, voting is only legal from active", session.status),
            ));
        }
        session.status = SessionStatus::Voting;
        // The transition lands in the store before the first model call so
        // a concurrent Discuss/Vote on the same session sees `voting`.
        if !self.sessions.update(session_id, |s| s.status = SessionStatus::Voting) {
            return Err(AppError::not_found("Session", session_id));
        }

        let transcript = render_transcript(&session.statements);
        let proposal = proposal.unwrap_or(&session.topic).to_string();
        let mut votes: HashMap<String, Vote> = HashMap::new();

        for agent in session.agents.clone() {
            let system = format!(
                "{}\n\n{}",
                agent.persona_prompt(),
                VOTE_CLASSIFICATION_PROMPT
            );
            let user = format!("Proposal: {}\n\nDeliberation:\n{}", proposal, transcript);
            let request = ModelRequest::new(
                CapabilityHint::Chat,
                vec![Message::system(system), Message::user(user)],
            )
            .with_temperature(0.1)
            .with_max_tokens(VOTE_MAX_TOKENS);

            let (vote, content) = match self.port.invoke(request).await {
                Ok(reply) => (classify_vote(&reply.content), reply.content),
                Err(e) => {
                    warn!(
                        session_id = %session.id,
                        agent = %agent.id,
                        error = %e,
                        "Vote call failed, counting as abstain"
                    );
                    (Vote::Abstain, STATEMENT_FAILURE_PLACEHOLDER.to_string())
                }
            };

            votes.insert(agent.id.clone(), vote);
            session.append_statement(Statement {
                agent_id: agent.id.clone(),
                agent_name: agent.name.clone(),
                content,
                vote: Some(vote),
                confidence: STATEMENT_CONFIDENCE,
                created_at: Utc::now(),
            });
        }

        let decision = tally(&votes, session.agents.len());
        let approve_count = votes.values().filter(|v| **v == Vote::Approve).count();
        let reject_count = votes.values().filter(|v| **v == Vote::Reject).count();
        let abstain_count = session.agents.len() - approve_count - reject_count;

        let summary = self
            .vote_summary(&session, decision, approve_count, reject_count, abstain_count)
            .await;

        let conclusion = Conclusion {
            decision,
            votes,
            summary,
            approve_count,
            reject_count,
            abstain_count,
        };
        session.conclusion = Some(conclusion.clone());
        session.status = SessionStatus::Concluded;
        session.completed_at = Some(Utc::now());

        info!(
            session_id = %session.id,
            decision = %decision,
            approve = approve_count,
            reject = reject_count,
            abstain = abstain_count,
            "Session concluded"
        );

        let result = VoteResult {
            session_id: session.id.clone(),
            conclusion,
        };

        let id = session.id.clone();
        if !self.sessions.update(&id, |s| *s = session) {
            return Err(AppError::not_found("Session", &id));
        }
        Ok(result)
    }

    /// Stateless one-call deliberation: no session is created.
    pub async fn quick_decision(
        &self,
        params: QuickDecisionParams,
    ) -> AppResult<QuickDecisionResult> {
        if params.topic.trim().is_empty() {
            return Err(AppError::validation("topic", "Topic cannot be empty"));
        }

        let template = self.resolve_template(params.template.as_deref(), params.theme.as_deref())?;
        let roster: Vec<String> = template
            .agents
            .iter()
            .map(|a| format!("- {}: {} ({})", a.name, a.perspective, a.personality))
            .collect();
        let system = format!("{}\n\nPersonas:\n{}", QUICK_DECISION_FRAMING, roster.join("\n"));

        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![Message::system(system), Message::user(params.topic)],
        )
        .with_temperature(0.7)
        .with_max_tokens(params.depth.max_tokens());

        let reply = self.port.invoke(request).await?;

        Ok(QuickDecisionResult {
            template_id: template.id,
            content: reply.content,
        })
    }

    /// Render a session in the requested format. Read-only; rendering the
    /// same session twice yields identical output.
    pub fn summary(&self, session_id: &str, format: SummaryFormat) -> AppResult<String> {
        let session = self
            .sessions
            .get(session_id)
            .ok_or_else(|| AppError::not_found("Session", session_id))?;
        Ok(render_session(&session, format))
    }

    /// All templates known to the registry.
    pub fn list_templates(&self) -> Vec<SageTemplate> {
        self.templates.list()
    }

    /// Resolve explicit template id, then theme, then the default roster.
    fn resolve_template(
        &self,
        template: Option<&str>,
        theme: Option<&str>,
    ) -> AppResult<SageTemplate> {
        let id = match (template, theme) {
            (Some(id), _) => id.to_string(),
            (None, Some(theme)) => self.templates.resolve_theme(theme).ok_or_else(|| {
                AppError::validation("theme", format!("Unknown theme '{}'", theme))
            })?,
            (None, None) => DEFAULT_TEMPLATE_ID.to_string(),
        };
        self.templates
            .find(&id)
            .ok_or_else(|| AppError::not_found("Template", &id))
    }

    /// One persona statement; a port failure records the placeholder.
    async fn agent_statement(
        &self,
        agent: &WiseAgent,
        framing: &str,
        user: String,
    ) -> Statement {
        let system = format!("{}\n\n{}", framing, agent.persona_prompt());
        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![Message::system(system), Message::user(user)],
        )
        .with_temperature(0.7)
        .with_max_tokens(STATEMENT_MAX_TOKENS);

        let content = match self.port.invoke(request).await {
            Ok(reply) => reply.content,
            Err(e) => {
                warn!(agent = %agent.id, error = %e, "Statement call failed, recording placeholder");
                STATEMENT_FAILURE_PLACEHOLDER.to_string()
            }
        };

        Statement {
            agent_id: agent.id.clone(),
            agent_name: agent.name.clone(),
            content,
            vote: None,
            confidence: STATEMENT_CONFIDENCE,
            created_at: Utc::now(),
        }
    }

    /// Model-written vote summary, with a deterministic local fallback.
    async fn vote_summary(
        &self,
        session: &DebateSession,
        decision: Decision,
        approve: usize,
        reject: usize,
        abstain: usize,
    ) -> String {
        let user = format!(
            "Topic: {}\n\nDeliberation:\n{}\n\nDecision: {} (approve {}, reject {}, abstain {})",
            session.topic,
            render_transcript(&session.statements),
            decision,
            approve,
            reject,
            abstain
        );
        let request = ModelRequest::new(
            CapabilityHint::Chat,
            vec![
                Message::system(DEBATE_SUMMARY_PROMPT),
                Message::user(user),
            ],
        )
        .with_temperature(0.3)
        .with_max_tokens(SUMMARY_MAX_TOKENS);

        match self.port.invoke(request).await {
            Ok(reply) => reply.content,
            Err(e) => {
                warn!(session_id = %session.id, error = %e, "Summary call failed, using local fallback");
                format!(
                    "Decision: {}. Votes: {} approve, {} reject, {} abstain.",
                    decision, approve, reject, abstain
                )
            }
        }
    }
}

fn render_transcript(statements: &[Statement]) -> String {
    statements
        .iter()
        .map(|s| format!("{}: {}", s.agent_name, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Render a session in one of the three summary formats.
///
/// Votes are listed in roster order so repeated renderings are
/// byte-identical.
fn render_session(session: &DebateSession, format: SummaryFormat) -> String {
    let roster_votes: Vec<(String, Option<Vote>)> = session
        .agents
        .iter()
        .map(|a| {
            let vote = session
                .conclusion
                .as_ref()
                .and_then(|c| c.votes.get(&a.id).copied());
            (a.name.clone(), vote)
        })
        .collect();

    match format {
        SummaryFormat::Text => {
            let mut out = format!(
                "Session {}\nTopic: {}\nStatus: {}\nAgents: {}\nStatements: {}\n",
                session.id,
                session.topic,
                session.status,
                session
                    .agents
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
                session.statements.len()
            );
            if let Some(conclusion) = &session.conclusion {
                out.push_str(&format!(
                    "Decision: {} (approve {}, reject {}, abstain {})\n",
                    conclusion.decision,
                    conclusion.approve_count,
                    conclusion.reject_count,
                    conclusion.abstain_count
                ));
                for (name, vote) in &roster_votes {
                    if let Some(vote) = vote {
                        out.push_str(&format!("  {}: {}\n", name, vote));
                    }
                }
                out.push_str(&format!("Summary: {}\n", conclusion.summary));
            }
            out
        }
        SummaryFormat::Markdown => {
            let mut out = format!(
                "# Deliberation: {}\n\n- Session: `{}`\n- Status: {}\n- Statements: {}\n",
                session.topic,
                session.id,
                session.status,
                session.statements.len()
            );
            out.push_str("\n## Transcript\n\n");
            for s in &session.statements {
                let vote_tag = s
                    .vote
                    .map(|v| format!(" _(vote: {})_", v))
                    .unwrap_or_default();
                out.push_str(&format!("**{}**{}: {}\n\n", s.agent_name, vote_tag, s.content));
            }
            if let Some(conclusion) = &session.conclusion {
                out.push_str(&format!(
                    "## Conclusion\n\n**{}** (approve {}, reject {}, abstain {})\n\n{}\n",
                    conclusion.decision,
                    conclusion.approve_count,
                    conclusion.reject_count,
                    conclusion.abstain_count,
                    conclusion.summary
                ));
            }
            out
        }
        SummaryFormat::Json => {
            let votes_json: Vec<serde_json::Value> = roster_votes
                .iter()
                .map(|(name, vote)| {
                    serde_json::json!({
                        "agent": name,
                        "vote": vote.map(|v| v.to_string()),
                    })
                })
                .collect();
            let value = serde_json::json!({
                "session_id": session.id,
                "topic": session.topic,
                "status": session.status,
                "template_id": session.template_id,
                "statement_count": session.statements.len(),
                "statements": session.statements,
                "decision": session.conclusion.as_ref().map(|c| c.decision),
                "votes": votes_json,
                "summary": session.conclusion.as_ref().map(|c| c.summary.clone()),
            });
            // to_string on an identical value is deterministic.
            serde_json::to_string(&value).unwrap_or_else(|_| "{}".to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::magi::types::WiseAgent;

    fn sample_session() -> DebateSession {
        let template = SageTemplate {
            id: "t".to_string(),
            name: "T".to_string(),
            description: String::new(),
            agents: vec![
                WiseAgent::new("a", "Alpha", "p", "p"),
                WiseAgent::new("b", "Beta", "p", "p"),
            ],
        };
        let mut session = DebateSession::new("ship it?", &template);
        session.append_statement(Statement {
            agent_id: "a".to_string(),
            agent_name: "Alpha".to_string(),
            content: "yes".to_string(),
            vote: None,
            confidence: STATEMENT_CONFIDENCE,
            created_at: Utc::now(),
        });
        session
    }

    #[test]
    fn test_summary_format_parse() {
        assert_eq!("json".parse::<SummaryFormat>().unwrap(), SummaryFormat::Json);
        assert_eq!("md".parse::<SummaryFormat>().unwrap(), SummaryFormat::Markdown);
        assert!("xml".parse::<SummaryFormat>().is_err());
    }

    #[test]
    fn test_render_session_json_is_stable() {
        let session = sample_session();
        let first = render_session(&session, SummaryFormat::Json);
        let second = render_session(&session, SummaryFormat::Json);
        assert_eq!(first, second);
        assert!(first.contains("\"session_id\""));
    }

    #[test]
    fn test_render_session_text_mentions_agents() {
        let session = sample_session();
        let text = render_session(&session, SummaryFormat::Text);
        assert!(text.contains("Alpha, Beta"));
        assert!(text.contains("ship it?"));
    }

    #[test]
    fn test_render_transcript_order() {
        let session = sample_session();
        let transcript = render_transcript(&session.statements);
        assert_eq!(transcript, "Alpha: yes");
    }
}
