//! Debate sessions: convening, discussion rounds, voting and summaries.

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pretty_assertions::assert_eq;

use common::ScriptedPort;
use mcp_agentic_reasoning::config::StoreConfig;
use mcp_agentic_reasoning::error::{AppError, ModelError, ModelResult};
use mcp_agentic_reasoning::magi::debate::STATEMENT_FAILURE_PLACEHOLDER;
use mcp_agentic_reasoning::magi::{
    ConveneParams, DebateEngine, DebateSession, Decision, DiscussParams, QuickDecisionParams,
    SageTemplate, SessionStatus, SummaryFormat, TemplateRegistry, Vote, WiseAgent,
};
use mcp_agentic_reasoning::model::{ModelPort, ModelReply, ModelRequest};
use mcp_agentic_reasoning::store::SessionStore;

fn engine_with(port: Arc<ScriptedPort>) -> DebateEngine {
    let sessions: Arc<SessionStore<DebateSession>> =
        Arc::new(SessionStore::new(&StoreConfig::default()));
    DebateEngine::new(
        port as Arc<dyn ModelPort>,
        sessions,
        Arc::new(TemplateRegistry::new()),
    )
}

#[tokio::test]
async fn convene_collects_one_opening_statement_per_agent() {
    let port = Arc::new(ScriptedPort::new());
    port.push_reply("science says yes");
    port.push_reply("strategically sound");
    port.push_reply("people will benefit");
    let engine = engine_with(port.clone());

    let result = engine
        .convene(ConveneParams::new("adopt the proposal?"))
        .await
        .unwrap();

    assert_eq!(result.template_id, "magi");
    assert_eq!(result.agents.len(), 3);
    assert_eq!(result.statements.len(), 3);
    assert_eq!(result.statements[0].agent_name, "Melchior");
    assert_eq!(result.statements[2].content, "people will benefit");
    assert_eq!(port.call_count(), 3);

    // Later openers see the earlier openings
    let third_user = &port.requests()[2].messages[1].content;
    assert!(third_user.contains("science says yes"));
}

#[tokio::test]
async fn convene_resolves_theme_and_rejects_unknowns() {
    let engine = engine_with(Arc::new(ScriptedPort::new()));

    let result = engine
        .convene(ConveneParams::new("topic").with_theme("philosophy"))
        .await
        .unwrap();
    assert_eq!(result.template_id, "philosophers");

    let err = engine
        .convene(ConveneParams::new("topic").with_theme("astrology"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));

    let err = engine
        .convene(ConveneParams::new("topic").with_template("missing"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound { .. }));
}

#[tokio::test]
async fn discuss_adds_a_full_round_in_roster_order() {
    let port = Arc::new(ScriptedPort::with_fallback("position statement"));
    let engine = engine_with(port.clone());

    let session = engine
        .convene(ConveneParams::new("topic"))
        .await
        .unwrap();
    let round = engine
        .discuss(DiscussParams::new(&session.session_id).with_focus("focus on cost"))
        .await
        .unwrap();

    assert_eq!(round.statements.len(), 3);
    assert_eq!(round.statement_count, 6);
    assert_eq!(round.statements[0].agent_name, "Melchior");
    assert_eq!(round.statements[2].agent_name, "Casper");

    // The steering prompt reaches every speaker
    for request in &port.requests()[3..] {
        assert!(request.messages[1].content.contains("focus on cost"));
    }
}

#[tokio::test]
async fn vote_with_majority_approves_and_freezes_conclusion() {
    let port = Arc::new(ScriptedPort::new());
    // Opening statements
    port.push_reply("open-1");
    port.push_reply("open-2");
    port.push_reply("open-3");
    // Votes, then the summary call
    port.push_reply("APPROVE - the evidence holds");
    port.push_reply("我赞成");
    port.push_reply("REJECT, too risky");
    port.push_reply("two in favor, one against");
    let engine = engine_with(port.clone());

    let session = engine.convene(ConveneParams::new("ship it?")).await.unwrap();
    let result = engine.vote(&session.session_id, None).await.unwrap();

    assert_eq!(result.conclusion.decision, Decision::Approved);
    assert_eq!(result.conclusion.approve_count, 2);
    assert_eq!(result.conclusion.reject_count, 1);
    assert_eq!(result.conclusion.abstain_count, 0);
    assert_eq!(result.conclusion.summary, "two in favor, one against");
    assert_eq!(result.conclusion.votes["melchior"], Vote::Approve);
    assert_eq!(result.conclusion.votes["casper"], Vote::Reject);

    // A concluded session rejects further rounds and votes
    let err = engine
        .discuss(DiscussParams::new(&session.session_id))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("concluded"));
    assert!(engine.vote(&session.session_id, None).await.is_err());
}

/// Port that snapshots every stored session status on each call.
struct StatusWatchingPort {
    sessions: Arc<SessionStore<DebateSession>>,
    observed: Mutex<Vec<String>>,
}

#[async_trait]
impl ModelPort for StatusWatchingPort {
    async fn invoke(&self, _request: ModelRequest) -> ModelResult<ModelReply> {
        let statuses = self
            .sessions
            .values()
            .iter()
            .map(|s| s.status.to_string())
            .collect::<Vec<_>>();
        self.observed.lock().unwrap().extend(statuses);
        Ok(ModelReply {
            content: "APPROVE".to_string(),
            identity: None,
            usage: None,
        })
    }
}

#[tokio::test]
async fn vote_transition_is_stored_before_the_first_vote_call() {
    let sessions: Arc<SessionStore<DebateSession>> =
        Arc::new(SessionStore::new(&StoreConfig::default()));
    let port = Arc::new(StatusWatchingPort {
        sessions: sessions.clone(),
        observed: Mutex::new(Vec::new()),
    });
    let engine = DebateEngine::new(
        port.clone() as Arc<dyn ModelPort>,
        sessions.clone(),
        Arc::new(TemplateRegistry::new()),
    );

    let session = engine.convene(ConveneParams::new("topic")).await.unwrap();
    engine.vote(&session.session_id, None).await.unwrap();

    // Convene inserts after its opening calls, so those see an empty store;
    // the three vote calls and the summary call all see the stored session
    // already in `voting`.
    let observed = port.observed.lock().unwrap().clone();
    assert_eq!(observed, vec!["voting".to_string(); 4]);
    assert_eq!(
        sessions.get(&session.session_id).unwrap().status,
        SessionStatus::Concluded
    );
}

#[tokio::test]
async fn split_vote_is_undecided() {
    let port = Arc::new(ScriptedPort::with_fallback("opening"));
    let engine = engine_with(port.clone());
    let session = engine.convene(ConveneParams::new("topic")).await.unwrap();

    port.push_reply("APPROVE");
    port.push_reply("REJECT");
    port.push_reply("I really cannot decide");
    port.push_reply("a split house");

    let result = engine.vote(&session.session_id, None).await.unwrap();
    assert_eq!(result.conclusion.decision, Decision::Undecided);
    assert_eq!(result.conclusion.abstain_count, 1);
}

#[tokio::test]
async fn failed_vote_call_counts_as_abstain() {
    let port = Arc::new(ScriptedPort::with_fallback("opening"));
    let engine = engine_with(port.clone());
    let session = engine.convene(ConveneParams::new("topic")).await.unwrap();

    port.push_error(ModelError::Timeout { timeout_ms: 100 });
    port.push_reply("APPROVE");
    port.push_reply("APPROVE");
    port.push_reply("summary text");

    let result = engine.vote(&session.session_id, None).await.unwrap();
    // 2 of 3 approvals is still a strict majority
    assert_eq!(result.conclusion.decision, Decision::Approved);
    assert_eq!(result.conclusion.abstain_count, 1);
}

#[tokio::test]
async fn failed_summary_call_falls_back_locally() {
    let port = Arc::new(ScriptedPort::with_fallback("opening"));
    let engine = engine_with(port.clone());
    let session = engine.convene(ConveneParams::new("topic")).await.unwrap();

    port.push_reply("APPROVE");
    port.push_reply("APPROVE");
    port.push_reply("APPROVE");
    port.push_error(ModelError::Timeout { timeout_ms: 100 });

    let result = engine.vote(&session.session_id, None).await.unwrap();
    assert_eq!(result.conclusion.decision, Decision::Approved);
    assert!(result.conclusion.summary.contains("3 approve"));
}

#[tokio::test]
async fn failed_opening_statement_records_placeholder() {
    let port = Arc::new(ScriptedPort::with_fallback("fine"));
    port.push_error(ModelError::Timeout { timeout_ms: 100 });
    let engine = engine_with(port);

    let result = engine.convene(ConveneParams::new("topic")).await.unwrap();
    assert_eq!(result.statements[0].content, STATEMENT_FAILURE_PLACEHOLDER);
    assert_eq!(result.statements[1].content, "fine");
}

#[tokio::test]
async fn summary_rendering_is_idempotent() {
    let port = Arc::new(ScriptedPort::with_fallback("opening"));
    let engine = engine_with(port.clone());
    let session = engine.convene(ConveneParams::new("topic")).await.unwrap();

    port.push_reply("APPROVE");
    port.push_reply("APPROVE");
    port.push_reply("APPROVE");
    port.push_reply("summary");
    engine.vote(&session.session_id, None).await.unwrap();

    let first = engine
        .summary(&session.session_id, SummaryFormat::Json)
        .unwrap();
    let second = engine
        .summary(&session.session_id, SummaryFormat::Json)
        .unwrap();
    assert_eq!(first, second);

    let markdown = engine
        .summary(&session.session_id, SummaryFormat::Markdown)
        .unwrap();
    assert!(markdown.contains("## Conclusion"));
    assert!(markdown.contains("**approved**"));
}

#[tokio::test]
async fn quick_decision_makes_one_call_and_no_session() {
    let port = Arc::new(ScriptedPort::new());
    port.push_reply("simulated deliberation with a vote");
    let engine = engine_with(port.clone());

    let result = engine
        .quick_decision(QuickDecisionParams::new("merge the branches?"))
        .await
        .unwrap();

    assert_eq!(result.template_id, "magi");
    assert_eq!(result.content, "simulated deliberation with a vote");
    assert_eq!(port.call_count(), 1);

    // The roster is embedded in the single system prompt
    let system = &port.requests()[0].messages[0].content;
    assert!(system.contains("Melchior"));
    assert!(system.contains("Balthasar"));
    assert!(system.contains("Casper"));
}

#[tokio::test]
async fn custom_template_can_be_registered_and_used() {
    let port = Arc::new(ScriptedPort::with_fallback("statement"));
    let engine = engine_with(port);

    engine
        .templates()
        .register(SageTemplate {
            id: "duo".to_string(),
            name: "Duo".to_string(),
            description: "Two-voice review".to_string(),
            agents: vec![
                WiseAgent::new("opt", "Optimist", "upside", "cheerful"),
                WiseAgent::new("pes", "Pessimist", "downside", "gloomy"),
            ],
        })
        .unwrap();

    let result = engine
        .convene(ConveneParams::new("topic").with_template("duo"))
        .await
        .unwrap();
    assert_eq!(result.agents.len(), 2);
    assert_eq!(result.statements.len(), 2);

    assert_eq!(engine.list_templates().len(), 4);
}
