//! Tool dispatch: argument parsing, engine calls and the reply envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::rpc::ToolCallResult;
use super::SharedState;
use crate::error::{AppResult, CommandError, CommandResult};
use crate::magi::{
    ConveneParams, DiscussParams, QuickDecisionParams, SageTemplate, SummaryFormat, WiseAgent,
};
use crate::thinking::{AutoRouteParams, ReflectParams, StartParams, StepParams, ThinkParams, VcpParams};

/// Uniform reply envelope carried in every tool result.
#[derive(Debug, Serialize, Deserialize)]
pub struct CommandReply {
    pub success: bool,
    /// Short human-readable outcome line.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandReply {
    fn ok(output: Option<String>, data: Value) -> Self {
        Self {
            success: true,
            output,
            data: Some(data),
            error: None,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            output: None,
            data: None,
            error: Some(message),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusParams {
    chain_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoteParams {
    session_id: String,
    proposal: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryParams {
    session_id: String,
    #[serde(default)]
    format: SummaryFormat,
}

#[derive(Debug, Deserialize)]
struct RegisterTemplateParams {
    id: String,
    name: String,
    #[serde(default)]
    description: String,
    agents: Vec<WiseAgent>,
}

/// Dispatch one tool call by name.
pub async fn handle_tool_call(
    state: &SharedState,
    name: &str,
    arguments: Value,
) -> CommandResult<ToolCallResult> {
    debug!(tool = %name, "Dispatching tool call");

    match name {
        "metathink_start" => {
            let params: StartParams = parse_arguments(name, arguments)?;
            render(Some("Chain started"), state.chain_engine.start(params).await)
        }
        "metathink_step" => {
            let params: StepParams = parse_arguments(name, arguments)?;
            render(Some("Step executed"), state.chain_engine.step(params).await)
        }
        "metathink_think" => {
            let params: ThinkParams = parse_arguments(name, arguments)?;
            render(
                Some("Reasoning complete"),
                state.chain_engine.think(params).await,
            )
        }
        "metathink_vcp" => {
            let params: VcpParams = parse_arguments(name, arguments)?;
            render(
                Some("Cluster deliberation complete"),
                state.vcp_engine.think_vcp(params).await,
            )
        }
        "metathink_reflect" => {
            let params: ReflectParams = parse_arguments(name, arguments)?;
            render(
                Some("Reflection complete"),
                state.chain_engine.reflect(params).await,
            )
        }
        "metathink_list" => render(None, Ok(state.chain_engine.list())),
        "metathink_status" => {
            let params: StatusParams = parse_arguments(name, arguments)?;
            render(None, state.chain_engine.status(params.chain_id.as_deref()))
        }
        "metathink_auto_route" => {
            let params: AutoRouteParams = parse_arguments(name, arguments)?;
            render(
                Some("Topic routed and executed"),
                state.router.auto_route(params).await,
            )
        }
        "magi_convene" => {
            let params: ConveneParams = parse_arguments(name, arguments)?;
            render(
                Some("Session convened"),
                state.debate_engine.convene(params).await,
            )
        }
        "magi_discuss" => {
            let params: DiscussParams = parse_arguments(name, arguments)?;
            render(
                Some("Discussion round complete"),
                state.debate_engine.discuss(params).await,
            )
        }
        "magi_vote" => {
            let params: VoteParams = parse_arguments(name, arguments)?;
            render(
                Some("Vote concluded"),
                state
                    .debate_engine
                    .vote(&params.session_id, params.proposal.as_deref())
                    .await,
            )
        }
        "magi_quick_decision" => {
            let params: QuickDecisionParams = parse_arguments(name, arguments)?;
            render(
                Some("Decision simulated"),
                state.debate_engine.quick_decision(params).await,
            )
        }
        "magi_summary" => {
            let params: SummaryParams = parse_arguments(name, arguments)?;
            render(
                None,
                state.debate_engine.summary(&params.session_id, params.format),
            )
        }
        "magi_list_templates" => render(None, Ok(state.debate_engine.list_templates())),
        "magi_register_template" => {
            let params: RegisterTemplateParams = parse_arguments(name, arguments)?;
            let template = SageTemplate {
                id: params.id.clone(),
                name: params.name,
                description: params.description,
                agents: params.agents,
            };
            render(
                Some("Template registered"),
                state
                    .debate_engine
                    .templates()
                    .register(template)
                    .map(|_| serde_json::json!({ "registered": params.id })),
            )
        }
        other => Err(CommandError::UnknownCommand {
            command: other.to_string(),
        }),
    }
}

/// Parse tool arguments into a typed params struct.
fn parse_arguments<T: DeserializeOwned>(command: &str, arguments: Value) -> CommandResult<T> {
    serde_json::from_value(arguments).map_err(|e| CommandError::InvalidParameters {
        command: command.to_string(),
        message: e.to_string(),
    })
}

/// Render an engine result as an enveloped tool result.
///
/// Engine errors become a `success: false` envelope with the error flag set;
/// only protocol-level problems surface as JSON-RPC errors.
fn render<T: Serialize>(output: Option<&str>, result: AppResult<T>) -> CommandResult<ToolCallResult> {
    match result {
        Ok(value) => {
            let reply = CommandReply::ok(output.map(str::to_string), serde_json::to_value(value)?);
            Ok(ToolCallResult::text(serde_json::to_string(&reply)?))
        }
        Err(e) => {
            let reply = CommandReply::failed(e.to_string());
            Ok(ToolCallResult::failure(serde_json::to_string(&reply)?))
        }
    }
}
