//! Routed execution: the decision plus the engine it dispatches to.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{CollectingSink, ScriptedPort};
use mcp_agentic_reasoning::config::StoreConfig;
use mcp_agentic_reasoning::events::EventSink;
use mcp_agentic_reasoning::model::ModelPort;
use mcp_agentic_reasoning::store::SessionStore;
use mcp_agentic_reasoning::thinking::router::RoutedOutput;
use mcp_agentic_reasoning::thinking::{
    select_route, AutoRouteParams, ChainEngine, ThinkingChain, TopicRouter, VcpEngine,
};

fn router_with(port: Arc<ScriptedPort>) -> TopicRouter {
    let sink: Arc<dyn EventSink> = Arc::new(CollectingSink::new());
    let chains: Arc<SessionStore<ThinkingChain>> =
        Arc::new(SessionStore::new(&StoreConfig::default()));
    let chain_engine = Arc::new(ChainEngine::new(
        port.clone() as Arc<dyn ModelPort>,
        sink.clone(),
        chains,
    ));
    let vcp_engine = Arc::new(VcpEngine::new(port as Arc<dyn ModelPort>, sink));
    TopicRouter::new(chain_engine, vcp_engine)
}

#[tokio::test]
async fn performance_topic_executes_the_deep_preset() {
    let port = Arc::new(ScriptedPort::with_fallback("cluster output"));
    let router = router_with(port.clone());

    let result = router
        .auto_route(AutoRouteParams::new("如何优化数据库查询性能"))
        .await
        .unwrap();

    assert_eq!(result.route.rule, "problem_solving");
    assert_eq!(result.route.vcp_preset, "deep");
    // deep preset k-sequence is 1+2+2+2+1
    assert_eq!(port.call_count(), 8);
    match result.output {
        RoutedOutput::Vcp(vcp) => assert_eq!(vcp.preset, "deep"),
        RoutedOutput::Think(_) => panic!("expected the cluster path"),
    }
}

#[tokio::test]
async fn prefer_vcp_false_takes_the_chain_path() {
    let port = Arc::new(ScriptedPort::new());
    port.push_reply("single-shot reasoning");
    let router = router_with(port.clone());

    let result = router
        .auto_route(AutoRouteParams::new("帮我对比这两个方案并决策").with_prefer_vcp(false))
        .await
        .unwrap();

    assert_eq!(result.route.rule, "decision");
    assert_eq!(result.route.chain_key, "decision");
    assert_eq!(port.call_count(), 1);
    match result.output {
        RoutedOutput::Think(think) => {
            assert_eq!(think.chain_key, "decision");
            assert_eq!(think.content, "single-shot reasoning");
        }
        RoutedOutput::Vcp(_) => panic!("expected the chain path"),
    }
}

#[tokio::test]
async fn unmatched_topic_runs_the_standard_fallback() {
    let port = Arc::new(ScriptedPort::new());
    let router = router_with(port.clone());

    let result = router
        .auto_route(AutoRouteParams::new("今天的天气"))
        .await
        .unwrap();

    assert_eq!(result.route.rule, "fallback");
    assert_eq!(result.route.confidence, 0.5);
    // standard preset is three clusters
    assert_eq!(port.call_count(), 3);
}

#[tokio::test]
async fn empty_topic_is_rejected_before_routing() {
    let router = router_with(Arc::new(ScriptedPort::new()));
    assert!(router.auto_route(AutoRouteParams::new("  ")).await.is_err());
}

#[test]
fn route_decision_is_pure_and_repeatable() {
    let first = select_route("summarize the incident report");
    let second = select_route("summarize the incident report");
    assert_eq!(first.rule, second.rule);
    assert_eq!(first.confidence, second.confidence);
    assert_eq!(first.rule, "summary");
    assert_eq!(first.vcp_preset, "quick");
}
