//! Command surface: shared state, JSON-RPC plumbing and tool handlers.

pub mod handlers;
pub mod rpc;

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppResult;
use crate::events::{EventSink, LogSink};
use crate::magi::{DebateEngine, DebateSession, TemplateRegistry};
use crate::model::{HttpModelPort, ModelPort};
use crate::store::SessionStore;
use crate::thinking::{ChainEngine, ThinkingChain, TopicRouter, VcpEngine};

/// Shared application state wired once at startup.
pub struct AppState {
    pub config: Config,
    pub chain_engine: Arc<ChainEngine>,
    pub vcp_engine: Arc<VcpEngine>,
    pub router: TopicRouter,
    pub debate_engine: DebateEngine,
}

/// Shared state handle passed to every handler.
pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the full engine stack over the configured HTTP port.
    pub fn new(config: Config) -> AppResult<SharedState> {
        let port: Arc<dyn ModelPort> =
            Arc::new(HttpModelPort::new(&config.model, config.request.clone())?);
        Ok(Self::with_port(config, port, Arc::new(LogSink)))
    }

    /// Wire the engine stack over an explicit port and sink (test seam).
    pub fn with_port(
        config: Config,
        port: Arc<dyn ModelPort>,
        sink: Arc<dyn EventSink>,
    ) -> SharedState {
        let chains: Arc<SessionStore<ThinkingChain>> =
            Arc::new(SessionStore::new(&config.store));
        let sessions: Arc<SessionStore<DebateSession>> =
            Arc::new(SessionStore::new(&config.store));
        let templates = Arc::new(TemplateRegistry::new());

        let chain_engine = Arc::new(ChainEngine::new(port.clone(), sink.clone(), chains));
        let vcp_engine = Arc::new(VcpEngine::new(port.clone(), sink));
        let router = TopicRouter::new(chain_engine.clone(), vcp_engine.clone());
        let debate_engine = DebateEngine::new(port, sessions, templates);

        Arc::new(AppState {
            config,
            chain_engine,
            vcp_engine,
            router,
            debate_engine,
        })
    }
}
