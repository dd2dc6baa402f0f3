//! Agentic reasoning orchestration served over the MCP tool protocol.
//!
//! Three engines sit behind one stdio JSON-RPC surface:
//!
//! - **Chain Orchestrator** ([`thinking::ChainEngine`]): single-agent
//!   multi-phase thinking chains with a step-count/confidence advancement
//!   policy, plus one-shot and reflective variants.
//! - **Cluster Engine** ([`thinking::VcpEngine`]): sequential multi-stance
//!   deliberation where each reasoning cluster sees the accumulated output
//!   of the clusters before it.
//! - **Debate Orchestrator** ([`magi::DebateEngine`]): multi-persona
//!   sessions driven through opening statements, discussion rounds and a
//!   strict-majority vote.
//!
//! A keyword-scored [`thinking::TopicRouter`] picks between strategies, and
//! all generation flows through the [`model::ModelPort`] trait so the
//! engines never name a concrete backend.

pub mod config;
pub mod error;
pub mod events;
pub mod magi;
pub mod model;
pub mod prompts;
pub mod server;
pub mod store;
pub mod thinking;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use server::{AppState, SharedState};
