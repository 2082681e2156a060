//! Shared library for Zero Bill Lambda functions.
//!
//! This crate provides common utilities, types, and clients used across all Lambda functions:
//! the lead data model and its status state machine, the reasoning-service client, the lead
//! record store, analysis normalization, the chat context assembler, and the client-side
//! convergence poller.

pub mod analysis;
pub mod chat;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod documents;
pub mod error;
pub mod http;
pub mod models;
pub mod orchestrator;
pub mod poll;
pub mod reasoning;
pub mod secrets;
pub mod store;

#[cfg(test)]
pub(crate) mod testutil;

pub use analysis::{analysis_prompt, normalize_analysis, placeholder_analysis};
pub use chat::{assemble_reply, CHAT_APOLOGY};
pub use config::Config;
pub use dispatch::AnalysisDispatcher;
pub use documents::DocumentStore;
pub use error::{Error, Result};
pub use models::{
    Analysis, AnalyzeRequest, AnalyzeResponse, ChatRequest, ChatResponse, ConversationTurn, Lead,
    LeadStatus, Role,
};
pub use orchestrator::run_analysis;
pub use poll::{watch_lead, PollConfig, WatchOutcome};
pub use reasoning::{GeminiClient, ReasoningService};
pub use secrets::{get_database_credentials, get_secret, DatabaseCredentials};
pub use store::{LeadStore, PgLeadStore};
