//! Semantic gateway
//!
//! Accepts conversational requests, resolves them through a pluggable LLM
//! backend and either returns the completion or routes the resolved intent to
//! a registered handler. Also reports the health of the critical dependencies.
//!
//! The HTTP surface lives in [`api`]; everything else is transport-agnostic
//! and can be driven in-process through [`gateway::Gateway`].

pub mod api;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod health;
pub mod identity;
pub mod llm;

pub use context::RequestContext;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use health::{HealthAggregator, HealthReport};
pub use identity::Identity;
