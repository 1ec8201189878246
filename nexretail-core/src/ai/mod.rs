//! AI Integration Module
//!
//! Connects the dashboard to the external reasoning service: the chat
//! assistant, inventory demand forecasts and ledger anomaly audits.

pub mod assistant;
pub mod client;
pub mod dispatcher;
pub mod prompts;
pub mod responses;

pub use assistant::{NOT_CONFIGURED_REPLY, NOT_UNDERSTOOD_REPLY, SERVICE_BUSY_REPLY};
pub use client::{AiClient, AiError, AiMode, ReasoningService};
pub use dispatcher::{
    AssistantDispatcher, AssistantFeature, AssistantReply, AssistantRequest, Completion,
    DispatcherSettings, RequestId,
};
pub use responses::{AiAnomalyResult, AiForecastResult};
