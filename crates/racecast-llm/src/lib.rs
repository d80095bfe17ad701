//! Remote plan provider client.
//!
//! This crate provides:
//! - The `PlanProvider` trait the director talks through
//! - An OpenAI-compatible chat-completions provider (hosted or local)
//! - Prompt templates for broadcast-style camera direction
//! - Segmented generation for sessions too long for one request

pub mod chat;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod segmented;

pub use chat::{ChatPlanProvider, ChatProviderConfig};
pub use error::{LlmError, LlmResult};
pub use provider::PlanProvider;
pub use segmented::{generate_plan_segmented, MAX_SEGMENT_FRAMES};
