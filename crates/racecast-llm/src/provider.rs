//! The seam between the director and any remote plan generator.

use async_trait::async_trait;

use racecast_models::{CameraPlan, RaceSummary};

use crate::error::LlmResult;

/// A remote collaborator that turns a race summary into a camera plan.
#[async_trait]
pub trait PlanProvider: Send + Sync {
    /// Human-readable provider name, e.g. "OpenAI".
    fn name(&self) -> &str;

    /// Model identifier requests are made against.
    fn model(&self) -> &str;

    /// Whether enough configuration is present to attempt a request.
    fn is_configured(&self) -> bool;

    /// Message from the most recent failure, if any.
    fn last_error(&self) -> Option<String>;

    /// Generate a camera plan for one summary (a whole short session, or one
    /// segment of a long one).
    async fn generate_plan(&self, summary: &RaceSummary) -> LlmResult<CameraPlan>;

    /// Cheap connectivity probe; never errors, just reports reachability.
    async fn test_connection(&self) -> bool;
}
