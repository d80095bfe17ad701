//! Scan/plan/apply orchestration.
//!
//! This crate provides:
//! - The `TelemetrySource` seam to the replay/telemetry collaborator
//! - The `Director` state machine driving scan, plan generation, and apply
//! - Status/progress publication over a watch channel
//! - Tracing bootstrap

pub mod director;
pub mod error;
pub mod logging;
pub mod telemetry;

pub use director::{Director, DirectorState, DirectorStatus};
pub use error::{DirectorError, DirectorResult};
pub use telemetry::{SessionMetadata, TelemetrySource};
