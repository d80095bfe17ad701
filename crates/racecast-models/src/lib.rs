//! Shared data models for the Racecast camera director.
//!
//! This crate provides Serde-serializable types for:
//! - Per-frame driver and session telemetry snapshots
//! - Discrete race events emitted by the detectors
//! - Scan results, camera plans, and race summaries
//! - The flat director configuration surface

pub mod config;
pub mod event;
pub mod plan;
pub mod scan;
pub mod snapshot;
pub mod summary;

// Re-export common types
pub use config::DirectorConfig;
pub use event::{RaceEvent, RaceEventKind};
pub use plan::{CameraAction, CameraPlan};
pub use scan::ScanResult;
pub use snapshot::{DriverSnapshot, TelemetrySnapshot, TrackSurface};
pub use summary::{CameraBrief, DriverBrief, RaceSummary};
