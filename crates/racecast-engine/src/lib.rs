//! Analysis core for the Racecast camera director.
//!
//! This crate provides:
//! - Event detectors that turn snapshot sequences into discrete race events
//! - The excitement scorer that picks which car to show at a frame
//! - The local event-driven cut scheduler
//! - The plan applier that replays a finalized plan into a camera sink
//!
//! Everything here is a pure, single-threaded pass over already-captured
//! data; no async and no internal concurrency.

pub mod apply;
pub mod detect;
pub mod schedule;
pub mod score;

pub use apply::{CameraSink, PlanApplier};
pub use detect::{run_detectors, BattleDetector, EventDetector, IncidentDetector, OvertakeDetector};
pub use schedule::CutScheduler;
pub use score::{ExcitementScorer, SelectionHistory};
