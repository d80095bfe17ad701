//! Race summary handed to the remote plan provider.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::RaceEvent;

/// Per-car digest for the provider prompt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DriverBrief {
    pub car_number: i32,
    pub display_name: String,
    /// Position at the first valid sighting in the scan
    pub start_position: i32,
    /// Position at the last valid sighting in the scan
    pub end_position: i32,
}

impl DriverBrief {
    pub fn positions_gained(&self) -> i32 {
        self.start_position - self.end_position
    }
}

/// One selectable camera group in the session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CameraBrief {
    pub group_id: i32,
    pub name: String,
}

/// Serializable digest of a scanned session, the provider's whole input.
///
/// Camera exclusions are applied while building the summary, so the provider
/// only ever sees cameras it is allowed to pick.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RaceSummary {
    pub track_name: String,
    pub session_type: String,

    pub start_frame: i64,
    pub end_frame: i64,

    pub frame_rate: i32,
    pub duration_minutes: f64,

    pub drivers: Vec<DriverBrief>,
    pub cameras: Vec<CameraBrief>,

    /// Detected events, sorted by frame
    pub events: Vec<RaceEvent>,
}

impl RaceSummary {
    pub fn total_frames(&self) -> i64 {
        self.end_frame - self.start_frame
    }

    /// Rough number of cuts a plan for this summary should contain, about
    /// four per minute.
    pub fn recommended_cuts(&self) -> i32 {
        (self.duration_minutes * 4.0) as i32
    }
}
