//! Race event models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Category of a detected race event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RaceEventKind {
    /// Off-track excursion, spin, contact
    Incident,
    /// Completed position change
    Overtake,
    /// Sustained close racing between two cars
    Battle,
    PitStop,
    RaceStart,
    RaceFinish,
}

impl RaceEventKind {
    /// Stable lowercase label, used in descriptions and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            RaceEventKind::Incident => "incident",
            RaceEventKind::Overtake => "overtake",
            RaceEventKind::Battle => "battle",
            RaceEventKind::PitStop => "pit_stop",
            RaceEventKind::RaceStart => "race_start",
            RaceEventKind::RaceFinish => "race_finish",
        }
    }
}

impl std::fmt::Display for RaceEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A discrete event detected in the snapshot sequence.
///
/// Created only by the detectors; immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RaceEvent {
    /// Frame the event was detected at (battles: the frame the gap closed)
    pub frame: i64,

    /// Session time in seconds at the event frame
    pub session_time: f64,

    pub kind: RaceEventKind,

    /// Primary car involved
    pub car_number: i32,

    /// Display name of the primary car
    pub car_name: String,

    /// Second car involved (the passed car, the battle rival)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_car_number: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub other_car_name: Option<String>,

    /// Running position the event concerns
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,

    /// Lap-distance fraction where the event happened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lap_distance: Option<f32>,

    /// Human-readable description, e.g. "#7 Alpine went off track"
    pub description: String,

    /// How much this event matters for coverage, 0-10
    pub importance: u8,

    /// How long the event stays interesting, in frames
    pub duration_frames: i64,
}

impl RaceEvent {
    /// Last frame at which this event is still considered ongoing.
    pub fn end_frame(&self) -> i64 {
        self.frame + self.duration_frames
    }

    /// Whether `frame` falls within the event's duration window.
    pub fn covers(&self, frame: i64) -> bool {
        frame >= self.frame && frame <= self.end_frame()
    }
}

impl std::fmt::Display for RaceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] frame {}: {}", self.kind, self.frame, self.description)
    }
}
