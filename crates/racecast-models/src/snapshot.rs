//! Telemetry snapshot models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where a car currently is relative to the racing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TrackSurface {
    /// Not present in the session at this frame.
    NotInWorld,
    /// Off the racing surface (grass, gravel, wall).
    OffTrack,
    InPitStall,
    ApproachingPits,
    OnTrack,
}

/// State of a single car at one sampled frame.
///
/// Immutable once captured; detectors and the scorer only ever read these.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DriverSnapshot {
    /// Session-local car identifier
    pub car_id: i32,

    /// Car number as painted on the car (0 = pace car)
    pub car_number: i32,

    /// Team or driver display name
    pub display_name: String,

    /// Running position, 1 = leader; zero or negative means invalid
    pub position: i32,

    /// Current lap number
    pub lap: i32,

    /// Fractional progress along the current lap (0.0 start/finish to 1.0)
    pub lap_distance: f32,

    /// Track surface state at capture time
    pub surface: TrackSurface,
}

impl DriverSnapshot {
    /// Whether this car holds a valid running position.
    pub fn has_valid_position(&self) -> bool {
        self.position > 0
    }

    /// Whether this car is present in the session (anything but NotInWorld).
    pub fn is_in_world(&self) -> bool {
        self.surface != TrackSurface::NotInWorld
    }
}

/// All driver states captured at one sampled frame.
///
/// The scan produces one of these per sampled frame; the sequence is
/// monotonic in frame number and is the sole input to the event detectors.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TelemetrySnapshot {
    /// Replay frame number
    pub frame: i64,

    /// Session time in seconds
    pub session_time: f64,

    /// One entry per car present at capture time
    pub drivers: Vec<DriverSnapshot>,
}

impl TelemetrySnapshot {
    /// Look up a car by number within this snapshot.
    pub fn driver(&self, car_number: i32) -> Option<&DriverSnapshot> {
        self.drivers.iter().find(|d| d.car_number == car_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn car(number: i32, position: i32) -> DriverSnapshot {
        DriverSnapshot {
            car_id: number,
            car_number: number,
            display_name: format!("Car {number}"),
            position,
            lap: 1,
            lap_distance: 0.5,
            surface: TrackSurface::OnTrack,
        }
    }

    #[test]
    fn test_driver_lookup() {
        let snapshot = TelemetrySnapshot {
            frame: 100,
            session_time: 1.5,
            drivers: vec![car(7, 1), car(12, 2)],
        };

        assert_eq!(snapshot.driver(12).unwrap().position, 2);
        assert!(snapshot.driver(99).is_none());
    }

    #[test]
    fn test_valid_position() {
        assert!(car(7, 1).has_valid_position());
        assert!(!car(7, 0).has_valid_position());
        assert!(!car(7, -1).has_valid_position());
    }
}
