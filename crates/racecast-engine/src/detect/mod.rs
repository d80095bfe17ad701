//! Event detection over a sampled snapshot sequence.
//!
//! Each detector is an independent, stateless-between-calls analyzer over the
//! full ordered snapshot sequence. A detector that fails contributes zero
//! events and never aborts the scan.

mod battle;
mod incident;
mod overtake;

pub use battle::BattleDetector;
pub use incident::IncidentDetector;
pub use overtake::OvertakeDetector;

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::warn;

use racecast_models::{RaceEvent, RaceEventKind, TelemetrySnapshot};

/// A pattern detector over the sampled snapshot sequence.
pub trait EventDetector {
    /// The kind of event this detector emits.
    fn kind(&self) -> RaceEventKind;

    /// Analyze the full ordered snapshot sequence and emit discrete events.
    fn detect(&self, snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent>;
}

/// Run every detector and merge the results into one frame-sorted list.
///
/// A panicking detector is isolated: its contribution is dropped, the
/// remaining detectors still run.
pub fn run_detectors(
    detectors: &[Box<dyn EventDetector>],
    snapshots: &[TelemetrySnapshot],
) -> Vec<RaceEvent> {
    let mut events = Vec::new();

    for detector in detectors {
        let kind = detector.kind();
        match catch_unwind(AssertUnwindSafe(|| detector.detect(snapshots))) {
            Ok(detected) => events.extend(detected),
            Err(_) => {
                warn!(detector = %kind, "detector failed, discarding its events for this scan");
            }
        }
    }

    events.sort_by_key(|e| e.frame);
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingDetector;

    impl EventDetector for PanickingDetector {
        fn kind(&self) -> RaceEventKind {
            RaceEventKind::Incident
        }

        fn detect(&self, _snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent> {
            panic!("boom");
        }
    }

    struct OneEventDetector;

    impl EventDetector for OneEventDetector {
        fn kind(&self) -> RaceEventKind {
            RaceEventKind::Overtake
        }

        fn detect(&self, _snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent> {
            vec![RaceEvent {
                frame: 42,
                session_time: 0.7,
                kind: RaceEventKind::Overtake,
                car_number: 7,
                car_name: "Car 7".to_string(),
                other_car_number: None,
                other_car_name: None,
                position: Some(1),
                lap_distance: None,
                description: "#7 moves to P1".to_string(),
                importance: 10,
                duration_frames: 300,
            }]
        }
    }

    #[test]
    fn test_failing_detector_is_isolated() {
        let detectors: Vec<Box<dyn EventDetector>> =
            vec![Box::new(PanickingDetector), Box::new(OneEventDetector)];

        let events = run_detectors(&detectors, &[]);
        assert_eq!(events.len(), 1, "surviving detector still contributes");
        assert_eq!(events[0].frame, 42);
    }
}
