//! Incident detection: off-track excursions and probable spins.

use std::collections::HashMap;

use racecast_models::{RaceEvent, RaceEventKind, TelemetrySnapshot, TrackSurface};

use super::EventDetector;

/// Frames a car is debounced for after an incident (~5 s at 60 fps).
const MIN_FRAMES_BETWEEN_INCIDENTS: i64 = 300;

/// How long an off-track excursion stays interesting (~3 s).
const OFF_TRACK_DURATION_FRAMES: i64 = 180;

/// How long a spin stays interesting (~4 s).
const SPIN_DURATION_FRAMES: i64 = 240;

/// Detects cars leaving the racing surface and backward jumps in lap
/// progress that look like a spin.
#[derive(Debug, Default)]
pub struct IncidentDetector;

impl EventDetector for IncidentDetector {
    fn kind(&self) -> RaceEventKind {
        RaceEventKind::Incident
    }

    fn detect(&self, snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent> {
        let mut events = Vec::new();

        if snapshots.len() < 2 {
            return events;
        }

        let mut last_incident_frame: HashMap<i32, i64> = HashMap::new();

        for pair in snapshots.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            for driver in &current.drivers {
                let Some(prev) = previous.driver(driver.car_number) else {
                    continue;
                };

                if prev.surface == TrackSurface::OnTrack
                    && driver.surface == TrackSurface::OffTrack
                {
                    if debounced(&last_incident_frame, driver.car_number, current.frame) {
                        continue;
                    }
                    last_incident_frame.insert(driver.car_number, current.frame);

                    events.push(RaceEvent {
                        frame: current.frame,
                        session_time: current.session_time,
                        kind: RaceEventKind::Incident,
                        car_number: driver.car_number,
                        car_name: driver.display_name.clone(),
                        other_car_number: None,
                        other_car_name: None,
                        position: Some(driver.position),
                        lap_distance: Some(driver.lap_distance),
                        description: format!(
                            "#{} {} went off track",
                            driver.car_number, driver.display_name
                        ),
                        importance: importance(driver.position),
                        duration_frames: OFF_TRACK_DURATION_FRAMES,
                    });
                } else if prev.surface == TrackSurface::OnTrack
                    && driver.surface == TrackSurface::OnTrack
                {
                    // Backward lap progress too small to be lap wraparound and
                    // too large to be sensor noise reads as a spin.
                    let progress_change = driver.lap_distance - prev.lap_distance;
                    if progress_change < -0.01 && progress_change > -0.5 {
                        if debounced(&last_incident_frame, driver.car_number, current.frame) {
                            continue;
                        }
                        last_incident_frame.insert(driver.car_number, current.frame);

                        events.push(RaceEvent {
                            frame: current.frame,
                            session_time: current.session_time,
                            kind: RaceEventKind::Incident,
                            car_number: driver.car_number,
                            car_name: driver.display_name.clone(),
                            other_car_number: None,
                            other_car_name: None,
                            position: Some(driver.position),
                            lap_distance: Some(driver.lap_distance),
                            description: format!(
                                "#{} {} possible spin",
                                driver.car_number, driver.display_name
                            ),
                            importance: importance(driver.position),
                            duration_frames: SPIN_DURATION_FRAMES,
                        });
                    }
                }
            }
        }

        events
    }
}

fn debounced(last_frames: &HashMap<i32, i64>, car_number: i32, frame: i64) -> bool {
    last_frames
        .get(&car_number)
        .is_some_and(|&last| frame - last < MIN_FRAMES_BETWEEN_INCIDENTS)
}

/// Front-runners going off matter more than backmarkers.
fn importance(position: i32) -> u8 {
    if position <= 3 {
        10
    } else if position <= 5 {
        8
    } else if position <= 10 {
        6
    } else {
        4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racecast_models::DriverSnapshot;

    fn snapshot(frame: i64, lap_distance: f32, surface: TrackSurface) -> TelemetrySnapshot {
        TelemetrySnapshot {
            frame,
            session_time: frame as f64 / 60.0,
            drivers: vec![DriverSnapshot {
                car_id: 1,
                car_number: 7,
                display_name: "Car 7".to_string(),
                position: 4,
                lap: 2,
                lap_distance,
                surface,
            }],
        }
    }

    #[test]
    fn test_off_track_transition_emits_incident() {
        let snapshots = vec![
            snapshot(0, 0.30, TrackSurface::OnTrack),
            snapshot(60, 0.31, TrackSurface::OffTrack),
        ];

        let events = IncidentDetector.detect(&snapshots);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].frame, 60);
        assert_eq!(events[0].importance, 8);
        assert_eq!(events[0].duration_frames, 180);
        assert!(events[0].description.contains("went off track"));
    }

    #[test]
    fn test_backward_progress_reads_as_spin() {
        let snapshots = vec![
            snapshot(0, 0.30, TrackSurface::OnTrack),
            snapshot(60, 0.25, TrackSurface::OnTrack),
        ];

        let events = IncidentDetector.detect(&snapshots);
        assert_eq!(events.len(), 1);
        assert!(events[0].description.contains("possible spin"));
        assert_eq!(events[0].duration_frames, 240);
    }

    #[test]
    fn test_lap_wraparound_is_not_a_spin() {
        // 0.99 -> 0.01 is a new lap, delta -0.98 falls outside the spin window
        let snapshots = vec![
            snapshot(0, 0.99, TrackSurface::OnTrack),
            snapshot(60, 0.01, TrackSurface::OnTrack),
        ];

        assert!(IncidentDetector.detect(&snapshots).is_empty());
    }

    #[test]
    fn test_sensor_noise_is_not_a_spin() {
        let snapshots = vec![
            snapshot(0, 0.300, TrackSurface::OnTrack),
            snapshot(60, 0.295, TrackSurface::OnTrack),
        ];

        assert!(IncidentDetector.detect(&snapshots).is_empty());
    }

    #[test]
    fn test_per_car_debounce() {
        // Two spins 120 frames apart: only the first is reported
        let snapshots = vec![
            snapshot(0, 0.40, TrackSurface::OnTrack),
            snapshot(60, 0.35, TrackSurface::OnTrack),
            snapshot(120, 0.30, TrackSurface::OnTrack),
            // Past the debounce window, a new spin reports again
            snapshot(420, 0.25, TrackSurface::OnTrack),
        ];

        let events = IncidentDetector.detect(&snapshots);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].frame, 60);
        assert_eq!(events[1].frame, 420);
        assert!(events[1].frame - events[0].frame >= 300);
    }
}
