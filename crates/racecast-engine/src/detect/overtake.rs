//! Overtake detection: completed position gains.

use std::collections::HashMap;

use racecast_models::{RaceEvent, RaceEventKind, TelemetrySnapshot, TrackSurface};

use super::EventDetector;

/// Frames a car is debounced for after an overtake (~2 s at 60 fps).
const MIN_FRAMES_BETWEEN_OVERTAKES: i64 = 120;

/// How long a pass stays interesting (~5 s).
const OVERTAKE_DURATION_FRAMES: i64 = 300;

/// Detects cars improving their running position between adjacent snapshots.
#[derive(Debug, Default)]
pub struct OvertakeDetector;

impl EventDetector for OvertakeDetector {
    fn kind(&self) -> RaceEventKind {
        RaceEventKind::Overtake
    }

    fn detect(&self, snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent> {
        let mut events = Vec::new();

        if snapshots.len() < 2 {
            return events;
        }

        let mut last_overtake_frame: HashMap<i32, i64> = HashMap::new();

        for pair in snapshots.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);

            for driver in &current.drivers {
                if driver.surface != TrackSurface::OnTrack {
                    continue;
                }

                let Some(prev) = previous.driver(driver.car_number) else {
                    continue;
                };

                // Lower position number is better; the previous position must
                // have been valid for the gain to mean anything.
                if driver.position >= prev.position || prev.position <= 0 {
                    continue;
                }

                let debounced = last_overtake_frame
                    .get(&driver.car_number)
                    .is_some_and(|&last| current.frame - last < MIN_FRAMES_BETWEEN_OVERTAKES);
                if debounced {
                    continue;
                }
                last_overtake_frame.insert(driver.car_number, current.frame);

                // The passed car is whoever now holds the mover's old position.
                let passed = current
                    .drivers
                    .iter()
                    .find(|d| d.position == prev.position && d.car_number != driver.car_number);

                let description = match passed {
                    Some(p) => format!(
                        "#{} {} passes #{} for P{}",
                        driver.car_number, driver.display_name, p.car_number, driver.position
                    ),
                    None => format!(
                        "#{} {} moves to P{}",
                        driver.car_number, driver.display_name, driver.position
                    ),
                };

                events.push(RaceEvent {
                    frame: current.frame,
                    session_time: current.session_time,
                    kind: RaceEventKind::Overtake,
                    car_number: driver.car_number,
                    car_name: driver.display_name.clone(),
                    other_car_number: passed.map(|p| p.car_number),
                    other_car_name: passed.map(|p| p.display_name.clone()),
                    position: Some(driver.position),
                    lap_distance: Some(driver.lap_distance),
                    description,
                    importance: importance(driver.position, prev.position - driver.position),
                    duration_frames: OVERTAKE_DURATION_FRAMES,
                });
            }
        }

        events
    }
}

fn importance(new_position: i32, positions_gained: i32) -> u8 {
    let mut score: i32 = if new_position == 1 {
        10
    } else if new_position <= 3 {
        8
    } else if new_position <= 5 {
        7
    } else if new_position <= 10 {
        6
    } else {
        5
    };

    // Multi-position gains add importance
    if positions_gained > 1 {
        score += positions_gained - 1;
    }

    score.min(10) as u8
}
