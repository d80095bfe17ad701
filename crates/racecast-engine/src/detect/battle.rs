//! Battle detection: sustained close racing between position neighbors.

use std::collections::HashMap;

use racecast_models::{DriverSnapshot, RaceEvent, RaceEventKind, TelemetrySnapshot, TrackSurface};

use super::EventDetector;

/// Shortest close-gap stretch that counts as a battle (~5 s at 60 fps).
const MIN_BATTLE_DURATION_FRAMES: i64 = 300;

/// Minimum spacing between emitted battle events for the same pair (~10 s).
const MIN_FRAMES_BETWEEN_BATTLE_EVENTS: i64 = 600;

/// Detects pairs of cars running nose-to-tail for a sustained stretch.
#[derive(Debug)]
pub struct BattleDetector {
    /// Lap-distance fraction at or below which two cars count as battling
    gap_threshold: f32,
}

impl Default for BattleDetector {
    fn default() -> Self {
        Self { gap_threshold: 0.02 }
    }
}

impl BattleDetector {
    pub fn new(gap_threshold: f32) -> Self {
        Self { gap_threshold }
    }
}

/// An in-progress close-gap stretch for one pair of cars.
struct BattleTracker {
    start_frame: i64,
    last_frame: i64,
    car_number: i32,
    car_name: String,
    other_car_number: i32,
    other_car_name: String,
    position: i32,
    closest_gap: f32,
}

impl BattleTracker {
    fn duration(&self) -> i64 {
        self.last_frame - self.start_frame
    }

    fn into_event(self) -> RaceEvent {
        let duration = self.duration();
        RaceEvent {
            frame: self.start_frame,
            session_time: 0.0,
            kind: RaceEventKind::Battle,
            car_number: self.car_number,
            car_name: self.car_name.clone(),
            other_car_number: Some(self.other_car_number),
            other_car_name: Some(self.other_car_name),
            position: Some(self.position),
            lap_distance: None,
            description: format!(
                "Battle for P{}: #{} vs #{}",
                self.position, self.car_number, self.other_car_number
            ),
            importance: importance(self.position, duration),
            duration_frames: duration,
        }
    }
}

/// Unordered pair key for a battle, low car number first.
fn pair_key(a: i32, b: i32) -> (i32, i32) {
    (a.min(b), a.max(b))
}

impl EventDetector for BattleDetector {
    fn kind(&self) -> RaceEventKind {
        RaceEventKind::Battle
    }

    fn detect(&self, snapshots: &[TelemetrySnapshot]) -> Vec<RaceEvent> {
        let mut events = Vec::new();

        if snapshots.len() < 2 {
            return events;
        }

        let mut ongoing: HashMap<(i32, i32), BattleTracker> = HashMap::new();
        let mut last_event_frame: HashMap<(i32, i32), i64> = HashMap::new();

        for snapshot in snapshots {
            let mut on_track: Vec<&DriverSnapshot> = snapshot
                .drivers
                .iter()
                .filter(|d| d.surface == TrackSurface::OnTrack && d.has_valid_position())
                .collect();
            on_track.sort_by_key(|d| d.position);

            for pair in on_track.windows(2) {
                let (leader, follower) = (pair[0], pair[1]);
                let gap = lap_distance_gap(leader, follower);
                let key = pair_key(leader.car_number, follower.car_number);

                if gap <= self.gap_threshold {
                    let tracker = ongoing.entry(key).or_insert_with(|| BattleTracker {
                        start_frame: snapshot.frame,
                        last_frame: snapshot.frame,
                        car_number: leader.car_number,
                        car_name: leader.display_name.clone(),
                        other_car_number: follower.car_number,
                        other_car_name: follower.display_name.clone(),
                        position: leader.position,
                        closest_gap: f32::MAX,
                    });
                    tracker.last_frame = snapshot.frame;
                    tracker.closest_gap = tracker.closest_gap.min(gap);
                } else if let Some(tracker) = ongoing.remove(&key) {
                    emit_if_sustained(tracker, snapshot.frame, &mut last_event_frame, &mut events);
                }
            }
        }

        // Battles still open when the stream ends
        for (key, tracker) in ongoing {
            debug_assert_eq!(key, pair_key(tracker.car_number, tracker.other_car_number));
            let now = tracker.start_frame;
            emit_if_sustained(tracker, now, &mut last_event_frame, &mut events);
        }

        events.sort_by_key(|e| e.frame);
        events
    }
}

fn emit_if_sustained(
    tracker: BattleTracker,
    now: i64,
    last_event_frame: &mut HashMap<(i32, i32), i64>,
    events: &mut Vec<RaceEvent>,
) {
    if tracker.duration() < MIN_BATTLE_DURATION_FRAMES {
        return;
    }

    let key = pair_key(tracker.car_number, tracker.other_car_number);
    let spaced = last_event_frame
        .get(&key)
        .is_none_or(|&last| now - last >= MIN_FRAMES_BETWEEN_BATTLE_EVENTS);
    if !spaced {
        return;
    }

    last_event_frame.insert(key, tracker.start_frame);
    events.push(tracker.into_event());
}

/// Gap between position neighbors as a fraction of a lap, wrap-corrected
/// when the leader is a whole lap or more ahead.
fn lap_distance_gap(leader: &DriverSnapshot, follower: &DriverSnapshot) -> f32 {
    let gap = if leader.lap == follower.lap {
        leader.lap_distance - follower.lap_distance
    } else if leader.lap > follower.lap {
        (1.0 - follower.lap_distance)
            + leader.lap_distance
            + (leader.lap - follower.lap - 1) as f32
    } else {
        (leader.lap_distance - follower.lap_distance).abs()
    };

    gap.abs()
}

fn importance(position: i32, duration_frames: i64) -> u8 {
    let mut score: i32 = if position == 1 {
        10
    } else if position <= 3 {
        8
    } else if position <= 5 {
        7
    } else if position <= 10 {
        6
    } else {
        5
    };

    // Longer battles are more interesting
    if duration_frames > 600 {
        score += 1;
    }
    if duration_frames > 1200 {
        score += 1;
    }

    score.min(10) as u8
}
