//! The tiered excitement scorer.
//!
//! For a given frame, scores every active car on five action components
//! (event proximity, battle, momentum, pack, fresh action), then position,
//! then applies variety/overexposure pressure damped by how much is actually
//! happening around the car. Variety yields to action, but never fully: at
//! least 40% of the nominal recency penalty always applies.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use racecast_models::config::{
    BATTLE_WEIGHT_BASELINE, FRESH_ACTION_WEIGHT_BASELINE, MOMENTUM_WEIGHT_BASELINE,
    PACK_WEIGHT_BASELINE, POSITION_WEIGHT_BASELINE, VARIETY_PENALTY_BASELINE,
};
use racecast_models::{
    DirectorConfig, DriverSnapshot, RaceEventKind, ScanResult, TelemetrySnapshot, TrackSurface,
};

use super::history::SelectionHistory;

/// Frames on either side of the target frame in which events still score.
const EVENT_WINDOW_FRAMES: i64 = 480;

/// Lookback for momentum comparison (60 s at 60 fps).
const MOMENTUM_WINDOW_FRAMES: i64 = 3600;

/// How long a completed overtake counts as fresh (20 s).
const FRESH_ACTION_WINDOW_FRAMES: i64 = 1200;

/// Lap-distance fraction within which cars count as running in a pack.
const PACK_GAP_THRESHOLD: f32 = 0.03;

/// Action score at which the action level saturates at 1.0.
const ACTION_SATURATION: f32 = 150.0;

/// Flat weight for pit-stop events.
const PIT_STOP_WEIGHT: f32 = 15.0;

/// Share of an event's contribution granted to the non-primary participant.
const SECONDARY_EVENT_SHARE: f32 = 0.8;

/// Share of a fresh-action bonus granted to the car that got passed.
const SECONDARY_FRESH_SHARE: f32 = 0.6;

/// Recency penalties by rank, most recent first.
const VARIETY_RANK_PENALTIES: [f32; 8] = [60.0, 40.0, 25.0, 15.0, 10.0, 8.0, 6.0, 4.0];

/// Variety penalty never drops below this fraction of nominal.
const VARIETY_DAMPENING_FLOOR: f32 = 0.4;

#[derive(Debug, Default)]
struct DriverScore {
    position: i32,
    event_score: f32,
    momentum_bonus: f32,
    battle_bonus: f32,
    pack_bonus: f32,
    fresh_action_bonus: f32,
    action_score: f32,
    /// Normalized 0..1 measure of how much is happening for this car
    action_level: f32,
    total: f32,
}

/// Picks the most exciting car at a frame, balancing current action against
/// coverage variety across the field.
///
/// Selection mutates the owned [`SelectionHistory`]; deterministic given the
/// configuration and history except for randomized tie-breaking, which is
/// seeded for tests via [`ExcitementScorer::with_seed`].
pub struct ExcitementScorer {
    config: DirectorConfig,
    history: SelectionHistory,
    rng: StdRng,
}

impl ExcitementScorer {
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            history: SelectionHistory::new(),
            rng: StdRng::from_os_rng(),
        }
    }

    /// Scorer with a fixed tie-breaking seed, for deterministic tests.
    pub fn with_seed(config: DirectorConfig, seed: u64) -> Self {
        Self {
            config,
            history: SelectionHistory::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn history(&self) -> &SelectionHistory {
        &self.history
    }

    /// Reset all selection state and rebuild the position series from a scan.
    /// Call before the first action of each plan application.
    pub fn reset(&mut self, scan: &ScanResult) {
        self.history.reset(scan);
    }

    /// Select the car most worth showing at `frame`.
    ///
    /// Returns `None` only when the scan holds no usable drivers at all.
    pub fn select(&mut self, frame: i64, scan: &ScanResult) -> Option<i32> {
        let snapshot = scan.nearest_snapshot(frame)?;

        let active: Vec<&DriverSnapshot> = snapshot
            .drivers
            .iter()
            .filter(|d| d.is_in_world() && d.car_number != 0)
            .collect();

        if active.is_empty() {
            return self.fallback(snapshot);
        }

        let mut scores: HashMap<i32, DriverScore> = active
            .iter()
            .map(|d| {
                (
                    d.car_number,
                    DriverScore {
                        position: d.position,
                        ..Default::default()
                    },
                )
            })
            .collect();

        self.score_events(frame, scan, &mut scores);
        self.apply_battle_bonus(frame, scan, &mut scores);
        self.apply_momentum_bonus(frame, &mut scores);
        self.apply_pack_bonus(snapshot, &mut scores);
        self.apply_fresh_action_bonus(frame, scan, &mut scores);

        for score in scores.values_mut() {
            score.action_score = score.event_score
                + score.momentum_bonus
                + score.battle_bonus
                + score.pack_bonus
                + score.fresh_action_bonus;
            score.action_level = (score.action_score / ACTION_SATURATION).min(1.0);
        }

        // Position matters less for a car with its own action going on.
        let position_scale = self.config.position_weight / POSITION_WEIGHT_BASELINE;
        for score in scores.values_mut() {
            let position_score = position_base(score.position)
                * position_scale
                * (1.0 - score.action_level * 0.5);
            score.total = score.action_score + position_score;
        }

        self.apply_variety_penalty(&mut scores);
        self.apply_overexposure_penalty(&mut scores, active.len());
        self.apply_field_diversity_bonus(&mut scores);
        self.apply_focus_driver_bonus(&mut scores);

        let selected = self.pick_with_tie_breaking(&scores)?;
        debug!(frame, car = selected, "selected most exciting car");
        self.history.record_selection(selected);
        Some(selected)
    }

    fn event_type_weight(&self, kind: RaceEventKind) -> f32 {
        match kind {
            RaceEventKind::Incident => self.config.incident_weight,
            RaceEventKind::Battle => self.config.battle_weight,
            RaceEventKind::Overtake | RaceEventKind::RaceStart | RaceEventKind::RaceFinish => {
                self.config.overtake_weight
            }
            RaceEventKind::PitStop => PIT_STOP_WEIGHT,
        }
    }

    /// Event proximity scoring with an urgency boost for events happening
    /// right now.
    fn score_events(&self, frame: i64, scan: &ScanResult, scores: &mut HashMap<i32, DriverScore>) {
        for event in &scan.events {
            let distance = (event.frame - frame).abs();
            let during = event.covers(frame);
            if distance > EVENT_WINDOW_FRAMES && !during {
                continue;
            }

            let multiplier = if during || distance <= 60 {
                1.2
            } else if distance <= 120 {
                1.0
            } else if distance <= 300 {
                0.7
            } else {
                (-(distance as f32) / 300.0).exp().max(0.1)
            };

            let contribution =
                self.event_type_weight(event.kind) * multiplier + event.importance as f32 * multiplier;

            if let Some(score) = scores.get_mut(&event.car_number) {
                score.event_score += contribution;
            }
            if let Some(other) = event.other_car_number {
                if let Some(score) = scores.get_mut(&other) {
                    score.event_score += contribution * SECONDARY_EVENT_SHARE;
                }
            }
        }
    }

    /// Bonus for both cars of a battle currently in progress, tiered by how
    /// deep into the battle the frame is.
    fn apply_battle_bonus(
        &self,
        frame: i64,
        scan: &ScanResult,
        scores: &mut HashMap<i32, DriverScore>,
    ) {
        let scale = self.config.battle_weight / BATTLE_WEIGHT_BASELINE;

        for event in &scan.events {
            if event.kind != RaceEventKind::Battle || !event.covers(frame) {
                continue;
            }

            let progress = (frame - event.frame) as f32 / event.duration_frames.max(1) as f32;
            let mut base = if progress > 0.7 {
                22.0 // climax
            } else if progress > 0.4 {
                18.0
            } else {
                15.0
            };

            let position = event.position.unwrap_or(i32::MAX);
            if position <= 3 {
                base += 5.0;
            } else if position <= 5 {
                base += 3.0;
            }

            let bonus = base * scale;
            if let Some(score) = scores.get_mut(&event.car_number) {
                score.battle_bonus += bonus;
            }
            if let Some(other) = event.other_car_number {
                if let Some(score) = scores.get_mut(&other) {
                    score.battle_bonus += bonus;
                }
            }
        }
    }

    /// Bonus for cars that gained two or more positions over the lookback
    /// window, with a bump for breaking into the top 3 or top 5.
    fn apply_momentum_bonus(&self, frame: i64, scores: &mut HashMap<i32, DriverScore>) {
        let scale = self.config.momentum_weight / MOMENTUM_WEIGHT_BASELINE;

        for (&car_number, score) in scores.iter_mut() {
            if self.history.sample_count(car_number) < 2 {
                continue;
            }
            let Some(start) = self
                .history
                .position_at_or_before(car_number, frame - MOMENTUM_WINDOW_FRAMES)
            else {
                continue;
            };
            let Some(current) = self.history.position_at_or_before(car_number, frame) else {
                continue;
            };

            let gained = start.position - current.position;
            if gained < 2 {
                continue;
            }

            let mut base = if gained >= 5 {
                30.0
            } else if gained >= 4 {
                25.0
            } else if gained >= 3 {
                18.0
            } else {
                12.0
            };

            if current.position <= 3 && start.position > 3 {
                base += 8.0;
            } else if current.position <= 5 && start.position > 5 {
                base += 4.0;
            }

            score.momentum_bonus = base * scale;
        }
    }

    /// Bonus for cars running in a group, tiered by pack size.
    fn apply_pack_bonus(
        &self,
        snapshot: &TelemetrySnapshot,
        scores: &mut HashMap<i32, DriverScore>,
    ) {
        let scale = self.config.pack_weight / PACK_WEIGHT_BASELINE;

        for (&car_number, score) in scores.iter_mut() {
            let Some(me) = snapshot.driver(car_number) else {
                continue;
            };
            if me.surface != TrackSurface::OnTrack {
                continue;
            }

            let nearby = snapshot
                .drivers
                .iter()
                .filter(|other| {
                    other.car_number != car_number
                        && other.surface == TrackSurface::OnTrack
                        && same_lap_gap(me, other) <= PACK_GAP_THRESHOLD
                })
                .count();

            if nearby == 0 {
                continue;
            }

            let base = match nearby {
                1 => 6.0,
                2 => 10.0,
                3 => 15.0,
                _ => 20.0,
            };
            score.pack_bonus = base * scale;
        }
    }

    /// Recency-tiered bonus for overtakes in the last 20 seconds, taking the
    /// maximum per car rather than a sum. The passed car gets a reduced share.
    fn apply_fresh_action_bonus(
        &self,
        frame: i64,
        scan: &ScanResult,
        scores: &mut HashMap<i32, DriverScore>,
    ) {
        let scale = self.config.fresh_action_weight / FRESH_ACTION_WEIGHT_BASELINE;

        for event in &scan.events {
            if event.kind != RaceEventKind::Overtake {
                continue;
            }
            if frame < event.frame || frame > event.frame + FRESH_ACTION_WINDOW_FRAMES {
                continue;
            }

            let since = frame - event.frame;
            let base = if since <= 300 {
                15.0
            } else if since <= 600 {
                10.0
            } else if since <= 900 {
                6.0
            } else {
                3.0
            };
            let bonus = base * scale;

            if let Some(score) = scores.get_mut(&event.car_number) {
                score.fresh_action_bonus = score.fresh_action_bonus.max(bonus);
            }
            if let Some(other) = event.other_car_number {
                if let Some(score) = scores.get_mut(&other) {
                    score.fresh_action_bonus =
                        score.fresh_action_bonus.max(bonus * SECONDARY_FRESH_SHARE);
                }
            }
        }
    }

    /// Decaying penalty for recently shown cars, damped by action level but
    /// floored so variety pressure never fully disappears.
    fn apply_variety_penalty(&self, scores: &mut HashMap<i32, DriverScore>) {
        let penalty_scale = self.config.variety_penalty / VARIETY_PENALTY_BASELINE;
        let max_dampening = self.config.variety_dampening_pct / 100.0;

        for (rank, &car_number) in self.history.recent().iter().enumerate() {
            let Some(score) = scores.get_mut(&car_number) else {
                continue;
            };
            let dampener =
                (1.0 - score.action_level * max_dampening).max(VARIETY_DAMPENING_FLOOR);
            score.total -= VARIETY_RANK_PENALTIES[rank] * penalty_scale * dampener;
        }
    }

    /// Cars shown beyond their fair share of selections lose points.
    fn apply_overexposure_penalty(
        &self,
        scores: &mut HashMap<i32, DriverScore>,
        active_count: usize,
    ) {
        if self.history.total_selections() < 3 || active_count == 0 {
            return;
        }

        let fair_share = self.history.total_selections() as f32 / active_count as f32;
        for (car_number, count) in self.history.counts() {
            let Some(score) = scores.get_mut(&car_number) else {
                continue;
            };
            let excess = (count as f32 - fair_share) as i32;
            if excess > 0 {
                score.total -= (excess as f32 * 10.0).min(40.0);
            }
        }
    }

    /// Every 5th selection, boost midfield and backmarker cars that have
    /// barely been shown.
    fn apply_field_diversity_bonus(&self, scores: &mut HashMap<i32, DriverScore>) {
        let total = self.history.total_selections();
        if total == 0 || total % 5 != 0 {
            return;
        }

        for (&car_number, score) in scores.iter_mut() {
            if score.position > 10 && self.history.selection_count(car_number) <= 1 {
                score.total += if score.position > 15 { 25.0 } else { 20.0 };
            }
        }
    }

    fn apply_focus_driver_bonus(&self, scores: &mut HashMap<i32, DriverScore>) {
        if self.config.focus_driver_number <= 0 || self.config.focus_driver_bonus <= 0.0 {
            return;
        }
        if let Some(score) = scores.get_mut(&self.config.focus_driver_number) {
            score.total += self.config.focus_driver_bonus;
        }
    }

    /// Rank descending; every car within `max(5, 5% of top)` of the top is a
    /// tie candidate, chosen uniformly at random.
    fn pick_with_tie_breaking(&mut self, scores: &HashMap<i32, DriverScore>) -> Option<i32> {
        let mut ranked: Vec<(i32, f32)> = scores
            .iter()
            .map(|(&car_number, score)| (car_number, score.total))
            .collect();
        ranked.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        let &(top_car, top_score) = ranked.first()?;
        let threshold = (top_score.abs() * 0.05).max(5.0);

        let tied: Vec<i32> = ranked
            .iter()
            .take_while(|&&(_, score)| top_score - score <= threshold)
            .map(|&(car_number, _)| car_number)
            .collect();

        if tied.len() > 1 {
            Some(tied[self.rng.random_range(0..tied.len())])
        } else {
            Some(top_car)
        }
    }

    /// Last-resort choice when no scoring was possible: the best-placed car
    /// not shown recently, else the backmarker, else any non-pace car.
    fn fallback(&mut self, snapshot: &TelemetrySnapshot) -> Option<i32> {
        let mut ordered: Vec<&DriverSnapshot> = snapshot
            .drivers
            .iter()
            .filter(|d| d.is_in_world() && d.car_number != 0 && d.has_valid_position())
            .collect();
        ordered.sort_by_key(|d| d.position);

        if let Some(driver) = ordered
            .iter()
            .find(|d| !self.history.is_recent(d.car_number))
        {
            self.history.record_selection(driver.car_number);
            return Some(driver.car_number);
        }

        if let Some(driver) = ordered.last() {
            self.history.record_selection(driver.car_number);
            return Some(driver.car_number);
        }

        snapshot
            .drivers
            .iter()
            .find(|d| d.car_number != 0)
            .map(|d| d.car_number)
    }
}

fn position_base(position: i32) -> f32 {
    match position {
        1 => 15.0,
        2 => 12.0,
        3 => 10.0,
        4..=5 => 8.0,
        6..=10 => 5.0,
        11..=15 => 2.0,
        _ => 1.0,
    }
}

/// Pack distance: cars on different laps are never in the same pack.
fn same_lap_gap(a: &DriverSnapshot, b: &DriverSnapshot) -> f32 {
    if a.lap == b.lap {
        (a.lap_distance - b.lap_distance).abs()
    } else {
        1.0
    }
}
