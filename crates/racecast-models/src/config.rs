//! Director configuration.
//!
//! A flat set of named weights and thresholds that parameterize every
//! scoring and scheduling decision. Mutated only between plan generations,
//! read-only during a single scan/plan/apply pass.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Baseline the battle weight is scaled against.
pub const BATTLE_WEIGHT_BASELINE: f32 = 35.0;
/// Baseline the momentum weight is scaled against.
pub const MOMENTUM_WEIGHT_BASELINE: f32 = 25.0;
/// Baseline the pack weight is scaled against.
pub const PACK_WEIGHT_BASELINE: f32 = 15.0;
/// Baseline the fresh-action weight is scaled against.
pub const FRESH_ACTION_WEIGHT_BASELINE: f32 = 15.0;
/// Baseline the position weight is scaled against.
pub const POSITION_WEIGHT_BASELINE: f32 = 15.0;
/// Baseline the variety penalty is scaled against.
pub const VARIETY_PENALTY_BASELINE: f32 = 60.0;

/// All tunable knobs for scanning, scoring, and scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DirectorConfig {
    // Event detection
    pub detect_incidents: bool,
    pub detect_overtakes: bool,
    pub detect_battles: bool,
    /// Lap-distance fraction below which two cars count as battling
    pub battle_gap_threshold: f32,

    // Scan
    /// Frames between sampled snapshots
    pub scan_interval_frames: i64,
    /// Replay frames per second
    pub frame_rate: i32,

    // Excitement scoring weights
    pub incident_weight: f32,
    pub overtake_weight: f32,
    pub battle_weight: f32,
    pub momentum_weight: f32,
    pub pack_weight: f32,
    pub fresh_action_weight: f32,
    pub position_weight: f32,

    /// Base strength of the recency penalty
    pub variety_penalty: f32,
    /// How far action can erode the variety penalty, 0-100
    pub variety_dampening_pct: f32,

    /// Car number to favor, 0 = disabled
    pub focus_driver_number: i32,
    /// Flat score bonus for the focus driver
    pub focus_driver_bonus: f32,

    // Cut scheduling
    pub min_seconds_between_cuts: i32,
    pub max_seconds_between_cuts: i32,
    /// Seconds to cut ahead of a detected event
    pub event_anticipation_seconds: i32,

    /// Camera group names never to select
    pub excluded_cameras: Vec<String>,

    /// Delegate plan generation to the remote provider instead of the
    /// local event-driven scheduler
    pub use_remote_planner: bool,
}

impl Default for DirectorConfig {
    fn default() -> Self {
        Self {
            detect_incidents: true,
            detect_overtakes: true,
            detect_battles: true,
            battle_gap_threshold: 0.02,
            scan_interval_frames: 60,
            frame_rate: 60,
            incident_weight: 40.0,
            overtake_weight: 25.0,
            battle_weight: BATTLE_WEIGHT_BASELINE,
            momentum_weight: MOMENTUM_WEIGHT_BASELINE,
            pack_weight: PACK_WEIGHT_BASELINE,
            fresh_action_weight: FRESH_ACTION_WEIGHT_BASELINE,
            position_weight: POSITION_WEIGHT_BASELINE,
            variety_penalty: VARIETY_PENALTY_BASELINE,
            variety_dampening_pct: 80.0,
            focus_driver_number: 0,
            focus_driver_bonus: 40.0,
            min_seconds_between_cuts: 5,
            max_seconds_between_cuts: 20,
            event_anticipation_seconds: 3,
            excluded_cameras: Vec::new(),
            use_remote_planner: false,
        }
    }
}

impl DirectorConfig {
    /// Create config from `RACECAST_*` environment variables, falling back
    /// to defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            detect_incidents: env_parse("RACECAST_DETECT_INCIDENTS", defaults.detect_incidents),
            detect_overtakes: env_parse("RACECAST_DETECT_OVERTAKES", defaults.detect_overtakes),
            detect_battles: env_parse("RACECAST_DETECT_BATTLES", defaults.detect_battles),
            battle_gap_threshold: env_parse(
                "RACECAST_BATTLE_GAP_THRESHOLD",
                defaults.battle_gap_threshold,
            ),
            scan_interval_frames: env_parse(
                "RACECAST_SCAN_INTERVAL_FRAMES",
                defaults.scan_interval_frames,
            ),
            frame_rate: env_parse("RACECAST_FRAME_RATE", defaults.frame_rate),
            incident_weight: env_parse("RACECAST_INCIDENT_WEIGHT", defaults.incident_weight),
            overtake_weight: env_parse("RACECAST_OVERTAKE_WEIGHT", defaults.overtake_weight),
            battle_weight: env_parse("RACECAST_BATTLE_WEIGHT", defaults.battle_weight),
            momentum_weight: env_parse("RACECAST_MOMENTUM_WEIGHT", defaults.momentum_weight),
            pack_weight: env_parse("RACECAST_PACK_WEIGHT", defaults.pack_weight),
            fresh_action_weight: env_parse(
                "RACECAST_FRESH_ACTION_WEIGHT",
                defaults.fresh_action_weight,
            ),
            position_weight: env_parse("RACECAST_POSITION_WEIGHT", defaults.position_weight),
            variety_penalty: env_parse("RACECAST_VARIETY_PENALTY", defaults.variety_penalty),
            variety_dampening_pct: env_parse(
                "RACECAST_VARIETY_DAMPENING_PCT",
                defaults.variety_dampening_pct,
            ),
            focus_driver_number: env_parse(
                "RACECAST_FOCUS_DRIVER_NUMBER",
                defaults.focus_driver_number,
            ),
            focus_driver_bonus: env_parse(
                "RACECAST_FOCUS_DRIVER_BONUS",
                defaults.focus_driver_bonus,
            ),
            min_seconds_between_cuts: env_parse(
                "RACECAST_MIN_SECONDS_BETWEEN_CUTS",
                defaults.min_seconds_between_cuts,
            ),
            max_seconds_between_cuts: env_parse(
                "RACECAST_MAX_SECONDS_BETWEEN_CUTS",
                defaults.max_seconds_between_cuts,
            ),
            event_anticipation_seconds: env_parse(
                "RACECAST_EVENT_ANTICIPATION_SECONDS",
                defaults.event_anticipation_seconds,
            ),
            excluded_cameras: std::env::var("RACECAST_EXCLUDED_CAMERAS")
                .map(|s| {
                    s.split(',')
                        .map(|c| c.trim().to_string())
                        .filter(|c| !c.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.excluded_cameras),
            use_remote_planner: env_parse(
                "RACECAST_USE_REMOTE_PLANNER",
                defaults.use_remote_planner,
            ),
        }
    }

    /// Whether a camera group name is on the exclusion list.
    pub fn is_camera_excluded(&self, name: &str) -> bool {
        self.excluded_cameras
            .iter()
            .any(|excluded| excluded.eq_ignore_ascii_case(name))
    }

    /// Minimum frames between cuts.
    pub fn min_frames_between_cuts(&self) -> i64 {
        self.min_seconds_between_cuts as i64 * self.frame_rate as i64
    }

    /// Maximum frames between cuts before filler coverage is inserted.
    pub fn max_frames_between_cuts(&self) -> i64 {
        self.max_seconds_between_cuts as i64 * self.frame_rate as i64
    }

    /// Frames to cut ahead of an event.
    pub fn anticipation_frames(&self) -> i64 {
        self.event_anticipation_seconds as i64 * self.frame_rate as i64
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
