//! Plan application: replaying a finalized plan into a camera sink.

use tracing::{debug, warn};

use racecast_models::{CameraBrief, CameraPlan, DirectorConfig, ScanResult};

use crate::score::ExcitementScorer;

/// Receiver of resolved camera-change commands.
///
/// `car_number` of `None` means "let the playback side follow the most
/// exciting car"; the applier normally resolves a concrete car first.
pub trait CameraSink {
    fn add_action(&mut self, frame: i64, car_number: Option<i32>, camera_group_id: i32);

    /// Drop any previously emitted actions.
    fn clear_all(&mut self);
}

/// Walks a finalized plan in frame order, resolving each action's car via
/// the excitement scorer and its camera against the session's availability
/// and exclusion rules.
pub struct PlanApplier<'a> {
    config: &'a DirectorConfig,
    cameras: &'a [CameraBrief],
}

impl<'a> PlanApplier<'a> {
    pub fn new(config: &'a DirectorConfig, cameras: &'a [CameraBrief]) -> Self {
        Self { config, cameras }
    }

    /// Apply `plan` against `scan`, emitting one camera change per resolvable
    /// action. Returns the number of actions emitted.
    ///
    /// Scorer history is reset and the position series rebuilt before the
    /// first action, so every apply pass starts with fresh variety state.
    pub fn apply(
        &self,
        plan: &CameraPlan,
        scan: &ScanResult,
        scorer: &mut ExcitementScorer,
        sink: &mut dyn CameraSink,
        clear_existing: bool,
    ) -> usize {
        if plan.actions.is_empty() {
            return 0;
        }

        scorer.reset(scan);

        if clear_existing {
            sink.clear_all();
        }

        let mut actions = plan.actions.clone();
        actions.sort_by_key(|a| a.frame);

        let mut emitted = 0;
        for action in &actions {
            let car_number = match self.explicit_car(action.car_number, action.frame, scan) {
                Some(explicit) => Some(explicit),
                None => scorer.select(action.frame, scan),
            };
            let Some(car_number) = car_number else {
                warn!(frame = action.frame, "no car resolvable, skipping action");
                continue;
            };

            let Some(camera) = self.resolve_camera(&action.camera) else {
                warn!(
                    frame = action.frame,
                    camera = %action.camera,
                    "no usable camera, skipping action"
                );
                continue;
            };

            sink.add_action(action.frame, Some(car_number), camera.group_id);
            emitted += 1;
        }

        debug!(emitted, "applied camera plan");
        emitted
    }

    /// A legacy embedded car number is honored only when that car is actually
    /// present at the action's frame; otherwise selection is scorer-driven.
    fn explicit_car(&self, car_number: Option<i32>, frame: i64, scan: &ScanResult) -> Option<i32> {
        let number = car_number?;
        let snapshot = scan.nearest_snapshot(frame)?;
        snapshot
            .driver(number)
            .filter(|d| d.is_in_world())
            .map(|d| d.car_number)
    }

    /// Resolve a plan camera name: exact match first, then substring, then
    /// the first non-excluded camera.
    fn resolve_camera(&self, name: &str) -> Option<&CameraBrief> {
        let usable = |camera: &&CameraBrief| !self.config.is_camera_excluded(&camera.name);

        self.cameras
            .iter()
            .filter(usable)
            .find(|c| c.name.eq_ignore_ascii_case(name))
            .or_else(|| {
                let needle = name.to_ascii_lowercase();
                self.cameras
                    .iter()
                    .filter(usable)
                    .find(|c| c.name.to_ascii_lowercase().contains(&needle))
            })
            .or_else(|| self.cameras.iter().find(usable))
    }
}
