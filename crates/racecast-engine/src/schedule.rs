//! Local event-driven cut scheduling.
//!
//! Turns the detected event list into a time-spaced sequence of camera
//! switches: an opening establishing shot, anticipatory cuts ahead of
//! significant events, and filler coverage wherever the plan would otherwise
//! go stale. Actions never embed a driver; driver selection is deferred to
//! the excitement scorer at apply time.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use racecast_models::{CameraAction, CameraPlan, DirectorConfig, RaceEventKind, ScanResult};

/// Wide angles that show the whole scene.
const INCIDENT_CAMERAS: [&str; 7] = ["TV1", "TV2", "TV3", "Chopper", "Blimp", "Chase", "Far Chase"];

/// Chase angles that follow the action.
const OVERTAKE_CAMERAS: [&str; 6] = ["Chase", "Far Chase", "TV1", "TV2", "Rear Chase", "Cockpit"];

/// Mix of chase and TV angles.
const BATTLE_CAMERAS: [&str; 6] = ["Chase", "TV1", "TV2", "Far Chase", "Nose", "Cockpit"];

/// Wide establishing shots for the opening cut.
const OPENING_CAMERAS: [&str; 5] = ["Chopper", "Blimp", "TV1", "TV2", "TV3"];

/// Varied angles for gap-filling field coverage.
const FILLER_CAMERAS: [&str; 6] = ["TV1", "TV2", "Chase", "Far Chase", "Cockpit", "Chopper"];

const DEFAULT_CAMERAS: [&str; 4] = ["TV1", "Chase", "TV2", "Cockpit"];

/// Battles below this importance do not earn their own cut.
const BATTLE_CUT_MIN_IMPORTANCE: u8 = 6;

/// Incidents at or above this importance may displace the minimum spacing.
const INCIDENT_PRIORITY_IMPORTANCE: u8 = 8;

struct ScheduledCut {
    frame: i64,
    camera: String,
    reason: String,
}

/// Builds the local event-driven camera plan for a scanned range.
pub struct CutScheduler {
    config: DirectorConfig,
    rng: StdRng,
}

impl CutScheduler {
    pub fn new(config: DirectorConfig) -> Self {
        Self {
            config,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Scheduler with a fixed camera-fallback seed, for deterministic tests.
    pub fn with_seed(config: DirectorConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Build a time-spaced camera plan from the scan's detected events.
    ///
    /// `cameras` is the session's full camera group name list; exclusions
    /// from the configuration are applied here.
    pub fn build_plan(&mut self, scan: &ScanResult, cameras: &[String]) -> CameraPlan {
        let mut plan = CameraPlan::new("event-driven", scan.total_frames());

        let mut available: Vec<&str> = cameras
            .iter()
            .map(String::as_str)
            .filter(|name| !self.config.is_camera_excluded(name))
            .collect();
        if available.is_empty() {
            // Everything excluded: better to break the exclusion list than
            // to emit an empty plan.
            available = cameras.iter().map(String::as_str).collect();
        }
        if available.is_empty() {
            return plan;
        }

        let min_spacing = self.config.min_frames_between_cuts();
        let max_spacing = self.config.max_frames_between_cuts();
        let anticipation = self.config.anticipation_frames();

        let mut significant: Vec<_> = scan
            .events
            .iter()
            .filter(|e| match e.kind {
                RaceEventKind::Incident | RaceEventKind::Overtake => true,
                RaceEventKind::Battle => e.importance >= BATTLE_CUT_MIN_IMPORTANCE,
                _ => false,
            })
            .collect();
        significant.sort_by_key(|e| e.frame);

        let mut cuts: Vec<ScheduledCut> = Vec::new();

        let opening = self.pick_camera(&OPENING_CAMERAS, &available, None);
        let mut last_camera = opening.clone();
        let mut last_cut_frame = scan.start_frame;
        cuts.push(ScheduledCut {
            frame: scan.start_frame,
            camera: opening,
            reason: "Opening shot".to_string(),
        });

        for event in significant {
            // Switch before the event happens
            let mut cut_frame = (event.frame - anticipation).max(scan.start_frame);
            if cut_frame >= scan.end_frame {
                continue;
            }

            if cut_frame - last_cut_frame < min_spacing {
                // Too close to the previous cut; only a serious incident is
                // worth squeezing in late.
                let priority_incident = event.kind == RaceEventKind::Incident
                    && event.importance >= INCIDENT_PRIORITY_IMPORTANCE;
                if !priority_incident {
                    continue;
                }
                cut_frame = last_cut_frame + min_spacing;
                if cut_frame >= event.end_frame() {
                    continue;
                }
            }

            let preferences: &[&str] = match event.kind {
                RaceEventKind::Incident => &INCIDENT_CAMERAS,
                RaceEventKind::Overtake => &OVERTAKE_CAMERAS,
                RaceEventKind::Battle => &BATTLE_CAMERAS,
                _ => &DEFAULT_CAMERAS,
            };
            let camera = self.pick_camera(preferences, &available, Some(last_camera.as_str()));

            cuts.push(ScheduledCut {
                frame: cut_frame,
                camera: camera.clone(),
                reason: event.description.clone(),
            });
            last_cut_frame = cut_frame;
            last_camera = camera;
        }

        self.fill_gaps(
            &mut cuts,
            scan.start_frame,
            scan.end_frame,
            max_spacing,
            min_spacing,
            &available,
        );

        cuts.sort_by_key(|c| c.frame);
        debug!(cut_count = cuts.len(), "built event-driven camera plan");

        plan.actions = cuts
            .into_iter()
            .map(|cut| CameraAction {
                frame: cut.frame,
                camera: cut.camera,
                car_number: None,
                reason: cut.reason,
            })
            .collect();
        plan
    }

    /// Insert field-coverage cuts wherever the gap to the next cut exceeds
    /// the maximum spacing, and fill the trailing gap to the end frame.
    fn fill_gaps(
        &mut self,
        cuts: &mut Vec<ScheduledCut>,
        start_frame: i64,
        end_frame: i64,
        max_spacing: i64,
        min_spacing: i64,
        available: &[&str],
    ) {
        let mut sorted: Vec<(i64, String)> = cuts.iter().map(|c| (c.frame, c.camera.clone())).collect();
        sorted.sort_by_key(|&(frame, _)| frame);

        let mut fillers: Vec<ScheduledCut> = Vec::new();
        let mut previous_frame = start_frame;
        let mut last_camera = sorted.first().map(|(_, camera)| camera.clone());

        for (frame, camera) in &sorted {
            let mut gap = frame - previous_frame;
            while gap > max_spacing {
                let filler_frame = previous_frame + max_spacing;
                if filler_frame >= frame - min_spacing {
                    break; // too close to the next scheduled cut
                }
                let filler_camera =
                    self.pick_camera(&FILLER_CAMERAS, available, last_camera.as_deref());
                fillers.push(ScheduledCut {
                    frame: filler_frame,
                    camera: filler_camera.clone(),
                    reason: "Field coverage".to_string(),
                });
                last_camera = Some(filler_camera);
                previous_frame = filler_frame;
                gap = frame - previous_frame;
            }
            previous_frame = *frame;
            last_camera = Some(camera.clone());
        }

        let mut last_frame = sorted.last().map_or(start_frame, |&(frame, _)| frame);
        while end_frame - last_frame > max_spacing {
            let filler_frame = last_frame + max_spacing;
            if filler_frame >= end_frame {
                break;
            }
            let filler_camera =
                self.pick_camera(&FILLER_CAMERAS, available, last_camera.as_deref());
            fillers.push(ScheduledCut {
                frame: filler_frame,
                camera: filler_camera.clone(),
                reason: "Field coverage".to_string(),
            });
            last_camera = Some(filler_camera);
            last_frame = filler_frame;
        }

        cuts.extend(fillers);
    }

    /// First preferred camera that is available and not an immediate repeat;
    /// otherwise a random non-repeat, otherwise any available camera.
    fn pick_camera(
        &mut self,
        preferences: &[&str],
        available: &[&str],
        last_camera: Option<&str>,
    ) -> String {
        for preference in preferences {
            let preference = preference.to_ascii_lowercase();
            let matched = available.iter().find(|&&name| {
                name.to_ascii_lowercase().contains(&preference) && Some(name) != last_camera
            });
            if let Some(&name) = matched {
                return name.to_string();
            }
        }

        let different: Vec<&str> = available
            .iter()
            .copied()
            .filter(|&name| Some(name) != last_camera)
            .collect();
        if !different.is_empty() {
            return different[self.rng.random_range(0..different.len())].to_string();
        }

        available[self.rng.random_range(0..available.len())].to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racecast_models::RaceEvent;

    fn camera_names() -> Vec<String> {
        ["TV1", "TV2", "Chase", "Far Chase", "Cockpit", "Chopper"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    fn empty_scan(start_frame: i64, end_frame: i64) -> ScanResult {
        ScanResult {
            start_frame,
            end_frame,
            track_name: "Test".to_string(),
            session_type: "Race".to_string(),
            snapshots: Vec::new(),
            events: Vec::new(),
            duration_seconds: (end_frame - start_frame) as f64 / 60.0,
        }
    }

    fn incident(frame: i64, importance: u8) -> RaceEvent {
        RaceEvent {
            frame,
            session_time: 0.0,
            kind: RaceEventKind::Incident,
            car_number: 7,
            car_name: "Car 7".to_string(),
            other_car_number: None,
            other_car_name: None,
            position: Some(2),
            lap_distance: None,
            description: "#7 Car 7 went off track".to_string(),
            importance,
            duration_frames: 180,
        }
    }

    fn battle(frame: i64, importance: u8) -> RaceEvent {
        RaceEvent {
            frame,
            session_time: 0.0,
            kind: RaceEventKind::Battle,
            car_number: 7,
            car_name: "Car 7".to_string(),
            other_car_number: Some(12),
            other_car_name: Some("Car 12".to_string()),
            position: Some(8),
            lap_distance: None,
            description: "Battle for P8: #7 vs #12".to_string(),
            importance,
            duration_frames: 600,
        }
    }

    #[test]
    fn test_quiet_scan_gets_opening_plus_evenly_spaced_fillers() {
        let config = DirectorConfig::default();
        let min_spacing = config.min_frames_between_cuts();
        let max_spacing = config.max_frames_between_cuts();

        let mut scheduler = CutScheduler::with_seed(config, 7);
        let plan = scheduler.build_plan(&empty_scan(0, 6000), &camera_names());

        assert!(plan.actions.len() > 1);
        assert_eq!(plan.actions[0].frame, 0, "opening cut at the start frame");
        assert_eq!(plan.actions[0].reason, "Opening shot");
        for filler in &plan.actions[1..] {
            assert_eq!(filler.reason, "Field coverage");
        }

        for pair in plan.actions.windows(2) {
            let gap = pair[1].frame - pair[0].frame;
            assert!(gap <= max_spacing, "gap {gap} exceeds maximum spacing");
            assert!(gap >= min_spacing, "gap {gap} under minimum spacing");
        }
    }

    #[test]
    fn test_actions_never_embed_a_driver() {
        let mut scan = empty_scan(0, 10_000);
        scan.events.push(incident(5000, 10));

        let mut scheduler = CutScheduler::with_seed(DirectorConfig::default(), 7);
        let plan = scheduler.build_plan(&scan, &camera_names());

        assert!(plan.actions.iter().all(|a| a.car_number.is_none()));
    }

    #[test]
    fn test_event_cut_anticipates_the_event() {
        let mut scan = empty_scan(0, 10_000);
        scan.events.push(incident(5000, 10));

        let config = DirectorConfig::default();
        let anticipation = config.anticipation_frames();
        let mut scheduler = CutScheduler::with_seed(config, 7);
        let plan = scheduler.build_plan(&scan, &camera_names());

        assert!(
            plan.actions.iter().any(|a| a.frame == 5000 - anticipation),
            "an incident earns a cut ahead of its frame"
        );
    }

    #[test]
    fn test_low_importance_battle_is_not_cut() {
        let mut scan = empty_scan(0, 3000);
        scan.events.push(battle(1500, 5));

        let mut scheduler = CutScheduler::with_seed(DirectorConfig::default(), 7);
        let plan = scheduler.build_plan(&scan, &camera_names());

        assert!(plan.actions.iter().all(|a| !a.reason.contains("Battle")));
    }

    #[test]
    fn test_priority_incident_pulled_forward_at_min_spacing() {
        let config = DirectorConfig::default();
        let min_spacing = config.min_frames_between_cuts();

        // High-importance incident right after the opening cut: it cannot
        // anticipate, so it lands exactly at the minimum spacing.
        let mut scan = empty_scan(0, 10_000);
        scan.events.push(incident(min_spacing / 2, 10));

        let mut scheduler = CutScheduler::with_seed(config, 7);
        let plan = scheduler.build_plan(&scan, &camera_names());

        assert!(plan
            .actions
            .iter()
            .any(|a| a.frame == min_spacing && a.reason.contains("went off track")));
    }

    #[test]
    fn test_excluded_cameras_are_never_picked() {
        let config = DirectorConfig {
            excluded_cameras: vec!["Cockpit".to_string(), "Chopper".to_string()],
            ..Default::default()
        };
        let mut scheduler = CutScheduler::with_seed(config, 7);
        let plan = scheduler.build_plan(&empty_scan(0, 20_000), &camera_names());

        for action in &plan.actions {
            assert_ne!(action.camera, "Cockpit");
            assert_ne!(action.camera, "Chopper");
        }
    }

    #[test]
    fn test_no_cameras_yields_empty_plan() {
        let mut scheduler = CutScheduler::with_seed(DirectorConfig::default(), 7);
        let plan = scheduler.build_plan(&empty_scan(0, 6000), &[]);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_is_frame_sorted() {
        let mut scan = empty_scan(0, 30_000);
        scan.events.push(incident(25_000, 10));
        scan.events.push(incident(5_000, 10));
        scan.events.push(battle(14_000, 8));

        let mut scheduler = CutScheduler::with_seed(DirectorConfig::default(), 7);
        let plan = scheduler.build_plan(&scan, &camera_names());

        assert!(plan.actions.windows(2).all(|w| w[0].frame <= w[1].frame));
    }
}
