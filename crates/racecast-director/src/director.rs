//! The director state machine.
//!
//! Owns the last scan result and generated plan, accepts scan/generate/apply
//! operations only while idle, and publishes status and progress through a
//! watch channel so callers can observe without polling the director itself.

use std::collections::BTreeMap;

use tokio::sync::watch;
use tracing::{info, warn};

use racecast_engine::{
    run_detectors, BattleDetector, CameraSink, CutScheduler, EventDetector, ExcitementScorer,
    IncidentDetector, OvertakeDetector, PlanApplier,
};
use racecast_llm::{generate_plan_segmented, PlanProvider};
use racecast_models::{
    CameraBrief, CameraPlan, DirectorConfig, DriverBrief, RaceSummary, ScanResult,
};

use crate::error::{DirectorError, DirectorResult};
use crate::telemetry::TelemetrySource;

/// What the director is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorState {
    Idle,
    Scanning,
    GeneratingPlan,
    ApplyingPlan,
    Error,
}

impl DirectorState {
    /// Whether a new operation may start from this state.
    pub fn accepts_operations(&self) -> bool {
        matches!(self, DirectorState::Idle | DirectorState::Error)
    }
}

impl std::fmt::Display for DirectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DirectorState::Idle => "idle",
            DirectorState::Scanning => "scanning",
            DirectorState::GeneratingPlan => "generating plan",
            DirectorState::ApplyingPlan => "applying plan",
            DirectorState::Error => "error",
        };
        write!(f, "{label}")
    }
}

/// Snapshot of director state published to observers.
#[derive(Debug, Clone)]
pub struct DirectorStatus {
    pub state: DirectorState,
    pub progress_pct: u8,
    pub message: String,
}

/// Orchestrates scan, plan generation, and plan application over a recorded
/// session.
pub struct Director {
    config: DirectorConfig,
    last_scan: Option<ScanResult>,
    generated_plan: Option<CameraPlan>,
    status: watch::Sender<DirectorStatus>,
}

impl Director {
    pub fn new(config: DirectorConfig) -> Self {
        let (status, _) = watch::channel(DirectorStatus {
            state: DirectorState::Idle,
            progress_pct: 0,
            message: "Ready".to_string(),
        });

        Self {
            config,
            last_scan: None,
            generated_plan: None,
            status,
        }
    }

    /// Observe status changes without holding a reference to the director.
    pub fn subscribe_status(&self) -> watch::Receiver<DirectorStatus> {
        self.status.subscribe()
    }

    pub fn status(&self) -> DirectorStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> DirectorState {
        self.status.borrow().state
    }

    pub fn config(&self) -> &DirectorConfig {
        &self.config
    }

    /// Replace the configuration. Rejected while an operation is running.
    pub fn set_config(&mut self, config: DirectorConfig) -> DirectorResult<()> {
        self.ensure_accepting()?;
        self.config = config;
        Ok(())
    }

    pub fn last_scan(&self) -> Option<&ScanResult> {
        self.last_scan.as_ref()
    }

    pub fn generated_plan(&self) -> Option<&CameraPlan> {
        self.generated_plan.as_ref()
    }

    /// Drop scan and plan results and return to the ready state.
    pub fn clear_results(&mut self) {
        self.last_scan = None;
        self.generated_plan = None;
        self.set_status(DirectorState::Idle, 0, "Ready");
    }

    /// Scan `[start_frame, end_frame]` of the recording, sampling every
    /// `scan_interval_frames`, then run the enabled detectors.
    ///
    /// Returns `Ok(None)` when cancelled; the director goes back to idle and
    /// no partial result is retained. Frames that fail to capture are
    /// skipped. The source is returned to its original position afterwards.
    pub async fn scan(
        &mut self,
        source: &mut dyn TelemetrySource,
        start_frame: i64,
        end_frame: i64,
        cancel: &watch::Receiver<bool>,
    ) -> DirectorResult<Option<ScanResult>> {
        self.ensure_accepting()?;
        self.set_status(DirectorState::Scanning, 0, "Scanning replay...");

        let final_frame = source.final_frame();
        let end_frame = if final_frame > 0 {
            end_frame.min(final_frame)
        } else {
            end_frame
        };

        let total_frames = end_frame - start_frame;
        if total_frames <= 0 {
            self.set_status(DirectorState::Error, 0, "Invalid frame range");
            return Err(DirectorError::InvalidRange {
                start: start_frame,
                end: end_frame,
            });
        }

        let metadata = source.session_metadata();
        let original_frame = source.current_frame();

        let mut snapshots = Vec::new();
        let mut frame = start_frame;
        while frame <= end_frame {
            if *cancel.borrow() {
                source.seek(original_frame).await;
                self.set_status(DirectorState::Idle, 0, "Scan cancelled");
                info!("scan cancelled, returning to idle");
                return Ok(None);
            }

            source.seek(frame).await;
            match source.capture(frame).await {
                Some(snapshot) => snapshots.push(snapshot),
                None => warn!(frame, "snapshot capture failed, skipping frame"),
            }

            let processed = frame - start_frame;
            let progress = ((processed * 100) / total_frames).min(100) as u8;
            self.set_status(
                DirectorState::Scanning,
                progress,
                format!("Scanning: {progress}% ({frame}/{end_frame})"),
            );

            frame += self.config.scan_interval_frames.max(1);
        }

        source.seek(original_frame).await;

        self.set_status(DirectorState::Scanning, 100, "Analyzing events...");
        let detectors = self.build_detectors();
        let events = run_detectors(&detectors, &snapshots);

        let result = ScanResult {
            start_frame,
            end_frame,
            track_name: metadata.track_name,
            session_type: metadata.session_type,
            snapshots,
            events,
            duration_seconds: total_frames as f64 / self.config.frame_rate.max(1) as f64,
        };

        info!(
            events = result.events.len(),
            snapshots = result.snapshots.len(),
            "scan complete"
        );
        self.set_status(
            DirectorState::Idle,
            100,
            format!("Scan complete: {} events detected", result.events.len()),
        );
        self.last_scan = Some(result.clone());

        Ok(Some(result))
    }

    /// Build the provider-facing summary of the last scan.
    pub fn build_summary(&self, cameras: &[CameraBrief]) -> DirectorResult<RaceSummary> {
        let scan = self.last_scan.as_ref().ok_or(DirectorError::NoScanResult)?;
        Ok(self.summarize(scan, cameras))
    }

    /// Generate a camera plan for the last scan: the local event-driven
    /// scheduler by default, or the remote provider when configured.
    pub async fn generate_plan(
        &mut self,
        cameras: &[CameraBrief],
        provider: Option<&dyn PlanProvider>,
        cancel: &watch::Receiver<bool>,
    ) -> DirectorResult<CameraPlan> {
        self.ensure_accepting()?;

        let built: DirectorResult<CameraPlan> = match self.last_scan.as_ref() {
            None => {
                self.set_status(DirectorState::Error, 0, "No scan result to plan from");
                return Err(DirectorError::NoScanResult);
            }
            Some(scan) => {
                self.set_status(DirectorState::GeneratingPlan, 0, "Generating camera plan...");
                if self.config.use_remote_planner {
                    match provider {
                        Some(provider) if provider.is_configured() => {
                            let summary = self.summarize(scan, cameras);
                            generate_plan_segmented(provider, &summary, cancel)
                                .await
                                .map_err(DirectorError::from)
                        }
                        Some(provider) => Err(DirectorError::ProviderNotConfigured(
                            provider.name().to_string(),
                        )),
                        None => Err(DirectorError::ProviderNotConfigured("remote".to_string())),
                    }
                } else {
                    let camera_names: Vec<String> =
                        cameras.iter().map(|c| c.name.clone()).collect();
                    let mut scheduler = CutScheduler::new(self.config.clone());
                    Ok(scheduler.build_plan(scan, &camera_names))
                }
            }
        };

        match built {
            Ok(plan) => {
                self.set_status(
                    DirectorState::Idle,
                    100,
                    format!("Plan generated: {} camera actions", plan.actions.len()),
                );
                self.generated_plan = Some(plan.clone());
                Ok(plan)
            }
            Err(error) => {
                self.set_status(
                    DirectorState::Error,
                    0,
                    format!("Plan generation error: {error}"),
                );
                Err(error)
            }
        }
    }

    /// Apply the generated plan: resolve each action's car and camera and
    /// emit camera changes to the sink. Returns the number of actions
    /// emitted.
    pub fn apply_plan(
        &mut self,
        cameras: &[CameraBrief],
        sink: &mut dyn CameraSink,
        clear_existing: bool,
    ) -> DirectorResult<usize> {
        self.ensure_accepting()?;
        let Some(scan) = self.last_scan.as_ref() else {
            self.set_status(DirectorState::Error, 0, "No scan result to apply against");
            return Err(DirectorError::NoScanResult);
        };
        let Some(plan) = self.generated_plan.as_ref() else {
            self.set_status(DirectorState::Error, 0, "No generated plan to apply");
            return Err(DirectorError::NoPlan);
        };

        self.set_status(DirectorState::ApplyingPlan, 0, "Applying camera plan...");

        let applier = PlanApplier::new(&self.config, cameras);
        let mut scorer = ExcitementScorer::new(self.config.clone());
        let emitted = applier.apply(plan, scan, &mut scorer, sink, clear_existing);

        self.set_status(
            DirectorState::Idle,
            100,
            format!("Applied {emitted} camera actions"),
        );
        Ok(emitted)
    }

    fn summarize(&self, scan: &ScanResult, cameras: &[CameraBrief]) -> RaceSummary {
        // First and last valid sighting per car across the scan
        let mut briefs: BTreeMap<i32, DriverBrief> = BTreeMap::new();
        for snapshot in &scan.snapshots {
            for driver in &snapshot.drivers {
                if driver.car_number == 0 || !driver.has_valid_position() || !driver.is_in_world() {
                    continue;
                }
                briefs
                    .entry(driver.car_number)
                    .and_modify(|brief| brief.end_position = driver.position)
                    .or_insert_with(|| DriverBrief {
                        car_number: driver.car_number,
                        display_name: driver.display_name.clone(),
                        start_position: driver.position,
                        end_position: driver.position,
                    });
            }
        }

        RaceSummary {
            track_name: scan.track_name.clone(),
            session_type: scan.session_type.clone(),
            start_frame: scan.start_frame,
            end_frame: scan.end_frame,
            frame_rate: self.config.frame_rate,
            duration_minutes: scan.duration_seconds / 60.0,
            drivers: briefs.into_values().collect(),
            cameras: cameras
                .iter()
                .filter(|c| !self.config.is_camera_excluded(&c.name))
                .cloned()
                .collect(),
            events: scan.events.clone(),
        }
    }

    fn build_detectors(&self) -> Vec<Box<dyn EventDetector>> {
        let mut detectors: Vec<Box<dyn EventDetector>> = Vec::new();
        if self.config.detect_incidents {
            detectors.push(Box::new(IncidentDetector));
        }
        if self.config.detect_overtakes {
            detectors.push(Box::new(OvertakeDetector));
        }
        if self.config.detect_battles {
            detectors.push(Box::new(BattleDetector::new(self.config.battle_gap_threshold)));
        }
        detectors
    }

    fn ensure_accepting(&self) -> DirectorResult<()> {
        let state = self.state();
        if state.accepts_operations() {
            Ok(())
        } else {
            Err(DirectorError::Busy(state))
        }
    }

    fn set_status(&self, state: DirectorState, progress_pct: u8, message: impl Into<String>) {
        self.status.send_replace(DirectorStatus {
            state,
            progress_pct,
            message: message.into(),
        });
    }
}
