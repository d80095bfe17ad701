//! Segmented plan generation for long sessions.
//!
//! Long replays are split into sequential segments, each requested on its
//! own with a little surrounding event context. Segments are paced to
//! respect provider rate limits; a failed segment is skipped unless it is
//! the first and nothing has been produced yet.

use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use racecast_models::{CameraPlan, RaceSummary};

use crate::error::LlmResult;
use crate::provider::PlanProvider;

/// Longest span requested in one call: 10 minutes at 60 fps.
pub const MAX_SEGMENT_FRAMES: i64 = 36_000;

/// Frames of surrounding events included for context (10 s).
const SEGMENT_EVENT_BUFFER_FRAMES: i64 = 600;

/// Pacing delay between segment requests.
const INTER_SEGMENT_DELAY: Duration = Duration::from_millis(500);

/// Generate a plan for `summary`, splitting into segments when it exceeds
/// [`MAX_SEGMENT_FRAMES`]. Cancellation is honored between segments and
/// returns whatever has been stitched so far.
pub async fn generate_plan_segmented(
    provider: &dyn PlanProvider,
    summary: &RaceSummary,
    cancel: &watch::Receiver<bool>,
) -> LlmResult<CameraPlan> {
    let total_frames = summary.total_frames();
    if total_frames <= MAX_SEGMENT_FRAMES {
        return provider.generate_plan(summary).await;
    }

    let segment_count = (total_frames + MAX_SEGMENT_FRAMES - 1) / MAX_SEGMENT_FRAMES;
    info!(segment_count, total_frames, "generating camera plan in segments");

    let mut combined = CameraPlan::new(
        format!("{} ({})", provider.name(), provider.model()),
        total_frames,
    );

    for index in 0..segment_count {
        if *cancel.borrow() {
            warn!(segment = index + 1, "plan generation cancelled between segments");
            break;
        }

        let segment_start = summary.start_frame + index * MAX_SEGMENT_FRAMES;
        let segment_end = (segment_start + MAX_SEGMENT_FRAMES).min(summary.end_frame);
        let segment = segment_summary(summary, segment_start, segment_end);

        match provider.generate_plan(&segment).await {
            Ok(plan) => {
                combined.actions.extend(
                    plan.actions
                        .into_iter()
                        .filter(|a| a.frame >= segment_start && a.frame <= segment_end),
                );
            }
            Err(error) => {
                warn!(
                    segment = index + 1,
                    segment_count, %error,
                    "segment generation failed"
                );
                // Nothing to show and the very first segment failed: give up
                if index == 0 && combined.actions.is_empty() {
                    return Err(error);
                }
            }
        }

        if index < segment_count - 1 {
            tokio::time::sleep(INTER_SEGMENT_DELAY).await;
        }
    }

    combined.sort_by_frame();
    Ok(combined)
}

/// Slice of the full summary covering one segment, with events kept from a
/// buffered window around it so the model sees what leads in and out.
fn segment_summary(full: &RaceSummary, segment_start: i64, segment_end: i64) -> RaceSummary {
    let segment_frames = segment_end - segment_start;
    let duration_minutes = segment_frames as f64 / full.frame_rate.max(1) as f64 / 60.0;

    RaceSummary {
        track_name: full.track_name.clone(),
        session_type: full.session_type.clone(),
        start_frame: segment_start,
        end_frame: segment_end,
        frame_rate: full.frame_rate,
        duration_minutes,
        drivers: full.drivers.clone(),
        cameras: full.cameras.clone(),
        events: full
            .events
            .iter()
            .filter(|e| {
                e.frame >= segment_start - SEGMENT_EVENT_BUFFER_FRAMES
                    && e.frame <= segment_end + SEGMENT_EVENT_BUFFER_FRAMES
            })
            .cloned()
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    use racecast_models::{CameraAction, RaceEvent, RaceEventKind};

    use crate::error::LlmError;

    fn summary(total_frames: i64) -> RaceSummary {
        RaceSummary {
            track_name: "Test".to_string(),
            session_type: "Race".to_string(),
            start_frame: 0,
            end_frame: total_frames,
            frame_rate: 60,
            duration_minutes: total_frames as f64 / 3600.0,
            drivers: Vec::new(),
            cameras: Vec::new(),
            events: vec![RaceEvent {
                frame: 40_000,
                session_time: 0.0,
                kind: RaceEventKind::Overtake,
                car_number: 7,
                car_name: "Car 7".to_string(),
                other_car_number: None,
                other_car_name: None,
                position: Some(3),
                lap_distance: None,
                description: "pass".to_string(),
                importance: 8,
                duration_frames: 300,
            }],
        }
    }

    /// Scripted provider: one canned result per expected request.
    struct ScriptedProvider {
        responses: Mutex<Vec<LlmResult<CameraPlan>>>,
        requests: Mutex<Vec<(i64, i64)>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<LlmResult<CameraPlan>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<(i64, i64)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlanProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "Scripted"
        }

        fn model(&self) -> &str {
            "canned"
        }

        fn is_configured(&self) -> bool {
            true
        }

        fn last_error(&self) -> Option<String> {
            None
        }

        async fn generate_plan(&self, summary: &RaceSummary) -> LlmResult<CameraPlan> {
            self.requests
                .lock()
                .unwrap()
                .push((summary.start_frame, summary.end_frame));
            self.responses.lock().unwrap().remove(0)
        }

        async fn test_connection(&self) -> bool {
            true
        }
    }

    fn plan_with_frames(frames: &[i64]) -> CameraPlan {
        let mut plan = CameraPlan::new("canned", 0);
        plan.actions = frames
            .iter()
            .map(|&frame| CameraAction {
                frame,
                camera: "TV1".to_string(),
                car_number: None,
                reason: String::new(),
            })
            .collect();
        plan
    }

    fn idle_cancel() -> watch::Receiver<bool> {
        let (_sender, receiver) = watch::channel(false);
        receiver
    }

    #[test]
    fn test_segment_summary_bounds_and_event_buffer() {
        let full = summary(80_000);

        let first = segment_summary(&full, 0, 36_000);
        assert_eq!(first.total_frames(), 36_000);
        assert!((first.duration_minutes - 10.0).abs() < 0.01);
        assert!(first.events.is_empty(), "event at 40000 is out of buffer range");

        let second = segment_summary(&full, 36_000, 72_000);
        assert_eq!(second.events.len(), 1);

        // Event sits within the trailing buffer of a segment ending at 39600
        let buffered = segment_summary(&full, 3_600, 39_600);
        assert_eq!(buffered.events.len(), 1);
    }

    #[tokio::test]
    async fn test_short_summary_is_one_request() {
        let provider = ScriptedProvider::new(vec![Ok(plan_with_frames(&[0, 1200]))]);
        let plan = generate_plan_segmented(&provider, &summary(30_000), &idle_cancel())
            .await
            .unwrap();

        assert_eq!(plan.actions.len(), 2);
        assert_eq!(provider.requests(), vec![(0, 30_000)]);
    }

    #[tokio::test]
    async fn test_long_summary_is_split_and_stitched() {
        // 80k frames -> three segments; an out-of-bounds action is dropped
        let provider = ScriptedProvider::new(vec![
            Ok(plan_with_frames(&[0, 50_000])),
            Ok(plan_with_frames(&[40_000])),
            Ok(plan_with_frames(&[75_000])),
        ]);

        let plan = generate_plan_segmented(&provider, &summary(80_000), &idle_cancel())
            .await
            .unwrap();

        assert_eq!(
            provider.requests(),
            vec![(0, 36_000), (36_000, 72_000), (72_000, 80_000)]
        );
        let frames: Vec<i64> = plan.actions.iter().map(|a| a.frame).collect();
        assert_eq!(frames, vec![0, 40_000, 75_000], "sorted, in-bounds actions only");
    }

    #[tokio::test]
    async fn test_later_segment_failure_is_tolerated() {
        let provider = ScriptedProvider::new(vec![
            Ok(plan_with_frames(&[100])),
            Err(LlmError::Parse("garbage".to_string())),
            Ok(plan_with_frames(&[75_000])),
        ]);

        let plan = generate_plan_segmented(&provider, &summary(80_000), &idle_cancel())
            .await
            .unwrap();

        let frames: Vec<i64> = plan.actions.iter().map(|a| a.frame).collect();
        assert_eq!(frames, vec![100, 75_000]);
    }

    #[tokio::test]
    async fn test_first_segment_failure_propagates() {
        let provider = ScriptedProvider::new(vec![
            Err(LlmError::Parse("garbage".to_string())),
            Ok(plan_with_frames(&[40_000])),
            Ok(plan_with_frames(&[75_000])),
        ]);

        let result = generate_plan_segmented(&provider, &summary(80_000), &idle_cancel()).await;
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }

    #[tokio::test]
    async fn test_cancellation_between_segments() {
        let (sender, receiver) = watch::channel(true);
        let provider = ScriptedProvider::new(vec![Ok(plan_with_frames(&[0]))]);

        let plan = generate_plan_segmented(&provider, &summary(80_000), &receiver)
            .await
            .unwrap();

        assert!(plan.is_empty(), "cancelled before the first segment");
        assert!(provider.requests().is_empty());
        drop(sender);
    }
}
