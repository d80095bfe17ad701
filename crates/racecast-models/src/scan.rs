//! Scan result model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::event::RaceEvent;
use crate::snapshot::TelemetrySnapshot;

/// Everything produced by one scan pass over a replay range.
///
/// Owns the sampled snapshots and the merged, frame-sorted event list.
/// Replaced wholesale on re-scan.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ScanResult {
    pub start_frame: i64,
    pub end_frame: i64,

    pub track_name: String,
    pub session_type: String,

    /// Sampled snapshots, monotonic in frame number
    pub snapshots: Vec<TelemetrySnapshot>,

    /// All detected events, sorted by frame
    pub events: Vec<RaceEvent>,

    pub duration_seconds: f64,
}

impl ScanResult {
    pub fn total_frames(&self) -> i64 {
        self.end_frame - self.start_frame
    }

    /// The snapshot closest to `frame`, if any were captured.
    pub fn nearest_snapshot(&self, frame: i64) -> Option<&TelemetrySnapshot> {
        self.snapshots
            .iter()
            .min_by_key(|s| (s.frame - frame).abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_with_frames(frames: &[i64]) -> ScanResult {
        ScanResult {
            start_frame: 0,
            end_frame: 10_000,
            track_name: "Test Track".to_string(),
            session_type: "Race".to_string(),
            snapshots: frames
                .iter()
                .map(|&frame| TelemetrySnapshot {
                    frame,
                    session_time: frame as f64 / 60.0,
                    drivers: Vec::new(),
                })
                .collect(),
            events: Vec::new(),
            duration_seconds: 10_000.0 / 60.0,
        }
    }

    #[test]
    fn test_nearest_snapshot() {
        let scan = scan_with_frames(&[0, 600, 1200]);
        assert_eq!(scan.nearest_snapshot(650).unwrap().frame, 600);
        assert_eq!(scan.nearest_snapshot(1100).unwrap().frame, 1200);
    }

    #[test]
    fn test_nearest_snapshot_empty() {
        let scan = scan_with_frames(&[]);
        assert!(scan.nearest_snapshot(100).is_none());
    }
}
