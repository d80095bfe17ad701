//! Selection history owned by the excitement scorer.
//!
//! Tracks which cars were shown recently and how often, plus a per-car
//! position time series rebuilt from the scan for momentum analysis. Owned
//! exclusively by one apply pass at a time; reset before each plan
//! application.

use std::collections::HashMap;

use racecast_models::ScanResult;

/// Cap on the most-recently-selected list.
const MAX_RECENT: usize = 8;

/// One tracked (frame, position) sample for a car.
#[derive(Debug, Clone, Copy)]
pub struct PositionSample {
    pub frame: i64,
    pub position: i32,
}

/// Recency, counts, and position series for one plan application.
#[derive(Debug, Default)]
pub struct SelectionHistory {
    /// Most-recent-first list of selected car numbers, capped at 8
    recent: Vec<i32>,

    /// Selections per car within the current plan
    counts: HashMap<i32, u32>,

    /// Total selections within the current plan
    total: u32,

    /// Per-car (frame, position) series, ascending in frame
    positions: HashMap<i32, Vec<PositionSample>>,
}

impl SelectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all state and rebuild the position series from a scan.
    pub fn reset(&mut self, scan: &ScanResult) {
        self.recent.clear();
        self.counts.clear();
        self.total = 0;
        self.rebuild_positions(scan);
    }

    fn rebuild_positions(&mut self, scan: &ScanResult) {
        self.positions.clear();

        for snapshot in &scan.snapshots {
            for driver in &snapshot.drivers {
                if !driver.has_valid_position() {
                    continue;
                }
                self.positions
                    .entry(driver.car_number)
                    .or_default()
                    .push(PositionSample {
                        frame: snapshot.frame,
                        position: driver.position,
                    });
            }
        }
    }

    /// Record a selection: move the car to the front of the recency list
    /// and bump its counter.
    pub fn record_selection(&mut self, car_number: i32) {
        self.recent.retain(|&n| n != car_number);
        self.recent.insert(0, car_number);
        self.recent.truncate(MAX_RECENT);

        *self.counts.entry(car_number).or_insert(0) += 1;
        self.total += 1;
    }

    /// Most-recent-first selected car numbers.
    pub fn recent(&self) -> &[i32] {
        &self.recent
    }

    pub fn is_recent(&self, car_number: i32) -> bool {
        self.recent.contains(&car_number)
    }

    pub fn selection_count(&self, car_number: i32) -> u32 {
        self.counts.get(&car_number).copied().unwrap_or(0)
    }

    /// Iterate over per-car selection counts.
    pub fn counts(&self) -> impl Iterator<Item = (i32, u32)> + '_ {
        self.counts.iter().map(|(&car, &count)| (car, count))
    }

    pub fn total_selections(&self) -> u32 {
        self.total
    }

    /// Latest tracked position for a car at or before `frame`.
    pub fn position_at_or_before(&self, car_number: i32, frame: i64) -> Option<PositionSample> {
        self.positions
            .get(&car_number)?
            .iter()
            .rev()
            .find(|sample| sample.frame <= frame)
            .copied()
    }

    /// Number of tracked samples for a car.
    pub fn sample_count(&self, car_number: i32) -> usize {
        self.positions.get(&car_number).map_or(0, Vec::len)
    }
}
