//! Camera plan models.
//!
//! The wire format (`cameraActions`, `cameraName`, `driverNumber`) is the
//! contract shared with the remote plan provider; provenance fields stay off
//! the wire.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One camera switch instruction.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CameraAction {
    /// Frame to switch at
    pub frame: i64,

    /// Camera group name, matched against the session's available cameras
    #[serde(rename = "cameraName")]
    pub camera: String,

    /// Optional explicit car to focus. Absent means the excitement scorer
    /// picks the car at apply time, which is the normal case.
    #[serde(rename = "driverNumber", skip_serializing_if = "Option::is_none")]
    pub car_number: Option<i32>,

    /// Why this cut exists; diagnostic only
    #[serde(default)]
    pub reason: String,
}

/// An ordered sequence of camera switches covering one replay range.
///
/// Invariant: actions are in non-decreasing frame order before application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CameraPlan {
    #[serde(rename = "cameraActions")]
    pub actions: Vec<CameraAction>,

    /// Which generator produced the plan, e.g. "event-driven"
    #[serde(skip)]
    pub generated_by: String,

    #[serde(skip)]
    pub generated_at: Option<DateTime<Utc>>,

    #[serde(skip)]
    pub total_duration_frames: i64,
}

impl CameraPlan {
    /// Create an empty plan stamped with its generator.
    pub fn new(generated_by: impl Into<String>, total_duration_frames: i64) -> Self {
        Self {
            actions: Vec::new(),
            generated_by: generated_by.into(),
            generated_at: Some(Utc::now()),
            total_duration_frames,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Sort actions into frame order, restoring the plan invariant.
    pub fn sort_by_frame(&mut self) {
        self.actions.sort_by_key(|a| a.frame);
    }
}
