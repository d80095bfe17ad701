//! The seam to the replay/telemetry collaborator.

use async_trait::async_trait;

use racecast_models::TelemetrySnapshot;

/// Track and session labels for the loaded replay.
#[derive(Debug, Clone)]
pub struct SessionMetadata {
    pub track_name: String,
    pub session_type: String,
}

impl Default for SessionMetadata {
    fn default() -> Self {
        Self {
            track_name: "Unknown Track".to_string(),
            session_type: "Race".to_string(),
        }
    }
}

/// A recorded session the director can seek through and sample.
///
/// Implementations wrap whatever simulator or log-file backend provides the
/// replay. A `capture` miss means "skip this frame", never a fatal error;
/// implementations should settle after `seek` before reporting data.
#[async_trait]
pub trait TelemetrySource: Send {
    /// Position the replay at `frame`.
    async fn seek(&mut self, frame: i64);

    /// Sample every car's state at `frame`, or `None` if the frame cannot be
    /// captured.
    async fn capture(&mut self, frame: i64) -> Option<TelemetrySnapshot>;

    /// The replay's current position.
    fn current_frame(&self) -> i64;

    /// The last frame of the recording.
    fn final_frame(&self) -> i64;

    fn session_metadata(&self) -> SessionMetadata;
}
