//! Prompt templates for the chat plan provider.

use std::fmt::Write;

use racecast_models::{CameraBrief, RaceEventKind, RaceSummary};

/// Cap on how many key moments the prompt lists.
const MAX_PROMPT_EVENTS: usize = 30;

/// System prompt establishing the broadcast-director role and the JSON
/// output contract.
pub const SYSTEM_PROMPT: &str = r#"You are an expert motorsport broadcast director creating camera sequences for race replays.

IMPORTANT: the playback side automatically follows the most exciting car at any moment. Your job is ONLY to select which CAMERA ANGLE to use and when to switch. You do NOT need to specify which driver to follow.

STANDARD CAMERA TYPES (sessions expose a subset, use exact names from the session list):
- Nose / Gearbox / Roll Bar / Gyro / Cockpit and suspension cameras: onboard angles
- Scenic: track-side beauty shots
- TV1 / TV2 / TV3: traditional broadcast cameras at various track positions
- Chopper / Blimp: aerial views
- Chase / Far Chase / Rear Chase: behind-car cameras

BROADCAST DIRECTING GUIDELINES:
1. VARIETY IS KEY: mix camera types throughout, never overuse a single camera
2. Establish-Detail-Establish rhythm: wide shot (TV/Blimp) -> close action (Chase/Cockpit) -> wide shot
3. TV cameras for race starts, track position, and corner entries with multiple cars
4. Chase cameras for close racing and most general coverage
5. Cockpit and onboard angles for intense battles
6. Chopper/Blimp for establishing shots and showing the full field
7. Scenic only for brief artistic shots during calm stretches
8. Never use the same camera twice in a row
9. After an intense close-up, cut back to a wider shot

OUTPUT FORMAT:
Respond with ONLY valid JSON (no markdown, no explanation):
{
  "cameraActions": [
    {
      "frame": <integer - frame number to switch camera>,
      "cameraName": <string - exact camera name from the session list>,
      "reason": <string - brief explanation>
    }
  ]
}

Sort cameraActions by frame number ascending."#;

/// Build the per-request user prompt from a race summary.
pub fn build_user_prompt(summary: &RaceSummary) -> String {
    let mut prompt = String::new();

    prompt.push_str("Create a comprehensive camera plan for this race replay.\n");
    prompt.push_str(
        "Remember: playback automatically follows the most exciting action - you only choose WHICH CAMERA to use.\n\n",
    );

    let _ = writeln!(prompt, "RACE INFO:");
    let _ = writeln!(prompt, "- Track: {}", summary.track_name);
    let _ = writeln!(prompt, "- Session: {}", summary.session_type);
    let _ = writeln!(
        prompt,
        "- Duration: {} frames ({:.1} minutes)",
        summary.total_frames(),
        summary.duration_minutes
    );
    let _ = writeln!(prompt, "- Frame rate: {} fps", summary.frame_rate);
    let _ = writeln!(prompt, "- Start frame: {}", summary.start_frame);
    let _ = writeln!(prompt, "- End frame: {}", summary.end_frame);
    prompt.push('\n');

    prompt.push_str("CAMERAS AVAILABLE IN THIS SESSION:\n");
    append_camera_groups(&mut prompt, &summary.cameras);
    prompt.push('\n');

    prompt.push_str("KEY MOMENTS (for camera selection context):\n");
    if summary.events.is_empty() {
        prompt.push_str("- No specific events detected. Create varied general race coverage.\n");
    } else {
        for event in summary.events.iter().take(MAX_PROMPT_EVENTS) {
            let hint = match event.kind {
                RaceEventKind::Incident => " -> consider TV or Chopper to show aftermath",
                RaceEventKind::Overtake => " -> consider Chase or TV for the pass",
                RaceEventKind::Battle => " -> consider Chase or Cockpit for intensity",
                _ => "",
            };
            let _ = writeln!(prompt, "- Frame {}: {}{}", event.frame, event.description, hint);
        }
    }
    prompt.push('\n');

    // About six cuts per minute makes for dynamic coverage
    let target_cuts = ((summary.duration_minutes * 6.0) as i32).clamp(10, 100);
    let _ = writeln!(
        prompt,
        "Create approximately {target_cuts} camera switches for professional broadcast-style coverage."
    );
    prompt.push_str("IMPORTANT: Use a good MIX of different camera types throughout the replay.\n");
    prompt.push_str("Start with an establishing shot (TV, Blimp, or Chopper) at the start frame.\n");
    prompt.push_str("Use the EXACT camera names from the list above.\n");

    prompt
}

fn append_camera_groups(prompt: &mut String, cameras: &[CameraBrief]) {
    if cameras.is_empty() {
        prompt.push_str("TV1, TV2, TV3, Cockpit, Chase, Far Chase, Chopper, Blimp\n");
        return;
    }

    let mut tv = Vec::new();
    let mut chase = Vec::new();
    let mut onboard = Vec::new();
    let mut aerial = Vec::new();
    let mut other = Vec::new();

    for camera in cameras {
        let name = camera.name.as_str();
        let lower = name.to_ascii_lowercase();
        if name.starts_with("TV") {
            tv.push(name);
        } else if lower.contains("chase") {
            chase.push(name);
        } else if matches!(name, "Cockpit" | "Roll Bar" | "Gyro" | "Nose" | "Gearbox")
            || name.contains("Susp")
        {
            onboard.push(name);
        } else if matches!(name, "Chopper" | "Blimp") {
            aerial.push(name);
        } else {
            other.push(name);
        }
    }

    for (label, group) in [
        ("TV/Broadcast cameras", tv),
        ("Chase cameras", chase),
        ("Onboard cameras", onboard),
        ("Aerial cameras", aerial),
        ("Other cameras", other),
    ] {
        if !group.is_empty() {
            let _ = writeln!(prompt, "{label}: {}", group.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use racecast_models::{RaceEvent, RaceEventKind};

    fn summary(events: Vec<RaceEvent>, cameras: Vec<&str>) -> RaceSummary {
        RaceSummary {
            track_name: "Summit Point".to_string(),
            session_type: "Race".to_string(),
            start_frame: 0,
            end_frame: 72_000,
            frame_rate: 60,
            duration_minutes: 20.0,
            drivers: Vec::new(),
            cameras: cameras
                .into_iter()
                .enumerate()
                .map(|(i, name)| CameraBrief {
                    group_id: i as i32 + 1,
                    name: name.to_string(),
                })
                .collect(),
            events,
        }
    }

    #[test]
    fn test_prompt_contains_session_facts_and_target_cuts() {
        let prompt = build_user_prompt(&summary(Vec::new(), vec!["TV1", "Chase"]));
        assert!(prompt.contains("Track: Summit Point"));
        assert!(prompt.contains("72000 frames"));
        assert!(prompt.contains("No specific events detected"));
        // 20 minutes at ~6 cuts/minute
        assert!(prompt.contains("approximately 100 camera switches"));
    }

    #[test]
    fn test_prompt_categorizes_cameras() {
        let prompt = build_user_prompt(&summary(
            Vec::new(),
            vec!["TV1", "TV2", "Far Chase", "Cockpit", "Blimp", "Scenic"],
        ));
        assert!(prompt.contains("TV/Broadcast cameras: TV1, TV2"));
        assert!(prompt.contains("Chase cameras: Far Chase"));
        assert!(prompt.contains("Onboard cameras: Cockpit"));
        assert!(prompt.contains("Aerial cameras: Blimp"));
        assert!(prompt.contains("Other cameras: Scenic"));
    }

    #[test]
    fn test_prompt_caps_event_list() {
        let events: Vec<RaceEvent> = (0..60)
            .map(|i| RaceEvent {
                frame: i * 600,
                session_time: 0.0,
                kind: RaceEventKind::Overtake,
                car_number: 7,
                car_name: "Car 7".to_string(),
                other_car_number: None,
                other_car_name: None,
                position: Some(5),
                lap_distance: None,
                description: format!("pass number {i}"),
                importance: 6,
                duration_frames: 300,
            })
            .collect();

        let prompt = build_user_prompt(&summary(events, vec!["TV1"]));
        assert!(prompt.contains("pass number 29"));
        assert!(!prompt.contains("pass number 30"));
    }
}
