use std::path::PathBuf;

use bevy::app::AppExit;
use bevy::prelude::*;
use bevy::render::view::screenshot::{save_to_disk, Screenshot, ScreenshotCaptured};
use serde::Serialize;

use super::FocusState;
use crate::explode::ExplodeState;
use crate::flare_effects::FlarePuffs;
use crate::telemetry_feed::TelemetryFeed;

const CAPTURE_PATH_ENV: &str = "FACILITY_TWIN_CAPTURE_PATH";
const CAPTURE_STATUS_PATH_ENV: &str = "FACILITY_TWIN_CAPTURE_STATUS_PATH";
const CAPTURE_DELAY_SECS_ENV: &str = "FACILITY_TWIN_CAPTURE_DELAY_SECS";
const CAPTURE_MAX_WAIT_SECS_ENV: &str = "FACILITY_TWIN_CAPTURE_MAX_WAIT_SECS";
const DEFAULT_CAPTURE_DELAY_SECS: f64 = 2.0;
const DEFAULT_CAPTURE_MAX_WAIT_SECS: f64 = 15.0;

/// Unattended screenshot run: wait for the scene to settle, save a PNG, exit.
/// Inactive unless the capture path env var is set.
#[derive(Resource, Clone, Debug, PartialEq)]
pub(super) struct CaptureConfig {
    pub path: Option<PathBuf>,
    pub status_path: Option<PathBuf>,
    pub delay_secs: f64,
    pub max_wait_secs: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            path: None,
            status_path: None,
            delay_secs: DEFAULT_CAPTURE_DELAY_SECS,
            max_wait_secs: DEFAULT_CAPTURE_MAX_WAIT_SECS,
        }
    }
}

impl CaptureConfig {
    /// A capture fires once: after the settle delay, as soon as the scene
    /// is ready, or unconditionally at the wait ceiling.
    fn should_fire(&self, elapsed_secs: f64, readout_ready: bool, already_requested: bool) -> bool {
        let armed =
            self.path.is_some() && !already_requested && elapsed_secs >= self.delay_secs;
        armed && (readout_ready || elapsed_secs >= self.max_wait_secs)
    }
}

#[derive(Resource, Default, Clone, Debug)]
pub(super) struct CaptureState {
    start_elapsed_secs: Option<f64>,
    requested: bool,
    last_status_dump: Option<String>,
}

pub(super) fn capture_config_from_env() -> CaptureConfig {
    config_from_values(
        std::env::var(CAPTURE_PATH_ENV).ok(),
        std::env::var(CAPTURE_STATUS_PATH_ENV).ok(),
        std::env::var(CAPTURE_DELAY_SECS_ENV).ok(),
        std::env::var(CAPTURE_MAX_WAIT_SECS_ENV).ok(),
    )
}

pub(super) fn trigger_capture(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<CaptureConfig>,
    focus: Res<FocusState>,
    explode: Res<ExplodeState>,
    feed: Res<TelemetryFeed>,
    puffs: Res<FlarePuffs>,
    mut capture_state: ResMut<CaptureState>,
) {
    persist_capture_status(&config, &focus, &explode, &feed, &puffs, &mut capture_state);

    let Some(output_path) = config.path.as_ref().cloned() else {
        return;
    };

    let start_elapsed_secs = capture_state
        .start_elapsed_secs
        .get_or_insert(time.elapsed_secs_f64());
    let elapsed_secs = (time.elapsed_secs_f64() - *start_elapsed_secs).max(0.0);
    let readout_ready = feed.readout_generation > 0;

    if !config.should_fire(elapsed_secs, readout_ready, capture_state.requested) {
        return;
    }

    capture_state.requested = true;
    commands.spawn(Screenshot::primary_window()).observe(
        move |captured: On<ScreenshotCaptured>, mut app_exit: MessageWriter<AppExit>| {
            save_to_disk(output_path.clone())(captured);
            app_exit.write(AppExit::Success);
        },
    );
}

fn config_from_values(
    path_value: Option<String>,
    status_path_value: Option<String>,
    delay_secs_value: Option<String>,
    max_wait_secs_value: Option<String>,
) -> CaptureConfig {
    let delay_secs = seconds_or(delay_secs_value, DEFAULT_CAPTURE_DELAY_SECS);
    CaptureConfig {
        path: non_empty_path(path_value),
        status_path: non_empty_path(status_path_value),
        delay_secs,
        // The wait ceiling can never undercut the settle delay.
        max_wait_secs: seconds_or(max_wait_secs_value, DEFAULT_CAPTURE_MAX_WAIT_SECS)
            .max(delay_secs),
    }
}

fn non_empty_path(value: Option<String>) -> Option<PathBuf> {
    let trimmed = value.as_deref().map(str::trim).unwrap_or_default();
    (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
}

fn seconds_or(value: Option<String>, default_secs: f64) -> f64 {
    match value.as_deref().map(str::trim).and_then(|raw| raw.parse::<f64>().ok()) {
        Some(parsed) if parsed.is_finite() && parsed >= 0.0 => parsed,
        _ => default_secs,
    }
}

#[derive(Serialize)]
struct CaptureStatus<'a> {
    assembly_state: &'static str,
    cascade_in_flight: bool,
    focused_part: Option<&'a str>,
    readout_generation: u64,
    live_puffs: usize,
}

fn persist_capture_status(
    config: &CaptureConfig,
    focus: &FocusState,
    explode: &ExplodeState,
    feed: &TelemetryFeed,
    puffs: &FlarePuffs,
    capture_state: &mut CaptureState,
) {
    let Some(status_path) = config.status_path.as_ref() else {
        return;
    };

    let status_dump = render_status_dump(focus, explode, feed, puffs);
    if capture_state.last_status_dump.as_deref() == Some(status_dump.as_str()) {
        return;
    }

    if let Some(parent) = status_path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!(
                "twin capture status mkdir failed: path={} err={err}",
                status_path.display()
            );
            return;
        }
    }

    if let Err(err) = std::fs::write(status_path, status_dump.as_bytes()) {
        eprintln!(
            "twin capture status write failed: path={} err={err}",
            status_path.display()
        );
        return;
    }
    capture_state.last_status_dump = Some(status_dump);
}

fn render_status_dump(
    focus: &FocusState,
    explode: &ExplodeState,
    feed: &TelemetryFeed,
    puffs: &FlarePuffs,
) -> String {
    use facility_twin::assembly::AssemblyState;

    let status = CaptureStatus {
        assembly_state: match explode.machine.state() {
            AssemblyState::Assembled => "assembled",
            AssemblyState::Exploded => "exploded",
        },
        cascade_in_flight: explode.machine.in_flight() > 0,
        focused_part: focus.current.as_deref(),
        readout_generation: feed.readout_generation,
        live_puffs: puffs.pool.len(),
    };
    serde_json::to_string_pretty(&status).unwrap_or_else(|_| "{}".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_values_parses_and_normalizes_thresholds() {
        let config = config_from_values(
            Some("  .tmp/screens/twin.png ".to_string()),
            Some(" .tmp/screens/capture_status.json ".to_string()),
            Some("3.5".to_string()),
            Some("2".to_string()),
        );

        assert_eq!(config.path, Some(PathBuf::from(".tmp/screens/twin.png")));
        assert_eq!(
            config.status_path,
            Some(PathBuf::from(".tmp/screens/capture_status.json"))
        );
        assert!((config.delay_secs - 3.5).abs() < f64::EPSILON);
        // Max wait can never undercut the delay.
        assert!((config.max_wait_secs - 3.5).abs() < f64::EPSILON);
    }

    #[test]
    fn config_from_values_falls_back_on_invalid_values() {
        let config = config_from_values(
            Some("   ".to_string()),
            Some(" ".to_string()),
            Some("-1".to_string()),
            Some("abc".to_string()),
        );

        assert_eq!(config.path, None);
        assert_eq!(config.status_path, None);
        assert!((config.delay_secs - DEFAULT_CAPTURE_DELAY_SECS).abs() < f64::EPSILON);
        assert!((config.max_wait_secs - DEFAULT_CAPTURE_MAX_WAIT_SECS).abs() < f64::EPSILON);
    }

    #[test]
    fn capture_fires_after_delay_on_readout_or_timeout() {
        let config = CaptureConfig {
            path: Some(PathBuf::from("shot.png")),
            status_path: None,
            delay_secs: 2.0,
            max_wait_secs: 10.0,
        };

        assert!(!config.should_fire(1.9, true, false));
        assert!(!config.should_fire(2.1, false, false));
        assert!(config.should_fire(2.1, true, false));
        assert!(config.should_fire(10.0, false, false));
        assert!(!config.should_fire(10.0, true, true));
    }

    #[test]
    fn capture_stays_idle_without_a_path() {
        let config = CaptureConfig::default();
        assert!(!config.should_fire(100.0, true, false));
    }

    #[test]
    fn status_dump_reports_scene_state() {
        let focus = FocusState {
            current: Some("flare-stack".to_string()),
        };
        let explode = ExplodeState::default();
        let feed = TelemetryFeed::default();
        let puffs = FlarePuffs::default();

        let dump = render_status_dump(&focus, &explode, &feed, &puffs);
        let parsed: serde_json::Value = serde_json::from_str(&dump).expect("valid json");
        assert_eq!(parsed["assembly_state"], "assembled");
        assert_eq!(parsed["focused_part"], "flare-stack");
        assert_eq!(parsed["readout_generation"], 0);
        assert_eq!(parsed["live_puffs"], 0);
    }
}
