use bevy::prelude::*;
use serde::Deserialize;

const CONFIG_PATH_ENV: &str = "FACILITY_TWIN_CONFIG";
const SHADOWS_ENV: &str = "FACILITY_TWIN_SHADOWS";
const AMBIENT_ENV: &str = "FACILITY_TWIN_AMBIENT_BRIGHTNESS";
const SUN_ENV: &str = "FACILITY_TWIN_SUN_ILLUMINANCE";
const EXPOSURE_ENV: &str = "FACILITY_TWIN_EXPOSURE_EV100";

const DEFAULT_AMBIENT_BRIGHTNESS: f32 = 140.0;
const DEFAULT_SUN_ILLUMINANCE: f32 = 9_500.0;
const DEFAULT_EXPOSURE_EV100: f32 = 9.7;

/// Mount-time rendering configuration. Resolved once at startup; the panel
/// tunables layer on top of these at runtime.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
pub(super) struct TwinConfig {
    pub shadows_enabled: bool,
    pub ambient_brightness: f32,
    pub sun_illuminance: f32,
    /// Baseline tone-mapping exposure; the brightness tunable offsets it
    /// in stops at runtime.
    pub exposure_ev100: f32,
}

impl Default for TwinConfig {
    fn default() -> Self {
        Self {
            shadows_enabled: true,
            ambient_brightness: DEFAULT_AMBIENT_BRIGHTNESS,
            sun_illuminance: DEFAULT_SUN_ILLUMINANCE,
            exposure_ev100: DEFAULT_EXPOSURE_EV100,
        }
    }
}

/// Optional TOML overlay named by `FACILITY_TWIN_CONFIG`. Every field is
/// optional; environment variables win over the file.
#[derive(Debug, Default, Clone, Deserialize)]
struct TwinConfigFile {
    shadows_enabled: Option<bool>,
    ambient_brightness: Option<f32>,
    sun_illuminance: Option<f32>,
    exposure_ev100: Option<f32>,
}

pub(super) fn resolve_twin_config() -> TwinConfig {
    let file = std::env::var(CONFIG_PATH_ENV)
        .ok()
        .and_then(|path| match std::fs::read_to_string(&path) {
            Ok(raw) => match toml::from_str::<TwinConfigFile>(&raw) {
                Ok(parsed) => Some(parsed),
                Err(err) => {
                    eprintln!("twin config parse failed: path={path} err={err}");
                    None
                }
            },
            Err(err) => {
                eprintln!("twin config read failed: path={path} err={err}");
                None
            }
        })
        .unwrap_or_default();

    config_from_values(
        file,
        std::env::var(SHADOWS_ENV).ok(),
        std::env::var(AMBIENT_ENV).ok(),
        std::env::var(SUN_ENV).ok(),
        std::env::var(EXPOSURE_ENV).ok(),
    )
}

fn config_from_values(
    file: TwinConfigFile,
    shadows_value: Option<String>,
    ambient_value: Option<String>,
    sun_value: Option<String>,
    exposure_value: Option<String>,
) -> TwinConfig {
    let defaults = TwinConfig::default();
    TwinConfig {
        shadows_enabled: parse_flag(shadows_value)
            .or(file.shadows_enabled)
            .unwrap_or(defaults.shadows_enabled),
        ambient_brightness: parse_positive(ambient_value)
            .or(file.ambient_brightness.filter(|value| *value > 0.0))
            .unwrap_or(defaults.ambient_brightness),
        sun_illuminance: parse_positive(sun_value)
            .or(file.sun_illuminance.filter(|value| *value > 0.0))
            .unwrap_or(defaults.sun_illuminance),
        exposure_ev100: parse_finite(exposure_value)
            .or(file.exposure_ev100.filter(|value| value.is_finite()))
            .unwrap_or(defaults.exposure_ev100),
    }
}

fn parse_flag(value: Option<String>) -> Option<bool> {
    let raw = value?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Some(true),
        "0" | "false" | "off" | "no" => Some(false),
        _ => None,
    }
}

fn parse_positive(value: Option<String>) -> Option<f32> {
    parse_finite(value).filter(|parsed| *parsed > 0.0)
}

// EV100 is a log scale, so zero and negatives are legitimate here.
fn parse_finite(value: Option<String>) -> Option<f32> {
    value
        .and_then(|raw| raw.trim().parse::<f32>().ok())
        .filter(|parsed| parsed.is_finite())
}
