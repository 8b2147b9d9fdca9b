use bevy::camera::{Exposure, Viewport};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use bevy_egui::{EguiPlugin, EguiPrimaryContextPass};

mod camera_rig;
mod capture;
mod explode;
mod flare_effects;
mod kinematics;
mod panel;
mod scene_assembly;
mod selection;
mod telemetry_feed;
mod twin_config;

use camera_rig::{
    advance_camera_tween, default_orbit, orbit_camera_controls, start_focus_framing,
    CameraTweenState, OrbitDragState,
};
use capture::{capture_config_from_env, trigger_capture, CaptureState};
use explode::{drive_explode_tweens, handle_explode_requests, ExplodeRequest, ExplodeState};
use flare_effects::{animate_flame, billboard_flame_glow, update_flare_puffs, FlarePuffs};
use kinematics::{animate_pumpjack, spin_rotors, PumpPhase};
use panel::render_side_panel;
use scene_assembly::{setup_facility_scene, PartRegistry};
use selection::{apply_focus_highlight, pick_part, update_focus_pulse, HighlightLedger};
use telemetry_feed::{advance_telemetry, TelemetryFeed};
use twin_config::{resolve_twin_config, TwinConfig};

const UI_PANEL_WIDTH: f32 = 340.0;
const GROUND_HALF_EXTENT: f32 = 55.0;
const FILL_LIGHT_INTENSITY: f32 = 6_000.0;
const HEADLESS_ENV: &str = "FACILITY_TWIN_HEADLESS";

fn main() {
    let config = resolve_twin_config();
    if std::env::var(HEADLESS_ENV).is_ok() {
        run_headless(config);
    } else {
        run_ui(config);
    }
}

fn run_ui(config: TwinConfig) {
    App::new()
        .insert_resource(config)
        .insert_resource(FocusState::default())
        .insert_resource(Tunables::default())
        .insert_resource(PartRegistry::default())
        .insert_resource(ExplodeState::default())
        .insert_resource(ExplodeRequest::default())
        .insert_resource(CameraTweenState::default())
        .insert_resource(OrbitDragState::default())
        .insert_resource(HighlightLedger::default())
        .insert_resource(TelemetryFeed::default())
        .insert_resource(FlarePuffs::default())
        .insert_resource(PumpPhase::default())
        .insert_resource(capture_config_from_env())
        .insert_resource(CaptureState::default())
        .add_plugins(
            DefaultPlugins.set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Facility Digital Twin".to_string(),
                    resolution: (1280, 800).into(),
                    ..default()
                }),
                ..default()
            }),
        )
        .add_plugins(EguiPlugin::default())
        .add_systems(Startup, (setup_environment, setup_facility_scene))
        .add_systems(
            Update,
            (
                advance_telemetry,
                (
                    animate_pumpjack,
                    spin_rotors,
                    animate_flame,
                    billboard_flame_glow,
                    update_flare_puffs,
                )
                    .after(advance_telemetry),
            ),
        )
        .add_systems(Update, (handle_explode_requests, drive_explode_tweens).chain())
        .add_systems(
            Update,
            (
                orbit_camera_controls,
                start_focus_framing,
                advance_camera_tween
                    .after(orbit_camera_controls)
                    .after(start_focus_framing),
            ),
        )
        .add_systems(
            Update,
            (
                apply_focus_highlight,
                update_focus_pulse,
                apply_lighting,
                update_3d_viewport,
                trigger_capture,
            ),
        )
        .add_systems(PostUpdate, pick_part.after(TransformSystems::Propagate))
        .add_systems(EguiPrimaryContextPass, render_side_panel)
        .run();
}

fn run_headless(config: TwinConfig) {
    App::new()
        .insert_resource(config)
        .insert_resource(FocusState::default())
        .insert_resource(TelemetryFeed::default())
        .insert_resource(HeadlessStatus::default())
        .add_plugins(MinimalPlugins)
        .add_systems(Update, (advance_telemetry, headless_report))
        .run();
}

/// Which part currently holds focus, if any. Written by both the 3D pick
/// path and the panel's part list; read by highlight, pulse, and camera
/// framing.
#[derive(Resource, Default)]
struct FocusState {
    current: Option<String>,
}

impl FocusState {
    fn set(&mut self, next: Option<String>) {
        self.current = next;
    }

    fn is(&self, key: &str) -> bool {
        self.current.as_deref() == Some(key)
    }
}

/// Live-adjustable visual parameters exposed in the panel.
#[derive(Resource, Clone, Copy, Debug, PartialEq)]
struct Tunables {
    brightness: f32,
    flame_intensity: f32,
    flame_turbulence: f32,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            brightness: 1.0,
            flame_intensity: 1.0,
            flame_turbulence: 1.0,
        }
    }
}

#[derive(Component)]
struct TwinCamera;

#[derive(Component, Copy, Clone)]
struct BaseScale(Vec3);

/// Lights whose intensity scales with the panel brightness control.
#[derive(Component)]
struct SceneLight {
    base_intensity: f32,
}

#[derive(Resource, Default)]
struct HeadlessStatus {
    last_generation: u64,
}

fn setup_environment(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<TwinConfig>,
) {
    let orbit = default_orbit();
    let mut transform = Transform::default();
    orbit.apply_to_transform(&mut transform);
    commands.spawn((
        Camera3d::default(),
        transform,
        Exposure {
            ev100: config.exposure_ev100,
        },
        TwinCamera,
        orbit,
    ));

    commands.insert_resource(GlobalAmbientLight {
        color: Color::WHITE,
        brightness: config.ambient_brightness,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: config.sun_illuminance,
            shadows_enabled: config.shadows_enabled,
            ..default()
        },
        SceneLight {
            base_intensity: config.sun_illuminance,
        },
        Transform::from_xyz(30.0, 45.0, 18.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        PointLight {
            intensity: FILL_LIGHT_INTENSITY,
            shadows_enabled: false,
            ..default()
        },
        SceneLight {
            base_intensity: FILL_LIGHT_INTENSITY,
        },
        Transform::from_xyz(-24.0, 20.0, -16.0),
    ));

    let ground_mesh = meshes.add(Cuboid::new(
        GROUND_HALF_EXTENT * 2.0,
        0.2,
        GROUND_HALF_EXTENT * 2.0,
    ));
    let ground_material = materials.add(StandardMaterial {
        base_color: Color::srgb(0.42, 0.39, 0.33),
        perceptual_roughness: 0.95,
        ..default()
    });
    commands.spawn((
        Mesh3d(ground_mesh),
        MeshMaterial3d(ground_material),
        Transform::from_xyz(0.0, -0.1, 0.0),
        Name::new("ground-pad"),
    ));
}

fn apply_lighting(
    config: Res<TwinConfig>,
    tunables: Res<Tunables>,
    mut ambient: ResMut<GlobalAmbientLight>,
    mut lights: Query<(
        &SceneLight,
        Option<&mut PointLight>,
        Option<&mut DirectionalLight>,
    )>,
    mut exposures: Query<&mut Exposure, With<TwinCamera>>,
) {
    if !tunables.is_changed() {
        return;
    }

    let factor = tunables.brightness.max(0.0);
    ambient.brightness = config.ambient_brightness * factor;
    for (scene_light, point, directional) in &mut lights {
        if let Some(mut point) = point {
            point.intensity = scene_light.base_intensity * factor;
        }
        if let Some(mut directional) = directional {
            directional.illuminance = scene_light.base_intensity * factor;
        }
    }

    // Doubling brightness opens the exposure by one stop (lower EV100).
    let stops = factor.max(0.05).log2();
    for mut exposure in &mut exposures {
        exposure.ev100 = config.exposure_ev100 - stops;
    }
}

fn update_3d_viewport(
    windows: Query<&Window, With<PrimaryWindow>>,
    mut cameras: Query<&mut Camera, With<TwinCamera>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let Ok(mut camera) = cameras.single_mut() else {
        return;
    };

    let panel_width_physical = (UI_PANEL_WIDTH * window.scale_factor()).round() as u32;
    let window_width = window.physical_width();
    let window_height = window.physical_height().max(1);
    let render_width = window_width.saturating_sub(panel_width_physical).max(1);

    camera.viewport = Some(Viewport {
        physical_position: UVec2::ZERO,
        physical_size: UVec2::new(render_width, window_height),
        depth: 0.0..1.0,
    });
}

fn headless_report(mut status: ResMut<HeadlessStatus>, feed: Res<TelemetryFeed>) {
    if feed.readout_generation == status.last_generation {
        return;
    }
    status.last_generation = feed.readout_generation;

    let summary: Vec<String> = feed
        .readout
        .values
        .iter()
        .map(|(kind, value)| format!("{}={value:.1}{}", kind.label(), kind.unit()))
        .collect();
    println!("twin readout #{}: {}", feed.readout_generation, summary.join(" "));
}
