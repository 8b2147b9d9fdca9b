use std::collections::HashMap;

use bevy::prelude::*;

use facility_twin::flame::{flame_color, flame_radius, flicker};
use facility_twin::puffs::PuffPool;
use facility_twin::telemetry::MetricKind;

use super::{Tunables, TwinCamera};
use crate::scene_assembly::{to_point, FlameGlow, FlameSegment, PuffAssets, PuffEmitter};
use crate::telemetry_feed::TelemetryFeed;

/// Widest the flame gets at full boost, in world units.
const FLAME_MAX_RADIUS: f32 = 0.9;
/// Multiplier lifting flame colors into emissive range.
const FLAME_EMISSIVE_GAIN: f32 = 4.0;
/// Alpha ceiling for vapor puffs; individual puffs fade from here.
const PUFF_BASE_ALPHA: f32 = 0.55;
/// Flare rate that maps to nominal flame size.
const FLAME_NOMINAL_RATE: f32 = 400.0;

/// Vapor puff simulation plus the entity mirror that renders it.
#[derive(Resource, Default)]
pub(super) struct FlarePuffs {
    pub pool: PuffPool,
    entities: HashMap<u32, Entity>,
}

/// Marks a spawned puff mesh with the pool id it mirrors.
#[derive(Component)]
pub(crate) struct PuffVisual {
    id: u32,
}

/// Scales and recolors the stacked flame segments every frame from the live
/// flare rate, the flicker noise, and the panel tunables.
pub(super) fn animate_flame(
    time: Res<Time>,
    feed: Res<TelemetryFeed>,
    tunables: Res<Tunables>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut segments: Query<(&FlameSegment, &mut Transform, &MeshMaterial3d<StandardMaterial>)>,
) {
    let t = time.elapsed_secs();
    let flare_rate = feed.sim.displayed(MetricKind::FlareRate);
    let rate_boost = (flare_rate / FLAME_NOMINAL_RATE).clamp(0.3, 1.6);
    let intensity = tunables.flame_intensity * flicker(t, tunables.flame_turbulence);

    for (segment, mut transform, material_handle) in &mut segments {
        let radius = flame_radius(segment.height_frac, t, tunables.flame_turbulence)
            * FLAME_MAX_RADIUS
            * rate_boost;
        let r = radius.max(0.02);
        transform.scale = Vec3::new(r, 1.0, r);

        if let Some(material) = materials.get_mut(&material_handle.0) {
            let (red, green, blue) = flame_color(segment.height_frac, intensity);
            material.emissive = LinearRgba::new(
                red * FLAME_EMISSIVE_GAIN,
                green * FLAME_EMISSIVE_GAIN,
                blue * FLAME_EMISSIVE_GAIN,
                1.0,
            );
        }
    }
}

/// Turns the glow quad toward the camera and breathes its scale with the
/// flicker. Glow parents carry no rotation, so the local rotation is the
/// world rotation.
pub(super) fn billboard_flame_glow(
    time: Res<Time>,
    tunables: Res<Tunables>,
    cameras: Query<&GlobalTransform, (With<TwinCamera>, Without<FlameGlow>)>,
    mut glows: Query<(&GlobalTransform, &mut Transform), With<FlameGlow>>,
) {
    let Ok(camera) = cameras.single() else {
        return;
    };
    let camera_position = camera.translation();
    let swell = (flicker(time.elapsed_secs(), tunables.flame_turbulence)
        * tunables.flame_intensity)
        .clamp(0.2, 2.0);

    for (global, mut transform) in &mut glows {
        let to_camera = camera_position - global.translation();
        if to_camera.length_squared() > 1e-6 {
            transform.rotation = billboard_rotation(to_camera);
        }
        transform.scale = Vec3::splat(swell);
    }
}

fn billboard_rotation(to_camera: Vec3) -> Quat {
    Quat::from_rotation_arc(Vec3::Z, to_camera.normalize())
}

/// Steps the puff pool from the live flare rate, then reconciles the entity
/// mirror: move and fade survivors, spawn newcomers, despawn expired ids.
pub(super) fn update_flare_puffs(
    time: Res<Time>,
    feed: Res<TelemetryFeed>,
    assets: Res<PuffAssets>,
    mut puffs: ResMut<FlarePuffs>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut commands: Commands,
    emitters: Query<&GlobalTransform, With<PuffEmitter>>,
    mut visuals: Query<(&mut Transform, &MeshMaterial3d<StandardMaterial>), With<PuffVisual>>,
) {
    let Ok(emitter) = emitters.single() else {
        return;
    };
    let flare_rate = feed.sim.displayed(MetricKind::FlareRate);

    let FlarePuffs { pool, entities } = puffs.as_mut();
    pool.update(
        time.delta_secs(),
        flare_rate,
        to_point(emitter.translation()),
    );

    let mut live_ids: Vec<u32> = Vec::with_capacity(pool.len());
    for puff in pool.live() {
        live_ids.push(puff.id);
        let position = Vec3::new(puff.position.x, puff.position.y, puff.position.z);
        let scale = Vec3::splat(puff.scale());
        let alpha = puff.alpha() * PUFF_BASE_ALPHA;

        if let Some(&entity) = entities.get(&puff.id) {
            if let Ok((mut transform, material_handle)) = visuals.get_mut(entity) {
                transform.translation = position;
                transform.scale = scale;
                if let Some(material) = materials.get_mut(&material_handle.0) {
                    material.base_color = material.base_color.with_alpha(alpha);
                }
            }
        } else {
            let material = materials.add(StandardMaterial {
                base_color: Color::srgba(0.85, 0.85, 0.9, alpha),
                unlit: true,
                alpha_mode: AlphaMode::Blend,
                ..default()
            });
            let entity = commands
                .spawn((
                    PuffVisual { id: puff.id },
                    Mesh3d(assets.mesh.clone()),
                    MeshMaterial3d(material),
                    Transform::from_translation(position).with_scale(scale),
                    Name::new("flare-puff"),
                ))
                .id();
            entities.insert(puff.id, entity);
        }
    }

    entities.retain(|id, entity| {
        if live_ids.contains(id) {
            true
        } else {
            commands.entity(*entity).despawn();
            false
        }
    });
}
