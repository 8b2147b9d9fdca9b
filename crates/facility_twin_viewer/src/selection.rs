use std::collections::HashMap;

use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use super::{BaseScale, FocusState, TwinCamera, UI_PANEL_WIDTH};
use crate::scene_assembly::{PartRegistry, PartRoot};

const HIGHLIGHT_EMISSIVE: LinearRgba = LinearRgba::new(1.1, 0.72, 0.16, 1.0);
const HIGHLIGHT_BLEND: f32 = 0.65;
const FOCUS_PULSE_SECS: f32 = 0.45;
const FOCUS_PULSE_SCALE: f32 = 0.06;

/// Original emissive values captured the first time a material is
/// highlighted, keyed by the mesh entity. Restores always write these exact
/// values back; they are never re-derived from the highlighted state.
#[derive(Resource, Default)]
pub(super) struct HighlightLedger {
    captured: HashMap<Entity, LinearRgba>,
    applied: Option<String>,
}

/// Transient scale swell on a freshly focused part root.
#[derive(Component)]
pub(super) struct FocusPulse {
    elapsed_secs: f32,
}

pub(super) fn apply_focus_highlight(
    mut commands: Commands,
    focus: Res<FocusState>,
    registry: Res<PartRegistry>,
    children: Query<&Children>,
    material_refs: Query<&MeshMaterial3d<StandardMaterial>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut ledger: ResMut<HighlightLedger>,
) {
    if !focus.is_changed() {
        return;
    }
    if ledger.applied == focus.current {
        return;
    }

    if let Some(previous) = ledger.applied.take() {
        if let Some(root) = registry.root_of(&previous) {
            for entity in collect_subtree(root, &children) {
                let Ok(material_ref) = material_refs.get(entity) else {
                    continue;
                };
                let Some(original) = ledger.captured.get(&entity) else {
                    continue;
                };
                if let Some(material) = materials.get_mut(&material_ref.0) {
                    material.emissive = *original;
                }
            }
        }
    }

    let Some(key) = focus.current.clone() else {
        return;
    };
    let Some(root) = registry.root_of(&key) else {
        return;
    };

    for entity in collect_subtree(root, &children) {
        let Ok(material_ref) = material_refs.get(entity) else {
            continue;
        };
        let Some(material) = materials.get_mut(&material_ref.0) else {
            continue;
        };
        let original = *ledger.captured.entry(entity).or_insert(material.emissive);
        material.emissive = highlighted_emissive(original);
    }
    ledger.applied = Some(key);
    commands.entity(root).insert(FocusPulse { elapsed_secs: 0.0 });
}

pub(super) fn update_focus_pulse(
    mut commands: Commands,
    time: Res<Time>,
    mut pulses: Query<(Entity, &mut FocusPulse, &mut Transform, &BaseScale)>,
) {
    for (entity, mut pulse, mut transform, base) in &mut pulses {
        pulse.elapsed_secs += time.delta_secs();
        let frac = pulse.elapsed_secs / FOCUS_PULSE_SECS;
        if frac >= 1.0 {
            transform.scale = base.0;
            commands.entity(entity).remove::<FocusPulse>();
            continue;
        }
        let swell = 1.0 + (frac * std::f32::consts::PI).sin() * FOCUS_PULSE_SCALE;
        transform.scale = base.0 * swell;
    }
}

/// Click picking against part-level bounding boxes. Runs after transform
/// propagation so the boxes line up with what is on screen, including parts
/// mid-explode. Empty-space clicks leave the focus untouched.
pub(super) fn pick_part(
    buttons: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    cameras: Query<(&Camera, &GlobalTransform), With<TwinCamera>>,
    registry: Res<PartRegistry>,
    roots: Query<(&GlobalTransform, &PartRoot)>,
    mut focus: ResMut<FocusState>,
) {
    if !buttons.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = windows.single() else {
        return;
    };
    let Some(cursor_position) = window.cursor_position() else {
        return;
    };
    if cursor_position.x > (window.width() - UI_PANEL_WIDTH) {
        return;
    }

    let Ok((camera, camera_transform)) = cameras.single() else {
        return;
    };
    let Ok(ray) = camera.viewport_to_world(camera_transform, cursor_position) else {
        return;
    };

    let mut best: Option<(String, f32)> = None;
    for (transform, part) in roots.iter() {
        let Some(bounds) = registry.bounds_of(&part.key) else {
            continue;
        };
        let center = transform.translation() + bounds.center;
        let Some(distance) =
            ray_box_entry(ray.origin, *ray.direction, center, bounds.half_extents)
        else {
            continue;
        };
        if best
            .as_ref()
            .map(|(_, best_distance)| distance < *best_distance)
            .unwrap_or(true)
        {
            best = Some((part.key.clone(), distance));
        }
    }

    if let Some((key, _)) = best {
        if !focus.is(&key) {
            focus.set(Some(key));
        }
    }
}

fn highlighted_emissive(original: LinearRgba) -> LinearRgba {
    LinearRgba::new(
        original.red + (HIGHLIGHT_EMISSIVE.red - original.red) * HIGHLIGHT_BLEND,
        original.green + (HIGHLIGHT_EMISSIVE.green - original.green) * HIGHLIGHT_BLEND,
        original.blue + (HIGHLIGHT_EMISSIVE.blue - original.blue) * HIGHLIGHT_BLEND,
        1.0,
    )
}

/// Slab test: distance along the ray to the first face of an axis-aligned
/// box, `None` on a miss. A ray starting inside reports distance zero.
fn ray_box_entry(origin: Vec3, direction: Vec3, center: Vec3, half_extents: Vec3) -> Option<f32> {
    let mut t_entry = 0.0_f32;
    let mut t_exit = f32::INFINITY;

    for axis in 0..3 {
        let lo = center[axis] - half_extents[axis];
        let hi = center[axis] + half_extents[axis];
        if direction[axis].abs() < 1e-8 {
            if origin[axis] < lo || origin[axis] > hi {
                return None;
            }
            continue;
        }
        let inv = 1.0 / direction[axis];
        let a = (lo - origin[axis]) * inv;
        let b = (hi - origin[axis]) * inv;
        let (near, far) = if a < b { (a, b) } else { (b, a) };
        t_entry = t_entry.max(near);
        t_exit = t_exit.min(far);
        if t_entry > t_exit {
            return None;
        }
    }

    Some(t_entry)
}

fn collect_subtree(root: Entity, children: &Query<&Children>) -> Vec<Entity> {
    let mut stack = vec![root];
    let mut collected = Vec::new();
    while let Some(entity) = stack.pop() {
        collected.push(entity);
        if let Ok(kids) = children.get(entity) {
            stack.extend(kids.iter());
        }
    }
    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_assembly::PartBounds;
    use facility_twin::assembly::PartSpec;
    use facility_twin::geometry::Point3;

    #[test]
    fn ray_box_entry_hits_and_misses() {
        let center = Vec3::new(0.0, 0.0, -10.0);
        let half = Vec3::splat(1.0);

        let hit = ray_box_entry(Vec3::ZERO, Vec3::NEG_Z, center, half);
        assert!((hit.expect("hit") - 9.0).abs() < 1e-5);

        let miss = ray_box_entry(Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Z, center, half);
        assert!(miss.is_none());

        let behind = ray_box_entry(Vec3::ZERO, Vec3::Z, center, half);
        assert!(behind.is_none());
    }

    #[test]
    fn ray_box_entry_inside_reports_zero() {
        let inside = ray_box_entry(Vec3::ZERO, Vec3::X, Vec3::ZERO, Vec3::splat(2.0));
        assert_eq!(inside, Some(0.0));
    }

    #[test]
    fn ray_box_entry_parallel_ray_outside_slab_misses() {
        let miss = ray_box_entry(
            Vec3::new(0.0, 5.0, 0.0),
            Vec3::X,
            Vec3::ZERO,
            Vec3::splat(1.0),
        );
        assert!(miss.is_none());
    }

    #[test]
    fn highlighted_emissive_brightens_without_erasing_the_original() {
        let dark = LinearRgba::new(0.0, 0.0, 0.0, 1.0);
        let lifted = highlighted_emissive(dark);
        assert!(lifted.red > 0.5);
        assert!(lifted.green > lifted.blue);

        let warm = LinearRgba::new(3.0, 1.6, 0.5, 1.0);
        let blended = highlighted_emissive(warm);
        assert!(blended.red < warm.red, "blend pulls toward the accent");
    }

    fn highlight_app() -> (App, Entity, Handle<StandardMaterial>) {
        let mut app = App::new();
        app.insert_resource(FocusState::default());
        app.insert_resource(HighlightLedger::default());
        app.insert_resource(PartRegistry::default());
        app.insert_resource(Assets::<StandardMaterial>::default());
        app.add_systems(Update, apply_focus_highlight);

        let handle = app
            .world_mut()
            .resource_mut::<Assets<StandardMaterial>>()
            .add(StandardMaterial {
                emissive: LinearRgba::new(0.2, 0.1, 0.05, 1.0),
                ..default()
            });

        let root = app
            .world_mut()
            .spawn((
                PartRoot {
                    key: "separator".to_string(),
                },
                Transform::default(),
                BaseScale(Vec3::ONE),
            ))
            .id();
        let mesh_child = app
            .world_mut()
            .spawn((MeshMaterial3d(handle.clone()), Transform::default()))
            .id();
        app.world_mut().entity_mut(root).add_child(mesh_child);

        app.world_mut().resource_mut::<PartRegistry>().register(
            PartSpec {
                key: "separator".to_string(),
                final_position: Point3::ZERO,
                exploded_position: Point3::new(0.0, 5.0, 0.0),
            },
            root,
            PartBounds {
                center: Vec3::new(0.0, 1.0, 0.0),
                half_extents: Vec3::ONE,
            },
        );

        (app, root, handle)
    }

    fn emissive_of(app: &App, handle: &Handle<StandardMaterial>) -> LinearRgba {
        app.world()
            .resource::<Assets<StandardMaterial>>()
            .get(handle)
            .expect("material")
            .emissive
    }

    #[test]
    fn focus_highlights_and_clearing_restores_exactly() {
        let (mut app, _root, handle) = highlight_app();
        let original = emissive_of(&app, &handle);

        app.world_mut()
            .resource_mut::<FocusState>()
            .set(Some("separator".to_string()));
        app.update();
        let highlighted = emissive_of(&app, &handle);
        assert_ne!(highlighted, original);

        app.world_mut().resource_mut::<FocusState>().set(None);
        app.update();
        assert_eq!(emissive_of(&app, &handle), original);
    }

    #[test]
    fn refocusing_the_same_part_never_compounds() {
        let (mut app, _root, handle) = highlight_app();

        app.world_mut()
            .resource_mut::<FocusState>()
            .set(Some("separator".to_string()));
        app.update();
        let once = emissive_of(&app, &handle);

        // Touch the resource again with the same key.
        app.world_mut()
            .resource_mut::<FocusState>()
            .set(Some("separator".to_string()));
        app.update();
        assert_eq!(emissive_of(&app, &handle), once);
    }

    #[test]
    fn focusing_attaches_a_pulse_to_the_root() {
        let (mut app, root, _handle) = highlight_app();
        app.world_mut()
            .resource_mut::<FocusState>()
            .set(Some("separator".to_string()));
        app.update();
        assert!(app.world().get::<FocusPulse>(root).is_some());
    }

    #[test]
    fn unknown_focus_key_is_a_no_op() {
        let (mut app, _root, handle) = highlight_app();
        let original = emissive_of(&app, &handle);

        app.world_mut()
            .resource_mut::<FocusState>()
            .set(Some("no-such-part".to_string()));
        app.update();
        assert_eq!(emissive_of(&app, &handle), original);
    }

    #[test]
    fn pulse_swells_then_returns_to_base_scale() {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.add_systems(Update, update_focus_pulse);

        let entity = app
            .world_mut()
            .spawn((
                FocusPulse { elapsed_secs: 0.0 },
                Transform::default(),
                BaseScale(Vec3::ONE),
            ))
            .id();

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(std::time::Duration::from_millis(200));
        app.update();
        let swollen = app.world().get::<Transform>(entity).expect("pulse").scale;
        assert!(swollen.x > 1.0);

        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(std::time::Duration::from_millis(400));
        app.update();
        let settled = app.world().get::<Transform>(entity).expect("pulse").scale;
        assert_eq!(settled, Vec3::ONE);
        assert!(app.world().get::<FocusPulse>(entity).is_none());
    }
}
