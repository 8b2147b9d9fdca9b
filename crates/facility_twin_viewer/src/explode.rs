use std::collections::HashMap;

use bevy::prelude::*;

use facility_twin::assembly::ExplodeMachine;
use facility_twin::geometry::Point3;

use crate::scene_assembly::{to_point, to_vec3, PartRegistry, PartRoot};

/// Explode/assemble machine state shared between the keyboard shortcut, the
/// panel button, and the per-frame tween driver.
#[derive(Resource, Default)]
pub(super) struct ExplodeState {
    pub machine: ExplodeMachine,
}

/// One-shot toggle request raised by the panel; consumed next frame.
#[derive(Resource, Default)]
pub(super) struct ExplodeRequest {
    pub queued: bool,
}

pub(super) fn handle_explode_requests(
    keys: Res<ButtonInput<KeyCode>>,
    registry: Res<PartRegistry>,
    mut request: ResMut<ExplodeRequest>,
    mut state: ResMut<ExplodeState>,
    roots: Query<(&Transform, &PartRoot)>,
) {
    let toggle = request.queued || keys.just_pressed(KeyCode::KeyE);
    if !toggle {
        return;
    }
    request.queued = false;

    if registry.catalog.is_empty() {
        return;
    }

    // Tweens restart from wherever each part is right now, so re-toggling
    // mid-cascade reverses smoothly.
    let current: HashMap<String, Point3> = roots
        .iter()
        .map(|(transform, part)| (part.key.clone(), to_point(transform.translation)))
        .collect();
    state.machine.toggle(&registry.catalog, &current);
}

pub(super) fn drive_explode_tweens(
    time: Res<Time>,
    registry: Res<PartRegistry>,
    mut state: ResMut<ExplodeState>,
    mut transforms: Query<&mut Transform, With<PartRoot>>,
) {
    if state.machine.is_settled() {
        return;
    }

    for (key, position) in state.machine.advance(time.delta_secs()) {
        let Some(entity) = registry.root_of(&key) else {
            continue;
        };
        if let Ok(mut transform) = transforms.get_mut(entity) {
            transform.translation = to_vec3(position);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facility_twin::assembly::{AssemblyState, PartSpec};
    use crate::scene_assembly::PartBounds;
    use std::time::Duration;

    fn explode_app() -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.insert_resource(ButtonInput::<KeyCode>::default());
        app.insert_resource(ExplodeState::default());
        app.insert_resource(ExplodeRequest::default());
        app.insert_resource(PartRegistry::default());
        app.add_systems(Update, (handle_explode_requests, drive_explode_tweens).chain());

        for (key, x) in [("separator", 0.0_f32), ("flare-stack", 8.0)] {
            let position = Vec3::new(x, 0.0, 0.0);
            let entity = app
                .world_mut()
                .spawn((
                    PartRoot {
                        key: key.to_string(),
                    },
                    Transform::from_translation(position),
                ))
                .id();
            app.world_mut().resource_mut::<PartRegistry>().register(
                PartSpec {
                    key: key.to_string(),
                    final_position: to_point(position),
                    exploded_position: to_point(position + Vec3::new(0.0, 5.0, -3.0)),
                },
                entity,
                PartBounds {
                    center: Vec3::new(0.0, 1.0, 0.0),
                    half_extents: Vec3::ONE,
                },
            );
        }
        app
    }

    fn step(app: &mut App, millis: u64) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(millis));
        app.update();
    }

    fn part_translation(app: &mut App, key: &str) -> Vec3 {
        let entity = app
            .world()
            .resource::<PartRegistry>()
            .root_of(key)
            .expect("registered part");
        app.world()
            .get::<Transform>(entity)
            .expect("part transform")
            .translation
    }

    #[test]
    fn queued_request_runs_the_full_cascade() {
        let mut app = explode_app();
        app.world_mut().resource_mut::<ExplodeRequest>().queued = true;

        for _ in 0..120 {
            step(&mut app, 16);
        }

        let state = app.world().resource::<ExplodeState>();
        assert_eq!(state.machine.state(), AssemblyState::Exploded);
        assert!(state.machine.is_settled());

        let registry_positions: Vec<(String, Vec3)> = {
            let registry = app.world().resource::<PartRegistry>();
            registry
                .catalog
                .iter()
                .map(|spec| {
                    (
                        spec.key.clone(),
                        to_vec3(spec.target_for(AssemblyState::Exploded)),
                    )
                })
                .collect()
        };
        for (key, expected) in registry_positions {
            assert!(part_translation(&mut app, &key).distance(expected) < 1e-3);
        }
    }

    #[test]
    fn key_press_toggles_like_the_button() {
        let mut app = explode_app();
        app.world_mut()
            .resource_mut::<ButtonInput<KeyCode>>()
            .press(KeyCode::KeyE);
        step(&mut app, 16);

        let state = app.world().resource::<ExplodeState>();
        assert_eq!(state.machine.state(), AssemblyState::Exploded);
        assert!(!state.machine.is_settled());
    }

    #[test]
    fn re_toggle_mid_cascade_returns_home() {
        let mut app = explode_app();
        app.world_mut().resource_mut::<ExplodeRequest>().queued = true;
        for _ in 0..20 {
            step(&mut app, 16);
        }
        // Parts are mid-flight; queue the reverse toggle.
        app.world_mut().resource_mut::<ExplodeRequest>().queued = true;
        for _ in 0..120 {
            step(&mut app, 16);
        }

        let state = app.world().resource::<ExplodeState>();
        assert_eq!(state.machine.state(), AssemblyState::Assembled);
        assert!(state.machine.is_settled());
        assert!(part_translation(&mut app, "separator").distance(Vec3::ZERO) < 1e-3);
    }
}
