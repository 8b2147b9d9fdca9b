use bevy::ecs::message::MessageReader;
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;

use facility_twin::tween::ease_out_cubic;

use super::{FocusState, TwinCamera, UI_PANEL_WIDTH};
use crate::scene_assembly::PartRegistry;

const ORBIT_ROTATE_SENSITIVITY: f32 = 0.005;
const ORBIT_PAN_SENSITIVITY: f32 = 0.002;
const ORBIT_ZOOM_SENSITIVITY: f32 = 0.2;
const ORBIT_MIN_RADIUS: f32 = 3.0;
const ORBIT_MAX_RADIUS: f32 = 160.0;
const DEFAULT_CAMERA_RADIUS: f32 = 34.0;
const FOCUS_TWEEN_SECS: f32 = 0.8;
const FRAME_PADDING: f32 = 2.2;
const FRAME_MIN_RADIUS: f32 = 6.0;
const DEFAULT_VERTICAL_FOV: f32 = std::f32::consts::FRAC_PI_4;

/// Focus-point orbit rig: yaw/pitch around a focus at a given radius.
#[derive(Component, Clone, Copy, Debug)]
pub(super) struct OrbitCamera {
    pub focus: Vec3,
    pub radius: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl OrbitCamera {
    pub fn apply_to_transform(&self, transform: &mut Transform) {
        let rotation = Quat::from_axis_angle(Vec3::Y, self.yaw)
            * Quat::from_axis_angle(Vec3::X, self.pitch);
        let offset = rotation * Vec3::new(0.0, 0.0, self.radius);
        transform.translation = self.focus + offset;
        transform.look_at(self.focus, Vec3::Y);
    }
}

pub(super) fn default_orbit() -> OrbitCamera {
    OrbitCamera {
        focus: Vec3::new(0.0, 2.0, 0.0),
        radius: DEFAULT_CAMERA_RADIUS,
        yaw: -0.7,
        pitch: -0.45,
    }
}

#[derive(Resource, Default)]
pub(super) struct OrbitDragState {
    last_cursor_position: Option<Vec2>,
}

/// In-flight camera framing move. While active it owns the camera; orbit
/// input resumes once it lands.
struct CameraTween {
    from_focus: Vec3,
    to_focus: Vec3,
    from_radius: f32,
    to_radius: f32,
    elapsed_secs: f32,
    duration_secs: f32,
}

#[derive(Resource, Default)]
pub(super) struct CameraTweenState {
    active: Option<CameraTween>,
    last_framed: Option<String>,
}

impl CameraTweenState {
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }
}

pub(super) fn orbit_camera_controls(
    windows: Query<&Window, With<PrimaryWindow>>,
    buttons: Res<ButtonInput<MouseButton>>,
    keys: Res<ButtonInput<KeyCode>>,
    tween_state: Res<CameraTweenState>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mut drag_state: ResMut<OrbitDragState>,
    mut query: Query<(&mut OrbitCamera, &mut Transform), With<TwinCamera>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };

    let cursor_position = window.cursor_position();
    let cursor_in_view = cursor_position
        .map(|cursor| cursor_in_3d_view(window, cursor))
        .unwrap_or(false);

    // A framing tween owns the camera; drop this frame's input.
    if tween_state.is_active() {
        drag_state.last_cursor_position = None;
        for _ in mouse_wheel.read() {}
        return;
    }

    let shift_pressed = keys.pressed(KeyCode::ShiftLeft) || keys.pressed(KeyCode::ShiftRight);
    let rotate_drag = buttons.pressed(MouseButton::Left) && !shift_pressed;
    let pan_drag = buttons.pressed(MouseButton::Right)
        || buttons.pressed(MouseButton::Middle)
        || (buttons.pressed(MouseButton::Left) && shift_pressed);
    let dragging = cursor_in_view && (rotate_drag || pan_drag);

    let (delta, next_cursor) =
        drag_delta(drag_state.last_cursor_position, cursor_position, dragging);
    drag_state.last_cursor_position = next_cursor;

    let mut scroll = 0.0;
    for event in mouse_wheel.read() {
        if cursor_in_view {
            scroll += normalized_mouse_wheel_delta(event.unit, event.y);
        }
    }

    if delta == Vec2::ZERO && scroll == 0.0 {
        return;
    }

    let Ok((mut orbit, mut transform)) = query.single_mut() else {
        return;
    };

    if rotate_drag && delta != Vec2::ZERO {
        orbit.yaw -= delta.x * ORBIT_ROTATE_SENSITIVITY;
        orbit.pitch = (orbit.pitch - delta.y * ORBIT_ROTATE_SENSITIVITY).clamp(-1.54, 1.54);
    } else if pan_drag && delta != Vec2::ZERO {
        let rotation = Quat::from_axis_angle(Vec3::Y, orbit.yaw)
            * Quat::from_axis_angle(Vec3::X, orbit.pitch);
        let right = rotation * Vec3::X;
        let up = rotation * Vec3::Y;
        let pan_scale = orbit.radius * ORBIT_PAN_SENSITIVITY;
        orbit.focus += (-delta.x * pan_scale) * right + (delta.y * pan_scale) * up;
    }

    if scroll != 0.0 {
        orbit.radius = (orbit.radius * (1.0 - scroll * ORBIT_ZOOM_SENSITIVITY))
            .clamp(ORBIT_MIN_RADIUS, ORBIT_MAX_RADIUS);
    }

    orbit.apply_to_transform(&mut transform);
}

fn cursor_in_3d_view(window: &Window, cursor: Vec2) -> bool {
    let viewport_width = (window.width() - UI_PANEL_WIDTH).max(0.0);
    cursor.x <= viewport_width
}

fn drag_delta(
    previous: Option<Vec2>,
    current: Option<Vec2>,
    dragging: bool,
) -> (Vec2, Option<Vec2>) {
    if !dragging {
        return (Vec2::ZERO, None);
    }

    let Some(cursor) = current else {
        return (Vec2::ZERO, None);
    };

    let delta = previous.map(|last| cursor - last).unwrap_or(Vec2::ZERO);
    (delta, Some(cursor))
}

fn normalized_mouse_wheel_delta(unit: MouseScrollUnit, y: f32) -> f32 {
    match unit {
        MouseScrollUnit::Line => y,
        MouseScrollUnit::Pixel => y / MouseScrollUnit::SCROLL_UNIT_CONVERSION_FACTOR,
    }
}

/// When focus lands on a part, start a camera move that frames its bounds
/// while keeping the current viewing angle. Clearing focus leaves the camera
/// where it is.
pub(super) fn start_focus_framing(
    focus: Res<FocusState>,
    registry: Res<PartRegistry>,
    cameras: Query<(&OrbitCamera, &Projection), With<TwinCamera>>,
    transforms: Query<&Transform>,
    mut tween_state: ResMut<CameraTweenState>,
) {
    if !focus.is_changed() {
        return;
    }
    if tween_state.last_framed == focus.current {
        return;
    }
    tween_state.last_framed = focus.current.clone();

    let Some(key) = focus.current.as_deref() else {
        return;
    };
    let Some(entity) = registry.root_of(key) else {
        return;
    };
    let Some(bounds) = registry.bounds_of(key) else {
        return;
    };
    let Ok((orbit, projection)) = cameras.single() else {
        return;
    };
    let Ok(root_transform) = transforms.get(entity) else {
        return;
    };

    let vertical_fov = match projection {
        Projection::Perspective(perspective) => perspective.fov,
        _ => DEFAULT_VERTICAL_FOV,
    };
    tween_state.active = Some(CameraTween {
        from_focus: orbit.focus,
        to_focus: root_transform.translation + bounds.center,
        from_radius: orbit.radius,
        to_radius: framing_radius(bounds.half_extents, vertical_fov),
        elapsed_secs: 0.0,
        duration_secs: FOCUS_TWEEN_SECS,
    });
}

pub(super) fn advance_camera_tween(
    time: Res<Time>,
    mut tween_state: ResMut<CameraTweenState>,
    mut query: Query<(&mut OrbitCamera, &mut Transform), With<TwinCamera>>,
) {
    let Some(tween) = tween_state.active.as_mut() else {
        return;
    };
    tween.elapsed_secs += time.delta_secs();
    let progress = (tween.elapsed_secs / tween.duration_secs).clamp(0.0, 1.0);
    let eased = ease_out_cubic(progress);

    let Ok((mut orbit, mut transform)) = query.single_mut() else {
        tween_state.active = None;
        return;
    };
    orbit.focus = tween.from_focus.lerp(tween.to_focus, eased);
    orbit.radius = tween.from_radius + (tween.to_radius - tween.from_radius) * eased;
    orbit.apply_to_transform(&mut transform);

    if progress >= 1.0 {
        tween_state.active = None;
    }
}

/// Distance that fits the largest dimension of a part in the vertical field
/// of view with breathing room. Tiny parts clamp to a comfortable minimum.
fn framing_radius(half_extents: Vec3, vertical_fov: f32) -> f32 {
    let span = half_extents.max_element().max(0.05);
    let fitted = span * FRAME_PADDING / (vertical_fov * 0.5).tan();
    fitted.clamp(FRAME_MIN_RADIUS, ORBIT_MAX_RADIUS)
}
