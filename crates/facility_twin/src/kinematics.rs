/// Angular rate of the pumpjack crank, radians per second.
pub const PUMP_PHASE_RATE: f32 = 1.4;

/// Linkage dimensions for the beam pump, in scene units. The beam pivot is
/// the samson-post bearing; the crank pin orbits the gearbox center.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinkageGeometry {
    pub crank_radius: f32,
    pub pitman_length: f32,
    /// Horizontal reach from the beam pivot back to the pitman attachment.
    pub beam_rear_reach: f32,
    /// Peak beam rocking angle, radians.
    pub beam_amplitude: f32,
    /// Full vertical travel of the polished rod.
    pub rod_travel: f32,
    /// Height of the beam pivot above the gearbox center.
    pub pivot_height: f32,
}

impl Default for LinkageGeometry {
    fn default() -> Self {
        Self {
            crank_radius: 0.9,
            pitman_length: 2.6,
            beam_rear_reach: 1.7,
            beam_amplitude: 0.28,
            rod_travel: 1.6,
            pivot_height: 3.4,
        }
    }
}

/// One kinematically consistent pose of the pumpjack mechanism. Every field
/// derives from the same phase angle, so linked parts cannot drift apart.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PumpjackPose {
    pub crank_angle: f32,
    pub beam_angle: f32,
    pub pitman_angle: f32,
    /// Vertical offset of the polished rod from mid-stroke.
    pub rod_offset: f32,
    /// Crank pin position relative to the gearbox center (x, y).
    pub pin_offset: (f32, f32),
}

pub fn pumpjack_pose(phase: f32, geometry: &LinkageGeometry) -> PumpjackPose {
    let pin_offset = (
        phase.sin() * geometry.crank_radius,
        phase.cos() * geometry.crank_radius,
    );
    let beam_angle = phase.sin() * geometry.beam_amplitude;
    let rod_offset = phase.sin() * geometry.rod_travel * 0.5;

    // Pitman leans between the crank pin and the beam's rear attachment.
    let attach_x = -geometry.beam_rear_reach * beam_angle.cos();
    let attach_y = geometry.pivot_height - geometry.beam_rear_reach * beam_angle.sin();
    let delta_x = attach_x - pin_offset.0;
    let delta_y = attach_y - pin_offset.1;
    // Angle from vertical, so a perfectly upright pitman reads zero.
    let pitman_angle = delta_x.atan2(delta_y);

    PumpjackPose {
        crank_angle: phase,
        beam_angle,
        pitman_angle,
        rod_offset,
        pin_offset,
    }
}

/// Spin rate for rotating equipment driven by a live metric:
/// `base + clamp(live, 0, cap) * gain`. Integrated by the caller as
/// `rotation += rate * dt`, so pausing never causes a jump.
pub fn rotor_rate(base_rate: f32, live_rate: f32, cap: f32, gain: f32) -> f32 {
    base_rate + live_rate.clamp(0.0, cap) * gain
}
