use bevy::prelude::*;

use facility_twin::kinematics::{pumpjack_pose, rotor_rate, LinkageGeometry, PUMP_PHASE_RATE};
use facility_twin::telemetry::MetricKind;

use crate::scene_assembly::{
    PumpBeam, PumpCrank, PumpPitman, PumpRod, RestTranslation, SpinRotor,
};
use crate::telemetry_feed::TelemetryFeed;

/// Half the nominal stroke rate is the floor; the live oil rate supplies
/// the rest of the speed.
const PUMP_BASE_RATE: f32 = PUMP_PHASE_RATE * 0.5;
const PUMP_RATE_GAIN: f32 = 0.0015;
const PUMP_RATE_CAP: f32 = 600.0;

/// Integrated crank phase. Kept as a resource so rate changes speed the
/// motion up or down without ever snapping the mechanism.
#[derive(Resource, Default)]
pub(super) struct PumpPhase {
    pub radians: f32,
}

pub(super) fn animate_pumpjack(
    time: Res<Time>,
    feed: Res<TelemetryFeed>,
    mut phase: ResMut<PumpPhase>,
    mut cranks: Query<
        &mut Transform,
        (
            With<PumpCrank>,
            Without<PumpBeam>,
            Without<PumpPitman>,
            Without<PumpRod>,
        ),
    >,
    mut beams: Query<
        &mut Transform,
        (With<PumpBeam>, Without<PumpPitman>, Without<PumpRod>),
    >,
    mut pitmans: Query<
        (&mut Transform, &RestTranslation),
        (With<PumpPitman>, Without<PumpRod>),
    >,
    mut rods: Query<(&mut Transform, &RestTranslation), With<PumpRod>>,
) {
    let oil_rate = feed.sim.displayed(MetricKind::OilRate);
    let rate = rotor_rate(PUMP_BASE_RATE, oil_rate, PUMP_RATE_CAP, PUMP_RATE_GAIN);
    phase.radians += rate * time.delta_secs();

    let geometry = LinkageGeometry::default();
    let pose = pumpjack_pose(phase.radians, &geometry);

    for mut transform in &mut cranks {
        transform.rotation = Quat::from_rotation_z(-pose.crank_angle);
    }
    for mut transform in &mut beams {
        transform.rotation = Quat::from_rotation_z(pose.beam_angle);
    }
    for (mut transform, rest) in &mut pitmans {
        transform.translation =
            rest.0 + Vec3::new(pose.pin_offset.0, pose.pin_offset.1, 0.0);
        transform.rotation = Quat::from_rotation_z(-pose.pitman_angle);
    }
    for (mut transform, rest) in &mut rods {
        transform.translation = Vec3::new(rest.0.x, rest.0.y + pose.rod_offset, rest.0.z);
    }
}

/// Integrates `rotation += rate * dt` for fans and impellers; the rate is
/// recomputed from the live metric every frame.
pub(super) fn spin_rotors(
    time: Res<Time>,
    feed: Res<TelemetryFeed>,
    mut rotors: Query<(&SpinRotor, &mut Transform)>,
) {
    let dt = time.delta_secs();
    for (rotor, mut transform) in &mut rotors {
        let live = feed.sim.displayed(rotor.metric);
        let rate = rotor_rate(rotor.base_rate, live, rotor.cap, rotor.gain);
        let step = Quat::from_axis_angle(rotor.axis, rate * dt);
        transform.rotation = transform.rotation * step;
    }
}
