use std::collections::HashMap;

use bevy::prelude::*;

use facility_twin::telemetry::{
    pulse_exceeded, MetricKind, ReadoutSnapshot, ReadoutThrottle, TelemetrySim,
};

/// How long a readout pulse keeps its text emphasized.
pub(super) const READOUT_PULSE_SECS: f32 = 0.6;

/// Owns the synthetic telemetry simulation and the throttled snapshot the
/// panel reads. Animated visuals read `sim` directly (continuous values);
/// text readouts go through `readout` (at most ~4 Hz).
#[derive(Resource, Default)]
pub(super) struct TelemetryFeed {
    pub sim: TelemetrySim,
    pub readout: ReadoutSnapshot,
    pub readout_generation: u64,
    throttle: ReadoutThrottle,
    pulse_timers: HashMap<MetricKind, f32>,
}

impl TelemetryFeed {
    /// Remaining pulse emphasis for a metric in `[0, 1]`.
    pub fn pulse_frac(&self, kind: MetricKind) -> f32 {
        self.pulse_timers
            .get(&kind)
            .map(|remaining| (remaining / READOUT_PULSE_SECS).clamp(0.0, 1.0))
            .unwrap_or(0.0)
    }
}

pub(super) fn advance_telemetry(time: Res<Time>, mut feed: ResMut<TelemetryFeed>) {
    let dt = time.delta_secs();
    let feed = feed.as_mut();

    feed.sim.advance(dt);
    for remaining in feed.pulse_timers.values_mut() {
        *remaining -= dt;
    }
    feed.pulse_timers.retain(|_, remaining| *remaining > 0.0);

    let now = feed.sim.elapsed_secs();
    if !feed.throttle.due(now) {
        return;
    }

    let next = ReadoutSnapshot::from_sim(&feed.sim);
    if feed.readout_generation > 0 {
        for kind in MetricKind::ALL {
            let (Some(previous), Some(current)) =
                (feed.readout.value(kind), next.value(kind))
            else {
                continue;
            };
            if pulse_exceeded(kind, previous, current) {
                feed.pulse_timers.insert(kind, READOUT_PULSE_SECS);
            }
        }
    }
    feed.readout = next;
    feed.readout_generation += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn feed_app() -> App {
        let mut app = App::new();
        app.insert_resource(Time::<()>::default());
        app.insert_resource(TelemetryFeed::default());
        app.add_systems(Update, advance_telemetry);
        app
    }

    fn step(app: &mut App, millis: u64) {
        app.world_mut()
            .resource_mut::<Time>()
            .advance_by(Duration::from_millis(millis));
        app.update();
    }

    #[test]
    fn readouts_refresh_at_a_bounded_rate() {
        let mut app = feed_app();

        // 60 frames over one second: far more updates than snapshots.
        for _ in 0..60 {
            step(&mut app, 16);
        }

        let feed = app.world().resource::<TelemetryFeed>();
        assert!(feed.readout_generation >= 3);
        assert!(feed.readout_generation <= 5);
        assert!(!feed.readout.values.is_empty());
    }

    #[test]
    fn displayed_values_move_every_frame() {
        let mut app = feed_app();
        step(&mut app, 1_600); // past the first target tick
        let before = app
            .world()
            .resource::<TelemetryFeed>()
            .sim
            .displayed(MetricKind::GasRate);
        step(&mut app, 16);
        let after = app
            .world()
            .resource::<TelemetryFeed>()
            .sim
            .displayed(MetricKind::GasRate);
        assert!((after - before).abs() > 0.0);
    }

    #[test]
    fn pulses_fire_on_threshold_jumps_and_decay() {
        let mut app = feed_app();
        step(&mut app, 300); // publish the first snapshot

        app.world_mut()
            .resource_mut::<TelemetryFeed>()
            .sim
            .force_target(MetricKind::OilRate, 900.0);
        // Let smoothing carry the displayed value across the 3.5% pulse
        // threshold, then cross a snapshot boundary.
        step(&mut app, 150);
        step(&mut app, 150);

        let fresh = app
            .world()
            .resource::<TelemetryFeed>()
            .pulse_frac(MetricKind::OilRate);
        assert!(fresh > 0.0, "jump must register a pulse");

        // A short step that stays inside the snapshot interval can only
        // decay the timer, never refresh it.
        step(&mut app, 100);
        let decayed = app
            .world()
            .resource::<TelemetryFeed>()
            .pulse_frac(MetricKind::OilRate);
        assert!(decayed < fresh);
        assert!(decayed > 0.0);
    }

    #[test]
    fn first_snapshot_never_pulses() {
        let mut app = feed_app();
        step(&mut app, 300);
        let feed = app.world().resource::<TelemetryFeed>();
        for kind in MetricKind::ALL {
            assert_eq!(feed.pulse_frac(kind), 0.0);
        }
    }
}
