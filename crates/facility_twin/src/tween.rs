use crate::geometry::Point3;

/// Cubic ease-in-out over `t` in `[0, 1]`.
pub fn ease_in_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let f = -2.0 * t + 2.0;
        1.0 - f * f * f / 2.0
    }
}

/// Cubic ease-out over `t` in `[0, 1]`.
pub fn ease_out_cubic(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    let f = 1.0 - t;
    1.0 - f * f * f
}

/// Time-bounded interpolation of a position, with a launch delay during
/// which the start value holds.
#[derive(Clone, Copy, Debug)]
pub struct Tween {
    pub start: Point3,
    pub end: Point3,
    pub delay_secs: f32,
    pub duration_secs: f32,
    elapsed_secs: f32,
}

impl Tween {
    pub fn new(start: Point3, end: Point3, delay_secs: f32, duration_secs: f32) -> Self {
        Self {
            start,
            end,
            delay_secs: delay_secs.max(0.0),
            duration_secs: duration_secs.max(f32::EPSILON),
            elapsed_secs: 0.0,
        }
    }

    /// Advance by one frame delta and return the current position.
    pub fn advance(&mut self, dt_secs: f32) -> Point3 {
        if dt_secs.is_finite() && dt_secs > 0.0 {
            self.elapsed_secs += dt_secs;
        }
        self.sample()
    }

    pub fn sample(&self) -> Point3 {
        let active_secs = self.elapsed_secs - self.delay_secs;
        if active_secs <= 0.0 {
            return self.start;
        }
        let progress = ease_in_out_cubic(active_secs / self.duration_secs);
        self.start.lerp(self.end, progress)
    }

    pub fn finished(&self) -> bool {
        self.elapsed_secs >= self.delay_secs + self.duration_secs
    }
}
