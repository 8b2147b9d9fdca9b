//! Procedural combustion look: a tapering, flickering silhouette and a
//! temperature-mapped color gradient. The exact noise basis is not part of
//! the visual contract; this one is a hash-based value noise so the result
//! is deterministic for a given time input.

/// Relative strength of silhouette flutter at turbulence 1.0.
const SILHOUETTE_FLUTTER: f32 = 0.22;

/// Relative strength of the global brightness flicker at turbulence 1.0.
const FLICKER_DEPTH: f32 = 0.16;

fn hash01(x: f32) -> f32 {
    let value = (x.sin() * 43_758.547).fract();
    value - value.floor()
}

/// Smoothly interpolated 1D value noise in `[0, 1]`.
fn value_noise(x: f32) -> f32 {
    let cell = x.floor();
    let frac = x - cell;
    let smooth = frac * frac * (3.0 - 2.0 * frac);
    let a = hash01(cell);
    let b = hash01(cell + 1.0);
    a + (b - a) * smooth
}

/// Three-octave fractal value noise in `[0, 1]`.
fn fractal_noise(x: f32) -> f32 {
    let mut amplitude = 0.5;
    let mut frequency = 1.0;
    let mut total = 0.0;
    let mut normalizer = 0.0;
    for _ in 0..3 {
        total += value_noise(x * frequency) * amplitude;
        normalizer += amplitude;
        amplitude *= 0.5;
        frequency *= 2.17;
    }
    total / normalizer
}

/// Silhouette radius multiplier at a normalized height (`0` = base,
/// `1` = tip). Tapers toward the tip and flutters with time; turbulence
/// scales the flutter, zero turbulence gives a steady taper.
pub fn flame_radius(height_frac: f32, time_secs: f32, turbulence: f32) -> f32 {
    let height_frac = height_frac.clamp(0.0, 1.0);
    let taper = (1.0 - height_frac).powf(1.35);
    let ripple = fractal_noise(time_secs * 2.6 + height_frac * 5.0) - 0.5;
    let flutter = 1.0 + ripple * 2.0 * SILHOUETTE_FLUTTER * turbulence.max(0.0) * height_frac;
    (taper * flutter).max(0.0)
}

/// Temperature-mapped color at a normalized height: near-white base through
/// yellow and orange to a deep red tip. Intensity scales linearly and the
/// result stays within `[0, 1]` per channel.
pub fn flame_color(height_frac: f32, intensity: f32) -> (f32, f32, f32) {
    let height_frac = height_frac.clamp(0.0, 1.0);
    let intensity = intensity.max(0.0);

    let r = 1.0;
    let g = 0.92 - height_frac * 0.62;
    let b = 0.55 - height_frac * 0.53;

    (
        (r * intensity).clamp(0.0, 1.0),
        (g * intensity).clamp(0.0, 1.0),
        (b * intensity).clamp(0.0, 1.0),
    )
}

/// Whole-flame brightness multiplier around 1.0, driven by the same noise
/// basis as the silhouette.
pub fn flicker(time_secs: f32, turbulence: f32) -> f32 {
    let ripple = fractal_noise(time_secs * 3.4) - 0.5;
    (1.0 + ripple * 2.0 * FLICKER_DEPTH * turbulence.max(0.0)).max(0.05)
}
