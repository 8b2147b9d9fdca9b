use serde::{Deserialize, Serialize};

/// Minimal 3D point/vector type shared between the simulation core and the
/// viewer. Kept self-contained so the core has no engine math dependency.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Point3 {
    pub const ZERO: Point3 = Point3 {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: Point3) -> f32 {
        (*self - other).length()
    }

    pub fn scaled(&self, factor: f32) -> Point3 {
        Point3::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Linear interpolation; `t` is clamped to `[0, 1]`.
    pub fn lerp(&self, other: Point3, t: f32) -> Point3 {
        let t = t.clamp(0.0, 1.0);
        Point3::new(
            self.x + (other.x - self.x) * t,
            self.y + (other.y - self.y) * t,
            self.z + (other.z - self.z) * t,
        )
    }
}

impl std::ops::Add for Point3 {
    type Output = Point3;

    fn add(self, other: Point3) -> Point3 {
        Point3::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }
}

impl std::ops::Sub for Point3 {
    type Output = Point3;

    fn sub(self, other: Point3) -> Point3 {
        Point3::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_is_clamped_to_endpoints() {
        let a = Point3::new(0.0, 2.0, -4.0);
        let b = Point3::new(8.0, 2.0, 4.0);

        assert_eq!(a.lerp(b, -0.5), a);
        assert_eq!(a.lerp(b, 1.5), b);

        let mid = a.lerp(b, 0.5);
        assert!((mid.x - 4.0).abs() < f32::EPSILON);
        assert!((mid.z - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn distance_matches_difference_length() {
        let a = Point3::new(1.0, 1.0, 1.0);
        let b = Point3::new(4.0, 5.0, 1.0);
        assert!((a.distance(b) - 5.0).abs() < 1e-6);
    }
}
