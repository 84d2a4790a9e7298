//! Quaternion utilities for 3D rotations.
//!
//! Convention: q = [w; x; y; z] where w is scalar, (x,y,z) is vector part.

use crate::{Mat3, Vec3};

/// A unit quaternion representing a 3D rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quat {
    /// Scalar part (w).
    pub w: f64,
    /// Vector part (x, y, z).
    pub v: Vec3,
}

impl Quat {
    /// Create a new quaternion from scalar and vector parts.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            w,
            v: Vec3::new(x, y, z),
        }
    }

    /// Identity quaternion (no rotation).
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            v: Vec3::zeros(),
        }
    }

    /// Create quaternion from axis-angle representation.
    /// axis should be a unit vector, angle in radians.
    pub fn from_axis_angle(axis: &Vec3, angle: f64) -> Self {
        let half_angle = angle * 0.5;
        let (s, c) = half_angle.sin_cos();
        Self { w: c, v: *axis * s }
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn about_z(angle: f64) -> Self {
        Self::from_axis_angle(&Vec3::new(0.0, 0.0, 1.0), angle)
    }

    /// Normalize this quaternion to unit length.
    pub fn normalize(&self) -> Self {
        let norm = (self.w * self.w + self.v.norm_squared()).sqrt();
        if norm < 1e-12 {
            return Self::identity();
        }
        Self {
            w: self.w / norm,
            v: self.v / norm,
        }
    }

    /// Quaternion multiplication: self * other.
    pub fn mul(&self, other: &Quat) -> Quat {
        Quat {
            w: self.w * other.w - self.v.dot(&other.v),
            v: self.v.cross(&other.v) + other.v * self.w + self.v * other.w,
        }
    }

    /// Conjugate of the quaternion (inverse for unit quaternions).
    pub fn conjugate(&self) -> Quat {
        Quat {
            w: self.w,
            v: -self.v,
        }
    }

    /// Rotate a vector by this quaternion: R(q) * p.
    pub fn rotate(&self, p: &Vec3) -> Vec3 {
        // q p q* expanded; cheaper than building the matrix.
        let t = self.v.cross(p) * 2.0;
        *p + t * self.w + self.v.cross(&t)
    }

    /// Rotate a vector by the inverse rotation: R(q)ᵀ * p.
    pub fn rotate_back(&self, p: &Vec3) -> Vec3 {
        self.conjugate().rotate(p)
    }

    /// Convert quaternion to 3x3 rotation matrix.
    pub fn to_matrix(&self) -> Mat3 {
        let w = self.w;
        let x = self.v.x;
        let y = self.v.y;
        let z = self.v.z;

        let x2 = x * x;
        let y2 = y * y;
        let z2 = z * z;
        let xy = x * y;
        let xz = x * z;
        let yz = y * z;
        let wx = w * x;
        let wy = w * y;
        let wz = w * z;

        Mat3::new(
            1.0 - 2.0 * (y2 + z2),
            2.0 * (xy - wz),
            2.0 * (xz + wy),
            2.0 * (xy + wz),
            1.0 - 2.0 * (x2 + z2),
            2.0 * (yz - wx),
            2.0 * (xz - wy),
            2.0 * (yz + wx),
            1.0 - 2.0 * (x2 + y2),
        )
    }

    /// Exponential map: exp(theta u) where theta u is axis-angle representation.
    /// For small angles, uses first-order approximation.
    pub fn exp(w: &Vec3) -> Quat {
        let theta = w.norm();
        if theta < 1e-10 {
            Quat {
                w: 1.0,
                v: *w * 0.5,
            }
            .normalize()
        } else {
            let half_theta = theta * 0.5;
            Quat {
                w: half_theta.cos(),
                v: *w * (half_theta.sin() / theta),
            }
        }
    }

    /// Logarithmic map: log(q) returns the rotation vector theta u such that q = exp(theta u).
    pub fn log(&self) -> Vec3 {
        let v_norm = self.v.norm();
        if v_norm < 1e-10 {
            return Vec3::zeros();
        }
        let angle = 2.0 * v_norm.atan2(self.w);
        self.v * (angle / v_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-10;

    #[test]
    fn test_identity() {
        let q = Quat::identity();
        assert_eq!(q.w, 1.0);
        assert_eq!(q.v, Vec3::zeros());
    }

    #[test]
    fn test_axis_angle() {
        let axis = Vec3::new(0.0, 0.0, 1.0);
        let angle = std::f64::consts::FRAC_PI_2;
        let q = Quat::from_axis_angle(&axis, angle);

        assert!((q.w - (angle / 2.0).cos()).abs() < EPS);
        assert!((q.v.z - (angle / 2.0).sin()).abs() < EPS);
    }

    #[test]
    fn test_multiplication() {
        let axis = Vec3::new(0.0, 0.0, 1.0);
        let q1 = Quat::from_axis_angle(&axis, std::f64::consts::FRAC_PI_2);
        let q2 = Quat::from_axis_angle(&axis, std::f64::consts::FRAC_PI_2);
        let result = q1.mul(&q2);

        let expected = Quat::from_axis_angle(&axis, std::f64::consts::PI);
        assert!((result.w - expected.w).abs() < EPS);
        assert!((result.v - expected.v).norm() < EPS);
    }

    #[test]
    fn test_rotate_matches_matrix() {
        let axis = Vec3::new(1.0, 2.0, 3.0).normalize();
        let q = Quat::from_axis_angle(&axis, 0.7);
        let p = Vec3::new(0.3, -1.2, 2.5);
        assert!((q.rotate(&p) - q.to_matrix() * p).norm() < EPS);
        assert!((q.rotate_back(&p) - q.to_matrix().transpose() * p).norm() < EPS);
    }

    #[test]
    fn test_to_matrix() {
        let q = Quat::about_z(std::f64::consts::FRAC_PI_2);
        let m = q.to_matrix();

        // 90 degree rotation about Z maps X to Y
        let y = m * Vec3::new(1.0, 0.0, 0.0);
        assert!((y - Vec3::new(0.0, 1.0, 0.0)).norm() < EPS);
    }

    #[test]
    fn test_exp_log() {
        let w = Vec3::new(0.1, 0.2, 0.3);
        let q = Quat::exp(&w);
        let w2 = q.log();
        assert!((w - w2).norm() < EPS);
    }

    #[test]
    fn test_conjugate() {
        let q = Quat::new(0.5, 0.5, 0.5, 0.5).normalize();
        let result = q.mul(&q.conjugate());
        assert!((result.w - 1.0).abs() < EPS);
        assert!(result.v.norm() < EPS);
    }
}
