//! Math primitives for the rheon motor-constraint engine.
//!
//! Provides unit quaternions, rigid poses (`Frame`), moving poses with
//! first and second derivatives (`FrameMoving`), and the relative
//! 1-in-2 kinematics transform used by frame constraints.

pub mod frame;
pub mod quaternion;

pub use frame::{Frame, FrameMoving, RelFrame};
pub use quaternion::Quat;

use nalgebra as na;

/// 3D vector alias.
pub type Vec3 = na::Vector3<f64>;
/// 3x3 matrix alias.
pub type Mat3 = na::Matrix3<f64>;
/// 6D vector alias.
pub type Vec6 = na::Vector6<f64>;
/// Dynamic vector.
pub type DVec = na::DVector<f64>;
/// Dynamic matrix.
pub type DMat = na::DMatrix<f64>;

/// Cross-product matrix: [v]× such that [v]× w = v × w.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}

/// Standard gravity (m/s²).
pub const GRAVITY: f64 = 9.81;
