//! Rigid poses and moving frames.
//!
//! `Frame` is a position + orientation. `FrameMoving` additionally carries
//! linear/angular velocity and acceleration (world coordinates) and provides
//! the marker composition and relative 1-in-2 kinematics used by constraints.

use crate::{Quat, Vec3};

/// A rigid pose: position + unit quaternion orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    /// Origin position, in the parent frame.
    pub pos: Vec3,
    /// Orientation, local → parent.
    pub rot: Quat,
}

impl Frame {
    pub fn new(pos: Vec3, rot: Quat) -> Self {
        Self { pos, rot }
    }

    pub fn identity() -> Self {
        Self {
            pos: Vec3::zeros(),
            rot: Quat::identity(),
        }
    }

    pub fn from_translation(pos: Vec3) -> Self {
        Self {
            pos,
            rot: Quat::identity(),
        }
    }

    /// Map a point expressed in this frame into the parent frame.
    pub fn local_to_parent(&self, p: &Vec3) -> Vec3 {
        self.pos + self.rot.rotate(p)
    }

    /// Map a point expressed in the parent frame into this frame.
    pub fn parent_to_local(&self, p: &Vec3) -> Vec3 {
        self.rot.rotate_back(&(p - self.pos))
    }

    /// Compose: `child` expressed in this frame, result in this frame's parent.
    pub fn compose(&self, child: &Frame) -> Frame {
        Frame {
            pos: self.local_to_parent(&child.pos),
            rot: self.rot.mul(&child.rot).normalize(),
        }
    }
}

/// A pose together with its first and second time derivatives.
///
/// Linear velocity/acceleration are of the frame origin, angular
/// velocity/acceleration are of the frame, all in world coordinates.
#[derive(Debug, Clone, Copy)]
pub struct FrameMoving {
    pub frame: Frame,
    pub lin_vel: Vec3,
    pub ang_vel: Vec3,
    pub lin_acc: Vec3,
    pub ang_acc: Vec3,
}

impl FrameMoving {
    pub fn fixed(frame: Frame) -> Self {
        Self {
            frame,
            lin_vel: Vec3::zeros(),
            ang_vel: Vec3::zeros(),
            lin_acc: Vec3::zeros(),
            ang_acc: Vec3::zeros(),
        }
    }

    /// Absolute moving frame of a marker rigidly attached at `local` in this frame.
    pub fn marker(&self, local: &Frame) -> FrameMoving {
        let r = self.frame.rot.rotate(&local.pos);
        FrameMoving {
            frame: Frame {
                pos: self.frame.pos + r,
                rot: self.frame.rot.mul(&local.rot).normalize(),
            },
            lin_vel: self.lin_vel + self.ang_vel.cross(&r),
            ang_vel: self.ang_vel,
            lin_acc: self.lin_acc
                + self.ang_acc.cross(&r)
                + self.ang_vel.cross(&self.ang_vel.cross(&r)),
            ang_acc: self.ang_acc,
        }
    }

    /// Kinematics of `self` (frame 1) relative to `other` (frame 2).
    ///
    /// Position derivatives are expressed in frame-2 coordinates; angular
    /// velocity/acceleration in the relative frame's own (frame-1) coordinates.
    pub fn relative_to(&self, other: &FrameMoving) -> RelFrame {
        let q1 = self.frame.rot;
        let q2 = other.frame.rot;
        let w1 = self.ang_vel;
        let w2 = other.ang_vel;

        let d = self.frame.pos - other.frame.pos;
        let pos = q2.rotate_back(&d);

        // d/dt[R2ᵀ v] = R2ᵀ (v̇ − ω2 × v)
        let u = self.lin_vel - other.lin_vel - w2.cross(&d);
        let pos_dt = q2.rotate_back(&u);

        let u_dot = self.lin_acc
            - other.lin_acc
            - other.ang_acc.cross(&d)
            - w2.cross(&(self.lin_vel - other.lin_vel));
        let pos_dtdt = q2.rotate_back(&(u_dot - w2.cross(&u)));

        let rot = q2.conjugate().mul(&q1).normalize();

        let w_rel = w1 - w2;
        let ang_vel = q1.rotate_back(&w_rel);
        let ang_acc = q1.rotate_back(&(self.ang_acc - other.ang_acc - w1.cross(&w_rel)));

        RelFrame {
            pos,
            rot,
            pos_dt,
            pos_dtdt,
            ang_vel,
            ang_acc,
        }
    }
}

/// Relative kinematics of frame 1 with respect to frame 2.
#[derive(Debug, Clone, Copy)]
pub struct RelFrame {
    /// Relative position, frame-2 coordinates.
    pub pos: Vec3,
    /// Relative orientation q2⁻¹ q1.
    pub rot: Quat,
    /// Relative linear velocity, frame-2 coordinates.
    pub pos_dt: Vec3,
    /// Relative linear acceleration, frame-2 coordinates.
    pub pos_dtdt: Vec3,
    /// Relative angular velocity, local coordinates.
    pub ang_vel: Vec3,
    /// Relative angular acceleration, local coordinates.
    pub ang_acc: Vec3,
}

impl RelFrame {
    /// Relative rotation as a rotation vector (axis * angle).
    pub fn rotation_vector(&self) -> Vec3 {
        self.rot.log()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_roundtrip() {
        let a = Frame::new(Vec3::new(1.0, 2.0, 3.0), Quat::about_z(0.4));
        let b = Frame::new(Vec3::new(-0.5, 0.1, 0.0), Quat::about_z(-1.1));
        let ab = a.compose(&b);
        let p_local = Vec3::new(0.2, 0.3, -0.7);
        let via_compose = ab.local_to_parent(&p_local);
        let via_chain = a.local_to_parent(&b.local_to_parent(&p_local));
        assert_relative_eq!((via_compose - via_chain).norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_marker_velocity_of_spinning_body() {
        // Body spinning about world Z at 2 rad/s; marker at (1,0,0) moves at (0,2,0).
        let body = FrameMoving {
            frame: Frame::identity(),
            lin_vel: Vec3::zeros(),
            ang_vel: Vec3::new(0.0, 0.0, 2.0),
            lin_acc: Vec3::zeros(),
            ang_acc: Vec3::zeros(),
        };
        let m = body.marker(&Frame::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        assert_relative_eq!(m.lin_vel.y, 2.0, epsilon = 1e-12);
        // centripetal acceleration points toward the axis
        assert_relative_eq!(m.lin_acc.x, -4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_translation_along_rotated_frame() {
        // Frame 2 rotated 90° about Z; frame 1 at world (0,1,0) moving along world Y.
        let f2 = FrameMoving::fixed(Frame::new(Vec3::zeros(), Quat::about_z(std::f64::consts::FRAC_PI_2)));
        let f1 = FrameMoving {
            frame: Frame::from_translation(Vec3::new(0.0, 1.0, 0.0)),
            lin_vel: Vec3::new(0.0, 3.0, 0.0),
            ang_vel: Vec3::zeros(),
            lin_acc: Vec3::zeros(),
            ang_acc: Vec3::zeros(),
        };
        let rel = f1.relative_to(&f2);
        // world Y is frame-2's X axis
        assert_relative_eq!(rel.pos.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(rel.pos_dt.x, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_relative_velocity_with_moving_base() {
        // Frame 2 spins about Z; a world-fixed frame 1 at (1,0,0) appears to
        // move backwards in frame-2 coordinates with speed ω × r.
        let f2 = FrameMoving {
            frame: Frame::identity(),
            lin_vel: Vec3::zeros(),
            ang_vel: Vec3::new(0.0, 0.0, 1.5),
            lin_acc: Vec3::zeros(),
            ang_acc: Vec3::zeros(),
        };
        let f1 = FrameMoving::fixed(Frame::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let rel = f1.relative_to(&f2);
        assert_relative_eq!(rel.pos_dt.y, -1.5, epsilon = 1e-12);
        // apparent centripetal term: d/dt(pos_dt) has an inward x component
        assert_relative_eq!(rel.pos_dtdt.x, -2.25, epsilon = 1e-12);
        assert_relative_eq!(rel.ang_vel.z, -1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_vector_about_z() {
        let f2 = FrameMoving::fixed(Frame::identity());
        let f1 = FrameMoving::fixed(Frame::new(Vec3::zeros(), Quat::about_z(0.3)));
        let rel = f1.relative_to(&f2);
        assert_relative_eq!(rel.rotation_vector().z, 0.3, epsilon = 1e-12);
    }
}
