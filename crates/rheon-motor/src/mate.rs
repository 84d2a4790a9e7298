//! Two-frame bilateral constraint base: lock patterns and constraint rows.
//!
//! `MateFrames` tracks the relative kinematics of two marker frames on two
//! bodies and produces one constraint row per locked relative DOF. Row
//! ordering is x, y, z, rx, ry, rz. Translation rows are expressed along the
//! frame-2 axes; rotation rows come from the imaginary part of the relative
//! quaternion, optionally measured against a frame 2 pre-rotated about its Z
//! axis (the rotating auxiliary frame used by rotational motors).

use crate::error::{MotorError, Result};
use rheon_math::{skew, Frame, FrameMoving, Mat3, Quat, Vec3, Vec6};
use rheon_model::{BodyId, BodySet};
use serde::{Deserialize, Serialize};

/// Which of the six relative DOF between two frames are held fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockPattern {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub rx: bool,
    pub ry: bool,
    pub rz: bool,
}

impl LockPattern {
    /// No DOF locked.
    pub fn free() -> Self {
        Self {
            x: false,
            y: false,
            z: false,
            rx: false,
            ry: false,
            rz: false,
        }
    }

    /// Number of locked DOF (= number of constraint rows produced).
    pub fn count(&self) -> usize {
        [self.x, self.y, self.z, self.rx, self.ry, self.rz]
            .iter()
            .filter(|&&f| f)
            .count()
    }
}

/// Guide presets for linear motors. The x direction is the motorized one and
/// is never part of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuideConstraint {
    Free,
    Prismatic,
    Spherical,
}

impl GuideConstraint {
    pub fn pattern(&self) -> LockPattern {
        let mut p = LockPattern::free();
        match self {
            GuideConstraint::Free => {}
            GuideConstraint::Prismatic => {
                p.y = true;
                p.z = true;
                p.rx = true;
                p.ry = true;
                p.rz = true;
            }
            GuideConstraint::Spherical => {
                p.y = true;
                p.z = true;
            }
        }
        p
    }
}

/// Spindle presets for rotational motors. The Z rotation is the motorized
/// one and is never part of the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SpindleConstraint {
    Free,
    Revolute,
    Cylindrical,
    Oldham,
}

impl SpindleConstraint {
    pub fn pattern(&self) -> LockPattern {
        let mut p = LockPattern::free();
        match self {
            SpindleConstraint::Free => {}
            SpindleConstraint::Revolute => {
                p.x = true;
                p.y = true;
                p.z = true;
                p.rx = true;
                p.ry = true;
            }
            SpindleConstraint::Cylindrical => {
                p.x = true;
                p.y = true;
                p.rx = true;
                p.ry = true;
            }
            SpindleConstraint::Oldham => {
                p.rx = true;
                p.ry = true;
            }
        }
        p
    }
}

/// One assembled constraint row: Jacobian blocks on the two bodies'
/// generalized speeds [v; ω] (world coordinates) and the violation.
#[derive(Debug, Clone, Copy)]
pub struct RowData {
    pub cq_a: Vec6,
    pub cq_b: Vec6,
    pub c: f64,
}

/// Generic two-frame bilateral constraint primitive.
///
/// Holds the marker frames, the lock pattern, and per-update kinematic
/// bookkeeping. Bodies are referenced by id only.
#[derive(Debug, Clone)]
pub struct MateFrames {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Marker frame on body A, body-local.
    pub frame_a: Frame,
    /// Marker frame on body B, body-local.
    pub frame_b: Frame,
    pub pattern: LockPattern,

    // Refreshed by update().
    abs_a: FrameMoving,
    abs_b: FrameMoving,
    rel: rheon_math::RelFrame,
    com_a: Vec3,
    com_b: Vec3,
}

impl MateFrames {
    /// An unbound mate; bodies/frames are filled in at configuration time.
    pub fn unbound(pattern: LockPattern) -> Self {
        let id = FrameMoving::fixed(Frame::identity());
        Self {
            body_a: BodyId(usize::MAX),
            body_b: BodyId(usize::MAX),
            frame_a: Frame::identity(),
            frame_b: Frame::identity(),
            pattern,
            abs_a: id,
            abs_b: id,
            rel: id.relative_to(&id),
            com_a: Vec3::zeros(),
            com_b: Vec3::zeros(),
        }
    }

    /// Bind bodies and marker frames.
    pub fn bind(
        &mut self,
        body_a: BodyId,
        frame_a: Frame,
        body_b: BodyId,
        frame_b: Frame,
        bodies: &BodySet,
    ) -> Result<()> {
        if !bodies.contains(body_a) {
            return Err(MotorError::UnknownBody(body_a.0));
        }
        if !bodies.contains(body_b) {
            return Err(MotorError::UnknownBody(body_b.0));
        }
        self.body_a = body_a;
        self.body_b = body_b;
        self.frame_a = frame_a;
        self.frame_b = frame_b;
        Ok(())
    }

    /// Recompute absolute marker frames and relative kinematics from the
    /// current body states.
    pub fn update(&mut self, bodies: &BodySet) -> Result<()> {
        let a = bodies
            .get(self.body_a)
            .ok_or(MotorError::UnknownBody(self.body_a.0))?;
        let b = bodies
            .get(self.body_b)
            .ok_or(MotorError::UnknownBody(self.body_b.0))?;
        self.abs_a = a.marker_frame(&self.frame_a);
        self.abs_b = b.marker_frame(&self.frame_b);
        self.rel = self.abs_a.relative_to(&self.abs_b);
        self.com_a = a.pose.pos;
        self.com_b = b.pose.pos;
        Ok(())
    }

    /// Relative kinematics of frame 1 in frame 2 from the last update.
    pub fn rel(&self) -> &rheon_math::RelFrame {
        &self.rel
    }

    /// Absolute moving frame of marker 1 from the last update.
    pub fn abs_a(&self) -> &FrameMoving {
        &self.abs_a
    }

    /// Absolute moving frame of marker 2 from the last update.
    pub fn abs_b(&self) -> &FrameMoving {
        &self.abs_b
    }

    /// Center of mass of body A from the last update.
    pub fn com_a(&self) -> Vec3 {
        self.com_a
    }

    /// Center of mass of body B from the last update.
    pub fn com_b(&self) -> Vec3 {
        self.com_b
    }

    /// World direction of the k-th frame-2 axis (0 = X, 1 = Y, 2 = Z).
    pub fn axis_world(&self, k: usize) -> Vec3 {
        let r2 = self.abs_b.frame.rot.to_matrix();
        Vec3::new(r2[(0, k)], r2[(1, k)], r2[(2, k)])
    }

    /// Translation constraint row along the k-th frame-2 axis.
    ///
    /// The application point for both Jacobian blocks is marker 1's absolute
    /// position, so the row applies an exactly opposite wrench pair.
    pub fn translation_row(&self, k: usize) -> RowData {
        let a = self.axis_world(k);
        let p1 = self.abs_a.frame.pos;
        let r1 = p1 - self.com_a;
        let d2 = p1 - self.com_b;

        let w1 = r1.cross(&a);
        let w2 = d2.cross(&a);
        RowData {
            cq_a: Vec6::new(a.x, a.y, a.z, w1.x, w1.y, w1.z),
            cq_b: Vec6::new(-a.x, -a.y, -a.z, -w2.x, -w2.y, -w2.z),
            c: self.rel.pos[k],
        }
    }

    /// Jacobian rows of the relative-quaternion imaginary part with frame 2
    /// pre-rotated by `extra_z` about its Z axis. Returns the 3x3 angular
    /// Jacobian (for body A's world ω; body B gets the negative) and the
    /// relative quaternion against the rotating frame.
    pub fn rotation_jacobian(&self, extra_z: f64) -> (Mat3, Quat) {
        let q2r = self.abs_b.frame.rot.mul(&Quat::about_z(extra_z)).normalize();
        let q12r = q2r.conjugate().mul(&self.abs_a.frame.rot).normalize();

        // d/dt Im(q12) = 0.5 (w I − [v×]) R2ᵀ (ω1 − ω2)
        let j3 = (Mat3::identity() * q12r.w - skew(&q12r.v)) * 0.5;
        let jw = j3 * q2r.to_matrix().transpose();
        (jw, q12r)
    }

    /// Rotation constraint row for the k-th quaternion imaginary component
    /// (0 = rx, 1 = ry, 2 = rz), measured against the rotating frame.
    pub fn rotation_row(&self, k: usize, jw: &Mat3, q12r: &Quat) -> RowData {
        let row = jw.row(k);
        RowData {
            cq_a: Vec6::new(0.0, 0.0, 0.0, row[0], row[1], row[2]),
            cq_b: Vec6::new(0.0, 0.0, 0.0, -row[0], -row[1], -row[2]),
            c: q12r.v[k],
        }
    }

    /// All rows required by the lock pattern, in x, y, z, rx, ry, rz order.
    ///
    /// `rotating_z` is the extra frame-2 Z rotation applied to the rotation
    /// rows (rotational motors measure their spindle locks against the
    /// rotating auxiliary frame; pass 0.0 otherwise).
    pub fn guide_rows(&self, rotating_z: f64) -> Vec<RowData> {
        let mut rows = Vec::with_capacity(self.pattern.count());
        for (k, locked) in [self.pattern.x, self.pattern.y, self.pattern.z]
            .iter()
            .enumerate()
        {
            if *locked {
                rows.push(self.translation_row(k));
            }
        }
        if self.pattern.rx || self.pattern.ry || self.pattern.rz {
            let (jw, q12r) = self.rotation_jacobian(rotating_z);
            for (k, locked) in [self.pattern.rx, self.pattern.ry, self.pattern.rz]
                .iter()
                .enumerate()
            {
                if *locked {
                    rows.push(self.rotation_row(k, &jw, &q12r));
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rheon_model::RigidBody;

    fn two_body_set() -> (BodySet, BodyId, BodyId) {
        let mut bodies = BodySet::new();
        let ground = bodies.insert(RigidBody::new_fixed("ground"));
        let slider = bodies.insert(RigidBody::new("slider", 1.0, Mat3::identity()));
        (bodies, ground, slider)
    }

    #[test]
    fn test_preset_row_counts() {
        assert_eq!(GuideConstraint::Free.pattern().count(), 0);
        assert_eq!(GuideConstraint::Spherical.pattern().count(), 2);
        assert_eq!(GuideConstraint::Prismatic.pattern().count(), 5);
        assert_eq!(SpindleConstraint::Free.pattern().count(), 0);
        assert_eq!(SpindleConstraint::Oldham.pattern().count(), 2);
        assert_eq!(SpindleConstraint::Cylindrical.pattern().count(), 4);
        assert_eq!(SpindleConstraint::Revolute.pattern().count(), 5);
    }

    #[test]
    fn test_guide_presets_never_lock_x() {
        assert!(!GuideConstraint::Prismatic.pattern().x);
        assert!(!SpindleConstraint::Revolute.pattern().rz);
    }

    #[test]
    fn test_translation_row_violation() {
        let (mut bodies, ground, slider) = two_body_set();
        bodies.get_mut(slider).unwrap().pose.pos = Vec3::new(0.0, 0.2, 0.0);

        let mut mate = MateFrames::unbound(GuideConstraint::Prismatic.pattern());
        mate.bind(slider, Frame::identity(), ground, Frame::identity(), &bodies)
            .unwrap();
        mate.update(&bodies).unwrap();

        // Relative y offset shows up as violation of the y row.
        let row = mate.translation_row(1);
        assert_relative_eq!(row.c, 0.2, epsilon = 1e-12);
        // Linear Jacobian blocks are exactly opposite.
        for i in 0..3 {
            assert_relative_eq!(row.cq_a[i], -row.cq_b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_rotation_row_small_angle() {
        let (mut bodies, ground, rotor) = two_body_set();
        bodies.get_mut(rotor).unwrap().pose.rot = Quat::about_z(0.1);

        let mut mate = MateFrames::unbound(SpindleConstraint::Revolute.pattern());
        mate.bind(rotor, Frame::identity(), ground, Frame::identity(), &bodies)
            .unwrap();
        mate.update(&bodies).unwrap();

        let (jw, q12r) = mate.rotation_jacobian(0.0);
        let row = mate.rotation_row(2, &jw, &q12r);
        // Residual is sin(0.05) for a 0.1 rad relative Z rotation.
        assert_relative_eq!(row.c, (0.05_f64).sin(), epsilon = 1e-12);
        // Angular Jacobian about Z is ~0.5 for small residuals.
        assert_relative_eq!(row.cq_a[5], 0.5 * (0.05_f64).cos(), epsilon = 1e-10);
    }

    #[test]
    fn test_rotating_frame_cancels_known_angle() {
        let (mut bodies, ground, rotor) = two_body_set();
        bodies.get_mut(rotor).unwrap().pose.rot = Quat::about_z(0.4);

        let mut mate = MateFrames::unbound(SpindleConstraint::Revolute.pattern());
        mate.bind(rotor, Frame::identity(), ground, Frame::identity(), &bodies)
            .unwrap();
        mate.update(&bodies).unwrap();

        // Measuring against a frame pre-rotated by the same angle zeroes the
        // rz residual.
        let (jw, q12r) = mate.rotation_jacobian(0.4);
        let row = mate.rotation_row(2, &jw, &q12r);
        assert_relative_eq!(row.c, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_guide_rows_follow_pattern() {
        let (bodies, ground, slider) = two_body_set();
        let mut mate = MateFrames::unbound(GuideConstraint::Spherical.pattern());
        mate.bind(slider, Frame::identity(), ground, Frame::identity(), &bodies)
            .unwrap();
        mate.update(&bodies).unwrap();
        assert_eq!(mate.guide_rows(0.0).len(), 2);

        mate.pattern = GuideConstraint::Prismatic.pattern();
        assert_eq!(mate.guide_rows(0.0).len(), 5);
    }
}
