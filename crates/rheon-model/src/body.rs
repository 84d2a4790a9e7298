//! Rigid body definition and body storage.

use rheon_math::{Frame, FrameMoving, Mat3, Quat, Vec3};

/// Handle identifying a body inside a [`BodySet`].
///
/// Constraints hold `BodyId`s, never references; a motor has no ownership
/// over the bodies it connects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyId(pub usize);

/// A 6-DOF rigid body in maximal coordinates.
#[derive(Debug, Clone)]
pub struct RigidBody {
    /// Name of the body (for debugging).
    pub name: String,
    /// Mass [kg]. Ignored when `fixed`.
    pub mass: f64,
    /// Inertia tensor about the COM, body-local frame.
    pub inertia: Mat3,
    /// Pose of the body frame (origin at COM) in world.
    pub pose: Frame,
    /// Linear velocity of the COM, world frame.
    pub lin_vel: Vec3,
    /// Angular velocity, world frame.
    pub ang_vel: Vec3,
    /// Linear acceleration of the COM, world frame.
    pub lin_acc: Vec3,
    /// Angular acceleration, world frame.
    pub ang_acc: Vec3,
    /// Fixed bodies never move and contribute zero inverse mass.
    pub fixed: bool,
}

impl RigidBody {
    /// Create a dynamic body with the given mass and local inertia tensor.
    pub fn new(name: &str, mass: f64, inertia: Mat3) -> Self {
        Self {
            name: name.to_string(),
            mass,
            inertia,
            pose: Frame::identity(),
            lin_vel: Vec3::zeros(),
            ang_vel: Vec3::zeros(),
            lin_acc: Vec3::zeros(),
            ang_acc: Vec3::zeros(),
            fixed: false,
        }
    }

    /// Create a fixed (ground) body.
    pub fn new_fixed(name: &str) -> Self {
        let mut body = Self::new(name, 0.0, Mat3::zeros());
        body.fixed = true;
        body
    }

    /// Builder-style initial pose.
    pub fn with_pose(mut self, pos: Vec3, rot: Quat) -> Self {
        self.pose = Frame::new(pos, rot);
        self
    }

    /// Inertia tensor rotated into the world frame: R I Rᵀ.
    pub fn world_inertia(&self) -> Mat3 {
        let r = self.pose.rot.to_matrix();
        r * self.inertia * r.transpose()
    }

    /// The body frame together with its current derivatives.
    pub fn frame_moving(&self) -> FrameMoving {
        FrameMoving {
            frame: self.pose,
            lin_vel: self.lin_vel,
            ang_vel: self.ang_vel,
            lin_acc: self.lin_acc,
            ang_acc: self.ang_acc,
        }
    }

    /// Absolute moving frame of a marker attached at `local` on this body.
    pub fn marker_frame(&self, local: &Frame) -> FrameMoving {
        self.frame_moving().marker(local)
    }
}

/// Storage for all bodies in a system.
#[derive(Debug, Clone, Default)]
pub struct BodySet {
    bodies: Vec<RigidBody>,
}

impl BodySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: RigidBody) -> BodyId {
        self.bodies.push(body);
        BodyId(self.bodies.len() - 1)
    }

    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id.0)
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(id.0)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        id.0 < self.bodies.len()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &RigidBody)> {
        self.bodies.iter().enumerate().map(|(i, b)| (BodyId(i), b))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BodyId, &mut RigidBody)> {
        self.bodies
            .iter_mut()
            .enumerate()
            .map(|(i, b)| (BodyId(i), b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_marker_frame_on_translated_body() {
        let mut body = RigidBody::new("b", 1.0, Mat3::identity());
        body.pose = Frame::from_translation(Vec3::new(1.0, 0.0, 0.0));
        body.lin_vel = Vec3::new(0.0, 1.0, 0.0);
        let m = body.marker_frame(&Frame::from_translation(Vec3::new(0.5, 0.0, 0.0)));
        assert_relative_eq!(m.frame.pos.x, 1.5, epsilon = 1e-12);
        assert_relative_eq!(m.lin_vel.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_world_inertia_rotates() {
        let inertia = Mat3::from_diagonal(&Vec3::new(1.0, 2.0, 3.0));
        let mut body = RigidBody::new("b", 1.0, inertia);
        body.pose.rot = Quat::about_z(std::f64::consts::FRAC_PI_2);
        let iw = body.world_inertia();
        // 90° about Z swaps the x and y principal moments
        assert_relative_eq!(iw[(0, 0)], 2.0, epsilon = 1e-10);
        assert_relative_eq!(iw[(1, 1)], 1.0, epsilon = 1e-10);
        assert_relative_eq!(iw[(2, 2)], 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_body_set_handles() {
        let mut set = BodySet::new();
        let a = set.insert(RigidBody::new_fixed("ground"));
        let b = set.insert(RigidBody::new("slider", 2.0, Mat3::identity()));
        assert_eq!(set.len(), 2);
        assert!(set.get(a).unwrap().fixed);
        assert_relative_eq!(set.get(b).unwrap().mass, 2.0);
    }
}
