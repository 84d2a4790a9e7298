//! Rigid body and body-set types for the rheon motor-constraint engine.
//!
//! `RigidBody` is a 6-DOF body in maximal coordinates (world-frame pose,
//! velocity, acceleration). `BodySet` is the read-only body/frame provider
//! consumed by constraints, which reference bodies by `BodyId` only.

pub mod body;

pub use body::{BodyId, BodySet, RigidBody};
