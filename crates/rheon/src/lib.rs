//! rheon — motorized multibody constraint engine.
//!
//! This is the umbrella crate that provides the [`System`] stepping loop and
//! re-exports core types from the sub-crates.

pub mod error;
pub mod system;

pub use error::{Result, SystemError};
pub use system::{MotorId, System};

pub use rheon_math::{self, Frame, Quat, Vec3, GRAVITY};
pub use rheon_model::{self, BodyId, BodySet, RigidBody};
pub use rheon_motor::{
    self, Behavior, ConstFn, GuideConstraint, LockPattern, Motor, MotorAxis, MotorConfig,
    MotorError, MotorState, RampFn, Rheonomic, SineFn, SpindleConstraint,
};
pub use rheon_solver::{self, SolveInfo, SolverSettings, SystemDescriptor};
