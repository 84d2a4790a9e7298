//! Motor constraints between two body frames.
//!
//! A [`Motor`] imposes a prescribed kinematic or force relationship along one
//! actuated degree of freedom between two frames on two rigid bodies: the
//! translation along frame X (linear motors) or the rotation about frame Z
//! (rotational motors). The remaining five relative DOF are optionally held
//! by a configurable [`LockPattern`]. Three behaviors are supported:
//!
//! - **Position**: `actual(t) = f(t) + offset` enforced as a holonomic
//!   rheonomic constraint, with no compliance.
//! - **Speed**: `actual'(t) = v(t)` as a differential constraint, with an
//!   auxiliary drift variable integrating `v(t)` on the side so the realized
//!   position cannot drift from the intended integral.
//! - **Force**: a plain applied force/torque `f(t)`, no constraint row.
//!
//! Motors push their rows and variables into a
//! [`rheon_solver::SystemDescriptor`] through opaque handles and read back
//! resolved multipliers as reaction forces after each solve.

pub mod config;
pub mod error;
pub mod function;
pub mod mate;
pub mod motor;

pub use config::{BehaviorConfig, FrameConfig, FunctionConfig, MotorConfig, CONFIG_VERSION};
pub use error::{MotorError, Result};
pub use function::{ConstFn, RampFn, Rheonomic, SineFn};
pub use mate::{GuideConstraint, LockPattern, MateFrames, RowData, SpindleConstraint};
pub use motor::{Behavior, Motor, MotorAxis, MotorState};
