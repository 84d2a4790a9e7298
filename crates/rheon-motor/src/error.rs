//! Error types for motor configuration.
//!
//! Only configuration mistakes are errors. Kinematic infeasibility (a target
//! the mechanism cannot reach) is never detected here; it surfaces as solver
//! non-convergence in the outer loop. Discontinuous driving functions are a
//! documented caveat, not an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MotorError {
    #[error("lock pattern constrains the actuated axis; the motorized DOF must stay free")]
    AxisInLockPattern,

    #[error("motor is not configured; bind frames and bodies first")]
    NotConfigured,

    #[error("motor is not active")]
    NotActive,

    #[error("motor was removed")]
    Removed,

    #[error("changing {0} on an active motor requires re-registration; deactivate it first")]
    ActiveReconfiguration(&'static str),

    #[error("unknown body index {0}")]
    UnknownBody(usize),

    #[error("setting does not apply to a {0} motor")]
    WrongMode(&'static str),

    #[error("unsupported config version {0}")]
    ConfigVersion(u32),

    #[error("motion function has no plain-data config representation")]
    UnsupportedFunction,
}

pub type Result<T> = std::result::Result<T, MotorError>;
