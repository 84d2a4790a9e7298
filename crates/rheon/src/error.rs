//! System-level errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SystemError {
    #[error(transparent)]
    Motor(#[from] rheon_motor::MotorError),

    #[error("unknown motor id {0}")]
    UnknownMotor(usize),
}

pub type Result<T> = std::result::Result<T, SystemError>;
