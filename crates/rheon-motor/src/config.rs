//! Plain-data motor configuration for persistence.
//!
//! `MotorConfig` is a versioned, serde-friendly snapshot of a motor's
//! definition: axis, mode, driving function, lock pattern, and binding.
//! Runtime state (handles, multipliers, the drift integrator) is
//! deliberately excluded; a rebuilt motor starts its lifecycle from
//! `Configured`.

use crate::error::{MotorError, Result};
use crate::function::{ConstFn, RampFn, Rheonomic, SineFn};
use crate::mate::LockPattern;
use crate::motor::{Behavior, Motor, MotorAxis, MotorState};
use rheon_math::{Frame, Quat, Vec3};
use rheon_model::{BodyId, BodySet};
use serde::{Deserialize, Serialize};

/// Format version accepted by [`MotorConfig::build`].
pub const CONFIG_VERSION: u32 = 1;

/// Plain-data form of a rheonomic function.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionConfig {
    Constant { value: f64 },
    Ramp { y0: f64, slope: f64 },
    Sine { amplitude: f64, omega: f64, phase: f64 },
}

impl FunctionConfig {
    pub fn build(&self) -> Box<dyn Rheonomic> {
        match *self {
            FunctionConfig::Constant { value } => Box::new(ConstFn::new(value)),
            FunctionConfig::Ramp { y0, slope } => Box::new(RampFn::new(y0, slope)),
            FunctionConfig::Sine {
                amplitude,
                omega,
                phase,
            } => Box::new(SineFn::new(amplitude, omega, phase)),
        }
    }
}

/// Plain-data form of a motor's driving mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BehaviorConfig {
    Position {
        func: FunctionConfig,
        offset: f64,
    },
    Speed {
        func: FunctionConfig,
        offset: f64,
        avoid_drift: bool,
    },
    Force {
        func: FunctionConfig,
    },
}

/// A body-local marker frame as plain numbers. Rotation is w, x, y, z.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameConfig {
    pub pos: [f64; 3],
    pub rot: [f64; 4],
}

impl From<&Frame> for FrameConfig {
    fn from(f: &Frame) -> Self {
        Self {
            pos: [f.pos.x, f.pos.y, f.pos.z],
            rot: [f.rot.w, f.rot.v.x, f.rot.v.y, f.rot.v.z],
        }
    }
}

impl FrameConfig {
    pub fn to_frame(&self) -> Frame {
        Frame {
            pos: Vec3::new(self.pos[0], self.pos[1], self.pos[2]),
            rot: Quat::new(self.rot[0], self.rot[1], self.rot[2], self.rot[3]).normalize(),
        }
    }
}

/// Versioned snapshot of a configured motor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotorConfig {
    pub version: u32,
    pub name: String,
    pub axis: MotorAxis,
    pub behavior: BehaviorConfig,
    pub pattern: LockPattern,
    pub body_a: usize,
    pub body_b: usize,
    pub frame_a: FrameConfig,
    pub frame_b: FrameConfig,
}

impl MotorConfig {
    /// Snapshot a motor. Fails on an unbound motor and on driving functions
    /// with no plain-data form.
    pub fn from_motor(motor: &Motor) -> Result<Self> {
        if motor.state() == MotorState::Uninitialized {
            return Err(MotorError::NotConfigured);
        }
        let behavior = match motor.behavior() {
            Behavior::Position { func, offset } => BehaviorConfig::Position {
                func: func.as_config().ok_or(MotorError::UnsupportedFunction)?,
                offset: *offset,
            },
            Behavior::Speed {
                func,
                offset,
                avoid_drift,
            } => BehaviorConfig::Speed {
                func: func.as_config().ok_or(MotorError::UnsupportedFunction)?,
                offset: *offset,
                avoid_drift: *avoid_drift,
            },
            Behavior::Force { func } => BehaviorConfig::Force {
                func: func.as_config().ok_or(MotorError::UnsupportedFunction)?,
            },
        };
        let mate = motor.mate();
        Ok(Self {
            version: CONFIG_VERSION,
            name: motor.name.clone(),
            axis: motor.axis(),
            behavior,
            pattern: motor.pattern(),
            body_a: mate.body_a.0,
            body_b: mate.body_b.0,
            frame_a: (&mate.frame_a).into(),
            frame_b: (&mate.frame_b).into(),
        })
    }

    /// Rebuild a motor in the `Configured` state. Rejects unknown versions
    /// and missing bodies.
    pub fn build(&self, bodies: &BodySet) -> Result<Motor> {
        if self.version != CONFIG_VERSION {
            return Err(MotorError::ConfigVersion(self.version));
        }
        let mut motor = match (self.axis, &self.behavior) {
            (MotorAxis::LinearX, BehaviorConfig::Position { .. }) => {
                Motor::linear_position(&self.name)
            }
            (MotorAxis::LinearX, BehaviorConfig::Speed { .. }) => Motor::linear_speed(&self.name),
            (MotorAxis::LinearX, BehaviorConfig::Force { .. }) => Motor::linear_force(&self.name),
            (MotorAxis::RotationZ, BehaviorConfig::Position { .. }) => {
                Motor::rotation_angle(&self.name)
            }
            (MotorAxis::RotationZ, BehaviorConfig::Speed { .. }) => {
                Motor::rotation_speed(&self.name)
            }
            (MotorAxis::RotationZ, BehaviorConfig::Force { .. }) => {
                Motor::rotation_torque(&self.name)
            }
        };
        match &self.behavior {
            BehaviorConfig::Position { func, offset } => {
                motor.set_function(func.build())?;
                motor.set_offset(*offset)?;
            }
            BehaviorConfig::Speed {
                func,
                offset,
                avoid_drift,
            } => {
                motor.set_function(func.build())?;
                motor.set_offset(*offset)?;
                motor.set_avoid_drift(*avoid_drift)?;
            }
            BehaviorConfig::Force { func } => {
                motor.set_function(func.build())?;
            }
        }
        motor.set_pattern(self.pattern)?;
        motor.configure(
            BodyId(self.body_a),
            self.frame_a.to_frame(),
            BodyId(self.body_b),
            self.frame_b.to_frame(),
            bodies,
        )?;
        Ok(motor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mate::SpindleConstraint;
    use approx::assert_relative_eq;
    use rheon_math::Mat3;
    use rheon_model::RigidBody;

    fn setup() -> (BodySet, BodyId, BodyId) {
        let mut bodies = BodySet::new();
        let ground = bodies.insert(RigidBody::new_fixed("ground"));
        let rotor = bodies.insert(RigidBody::new("rotor", 1.0, Mat3::identity()));
        (bodies, rotor, ground)
    }

    #[test]
    fn test_round_trip_preserves_definition() {
        let (bodies, rotor, ground) = setup();
        let mut m = Motor::rotation_speed("spin");
        m.set_function(Box::new(SineFn::new(2.0, 3.0, 0.25))).unwrap();
        m.set_offset(0.1).unwrap();
        m.set_spindle(SpindleConstraint::Cylindrical).unwrap();
        m.configure(
            rotor,
            Frame::identity(),
            ground,
            Frame {
                pos: Vec3::new(0.0, 0.0, 1.0),
                rot: Quat::identity(),
            },
            &bodies,
        )
        .unwrap();

        let cfg = MotorConfig::from_motor(&m).unwrap();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed: MotorConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cfg);

        let rebuilt = parsed.build(&bodies).unwrap();
        assert_eq!(rebuilt.state(), MotorState::Configured);
        assert_eq!(rebuilt.axis(), MotorAxis::RotationZ);
        assert_eq!(rebuilt.pattern(), SpindleConstraint::Cylindrical.pattern());
        match rebuilt.behavior() {
            Behavior::Speed { func, offset, .. } => {
                assert_relative_eq!(*offset, 0.1, epsilon = 1e-12);
                assert_relative_eq!(func.value(0.0), 2.0 * (0.25_f64).sin(), epsilon = 1e-12);
            }
            other => panic!("wrong mode: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_version_rejected() {
        let (bodies, rotor, ground) = setup();
        let mut m = Motor::linear_force("pusher");
        m.configure(rotor, Frame::identity(), ground, Frame::identity(), &bodies)
            .unwrap();
        let mut cfg = MotorConfig::from_motor(&m).unwrap();
        cfg.version = 7;
        assert!(matches!(
            cfg.build(&bodies),
            Err(MotorError::ConfigVersion(7))
        ));
    }

    #[test]
    fn test_unbound_motor_has_no_config() {
        let m = Motor::linear_position("servo");
        assert!(matches!(
            MotorConfig::from_motor(&m),
            Err(MotorError::NotConfigured)
        ));
    }
}
