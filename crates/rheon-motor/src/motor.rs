//! The motor: an actuated two-frame constraint.
//!
//! A `Motor` is a `MateFrames` guide plus one actuated degree of freedom,
//! either translation along the shared X axis or rotation about the shared
//! Z axis. The actuated DOF follows a rheonomic function in one of three
//! modes: position servo (extra constraint row on C = actual − f(t)),
//! speed servo (row on the velocity level, with an optional auxiliary
//! variable that integrates the commanded speed to avoid position drift),
//! or raw force/torque (no row, just applied loads).
//!
//! Lifecycle is an explicit state machine. A motor is built, `configure`d
//! onto two bodies, `activate`d against a `SystemDescriptor` (registering
//! its rows and, for drift-avoiding speed motors, its auxiliary variable
//! block), stepped via `update` / `assemble_aux` / `load_forces` /
//! `after_solve`, and eventually deactivated or removed. Changes that alter
//! row topology are rejected while active; deactivate first, mutate, then
//! activate again.

use crate::error::{MotorError, Result};
use crate::function::{ConstFn, RampFn, Rheonomic};
use crate::mate::{GuideConstraint, LockPattern, MateFrames, RowData, SpindleConstraint};
use rheon_math::{DVec, Frame, Vec3};
use rheon_model::{BodyId, BodySet};
use rheon_solver::{
    ConstraintRow, RowHandle, StateSlots, SystemDescriptor, VarHandle, VariableBlock,
};

/// Which relative DOF the motor drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum MotorAxis {
    /// Translation along the shared X axis of the two marker frames.
    LinearX,
    /// Rotation about the shared Z axis of the two marker frames.
    RotationZ,
}

/// How the actuated DOF is driven.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Servo the position (or angle) to `f(t) + offset` with a constraint row.
    Position { func: Box<dyn Rheonomic>, offset: f64 },
    /// Impose the speed `f(t)` with a velocity-level constraint row.
    ///
    /// With `avoid_drift`, an auxiliary 1-DOF variable integrates the
    /// commanded speed and the row also corrects accumulated position error
    /// against `aux + offset`; without it the row is purely kinematic and
    /// numerical drift accumulates.
    Speed {
        func: Box<dyn Rheonomic>,
        offset: f64,
        avoid_drift: bool,
    },
    /// Apply the raw force (or torque) `f(t)` along the axis. No row.
    Force { func: Box<dyn Rheonomic> },
}

/// Motor lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorState {
    /// Built, not yet bound to bodies.
    Uninitialized,
    /// Bound to bodies and frames; not registered with a solver.
    Configured,
    /// Rows (and auxiliary variable) registered; participates in solves.
    Active,
    /// Permanently retired.
    Removed,
}

/// An actuated two-frame constraint between two rigid bodies.
#[derive(Debug, Clone)]
pub struct Motor {
    pub name: String,
    axis: MotorAxis,
    behavior: Behavior,
    mate: MateFrames,
    state: MotorState,

    // Registered handles while active. Guide rows first, actuated row last.
    row_handles: Vec<RowHandle>,
    aux_var: Option<VarHandle>,
    body_vars: Option<(VarHandle, VarHandle)>,

    // Auxiliary drift state (speed mode).
    aux: f64,
    aux_dt: f64,
    aux_dtdt: f64,

    // Measured relative coordinate along the actuated axis.
    actual: f64,
    actual_dt: f64,
    actual_dtdt: f64,

    /// Force (N) or torque (N·m) the motor exerted along its axis at the
    /// last step.
    reaction: f64,
}

impl Motor {
    fn new(name: &str, axis: MotorAxis, behavior: Behavior, pattern: LockPattern) -> Self {
        Self {
            name: name.to_string(),
            axis,
            behavior,
            mate: MateFrames::unbound(pattern),
            state: MotorState::Uninitialized,
            row_handles: Vec::new(),
            aux_var: None,
            body_vars: None,
            aux: 0.0,
            aux_dt: 0.0,
            aux_dtdt: 0.0,
            actual: 0.0,
            actual_dt: 0.0,
            actual_dtdt: 0.0,
            reaction: 0.0,
        }
    }

    /// Linear position servo. Default function is the unit ramp x(t) = t,
    /// default guide is prismatic.
    pub fn linear_position(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::LinearX,
            Behavior::Position {
                func: Box::new(RampFn::new(0.0, 1.0)),
                offset: 0.0,
            },
            GuideConstraint::Prismatic.pattern(),
        )
    }

    /// Linear speed servo. Default function is the constant speed 1 m/s,
    /// drift avoidance on, prismatic guide.
    pub fn linear_speed(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::LinearX,
            Behavior::Speed {
                func: Box::new(ConstFn::new(1.0)),
                offset: 0.0,
                avoid_drift: true,
            },
            GuideConstraint::Prismatic.pattern(),
        )
    }

    /// Linear force actuator. Default function is zero force, prismatic guide.
    pub fn linear_force(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::LinearX,
            Behavior::Force {
                func: Box::new(ConstFn::new(0.0)),
            },
            GuideConstraint::Prismatic.pattern(),
        )
    }

    /// Rotational angle servo. Default function is the unit ramp,
    /// revolute spindle.
    pub fn rotation_angle(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::RotationZ,
            Behavior::Position {
                func: Box::new(RampFn::new(0.0, 1.0)),
                offset: 0.0,
            },
            SpindleConstraint::Revolute.pattern(),
        )
    }

    /// Rotational speed servo. Default function is the constant 1 rad/s,
    /// drift avoidance on, revolute spindle.
    pub fn rotation_speed(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::RotationZ,
            Behavior::Speed {
                func: Box::new(ConstFn::new(1.0)),
                offset: 0.0,
                avoid_drift: true,
            },
            SpindleConstraint::Revolute.pattern(),
        )
    }

    /// Rotational torque actuator. Default function is zero torque,
    /// revolute spindle.
    pub fn rotation_torque(name: &str) -> Self {
        Self::new(
            name,
            MotorAxis::RotationZ,
            Behavior::Force {
                func: Box::new(ConstFn::new(0.0)),
            },
            SpindleConstraint::Revolute.pattern(),
        )
    }

    pub fn axis(&self) -> MotorAxis {
        self.axis
    }

    pub fn state(&self) -> MotorState {
        self.state
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    pub fn pattern(&self) -> LockPattern {
        self.mate.pattern
    }

    /// The bodies this motor is bound to, once configured.
    pub fn bound_bodies(&self) -> Option<(BodyId, BodyId)> {
        match self.state {
            MotorState::Uninitialized | MotorState::Removed => None,
            _ => Some((self.mate.body_a, self.mate.body_b)),
        }
    }

    fn check_not_removed(&self) -> Result<()> {
        if self.state == MotorState::Removed {
            Err(MotorError::Removed)
        } else {
            Ok(())
        }
    }

    fn check_not_active(&self, what: &'static str) -> Result<()> {
        if self.state == MotorState::Active {
            Err(MotorError::ActiveReconfiguration(what))
        } else {
            Ok(())
        }
    }

    /// Swap the rheonomic function. Allowed while active; the row topology
    /// does not depend on the function.
    pub fn set_function(&mut self, func: Box<dyn Rheonomic>) -> Result<()> {
        self.check_not_removed()?;
        match &mut self.behavior {
            Behavior::Position { func: f, .. }
            | Behavior::Speed { func: f, .. }
            | Behavior::Force { func: f } => *f = func,
        }
        Ok(())
    }

    /// Set the constant offset added to the motor setpoint. No effect on
    /// force motors.
    pub fn set_offset(&mut self, offset: f64) -> Result<()> {
        self.check_not_removed()?;
        match &mut self.behavior {
            Behavior::Position { offset: o, .. } | Behavior::Speed { offset: o, .. } => {
                *o = offset
            }
            Behavior::Force { .. } => return Err(MotorError::WrongMode("force")),
        }
        Ok(())
    }

    /// Replace the whole driving mode. Changes row/variable topology, so
    /// the motor must not be active.
    pub fn set_behavior(&mut self, behavior: Behavior) -> Result<()> {
        self.check_not_removed()?;
        self.check_not_active("behavior")?;
        self.behavior = behavior;
        Ok(())
    }

    /// Toggle drift avoidance on a speed motor. Changes row/variable
    /// topology, so the motor must not be active.
    pub fn set_avoid_drift(&mut self, avoid: bool) -> Result<()> {
        self.check_not_removed()?;
        self.check_not_active("avoid_drift")?;
        match &mut self.behavior {
            Behavior::Speed { avoid_drift, .. } => {
                *avoid_drift = avoid;
                Ok(())
            }
            _ => Err(MotorError::WrongMode("speed")),
        }
    }

    /// Set the guide preset of a linear motor.
    pub fn set_guide(&mut self, guide: GuideConstraint) -> Result<()> {
        if self.axis != MotorAxis::LinearX {
            return Err(MotorError::WrongMode("linear"));
        }
        self.set_pattern(guide.pattern())
    }

    /// Set the spindle preset of a rotational motor.
    pub fn set_spindle(&mut self, spindle: SpindleConstraint) -> Result<()> {
        if self.axis != MotorAxis::RotationZ {
            return Err(MotorError::WrongMode("rotational"));
        }
        self.set_pattern(spindle.pattern())
    }

    /// Set an arbitrary lock pattern. The actuated DOF may not be locked,
    /// and the row topology changes, so the motor must not be active.
    pub fn set_pattern(&mut self, pattern: LockPattern) -> Result<()> {
        self.check_not_removed()?;
        self.check_not_active("lock pattern")?;
        let clashes = match self.axis {
            MotorAxis::LinearX => pattern.x,
            MotorAxis::RotationZ => pattern.rz,
        };
        if clashes {
            return Err(MotorError::AxisInLockPattern);
        }
        self.mate.pattern = pattern;
        Ok(())
    }

    /// Bind the motor to two bodies and their marker frames. The frames are
    /// body-local; the motor drives frame A relative to frame B.
    pub fn configure(
        &mut self,
        body_a: BodyId,
        frame_a: Frame,
        body_b: BodyId,
        frame_b: Frame,
        bodies: &BodySet,
    ) -> Result<()> {
        self.check_not_removed()?;
        self.check_not_active("bodies and frames")?;
        self.mate.bind(body_a, frame_a, body_b, frame_b, bodies)?;
        self.state = MotorState::Configured;
        Ok(())
    }

    /// Whether this motor contributes an actuated constraint row.
    fn has_actuated_row(&self) -> bool {
        !matches!(self.behavior, Behavior::Force { .. })
    }

    fn wants_aux_var(&self) -> bool {
        matches!(
            self.behavior,
            Behavior::Speed {
                avoid_drift: true,
                ..
            }
        )
    }

    /// Register constraint rows (and the auxiliary variable for a
    /// drift-avoiding speed motor) against the descriptor. `var_a`/`var_b`
    /// are the variable blocks of the bound bodies A and B.
    pub fn activate(
        &mut self,
        var_a: VarHandle,
        var_b: VarHandle,
        desc: &mut SystemDescriptor,
    ) -> Result<()> {
        self.check_not_removed()?;
        match self.state {
            MotorState::Uninitialized => return Err(MotorError::NotConfigured),
            MotorState::Active => return Err(MotorError::ActiveReconfiguration("registration")),
            _ => {}
        }
        self.body_vars = Some((var_a, var_b));
        let n_rows = self.mate.pattern.count() + usize::from(self.has_actuated_row());
        self.row_handles = (0..n_rows)
            .map(|_| desc.insert_constraint(ConstraintRow::new(var_a, var_b)))
            .collect();
        if self.wants_aux_var() {
            self.aux_var = Some(desc.insert_variables(VariableBlock::unit()));
        }
        self.state = MotorState::Active;
        Ok(())
    }

    /// Withdraw rows and auxiliary variable from the descriptor. The motor
    /// drops back to `Configured` and may be mutated and re-activated.
    pub fn deactivate(&mut self, desc: &mut SystemDescriptor) -> Result<()> {
        if self.state != MotorState::Active {
            return Err(MotorError::NotActive);
        }
        for h in self.row_handles.drain(..) {
            desc.remove_constraint(h);
        }
        if let Some(v) = self.aux_var.take() {
            desc.remove_variables(v);
        }
        self.body_vars = None;
        self.state = MotorState::Configured;
        Ok(())
    }

    /// Permanently retire the motor, withdrawing any registered rows.
    pub fn remove(&mut self, desc: &mut SystemDescriptor) -> Result<()> {
        if self.state == MotorState::Active {
            self.deactivate(desc)?;
        }
        self.state = MotorState::Removed;
        Ok(())
    }

    /// Rotating-frame angle used by a rotational motor: the Z pre-rotation
    /// of frame B against which all rotation rows are measured.
    fn rotating_angle(&self, t: f64) -> f64 {
        match &self.behavior {
            Behavior::Position { func, offset } => func.value(t) + offset,
            Behavior::Speed {
                offset,
                avoid_drift,
                ..
            } => {
                if *avoid_drift {
                    self.aux + offset
                } else {
                    self.actual
                }
            }
            Behavior::Force { .. } => 0.0,
        }
    }

    /// Recompute the relative kinematics and the measured coordinate from
    /// the current body states. Does not touch the registered rows; called
    /// again at the end of a step so `measured()` reports the integrated
    /// state, not the pre-solve one.
    pub fn measure(&mut self, bodies: &BodySet) -> Result<()> {
        if self.state != MotorState::Active {
            return Err(MotorError::NotActive);
        }
        self.mate.update(bodies)?;

        let rel = *self.mate.rel();
        match self.axis {
            MotorAxis::LinearX => {
                self.actual = rel.pos.x;
                self.actual_dt = rel.pos_dt.x;
                self.actual_dtdt = rel.pos_dtdt.x;
            }
            MotorAxis::RotationZ => {
                // Wrap the doubled quaternion angle into (−π, π].
                let two_half = 2.0 * rel.rot.v.z.atan2(rel.rot.w);
                let tau = 2.0 * std::f64::consts::PI;
                self.actual = two_half - tau * (two_half / tau).round();
                self.actual_dt = rel.ang_vel.z;
                self.actual_dtdt = rel.ang_acc.z;
            }
        }
        Ok(())
    }

    /// Refresh kinematics and rewrite all registered constraint rows for
    /// time `t`. The descriptor assembles `b = ct + c/h` afterwards.
    pub fn update(&mut self, t: f64, bodies: &BodySet, desc: &mut SystemDescriptor) -> Result<()> {
        self.measure(bodies)?;

        let rotz = match self.axis {
            MotorAxis::LinearX => 0.0,
            MotorAxis::RotationZ => self.rotating_angle(t),
        };
        let guide = self.mate.guide_rows(rotz);
        for (data, &h) in guide.iter().zip(&self.row_handles) {
            let row = desc.row_mut(h);
            row.cq_a = data.cq_a;
            row.cq_b = data.cq_b;
            row.c = data.c;
            row.ct = 0.0;
        }

        if self.has_actuated_row() {
            let h = self.row_handles[self.row_handles.len() - 1];
            let (data, c, ct) = self.actuated_row(t, rotz);
            let row = desc.row_mut(h);
            row.cq_a = data.cq_a;
            row.cq_b = data.cq_b;
            row.c = c;
            row.ct = ct;
        }
        Ok(())
    }

    /// Jacobian and residual of the actuated row.
    fn actuated_row(&self, t: f64, rotz: f64) -> (RowData, f64, f64) {
        match self.axis {
            MotorAxis::LinearX => {
                let data = self.mate.translation_row(0);
                match &self.behavior {
                    Behavior::Position { func, offset } => {
                        (data, self.actual - func.value(t) - offset, -func.derivative(t))
                    }
                    Behavior::Speed {
                        func,
                        offset,
                        avoid_drift,
                    } => {
                        let c = if *avoid_drift {
                            self.actual - self.aux - offset
                        } else {
                            0.0
                        };
                        (data, c, -func.value(t))
                    }
                    Behavior::Force { .. } => unreachable!("force motors register no row"),
                }
            }
            MotorAxis::RotationZ => {
                let (jw, q12r) = self.mate.rotation_jacobian(rotz);
                let data = self.mate.rotation_row(2, &jw, &q12r);
                // The rotating frame already subtracts the setpoint, so the
                // quaternion residual is the violation. The factor 0.5 maps
                // angular rates into quaternion-residual rates.
                match &self.behavior {
                    Behavior::Position { func, .. } => (data, data.c, -0.5 * func.derivative(t)),
                    Behavior::Speed {
                        func, avoid_drift, ..
                    } => {
                        let c = if *avoid_drift { data.c } else { 0.0 };
                        (data, c, -0.5 * func.value(t))
                    }
                    Behavior::Force { .. } => unreachable!("force motors register no row"),
                }
            }
        }
    }

    /// Contribute the applied-force impulse of a force motor into the body
    /// variable blocks' right-hand sides. No-op for servo motors.
    pub fn load_forces(&mut self, t: f64, h: f64, desc: &mut SystemDescriptor) -> Result<()> {
        if self.state != MotorState::Active {
            return Err(MotorError::NotActive);
        }
        let func = match &self.behavior {
            Behavior::Force { func } => func,
            _ => return Ok(()),
        };
        let (var_a, var_b) = self.body_vars.ok_or(MotorError::NotActive)?;
        let magnitude = func.value(t);
        self.reaction = magnitude;

        match self.axis {
            MotorAxis::LinearX => {
                // Force along the guide axis, applied at marker A's position
                // on both bodies so the wrench pair is exactly opposite.
                let a = self.mate.axis_world(0);
                let p1 = self.mate.abs_a().frame.pos;
                let imp = a * (magnitude * h);
                let r1 = p1 - self.mate.com_a();
                let d2 = p1 - self.mate.com_b();
                add_wrench(desc.variable_mut(var_a), &imp, &r1.cross(&imp));
                let neg = -imp;
                add_wrench(desc.variable_mut(var_b), &neg, &d2.cross(&neg));
            }
            MotorAxis::RotationZ => {
                let axis = self.mate.axis_world(2);
                let ang_imp = axis * (magnitude * h);
                add_wrench(desc.variable_mut(var_a), &Vec3::zeros(), &ang_imp);
                let neg = -ang_imp;
                add_wrench(desc.variable_mut(var_b), &Vec3::zeros(), &neg);
            }
        }
        Ok(())
    }

    /// Write the auxiliary variable's right-hand side. The integrator trick:
    /// the unit-mass block's solved slot carries the traveled coordinate
    /// itself, so loading `fb = aux + h·v(t)` makes the solve advance it by
    /// one step of the commanded speed's integral.
    pub fn assemble_aux(&mut self, t: f64, h: f64, desc: &mut SystemDescriptor) -> Result<()> {
        if self.state != MotorState::Active {
            return Err(MotorError::NotActive);
        }
        let (func, var) = match (&self.behavior, self.aux_var) {
            (Behavior::Speed { func, .. }, Some(var)) => (func, var),
            _ => return Ok(()),
        };
        let block = desc.variable_mut(var);
        block.fb[0] = self.aux + h * func.value(t);
        Ok(())
    }

    /// Pull solve results back: advance the drift integrator and recover
    /// the reaction force/torque from the actuated row's impulse.
    pub fn after_solve(&mut self, h: f64, desc: &SystemDescriptor) -> Result<()> {
        if self.state != MotorState::Active {
            return Err(MotorError::NotActive);
        }
        if let Some(var) = self.aux_var {
            let aux = desc.variable(var).qb[0];
            let aux_dt = (aux - self.aux) / h;
            self.aux_dtdt = (aux_dt - self.aux_dt) / h;
            self.aux_dt = aux_dt;
            self.aux = aux;
        }
        if self.has_actuated_row() {
            let row = desc.row(self.row_handles[self.row_handles.len() - 1]);
            let axis = match self.axis {
                MotorAxis::LinearX => self.mate.axis_world(0),
                MotorAxis::RotationZ => self.mate.axis_world(2),
            };
            let block = match self.axis {
                MotorAxis::LinearX => Vec3::new(row.cq_a[0], row.cq_a[1], row.cq_a[2]),
                MotorAxis::RotationZ => Vec3::new(row.cq_a[3], row.cq_a[4], row.cq_a[5]),
            };
            // Project the row impulse onto the axis. For rotation rows the
            // projection carries the 0.5 quaternion-rate factor, mapping the
            // multiplier back to a physical torque.
            self.reaction = block.dot(&axis) * row.multiplier / h;
        }
        Ok(())
    }

    /// Measured relative coordinate along the actuated axis (m or rad).
    pub fn measured(&self) -> f64 {
        self.actual
    }

    /// Measured relative speed along the actuated axis (m/s or rad/s).
    pub fn measured_dt(&self) -> f64 {
        self.actual_dt
    }

    /// Measured relative acceleration along the actuated axis.
    pub fn measured_dtdt(&self) -> f64 {
        self.actual_dtdt
    }

    /// The motor's own notion of traveled position/angle: for drift-avoiding
    /// speed motors this is the integral of the commanded speed plus offset,
    /// immune to solver drift; otherwise the measured coordinate.
    pub fn traveled(&self) -> f64 {
        match &self.behavior {
            Behavior::Speed {
                offset,
                avoid_drift: true,
                ..
            } => self.aux + offset,
            _ => self.actual,
        }
    }

    /// Force or torque the motor exerted along its axis at the last step.
    /// For force motors this is the commanded value itself.
    pub fn reaction(&self) -> f64 {
        self.reaction
    }

    pub(crate) fn mate(&self) -> &MateFrames {
        &self.mate
    }
}

fn add_wrench(block: &mut VariableBlock, lin: &Vec3, ang: &Vec3) {
    for i in 0..3 {
        block.fb[i] += lin[i];
        block.fb[i + 3] += ang[i];
    }
}

impl StateSlots for Motor {
    fn state_dims(&self) -> (usize, usize) {
        if self.aux_var.is_some() {
            (1, 1)
        } else {
            (0, 0)
        }
    }

    fn gather_state(&self, off_x: usize, x: &mut DVec, off_v: usize, v: &mut DVec) {
        if self.aux_var.is_some() {
            x[off_x] = self.aux;
            v[off_v] = self.aux_dt;
        }
    }

    fn scatter_state(&mut self, off_x: usize, x: &DVec, off_v: usize, v: &DVec) {
        if self.aux_var.is_some() {
            self.aux = x[off_x];
            self.aux_dt = v[off_v];
        }
    }

    fn gather_acceleration(&self, off_a: usize, a: &mut DVec) {
        if self.aux_var.is_some() {
            a[off_a] = self.aux_dtdt;
        }
    }

    fn scatter_acceleration(&mut self, off_a: usize, a: &DVec) {
        if self.aux_var.is_some() {
            self.aux_dtdt = a[off_a];
        }
    }
}
