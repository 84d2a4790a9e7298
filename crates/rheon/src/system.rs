//! The `System`: bodies, motors, and the stepping loop.
//!
//! Owns a [`BodySet`], the motors acting between its bodies, and the
//! [`SystemDescriptor`] both are registered in. `step` advances the whole
//! system by one semi-implicit Euler step: assemble body momenta and motor
//! rows, solve the coupled velocity/impulse problem, pull reactions back,
//! and integrate poses with the new velocities.

use crate::error::{Result, SystemError};
use rheon_math::{DMat, DVec, Quat, Vec3, GRAVITY};
use rheon_model::{BodyId, BodySet, RigidBody};
use rheon_motor::{Motor, MotorState};
use rheon_solver::{
    solve, SolveInfo, SolverSettings, StateSlots, SystemDescriptor, VarHandle, VariableBlock,
};

/// Opaque handle to a motor registered with a [`System`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MotorId(usize);

/// A motorized multibody system.
pub struct System {
    pub bodies: BodySet,
    motors: Vec<Motor>,
    desc: SystemDescriptor,
    body_vars: Vec<VarHandle>,
    pub settings: SolverSettings,
    pub gravity: Vec3,
    time: f64,
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

impl System {
    pub fn new() -> Self {
        Self {
            bodies: BodySet::new(),
            motors: Vec::new(),
            desc: SystemDescriptor::new(),
            body_vars: Vec::new(),
            settings: SolverSettings::default(),
            gravity: Vec3::new(0.0, 0.0, -GRAVITY),
            time: 0.0,
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Add a body, registering its 6-DOF variable block.
    pub fn add_body(&mut self, body: RigidBody) -> BodyId {
        let block = if body.fixed {
            VariableBlock::fixed6()
        } else {
            VariableBlock::new(mass_matrix(&body))
        };
        let id = self.bodies.insert(body);
        self.body_vars.push(self.desc.insert_variables(block));
        id
    }

    /// Register a configured motor and activate it. Returns its id.
    pub fn add_motor(&mut self, mut motor: Motor) -> Result<MotorId> {
        let (va, vb) = self.motor_body_vars(&motor)?;
        motor.activate(va, vb, &mut self.desc)?;
        self.motors.push(motor);
        Ok(MotorId(self.motors.len() - 1))
    }

    fn motor_body_vars(&self, motor: &Motor) -> Result<(VarHandle, VarHandle)> {
        let (a, b) = motor
            .bound_bodies()
            .ok_or(rheon_motor::MotorError::NotConfigured)?;
        Ok((self.body_vars[a.0], self.body_vars[b.0]))
    }

    pub fn motor(&self, id: MotorId) -> Result<&Motor> {
        self.motors.get(id.0).ok_or(SystemError::UnknownMotor(id.0))
    }

    pub fn motor_mut(&mut self, id: MotorId) -> Result<&mut Motor> {
        self.motors
            .get_mut(id.0)
            .ok_or(SystemError::UnknownMotor(id.0))
    }

    /// Withdraw a motor's rows without retiring it.
    pub fn deactivate_motor(&mut self, id: MotorId) -> Result<()> {
        let motor = self
            .motors
            .get_mut(id.0)
            .ok_or(SystemError::UnknownMotor(id.0))?;
        motor.deactivate(&mut self.desc)?;
        Ok(())
    }

    /// Re-register a deactivated motor.
    pub fn reactivate_motor(&mut self, id: MotorId) -> Result<()> {
        let motor = self.motors.get(id.0).ok_or(SystemError::UnknownMotor(id.0))?;
        let (va, vb) = self.motor_body_vars(motor)?;
        self.motors[id.0].activate(va, vb, &mut self.desc)?;
        Ok(())
    }

    /// Apply a topology-changing mutation to an active motor: deactivate,
    /// mutate, re-activate. The motor is re-activated even when the
    /// mutation fails.
    pub fn reconfigure_motor<F>(&mut self, id: MotorId, f: F) -> Result<()>
    where
        F: FnOnce(&mut Motor) -> rheon_motor::Result<()>,
    {
        let was_active = self.motor(id)?.state() == MotorState::Active;
        if was_active {
            self.deactivate_motor(id)?;
        }
        let outcome = f(&mut self.motors[id.0]);
        if was_active {
            self.reactivate_motor(id)?;
        }
        outcome.map_err(SystemError::from)
    }

    /// Permanently retire a motor. Its id stays valid but refers to a
    /// removed motor from now on.
    pub fn remove_motor(&mut self, id: MotorId) -> Result<()> {
        let motor = self
            .motors
            .get_mut(id.0)
            .ok_or(SystemError::UnknownMotor(id.0))?;
        motor.remove(&mut self.desc)?;
        Ok(())
    }

    /// Advance the system by one step of size `h`.
    pub fn step(&mut self, h: f64) -> Result<SolveInfo> {
        let inv_h = 1.0 / h;

        // Body momenta: fb = M v + h F, with gravity and the gyroscopic
        // torque as the external loads.
        for (id, body) in self.bodies.iter() {
            let block = self.desc.variable_mut(self.body_vars[id.0]);
            block.fb.fill(0.0);
            if body.fixed {
                block.qb.fill(0.0);
                continue;
            }
            let m = mass_matrix(body);
            let inv = m
                .clone()
                .try_inverse()
                .unwrap_or_else(|| DMat::zeros(6, 6));
            let iw = body.world_inertia();
            let f = self.gravity * body.mass;
            let tau = -body.ang_vel.cross(&(iw * body.ang_vel));
            for i in 0..3 {
                block.fb[i] = body.mass * body.lin_vel[i] + h * f[i];
                block.fb[i + 3] = (iw * body.ang_vel)[i] + h * tau[i];
            }
            block.mass = m;
            block.inv_mass = inv;
        }

        for motor in &mut self.motors {
            if motor.state() != MotorState::Active {
                continue;
            }
            motor.update(self.time, &self.bodies, &mut self.desc)?;
            motor.assemble_aux(self.time, h, &mut self.desc)?;
            motor.load_forces(self.time, h, &mut self.desc)?;
        }

        self.desc.assemble_rhs(inv_h);
        self.desc.count_offsets();
        let info = solve(&mut self.desc, &self.settings);

        for motor in &mut self.motors {
            if motor.state() == MotorState::Active {
                motor.after_solve(h, &self.desc)?;
            }
        }

        // Pull new velocities back and integrate poses.
        let desc = &self.desc;
        let body_vars = &self.body_vars;
        for (id, body) in self.bodies.iter_mut() {
            if body.fixed {
                continue;
            }
            let qb = &desc.variable(body_vars[id.0]).qb;
            let v_new = Vec3::new(qb[0], qb[1], qb[2]);
            let w_new = Vec3::new(qb[3], qb[4], qb[5]);
            body.lin_acc = (v_new - body.lin_vel) * inv_h;
            body.ang_acc = (w_new - body.ang_vel) * inv_h;
            body.lin_vel = v_new;
            body.ang_vel = w_new;
            body.pose.pos += v_new * h;
            let angle = w_new.norm() * h;
            if angle > 0.0 {
                let axis = w_new / w_new.norm();
                body.pose.rot = Quat::from_axis_angle(&axis, angle)
                    .mul(&body.pose.rot)
                    .normalize();
            }
        }

        // Re-measure motor kinematics against the integrated poses so the
        // reported coordinates match the end-of-step state.
        for motor in &mut self.motors {
            if motor.state() == MotorState::Active {
                motor.measure(&self.bodies)?;
            }
        }

        self.time += h;
        Ok(info)
    }

    /// Pack body poses/velocities and motor auxiliary state into flat
    /// vectors. Bodies contribute 7 position slots (3 + quaternion) and 6
    /// speed slots each; motors contribute via [`StateSlots`].
    pub fn gather_state(&self) -> (DVec, DVec) {
        let (nx, nv) = self.state_dims();
        let mut x = DVec::zeros(nx);
        let mut v = DVec::zeros(nv);
        let mut off_x = 0;
        let mut off_v = 0;
        for (_, body) in self.bodies.iter() {
            x[off_x] = body.pose.pos.x;
            x[off_x + 1] = body.pose.pos.y;
            x[off_x + 2] = body.pose.pos.z;
            x[off_x + 3] = body.pose.rot.w;
            x[off_x + 4] = body.pose.rot.v.x;
            x[off_x + 5] = body.pose.rot.v.y;
            x[off_x + 6] = body.pose.rot.v.z;
            for i in 0..3 {
                v[off_v + i] = body.lin_vel[i];
                v[off_v + 3 + i] = body.ang_vel[i];
            }
            off_x += 7;
            off_v += 6;
        }
        for motor in &self.motors {
            motor.gather_state(off_x, &mut x, off_v, &mut v);
            let (dx, dv) = motor.state_dims();
            off_x += dx;
            off_v += dv;
        }
        (x, v)
    }

    /// Restore state previously captured with [`System::gather_state`].
    /// The motor set and each motor's topology must be unchanged.
    pub fn scatter_state(&mut self, x: &DVec, v: &DVec) {
        let mut off_x = 0;
        let mut off_v = 0;
        for (_, body) in self.bodies.iter_mut() {
            body.pose.pos = Vec3::new(x[off_x], x[off_x + 1], x[off_x + 2]);
            body.pose.rot =
                Quat::new(x[off_x + 3], x[off_x + 4], x[off_x + 5], x[off_x + 6]).normalize();
            for i in 0..3 {
                body.lin_vel[i] = v[off_v + i];
                body.ang_vel[i] = v[off_v + 3 + i];
            }
            off_x += 7;
            off_v += 6;
        }
        for motor in &mut self.motors {
            motor.scatter_state(off_x, x, off_v, v);
            let (dx, dv) = motor.state_dims();
            off_x += dx;
            off_v += dv;
        }
    }

    fn state_dims(&self) -> (usize, usize) {
        let mut nx = 7 * self.bodies.len();
        let mut nv = 6 * self.bodies.len();
        for motor in &self.motors {
            let (dx, dv) = motor.state_dims();
            nx += dx;
            nv += dv;
        }
        (nx, nv)
    }
}

fn mass_matrix(body: &RigidBody) -> DMat {
    let mut m = DMat::zeros(6, 6);
    for i in 0..3 {
        m[(i, i)] = body.mass;
    }
    let iw = body.world_inertia();
    for i in 0..3 {
        for j in 0..3 {
            m[(i + 3, j + 3)] = iw[(i, j)];
        }
    }
    m
}
