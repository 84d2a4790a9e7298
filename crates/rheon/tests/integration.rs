//! End-to-end scenarios: motors driving bodies through full stepping loops.

use approx::assert_relative_eq;
use rheon::rheon_math::Mat3;
use rheon::{
    ConstFn, Frame, GuideConstraint, Motor, MotorConfig, MotorState, Quat, RampFn, RigidBody,
    System, Vec3, GRAVITY,
};

fn zero_g() -> System {
    let mut system = System::new();
    system.gravity = Vec3::zeros();
    system
}

fn vertical_guide() -> Frame {
    // Maps the guide X axis onto world +Z.
    Frame {
        pos: Vec3::zeros(),
        rot: Quat::from_axis_angle(&Vec3::new(0.0, 1.0, 0.0), -std::f64::consts::FRAC_PI_2),
    }
}

#[test]
fn test_linear_position_motor_tracks_ramp() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let slider = system.add_body(RigidBody::new("slider", 2.0, Mat3::identity()));

    let mut m = Motor::linear_position("servo");
    m.set_function(Box::new(RampFn::new(0.0, 0.25))).unwrap();
    m.configure(slider, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.01;
    for _ in 0..400 {
        system.step(h).unwrap();
    }
    // 4 s at 0.25 m/s setpoint slope.
    let motor = system.motor(id).unwrap();
    assert_relative_eq!(motor.measured(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(motor.measured_dt(), 0.25, epsilon = 1e-6);
    let x = system.bodies.get(slider).unwrap().pose.pos.x;
    assert_relative_eq!(x, 1.0, epsilon = 1e-6);
}

#[test]
fn test_rotation_angle_motor_tracks_ramp() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let rotor = system.add_body(RigidBody::new("rotor", 1.0, Mat3::identity()));

    let mut m = Motor::rotation_angle("servo");
    m.set_function(Box::new(RampFn::new(0.0, 0.5))).unwrap();
    m.configure(rotor, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.01;
    for _ in 0..200 {
        system.step(h).unwrap();
    }
    // 2 s at 0.5 rad/s setpoint slope.
    let motor = system.motor(id).unwrap();
    assert_relative_eq!(motor.measured(), 1.0, epsilon = 1e-6);
    assert_relative_eq!(motor.measured_dt(), 0.5, epsilon = 1e-6);
    let w = system.bodies.get(rotor).unwrap().ang_vel.z;
    assert_relative_eq!(w, 0.5, epsilon = 1e-6);
}

#[test]
fn test_rotation_angle_motor_tracks_past_pi() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let rotor = system.add_body(RigidBody::new("rotor", 1.0, Mat3::identity()));

    let mut m = Motor::rotation_angle("servo");
    m.set_function(Box::new(RampFn::new(0.0, 1.0))).unwrap();
    m.configure(rotor, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.01;
    for _ in 0..400 {
        system.step(h).unwrap();
    }
    // 4 rad of setpoint: the rotating reference frame keeps the residual
    // small across the ±π wrap, and the measurement comes back wrapped.
    let motor = system.motor(id).unwrap();
    let wrapped = 4.0 - 2.0 * std::f64::consts::PI;
    assert_relative_eq!(motor.measured(), wrapped, epsilon = 1e-6);
    assert_relative_eq!(motor.measured_dt(), 1.0, epsilon = 1e-6);
}

#[test]
fn test_rotation_speed_motor_accumulates_past_pi() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let rotor = system.add_body(RigidBody::new("rotor", 1.0, Mat3::identity()));

    let mut m = Motor::rotation_speed("spin");
    m.set_function(Box::new(ConstFn::new(2.0))).unwrap();
    m.configure(rotor, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.005;
    for _ in 0..600 {
        system.step(h).unwrap();
    }
    // 3 s at 2 rad/s: the traveled angle keeps counting past ±π.
    let motor = system.motor(id).unwrap();
    assert_relative_eq!(motor.traveled(), 6.0, epsilon = 1e-6);
    assert_relative_eq!(motor.measured_dt(), 2.0, epsilon = 1e-6);
    // The wrapped measurement agrees modulo 2π.
    let wrapped = (6.0 + std::f64::consts::PI).rem_euclid(2.0 * std::f64::consts::PI)
        - std::f64::consts::PI;
    assert_relative_eq!(motor.measured(), wrapped, epsilon = 1e-3);
}

#[test]
fn test_torque_motor_spins_up_rotor() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let rotor = system.add_body(RigidBody::new("rotor", 1.0, Mat3::identity()));

    let mut m = Motor::rotation_torque("driver");
    m.set_function(Box::new(ConstFn::new(2.0))).unwrap();
    m.configure(rotor, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.01;
    for _ in 0..100 {
        system.step(h).unwrap();
    }
    // τ = 2, I_zz = 1: ω = τ t = 2 rad/s after 1 s.
    let w = system.bodies.get(rotor).unwrap().ang_vel.z;
    assert_relative_eq!(w, 2.0, epsilon = 1e-9);
    // A force motor reports its commanded value as the reaction.
    assert_relative_eq!(system.motor(id).unwrap().reaction(), 2.0, epsilon = 1e-12);
}

#[test]
fn test_drift_avoidance_recovers_from_disturbance() {
    let run = |avoid: bool| -> f64 {
        let mut system = zero_g();
        let ground = system.add_body(RigidBody::new_fixed("ground"));
        let slider = system.add_body(RigidBody::new("slider", 1.0, Mat3::identity()));

        let mut m = Motor::linear_speed("drive");
        m.set_function(Box::new(ConstFn::new(0.5))).unwrap();
        m.set_avoid_drift(avoid).unwrap();
        m.configure(slider, Frame::identity(), ground, Frame::identity(), &system.bodies)
            .unwrap();
        let id = system.add_motor(m).unwrap();

        let h = 0.01;
        for _ in 0..100 {
            system.step(h).unwrap();
        }
        // Knock the slider 0.1 m ahead of where the motor put it.
        system.bodies.get_mut(slider).unwrap().pose.pos.x += 0.1;
        for _ in 0..100 {
            system.step(h).unwrap();
        }
        let _ = id;
        system.bodies.get(slider).unwrap().pose.pos.x
    };

    // With drift avoidance the position is pulled back to the commanded
    // integral (1.0 m after 2 s at 0.5 m/s); without it the disturbance
    // persists forever.
    assert_relative_eq!(run(true), 1.0, epsilon = 1e-3);
    assert_relative_eq!(run(false), 1.1, epsilon = 1e-3);
}

#[test]
fn test_speed_motor_holds_load_reaction() {
    let mut system = System::new();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let mass = 3.0;
    let slider = system.add_body(RigidBody::new("slider", mass, Mat3::identity()));

    let guide = vertical_guide();
    let mut m = Motor::linear_speed("lift");
    m.set_function(Box::new(ConstFn::new(0.0))).unwrap();
    m.configure(slider, guide, ground, guide, &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    let h = 0.01;
    for _ in 0..50 {
        system.step(h).unwrap();
    }
    // Holding still against gravity: the motor carries the full weight.
    let motor = system.motor(id).unwrap();
    assert_relative_eq!(motor.reaction(), mass * GRAVITY, epsilon = 1e-6);
    let z = system.bodies.get(slider).unwrap().pose.pos.z;
    assert_relative_eq!(z, 0.0, epsilon = 1e-9);
}

#[test]
fn test_spherical_guide_leaves_rotation_free() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let slider = system.add_body(RigidBody::new("slider", 1.0, Mat3::identity()));
    system
        .bodies
        .get_mut(slider)
        .unwrap()
        .ang_vel = Vec3::new(0.3, 0.0, 0.0);

    let mut m = Motor::linear_speed("drive");
    m.set_function(Box::new(ConstFn::new(0.0))).unwrap();
    m.configure(slider, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();
    system
        .reconfigure_motor(id, |m| m.set_guide(GuideConstraint::Spherical))
        .unwrap();

    for _ in 0..50 {
        system.step(0.01).unwrap();
    }
    // The spherical guide locks y/z translation only; the tumble survives.
    let body = system.bodies.get(slider).unwrap();
    assert_relative_eq!(body.ang_vel.x, 0.3, epsilon = 1e-9);
    assert_relative_eq!(body.pose.pos.y, 0.0, epsilon = 1e-9);
    assert_relative_eq!(body.pose.pos.z, 0.0, epsilon = 1e-9);
}

#[test]
fn test_motor_rebuilt_from_config_behaves_identically() {
    let build = |from_config: bool| -> f64 {
        let mut system = zero_g();
        let ground = system.add_body(RigidBody::new_fixed("ground"));
        let slider = system.add_body(RigidBody::new("slider", 1.0, Mat3::identity()));

        let mut m = Motor::linear_position("servo");
        m.set_function(Box::new(RampFn::new(0.0, 0.5))).unwrap();
        m.configure(slider, Frame::identity(), ground, Frame::identity(), &system.bodies)
            .unwrap();
        let m = if from_config {
            let json = serde_json::to_string(&MotorConfig::from_motor(&m).unwrap()).unwrap();
            let cfg: MotorConfig = serde_json::from_str(&json).unwrap();
            cfg.build(&system.bodies).unwrap()
        } else {
            m
        };
        system.add_motor(m).unwrap();
        for _ in 0..100 {
            system.step(0.01).unwrap();
        }
        system.bodies.get(slider).unwrap().pose.pos.x
    };

    assert_relative_eq!(build(false), build(true), epsilon = 1e-12);
}

#[test]
fn test_removed_motor_releases_its_rows() {
    let mut system = zero_g();
    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let slider = system.add_body(RigidBody::new("slider", 1.0, Mat3::identity()));

    let mut m = Motor::linear_speed("drive");
    m.configure(slider, Frame::identity(), ground, Frame::identity(), &system.bodies)
        .unwrap();
    let id = system.add_motor(m).unwrap();

    for _ in 0..50 {
        system.step(0.01).unwrap();
    }
    let v = system.bodies.get(slider).unwrap().lin_vel.x;
    assert_relative_eq!(v, 1.0, epsilon = 1e-9);

    system.remove_motor(id).unwrap();
    assert_eq!(system.motor(id).unwrap().state(), MotorState::Removed);
    for _ in 0..50 {
        system.step(0.01).unwrap();
    }
    // No rows left: the slider coasts at its released velocity.
    let body = system.bodies.get(slider).unwrap();
    assert_relative_eq!(body.lin_vel.x, 1.0, epsilon = 1e-9);
    assert_relative_eq!(body.pose.pos.x, 1.0, epsilon = 1e-9);
}
