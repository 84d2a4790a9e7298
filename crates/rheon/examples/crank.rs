//! Spin a rotor with a speed motor and print the tracked angle.

use rheon::{ConstFn, Frame, Motor, RigidBody, System, Vec3};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut system = System::new();
    system.gravity = Vec3::zeros();

    let ground = system.add_body(RigidBody::new_fixed("ground"));
    let rotor = system.add_body(RigidBody::new(
        "rotor",
        1.0,
        rheon::rheon_math::Mat3::identity(),
    ));

    let mut motor = Motor::rotation_speed("crank");
    motor.set_function(Box::new(ConstFn::new(1.0)))?;
    motor.configure(
        rotor,
        Frame::identity(),
        ground,
        Frame::identity(),
        &system.bodies,
    )?;
    let id = system.add_motor(motor)?;

    let h = 0.01;
    for step in 0..500 {
        let info = system.step(h)?;
        if step % 100 == 99 {
            let m = system.motor(id)?;
            println!(
                "t = {:.2} s  angle = {:.4} rad  torque = {:+.2e} N·m  ({} iters)",
                system.time(),
                m.traveled(),
                m.reaction(),
                info.iterations
            );
        }
    }
    Ok(())
}
