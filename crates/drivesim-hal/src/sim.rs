//! In-process stand-in for the physics collaborator.
//!
//! [`SimVehicle`] records every per-wheel command it receives and integrates
//! a coarse kinematic model so the full stack can run headless in tests and
//! in the CLI.  It is not a suspension solver: wheels have no contact model
//! and the chassis rides at a fixed height above a flat ground plane.
//!
//! # Example
//!
//! ```rust
//! use drivesim_hal::physics::RaycastVehicle;
//! use drivesim_hal::sim::SimVehicle;
//!
//! let mut sim = SimVehicle::new(true);
//! sim.apply_engine_force(-1000.0, 2).unwrap();
//! sim.apply_engine_force(-1000.0, 3).unwrap();
//! sim.step(0.1);
//! assert!(sim.chassis_pose().position.z > 0.0);
//! ```

use drivesim_types::{Pose, Quaternion, SimError, Vec3};

use crate::physics::{BodyHandle, RaycastVehicle, VehicleAssembly};
use crate::wheel::{AxisMapping, WHEEL_COUNT, WheelActuatorBinding};

const CHASSIS_MASS: f32 = 150.0;
const GRAVITY: f32 = 9.82;
const BRAKE_DECEL: f32 = 20.0;
const ROLLING_DRAG: f32 = 0.5;
/// Rate at which yaw velocity converges on the steering-induced rate.
const YAW_RESPONSE: f32 = 4.0;

/// Kinematic stand-in for a raycast vehicle.  Always accepts commands for
/// wheels `0..4`.
#[derive(Debug, Clone)]
pub struct SimVehicle {
    assembly: VehicleAssembly,
    movable: bool,
    wheelbase: f32,
    ride_height: f32,

    engine: [f32; WHEEL_COUNT],
    steering: [f32; WHEEL_COUNT],
    brake: [f32; WHEEL_COUNT],
    command_count: usize,

    position: Vec3,
    rotation: Quaternion,
    euler: Vec3,
    velocity: Vec3,
    angular_velocity: Vec3,
}

impl SimVehicle {
    /// A sim vehicle on the default wheel binding, resting at the origin.
    pub fn new(movable: bool) -> Self {
        let binding = WheelActuatorBinding::default();
        let assembly = VehicleAssembly {
            chassis: BodyHandle(0),
            wheels: [BodyHandle(1), BodyHandle(2), BodyHandle(3), BodyHandle(4)],
            slots: *binding.slots(),
            axes: AxisMapping::default(),
        };
        Self::from_assembly(assembly, binding.geometry().wheelbase(), movable)
    }

    /// Build from an explicit assembly.
    pub fn from_assembly(assembly: VehicleAssembly, wheelbase: f32, movable: bool) -> Self {
        let front = assembly.slots[0];
        let ride_height =
            front.suspension.suspension_rest_length + front.radius - front.connection_point.y;
        Self {
            assembly,
            movable,
            wheelbase,
            ride_height,
            engine: [0.0; WHEEL_COUNT],
            steering: [0.0; WHEEL_COUNT],
            brake: [0.0; WHEEL_COUNT],
            command_count: 0,
            position: Vec3::new(0.0, ride_height, 0.0),
            rotation: Quaternion::identity(),
            euler: Vec3::zero(),
            velocity: Vec3::zero(),
            angular_velocity: Vec3::zero(),
        }
    }

    pub fn assembly(&self) -> &VehicleAssembly {
        &self.assembly
    }

    pub fn engine_forces(&self) -> [f32; WHEEL_COUNT] {
        self.engine
    }

    pub fn steering_values(&self) -> [f32; WHEEL_COUNT] {
        self.steering
    }

    pub fn brake_forces(&self) -> [f32; WHEEL_COUNT] {
        self.brake
    }

    /// Number of per-wheel commands received so far.
    pub fn command_count(&self) -> usize {
        self.command_count
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn angular_velocity(&self) -> Vec3 {
        self.angular_velocity
    }

    /// The Euler angles last written by
    /// [`set_chassis_rotation`][RaycastVehicle::set_chassis_rotation].
    pub fn euler_rotation(&self) -> Vec3 {
        self.euler
    }

    /// Advance the kinematic model by `dt` seconds.
    pub fn step(&mut self, dt: f32) {
        if !self.movable || dt <= 0.0 {
            return;
        }

        let engine = (self.engine[2] + self.engine[3]) * 0.5;
        let steer = (self.steering[0] + self.steering[1]) * 0.5;
        let braking = self.brake.iter().any(|b| *b > 0.0);

        let forward = self.rotation.rotate(Vec3::new(0.0, 0.0, 1.0));
        let mut speed = self.velocity.dot(forward);
        // Negative engine force drives along +Z.
        speed += -engine / CHASSIS_MASS * dt;
        if braking {
            let slow = (BRAKE_DECEL * dt).min(speed.abs());
            speed -= slow * speed.signum();
        }
        speed *= 1.0 - (ROLLING_DRAG * dt).min(1.0);

        // Positive steering turns left, i.e. towards -X.
        let yaw_rate = -speed * steer.tan() / self.wheelbase;
        let blend = (YAW_RESPONSE * dt).min(1.0);
        self.angular_velocity.y += (yaw_rate - self.angular_velocity.y) * blend;
        self.rotation = Quaternion::from_axis_angle(Vec3::up(), self.angular_velocity.y * dt)
            .mul(self.rotation);

        let mut vy = self.velocity.y;
        if self.position.y > self.ride_height {
            vy -= GRAVITY * dt;
        }
        let heading = self.rotation.rotate(Vec3::new(0.0, 0.0, 1.0));
        self.velocity = Vec3::new(heading.x * speed, vy, heading.z * speed);
        self.position = self.position.add(self.velocity.scale(dt));
        if self.position.y < self.ride_height {
            self.position.y = self.ride_height;
            self.velocity.y = 0.0;
        }
    }

    fn wheel(index: usize) -> Result<usize, SimError> {
        if index < WHEEL_COUNT {
            Ok(index)
        } else {
            Err(SimError::InvalidConfiguration(format!(
                "wheel index {index} out of range"
            )))
        }
    }
}

impl RaycastVehicle for SimVehicle {
    fn apply_engine_force(&mut self, force: f32, wheel_index: usize) -> Result<(), SimError> {
        self.engine[Self::wheel(wheel_index)?] = force;
        self.command_count += 1;
        Ok(())
    }

    fn set_steering_value(&mut self, value: f32, wheel_index: usize) -> Result<(), SimError> {
        self.steering[Self::wheel(wheel_index)?] = value;
        self.command_count += 1;
        Ok(())
    }

    fn set_brake(&mut self, force: f32, wheel_index: usize) -> Result<(), SimError> {
        self.brake[Self::wheel(wheel_index)?] = force;
        self.command_count += 1;
        Ok(())
    }

    fn set_chassis_position(&mut self, position: Vec3) {
        self.position = position;
    }

    fn set_chassis_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn set_chassis_angular_velocity(&mut self, angular_velocity: Vec3) {
        self.angular_velocity = angular_velocity;
    }

    fn set_chassis_rotation(&mut self, euler: Vec3) {
        self.euler = euler;
        self.rotation = Quaternion::from_euler_xyz(euler);
    }

    fn chassis_pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drive(sim: &mut SimVehicle, force: f32) {
        sim.apply_engine_force(force, 2).unwrap();
        sim.apply_engine_force(force, 3).unwrap();
    }

    #[test]
    fn rests_at_ride_height() {
        let sim = SimVehicle::new(true);
        let y = sim.chassis_pose().position.y;
        assert!((y - 0.64).abs() < 1e-5, "y={y}");
    }

    #[test]
    fn negative_engine_force_moves_forward() {
        let mut sim = SimVehicle::new(true);
        drive(&mut sim, -1000.0);
        for _ in 0..10 {
            sim.step(0.016);
        }
        assert!(sim.chassis_pose().position.z > 0.0);
        assert!(sim.velocity().z > 0.0);
    }

    #[test]
    fn static_body_ignores_forces() {
        let mut sim = SimVehicle::new(false);
        let start = sim.chassis_pose();
        drive(&mut sim, -1000.0);
        sim.step(1.0);
        assert_eq!(sim.chassis_pose(), start);
    }

    #[test]
    fn brake_slows_vehicle() {
        let mut sim = SimVehicle::new(true);
        drive(&mut sim, -1000.0);
        for _ in 0..30 {
            sim.step(0.016);
        }
        let cruising = sim.velocity().z;
        drive(&mut sim, 0.0);
        for wheel in 0..4 {
            sim.set_brake(1_000_000.0, wheel).unwrap();
        }
        for _ in 0..30 {
            sim.step(0.016);
        }
        assert!(sim.velocity().z < cruising);
        assert!(sim.velocity().z >= 0.0);
    }

    #[test]
    fn positive_steering_turns_left() {
        let mut sim = SimVehicle::new(true);
        drive(&mut sim, -1000.0);
        sim.set_steering_value(0.5, 0).unwrap();
        sim.set_steering_value(0.5, 1).unwrap();
        for _ in 0..120 {
            sim.step(0.016);
        }
        assert!(sim.chassis_pose().position.x < 0.0);
    }

    #[test]
    fn out_of_range_wheel_is_rejected() {
        let mut sim = SimVehicle::new(true);
        assert!(sim.set_brake(1.0, 4).is_err());
        assert_eq!(sim.command_count(), 0);
    }

    #[test]
    fn reset_from_height_falls_to_ground() {
        let mut sim = SimVehicle::new(true);
        sim.set_chassis_position(Vec3::new(0.0, 5.0, 0.0));
        for _ in 0..300 {
            sim.step(0.016);
        }
        assert!((sim.chassis_pose().position.y - 0.64).abs() < 1e-4);
    }
}
