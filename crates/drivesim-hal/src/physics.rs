//! The physics collaborator seam.
//!
//! The rigid-body and suspension solver lives outside this workspace.  It is
//! reached only through the [`RaycastVehicle`] trait, so a real solver
//! binding and the in-process [`SimVehicle`][crate::sim::SimVehicle] are
//! interchangeable.

use std::f32::consts::FRAC_PI_4;

use drivesim_types::{Pose, SimError, Vec3};

use crate::wheel::{AxisMapping, WHEEL_COUNT, WheelSlot};

/// Opaque handle to a body owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub u32);

/// Everything the physics world needs to build a raycast vehicle: the
/// chassis body, four wheel bodies and their slot configuration.
#[derive(Debug, Clone)]
pub struct VehicleAssembly {
    pub chassis: BodyHandle,
    pub wheels: [BodyHandle; WHEEL_COUNT],
    pub slots: [WheelSlot; WHEEL_COUNT],
    pub axes: AxisMapping,
}

/// The chassis state written by the reset maneuver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResetPose {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Euler angles, X/Y/Z order.
    pub rotation: Vec3,
}

impl Default for ResetPose {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, 0.0),
            velocity: Vec3::zero(),
            // Slow spin on respawn.
            angular_velocity: Vec3::new(0.0, 0.5, 0.0),
            rotation: Vec3::new(0.0, -FRAC_PI_4, 0.0),
        }
    }
}

/// A raycast vehicle owned by the physics collaborator.
///
/// Wheel indices follow [`WheelSlot::index`]; out-of-range indices are a
/// collaborator error.
pub trait RaycastVehicle: Send {
    /// Apply `force` to the wheel at `wheel_index`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfiguration`] for an unknown wheel.
    fn apply_engine_force(&mut self, force: f32, wheel_index: usize) -> Result<(), SimError>;

    /// Steer the wheel at `wheel_index` to `value` radians.
    fn set_steering_value(&mut self, value: f32, wheel_index: usize) -> Result<(), SimError>;

    /// Apply brake `force` to the wheel at `wheel_index`.
    fn set_brake(&mut self, force: f32, wheel_index: usize) -> Result<(), SimError>;

    fn set_chassis_position(&mut self, position: Vec3);

    fn set_chassis_velocity(&mut self, velocity: Vec3);

    fn set_chassis_angular_velocity(&mut self, angular_velocity: Vec3);

    /// Set the chassis orientation from X/Y/Z Euler angles.
    fn set_chassis_rotation(&mut self, euler: Vec3);

    /// Current world pose of the chassis.
    fn chassis_pose(&self) -> Pose;
}
