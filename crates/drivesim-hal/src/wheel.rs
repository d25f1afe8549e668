//! Static wheel geometry and suspension configuration.
//!
//! [`WheelActuatorBinding`] produces the four [`WheelSlot`]s handed to the
//! physics collaborator when the raycast vehicle is assembled.  Slot roles
//! are fixed:
//!
//! | Slot | Position | Receives |
//! |---|---|---|
//! | 0 | front-left | steering, brake |
//! | 1 | front-right | steering, brake |
//! | 2 | rear-left | engine force, brake |
//! | 3 | rear-right | engine force, brake |
//!
//! # Example
//!
//! ```rust
//! use drivesim_hal::wheel::WheelActuatorBinding;
//!
//! let binding = WheelActuatorBinding::default();
//! let fl = binding.slot(0).connection_point;
//! assert_eq!((fl.x, fl.y, fl.z), (-0.6, -0.04, 1.3));
//! ```

use drivesim_types::Vec3;
use serde::{Deserialize, Serialize};

/// Number of wheels on every vehicle.
pub const WHEEL_COUNT: usize = 4;

const FRONT_SLOTS: [usize; 2] = [0, 1];
const REAR_SLOTS: [usize; 2] = [2, 3];
const ALL_SLOTS: [usize; WHEEL_COUNT] = [0, 1, 2, 3];

/// Index of each world axis in the physics collaborator's axis table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisMapping {
    pub right: usize,
    pub up: usize,
    pub forward: usize,
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self {
            right: 0,
            up: 1,
            forward: 2,
        }
    }
}

/// Chassis dimensions the wheel connection points are derived from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisGeometry {
    /// Distance between left and right connection points.
    pub width: f32,
    /// Height of the connection points relative to the chassis origin.
    pub height: f32,
    /// Z offset of the front axle.
    pub front: f32,
    /// Z offset of the rear axle.
    pub back: f32,
}

impl Default for ChassisGeometry {
    fn default() -> Self {
        Self {
            width: 1.2,
            height: -0.04,
            front: 1.3,
            back: -1.15,
        }
    }
}

impl ChassisGeometry {
    /// Distance between the front and rear axles.
    pub fn wheelbase(&self) -> f32 {
        self.front - self.back
    }
}

/// Suspension and tyre parameters shared by all four wheels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspensionConfig {
    pub direction_local: Vec3,
    pub suspension_stiffness: f32,
    pub suspension_rest_length: f32,
    pub max_suspension_force: f32,
    pub max_suspension_travel: f32,
    pub damping_relaxation: f32,
    pub damping_compression: f32,
    pub friction_slip: f32,
    pub roll_influence: f32,
    pub axle_local: Vec3,
    pub use_custom_sliding_rotational_speed: bool,
    pub custom_sliding_rotational_speed: f32,
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            direction_local: Vec3::new(0.0, -1.0, 0.0),
            suspension_stiffness: 30.0,
            suspension_rest_length: 0.3,
            max_suspension_force: 10_000.0,
            max_suspension_travel: 0.3,
            damping_relaxation: 2.3,
            damping_compression: 4.4,
            friction_slip: 5.0,
            roll_influence: 0.01,
            axle_local: Vec3::new(-1.0, 0.0, 0.0),
            use_custom_sliding_rotational_speed: true,
            custom_sliding_rotational_speed: -30.0,
        }
    }
}

/// One of the four fixed wheel positions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WheelSlot {
    pub index: usize,
    pub is_front: bool,
    pub is_left: bool,
    /// Chassis-local attachment point.
    pub connection_point: Vec3,
    pub radius: f32,
    pub suspension: SuspensionConfig,
}

/// The immutable set of four [`WheelSlot`]s for one vehicle.
#[derive(Debug, Clone, PartialEq)]
pub struct WheelActuatorBinding {
    slots: [WheelSlot; WHEEL_COUNT],
    geometry: ChassisGeometry,
}

impl Default for WheelActuatorBinding {
    fn default() -> Self {
        Self::new(ChassisGeometry::default(), SuspensionConfig::default(), 0.3)
    }
}

impl WheelActuatorBinding {
    /// Build the four slots.  `wheel_radius` is recorded on each slot and
    /// has no effect on connection points.
    pub fn new(geometry: ChassisGeometry, suspension: SuspensionConfig, wheel_radius: f32) -> Self {
        let half = geometry.width / 2.0;
        let slot = |index: usize, is_front: bool, is_left: bool| WheelSlot {
            index,
            is_front,
            is_left,
            connection_point: Vec3::new(
                if is_left { -half } else { half },
                geometry.height,
                if is_front { geometry.front } else { geometry.back },
            ),
            radius: wheel_radius,
            suspension,
        };
        Self {
            slots: [
                slot(0, true, true),
                slot(1, true, false),
                slot(2, false, true),
                slot(3, false, false),
            ],
            geometry,
        }
    }

    /// All four slots in index order.
    pub fn slots(&self) -> &[WheelSlot; WHEEL_COUNT] {
        &self.slots
    }

    /// The slot at `index`.
    ///
    /// # Panics
    ///
    /// Panics when `index >= WHEEL_COUNT`.
    pub fn slot(&self, index: usize) -> &WheelSlot {
        &self.slots[index]
    }

    pub fn geometry(&self) -> &ChassisGeometry {
        &self.geometry
    }

    /// Steered wheels.
    pub fn front_slots(&self) -> &'static [usize] {
        &FRONT_SLOTS
    }

    /// Driven wheels.
    pub fn rear_slots(&self) -> &'static [usize] {
        &REAR_SLOTS
    }

    /// Braked wheels.
    pub fn all_slots(&self) -> &'static [usize] {
        &ALL_SLOTS
    }
}
