//! `drivesim-hal` – the physics collaborator seam.
//!
//! # Modules
//!
//! - [`wheel`] – [`WheelActuatorBinding`][wheel::WheelActuatorBinding]: the
//!   four fixed [`WheelSlot`][wheel::WheelSlot]s with chassis geometry and
//!   suspension parameters.
//! - [`physics`] – the [`RaycastVehicle`][physics::RaycastVehicle] trait a
//!   solver binding implements, plus the reset maneuver constants.
//! - [`link`] – [`VehicleLink`][link::VehicleLink]: routes wheel commands to
//!   the right slots and absorbs calls made before a solver is bound.
//! - [`sim`] – [`SimVehicle`][sim::SimVehicle]: a recording, kinematic
//!   stand-in for headless runs.

pub mod link;
pub mod physics;
pub mod sim;
pub mod wheel;

pub use link::{VehicleLink, WheelCommand};
pub use physics::{BodyHandle, RaycastVehicle, ResetPose, VehicleAssembly};
pub use sim::SimVehicle;
pub use wheel::{AxisMapping, ChassisGeometry, SuspensionConfig, WheelActuatorBinding, WheelSlot};
