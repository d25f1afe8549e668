//! `drivesim-control` – the per-tick vehicle loop.
//!
//! Ties keyboard input, actuation and sensing together behind one
//! host-driven [`Vehicle`][vehicle::Vehicle].
//!
//! # Modules
//!
//! - [`input`] – [`KeyboardHub`][input::KeyboardHub] and the scoped
//!   [`KeyListener`][input::KeyListener] guard feeding the per-vehicle
//!   [`InputState`][input::InputState].
//! - [`drive`] – [`DriveController`][drive::DriveController]: maps the six
//!   control flags to steering, engine and brake values and pushes changes
//!   to the wheels.
//! - [`vehicle`] – [`Vehicle`][vehicle::Vehicle]: owns one vehicle's input,
//!   controller, physics link, obstacle index and sensor sampler.
//! - [`clock`] – [`SimClock`][clock::SimClock]: fixed-step manual scheduler
//!   for tests and headless runs.
//!
//! # Tick order
//!
//! Input is sampled before actuation is pushed, and all rays are cast before
//! the publish attempt.  Timers are fired by the host between ticks, never
//! from inside one.

pub mod clock;
pub mod drive;
pub mod input;
pub mod vehicle;

pub use clock::SimClock;
pub use drive::{DriveController, DriveLimits, DriveOutput, PushedFields};
pub use input::{InputSnapshot, InputState, KeyEvent, KeyListener, KeyMap, KeyboardHub};
pub use vehicle::{TickReport, Vehicle, VehicleBuilder};
