//! [`DriveController`] – maps the six control flags to actuation scalars.
//!
//! Per tick:
//!
//! | Field | Rule |
//! |---|---|
//! | steering | left only → `+max_steer_val`; right only → `-max_steer_val`; else `0` |
//! | engine | forward only → `-max_force`; backward only → `+max_force`; else cleared to `0` one tick later |
//! | brake | held → `max_brake_force`; else `0` |
//!
//! While reset is held the chassis is respawned every tick; the actuation
//! fields are left alone.
//!
//! Values are pushed to the wheels only when they differ from what the
//! collaborator last accepted.

use drivesim_hal::{RaycastVehicle, ResetPose, VehicleLink, WheelCommand};
use drivesim_types::{ActuationState, ControlKey};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::input::InputSnapshot;

/// Actuation magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveLimits {
    pub max_steer_val: f32,
    pub max_force: f32,
    pub max_brake_force: f32,
}

impl Default for DriveLimits {
    fn default() -> Self {
        Self {
            max_steer_val: 0.5,
            max_force: 1000.0,
            max_brake_force: 1_000_000.0,
        }
    }
}

/// Which fields reached the collaborator this tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PushedFields {
    pub engine: bool,
    pub steering: bool,
    pub brake: bool,
}

impl PushedFields {
    pub fn any(&self) -> bool {
        self.engine || self.steering || self.brake
    }
}

/// Result of one [`DriveController::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DriveOutput {
    pub state: ActuationState,
    pub pushed: PushedFields,
    /// The reset maneuver was written to the chassis.
    pub reset: bool,
}

/// Last value the collaborator accepted for each field.
#[derive(Debug, Clone, Copy)]
struct Synced {
    engine: f32,
    steering: f32,
    brake: f32,
}

#[derive(Debug, Clone)]
pub struct DriveController {
    limits: DriveLimits,
    reset: ResetPose,
    controllable: bool,
    state: ActuationState,
    synced: Synced,
    engine_clear_staged: bool,
}

impl DriveController {
    pub fn new(limits: DriveLimits, controllable: bool) -> Self {
        Self {
            limits,
            reset: ResetPose::default(),
            controllable,
            state: ActuationState::default(),
            // A freshly built collaborator starts at rest.
            synced: Synced {
                engine: 0.0,
                steering: 0.0,
                brake: 0.0,
            },
            engine_clear_staged: false,
        }
    }

    pub fn limits(&self) -> &DriveLimits {
        &self.limits
    }

    pub fn state(&self) -> ActuationState {
        self.state
    }

    pub fn is_controllable(&self) -> bool {
        self.controllable
    }

    pub fn reset_pose(&self) -> &ResetPose {
        &self.reset
    }

    /// Run one tick against `input`, pushing changes through `link`.
    pub fn tick<P: RaycastVehicle>(
        &mut self,
        input: &InputSnapshot,
        link: &mut VehicleLink<P>,
    ) -> DriveOutput {
        if !self.controllable {
            return DriveOutput {
                state: self.state,
                pushed: PushedFields::default(),
                reset: false,
            };
        }

        if std::mem::take(&mut self.engine_clear_staged) {
            self.state.engine_force = 0.0;
        }

        let held = |key| input.is_held(key);

        self.state.steering_value = match (held(ControlKey::Left), held(ControlKey::Right)) {
            (true, false) => self.limits.max_steer_val,
            (false, true) => -self.limits.max_steer_val,
            _ => 0.0,
        };

        match (held(ControlKey::Forward), held(ControlKey::Backward)) {
            (true, false) => self.state.engine_force = -self.limits.max_force,
            (false, true) => self.state.engine_force = self.limits.max_force,
            // Cleared at the start of the next tick.
            _ if self.state.engine_force != 0.0 => self.engine_clear_staged = true,
            _ => {}
        }

        self.state.brake_force = if held(ControlKey::Brake) {
            self.limits.max_brake_force
        } else {
            0.0
        };

        let force = link.take_resync();
        let pushed = PushedFields {
            engine: push(
                link,
                WheelCommand::EngineForce(self.state.engine_force),
                &mut self.synced.engine,
                force,
            ),
            steering: push(
                link,
                WheelCommand::Steering(self.state.steering_value),
                &mut self.synced.steering,
                force,
            ),
            brake: push(
                link,
                WheelCommand::Brake(self.state.brake_force),
                &mut self.synced.brake,
                force,
            ),
        };

        let reset = held(ControlKey::Reset) && link.reset_chassis(&self.reset);
        if reset {
            debug!("chassis reset");
        }

        DriveOutput {
            state: self.state,
            pushed,
            reset,
        }
    }
}

/// Push `command` unless the collaborator already holds its value.  The
/// synced value only advances when the collaborator accepted the command.
fn push<P: RaycastVehicle>(
    link: &mut VehicleLink<P>,
    command: WheelCommand,
    synced: &mut f32,
    force: bool,
) -> bool {
    let value = match command {
        WheelCommand::EngineForce(v) | WheelCommand::Steering(v) | WheelCommand::Brake(v) => v,
    };
    if !force && *synced == value {
        return false;
    }
    if link.dispatch(command) {
        *synced = value;
        true
    } else {
        false
    }
}
