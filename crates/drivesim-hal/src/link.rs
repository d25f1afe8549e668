//! [`VehicleLink`] – routes actuation commands to the physics collaborator's
//! per-wheel APIs.
//!
//! The link owns the (optional) physics handle and the
//! [`WheelActuatorBinding`].  A [`WheelCommand`] is fanned out to the slots
//! that role covers:
//!
//! | Command | Slots |
//! |---|---|
//! | [`WheelCommand::EngineForce`] | rear (2, 3) |
//! | [`WheelCommand::Steering`] | front (0, 1) |
//! | [`WheelCommand::Brake`] | all (0–3) |
//!
//! # Missing collaborator
//!
//! Commands issued while no physics handle is bound are absorbed: they are
//! logged at `debug` and reported as not applied, never as an error.  Once a
//! handle is bound the link raises a one-shot re-sync flag so the owner can
//! push its current state again.

use drivesim_types::{Pose, SimError};
use tracing::{debug, info};

use crate::physics::{RaycastVehicle, ResetPose};
use crate::wheel::WheelActuatorBinding;

/// A single actuation scalar addressed to a wheel role.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelCommand {
    EngineForce(f32),
    Steering(f32),
    Brake(f32),
}

/// Owner of the physics handle for one vehicle.
pub struct VehicleLink<P> {
    physics: Option<P>,
    binding: WheelActuatorBinding,
    needs_resync: bool,
}

impl<P: RaycastVehicle> VehicleLink<P> {
    /// Create an unbound link.
    pub fn new(binding: WheelActuatorBinding) -> Self {
        Self {
            physics: None,
            binding,
            needs_resync: false,
        }
    }

    /// Create a link that is bound from the start.
    pub fn bound(binding: WheelActuatorBinding, physics: P) -> Self {
        let mut link = Self::new(binding);
        link.bind(physics);
        link
    }

    /// Bind (or replace) the physics handle.  Returns the previous handle.
    pub fn bind(&mut self, physics: P) -> Option<P> {
        info!("physics collaborator bound");
        self.needs_resync = true;
        self.physics.replace(physics)
    }

    /// Release the physics handle, returning it to the caller.
    pub fn unbind(&mut self) -> Option<P> {
        self.needs_resync = false;
        self.physics.take()
    }

    pub fn is_bound(&self) -> bool {
        self.physics.is_some()
    }

    /// Returns `true` exactly once after each [`bind`][Self::bind].
    pub fn take_resync(&mut self) -> bool {
        std::mem::take(&mut self.needs_resync)
    }

    pub fn binding(&self) -> &WheelActuatorBinding {
        &self.binding
    }

    pub fn physics(&self) -> Option<&P> {
        self.physics.as_ref()
    }

    pub fn physics_mut(&mut self) -> Option<&mut P> {
        self.physics.as_mut()
    }

    /// Fan `command` out to the wheels of its role.
    ///
    /// Returns `false` when the command was absorbed (no collaborator, or the
    /// collaborator rejected a wheel).
    pub fn dispatch(&mut self, command: WheelCommand) -> bool {
        let Some(physics) = self.physics.as_mut() else {
            debug!(?command, "{}", missing());
            return false;
        };

        let (slots, result): (&[usize], fn(&mut P, f32, usize) -> Result<(), SimError>) =
            match command {
                WheelCommand::EngineForce(_) => (self.binding.rear_slots(), P::apply_engine_force),
                WheelCommand::Steering(_) => (self.binding.front_slots(), P::set_steering_value),
                WheelCommand::Brake(_) => (self.binding.all_slots(), P::set_brake),
            };
        let value = match command {
            WheelCommand::EngineForce(v) | WheelCommand::Steering(v) | WheelCommand::Brake(v) => v,
        };

        let mut applied = true;
        for &wheel in slots {
            if let Err(e) = result(physics, value, wheel) {
                debug!(wheel, error = %e, "wheel command rejected");
                applied = false;
            }
        }
        applied
    }

    /// Write the reset maneuver to the chassis.
    pub fn reset_chassis(&mut self, reset: &ResetPose) -> bool {
        let Some(physics) = self.physics.as_mut() else {
            debug!("{}", missing());
            return false;
        };
        physics.set_chassis_position(reset.position);
        physics.set_chassis_velocity(reset.velocity);
        physics.set_chassis_angular_velocity(reset.angular_velocity);
        physics.set_chassis_rotation(reset.rotation);
        true
    }

    /// Current chassis pose, or `None` while unbound.
    pub fn chassis_pose(&self) -> Option<Pose> {
        self.physics.as_ref().map(|p| p.chassis_pose())
    }
}

fn missing() -> SimError {
    SimError::MissingCollaborator {
        component: "raycast_vehicle".to_string(),
    }
}
