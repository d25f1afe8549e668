//! `drivesim-perception` – what the vehicle can see.
//!
//! # Modules
//!
//! - [`ring`] – [`SensorRing`][ring::SensorRing]: N radial rays fixed to the
//!   chassis.
//! - [`scene`] – [`Scene`][scene::Scene]: typed, handle-addressed object
//!   registry standing in for the host scene graph.
//! - [`obstacle`] – [`ObstacleIndex`][obstacle::ObstacleIndex]: per-tick scan
//!   of the scene for sensor obstacles.
//! - [`raycast`] – ray / box intersection.
//! - [`throttle`] – [`Throttle`][throttle::Throttle]: leading + trailing
//!   edge rate limiter as an explicit state machine.
//! - [`sampler`] – [`SensorSampler`][sampler::SensorSampler]: casts the ring
//!   and publishes throttled [`SensorFrame`][sampler::SensorFrame]s.

pub mod obstacle;
pub mod raycast;
pub mod ring;
pub mod sampler;
pub mod scene;
pub mod throttle;

pub use obstacle::{Obstacle, ObstacleIndex};
pub use raycast::{Aabb, WorldRay};
pub use ring::{Ray, SensorRing};
pub use sampler::{SensorConsumer, SensorFrame, SensorSampler, SensorVector};
pub use scene::{NodeCapability, NodeId, NodeKind, Scene, SceneNode};
pub use throttle::Throttle;
