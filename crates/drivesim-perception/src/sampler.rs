//! [`SensorSampler`] – casts the ring against the obstacle index and
//! publishes the result through a [`Throttle`].
//!
//! Each [`sample`][SensorSampler::sample] call rewrites every slot of the
//! [`SensorVector`] before anything is offered to the throttle, so a
//! consumer only ever receives complete vectors.

use std::time::Duration;

use drivesim_types::Pose;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::obstacle::ObstacleIndex;
use crate::ring::SensorRing;
use crate::scene::Scene;
use crate::throttle::Throttle;

/// Per-ray distance to the nearest obstacle; `None` on a miss.  Index `i`
/// belongs to ray `i`.
pub type SensorVector = Vec<Option<f32>>;

/// One published sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorFrame {
    /// Publish counter, starting at 0.
    pub seq: u64,
    /// Host time of the publish, milliseconds.
    pub at_ms: u64,
    pub distances: SensorVector,
}

/// Receiver of throttled sensor frames.
pub trait SensorConsumer {
    fn on_sensors(&mut self, frame: &SensorFrame);
}

impl<F: FnMut(&SensorFrame)> SensorConsumer for F {
    fn on_sensors(&mut self, frame: &SensorFrame) {
        self(frame)
    }
}

pub struct SensorSampler {
    ring: SensorRing,
    vector: SensorVector,
    throttle: Throttle<SensorVector>,
    consumer: Box<dyn SensorConsumer>,
    seq: u64,
}

impl SensorSampler {
    /// A sampler over `ring` publishing to `consumer` at most once per
    /// `window`.
    pub fn new(ring: SensorRing, window: Duration, consumer: Box<dyn SensorConsumer>) -> Self {
        let vector = vec![None; ring.len()];
        Self {
            ring,
            vector,
            throttle: Throttle::new(window),
            consumer,
            seq: 0,
        }
    }

    pub fn ring(&self) -> &SensorRing {
        &self.ring
    }

    /// The most recent sample.  Always `ring().len()` long.
    pub fn vector(&self) -> &[Option<f32>] {
        &self.vector
    }

    /// Number of frames delivered so far.
    pub fn published(&self) -> u64 {
        self.seq
    }

    /// Cast every ray from `pose` against `index`.
    pub fn sample(&mut self, pose: &Pose, index: &ObstacleIndex, scene: &Scene) -> &[Option<f32>] {
        for (slot, ray) in self.vector.iter_mut().zip(self.ring.rays()) {
            *slot = index.nearest_hit(scene, &ray.to_world(pose));
        }
        &self.vector
    }

    /// Offer the current vector for publishing.  Returns `true` when a
    /// frame was delivered immediately.
    pub fn publish(&mut self, now: Duration) -> bool {
        match self.throttle.request(now, self.vector.clone()) {
            Some(distances) => {
                self.deliver(now, distances);
                true
            }
            None => false,
        }
    }

    /// Fire the trailing-edge timer.  Returns `true` when a frame was
    /// delivered.
    pub fn fire_timer(&mut self, now: Duration) -> bool {
        match self.throttle.poll(now) {
            Some(distances) => {
                self.deliver(now, distances);
                true
            }
            None => false,
        }
    }

    /// When the host should call [`fire_timer`][Self::fire_timer] next.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.throttle.next_deadline()
    }

    /// Drop any pending trailing publish.
    pub fn cancel(&mut self) {
        if self.throttle.cancel().is_some() {
            debug!("pending sensor publish cancelled");
        }
    }

    fn deliver(&mut self, now: Duration, distances: SensorVector) {
        let frame = SensorFrame {
            seq: self.seq,
            at_ms: now.as_millis() as u64,
            distances,
        };
        self.seq += 1;
        debug!(seq = frame.seq, at_ms = frame.at_ms, "sensor frame published");
        self.consumer.on_sensors(&frame);
    }
}
