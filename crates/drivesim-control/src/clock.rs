//! [`SimClock`] – a manual fixed-step scheduler for headless runs.
//!
//! Each [`tick`][SimClock::tick] first fires every throttle deadline that is
//! already due, then runs the vehicle at the current time, then advances by
//! one step.  This is the same order a real host gets from its render loop
//! and timer facility.

use std::time::Duration;

use drivesim_hal::RaycastVehicle;
use drivesim_perception::Scene;
use drivesim_types::SimError;

use crate::vehicle::{TickReport, Vehicle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimClock {
    now: Duration,
    step: Duration,
}

impl SimClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Duration::ZERO,
            step,
        }
    }

    /// A clock stepping at `hz` ticks per second.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfiguration`] when `hz` is zero or so
    /// high that the step rounds down to zero.
    pub fn at_hz(hz: u32) -> Result<Self, SimError> {
        if hz == 0 {
            return Err(SimError::InvalidConfiguration(
                "tick rate must be at least 1 Hz".to_string(),
            ));
        }
        let step = Duration::from_secs_f64(1.0 / f64::from(hz));
        if step.is_zero() {
            return Err(SimError::InvalidConfiguration(format!(
                "tick rate {hz} Hz is below the timer resolution"
            )));
        }
        Ok(Self::new(step))
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    /// Fire due timers, tick `vehicle` at the current time and advance.
    pub fn tick<P: RaycastVehicle>(
        &mut self,
        vehicle: &mut Vehicle<P>,
        scene: &Scene,
    ) -> TickReport {
        self.fire_due(vehicle);
        let report = vehicle.tick(self.now, scene);
        self.now += self.step;
        report
    }

    /// Fire every timer whose deadline is at or before the current time.
    /// Returns how many frames were delivered.
    pub fn fire_due<P: RaycastVehicle>(&self, vehicle: &mut Vehicle<P>) -> usize {
        let mut fired = 0;
        while let Some(deadline) = vehicle.next_timer_deadline()
            && deadline <= self.now
        {
            if !vehicle.fire_timers(deadline) {
                break;
            }
            fired += 1;
        }
        fired
    }

    /// Jump to the pending timer deadline, if any, and fire it.  Used to
    /// flush the trailing frame at the end of a run.
    pub fn settle<P: RaycastVehicle>(&mut self, vehicle: &mut Vehicle<P>) -> bool {
        let Some(deadline) = vehicle.next_timer_deadline() else {
            return false;
        };
        self.now = self.now.max(deadline);
        self.fire_due(vehicle) > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesim_hal::SimVehicle;
    use drivesim_perception::SensorFrame;
    use drivesim_perception::scene::NodeId;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn vehicle(frames: Rc<RefCell<Vec<SensorFrame>>>) -> Vehicle<SimVehicle> {
        Vehicle::builder(NodeId(0))
            .physics(SimVehicle::new(true))
            .consumer(move |f: &SensorFrame| frames.borrow_mut().push(f.clone()))
            .build()
            .unwrap()
    }

    #[test]
    fn zero_hz_is_rejected() {
        assert!(matches!(
            SimClock::at_hz(0),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn rates_finer_than_a_nanosecond_are_rejected() {
        assert!(matches!(
            SimClock::at_hz(u32::MAX),
            Err(SimError::InvalidConfiguration(_))
        ));
        let clock = SimClock::at_hz(1_000_000_000).unwrap();
        assert_eq!(clock.step(), Duration::from_nanos(1));
    }

    #[test]
    fn advances_by_one_step_per_tick() {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let mut car = vehicle(frames);
        let scene = Scene::new();
        let mut clock = SimClock::new(Duration::from_millis(10));
        let first = clock.tick(&mut car, &scene);
        let second = clock.tick(&mut car, &scene);
        assert_eq!(first.at, Duration::ZERO);
        assert_eq!(second.at, Duration::from_millis(10));
        assert_eq!(clock.now(), Duration::from_millis(20));
    }

    #[test]
    fn steady_ticking_respects_the_window() {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let mut car = vehicle(frames.clone());
        let scene = Scene::new();
        // 10 ms steps against the default 50 ms window.
        let mut clock = SimClock::new(Duration::from_millis(10));
        for _ in 0..100 {
            clock.tick(&mut car, &scene);
        }
        clock.settle(&mut car);

        let frames = frames.borrow();
        assert_eq!(frames[0].at_ms, 0);
        for pair in frames.windows(2) {
            assert!(pair[1].at_ms - pair[0].at_ms >= 50, "{pair:?}");
        }
        // One second of ticks at most one frame per window.
        assert!(frames.len() <= 21, "{} frames", frames.len());
        assert!(frames.len() >= 15, "{} frames", frames.len());
    }

    #[test]
    fn settle_flushes_trailing_frame() {
        let frames = Rc::new(RefCell::new(Vec::new()));
        let mut car = vehicle(frames.clone());
        let scene = Scene::new();
        let mut clock = SimClock::new(Duration::from_millis(10));
        clock.tick(&mut car, &scene);
        clock.tick(&mut car, &scene);
        assert_eq!(frames.borrow().len(), 1);
        assert!(clock.settle(&mut car));
        assert_eq!(frames.borrow().len(), 2);
        assert_eq!(frames.borrow()[1].at_ms, 50);
        assert!(!clock.settle(&mut car));
    }
}
