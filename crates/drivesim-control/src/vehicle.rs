//! [`Vehicle`] – one controllable raycast vehicle with its sensor ring.
//!
//! The vehicle is driven entirely by its host: [`Vehicle::tick`] once per
//! frame and [`Vehicle::fire_timers`] whenever
//! [`Vehicle::next_timer_deadline`] comes due.  Within a tick the order is
//! fixed:
//!
//! 1. Drain pending key events into the [`InputState`].
//! 2. Run the [`DriveController`] and push changed actuation.
//! 3. Rebuild the [`ObstacleIndex`] from the scene.
//! 4. Cast every ray, then offer the complete vector to the throttle.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use drivesim_control::input::KeyboardHub;
//! use drivesim_control::vehicle::Vehicle;
//! use drivesim_hal::SimVehicle;
//! use drivesim_perception::scene::{NodeKind, Scene};
//!
//! let mut scene = Scene::new();
//! let node = scene.add_root(NodeKind::Group, "car");
//! let hub = KeyboardHub::new();
//!
//! let mut car = Vehicle::builder(node)
//!     .physics(SimVehicle::new(true))
//!     .keyboard(&hub)
//!     .build()
//!     .unwrap();
//!
//! hub.key_down("w");
//! let report = car.tick(Duration::ZERO, &scene);
//! assert_eq!(report.drive.state.engine_force, -1000.0);
//!
//! drop(car);
//! assert_eq!(hub.listener_count(), 0);
//! ```

use std::time::Duration;

use drivesim_hal::{
    ChassisGeometry, RaycastVehicle, SuspensionConfig, VehicleLink, WheelActuatorBinding,
};
use drivesim_perception::{
    NodeId, ObstacleIndex, Scene, SensorConsumer, SensorFrame, SensorRing, SensorSampler,
};
use drivesim_types::{Pose, SimError, Vec3, VehicleOptions};
use tracing::{debug, info};

use crate::drive::{DriveController, DriveLimits, DriveOutput};
use crate::input::{InputState, KeyListener, KeyMap, KeyboardHub};

/// What one [`Vehicle::tick`] did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    pub at: Duration,
    pub drive: DriveOutput,
    /// Obstacles indexed this tick.
    pub obstacles: usize,
    /// The ring was cast (a chassis pose was available).
    pub sampled: bool,
    /// A frame reached the consumer on the leading edge.
    pub published: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Builder
// ────────────────────────────────────────────────────────────────────────────

pub struct VehicleBuilder<P: RaycastVehicle> {
    node: NodeId,
    options: VehicleOptions,
    limits: DriveLimits,
    geometry: ChassisGeometry,
    suspension: SuspensionConfig,
    keymap: KeyMap,
    physics: Option<P>,
    keyboard: Option<KeyboardHub>,
    consumer: Option<Box<dyn SensorConsumer>>,
}

impl<P: RaycastVehicle> VehicleBuilder<P> {
    pub fn options(mut self, options: VehicleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn limits(mut self, limits: DriveLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn geometry(mut self, geometry: ChassisGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn suspension(mut self, suspension: SuspensionConfig) -> Self {
        self.suspension = suspension;
        self
    }

    pub fn keymap(mut self, keymap: KeyMap) -> Self {
        self.keymap = keymap;
        self
    }

    /// Bind the physics collaborator up front.  It can also be bound later
    /// with [`Vehicle::bind_physics`].
    pub fn physics(mut self, physics: P) -> Self {
        self.physics = Some(physics);
        self
    }

    /// Listen on `hub` for key events.  Ignored for uncontrollable vehicles.
    pub fn keyboard(mut self, hub: &KeyboardHub) -> Self {
        self.keyboard = Some(hub.clone());
        self
    }

    /// Where throttled sensor frames go.  Frames are discarded without one.
    pub fn consumer(mut self, consumer: impl SensorConsumer + 'static) -> Self {
        self.consumer = Some(Box::new(consumer));
        self
    }

    /// Validate the options and assemble the vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfiguration`] when the options are
    /// rejected; no ray and no listener is created in that case.
    pub fn build(self) -> Result<Vehicle<P>, SimError> {
        self.options.validate()?;
        let ring = SensorRing::from_options(&self.options)?;

        let binding =
            WheelActuatorBinding::new(self.geometry, self.suspension, self.options.wheel_radius);
        let link = match self.physics {
            Some(physics) => VehicleLink::bound(binding, physics),
            None => VehicleLink::new(binding),
        };

        let consumer = self
            .consumer
            .unwrap_or_else(|| Box::new(|_: &SensorFrame| {}));
        let sampler = SensorSampler::new(
            ring,
            Duration::from_millis(self.options.throttle_ms),
            consumer,
        );

        let listener = match &self.keyboard {
            Some(hub) if self.options.controllable => Some(hub.listen()),
            _ => None,
        };

        info!(
            node = ?self.node,
            sensors = sampler.ring().len(),
            controllable = self.options.controllable,
            bound = link.is_bound(),
            "vehicle built"
        );

        Ok(Vehicle {
            node: self.node,
            index: ObstacleIndex::new(self.options.chassis_child.clone()).excluding(self.node),
            drive: DriveController::new(self.limits, self.options.controllable),
            input: InputState::new(self.keymap),
            options: self.options,
            link,
            listener,
            sampler,
            torn_down: false,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Vehicle
// ────────────────────────────────────────────────────────────────────────────

pub struct Vehicle<P: RaycastVehicle> {
    node: NodeId,
    options: VehicleOptions,
    link: VehicleLink<P>,
    drive: DriveController,
    input: InputState,
    listener: Option<KeyListener>,
    index: ObstacleIndex,
    sampler: SensorSampler,
    torn_down: bool,
}

impl<P: RaycastVehicle> Vehicle<P> {
    /// Start building the vehicle whose scene group is `node`.
    pub fn builder(node: NodeId) -> VehicleBuilder<P> {
        VehicleBuilder {
            node,
            options: VehicleOptions::default(),
            limits: DriveLimits::default(),
            geometry: ChassisGeometry::default(),
            suspension: SuspensionConfig::default(),
            keymap: KeyMap::default(),
            physics: None,
            keyboard: None,
            consumer: None,
        }
    }

    /// Run one frame at host time `now`.
    pub fn tick(&mut self, now: Duration, scene: &Scene) -> TickReport {
        if self.options.controllable
            && let Some(listener) = self.listener.as_mut()
        {
            self.input.pump(listener);
        }

        let drive = self.drive.tick(&self.input.snapshot(), &mut self.link);
        let obstacles = self.index.refresh(scene);

        let (sampled, published) = match self.link.chassis_pose() {
            Some(pose) => {
                self.sampler.sample(&pose, &self.index, scene);
                (true, self.sampler.publish(now))
            }
            None => {
                debug!(node = ?self.node, "no chassis pose, sensors skipped");
                (false, false)
            }
        };

        TickReport {
            at: now,
            drive,
            obstacles,
            sampled,
            published,
        }
    }

    /// Fire the sensor throttle's trailing edge.  Returns `true` when a
    /// frame was delivered.
    pub fn fire_timers(&mut self, now: Duration) -> bool {
        self.sampler.fire_timer(now)
    }

    /// When [`fire_timers`][Self::fire_timers] must next run.
    pub fn next_timer_deadline(&self) -> Option<Duration> {
        self.sampler.next_deadline()
    }

    /// Bind (or replace) the physics collaborator.  The next tick re-pushes
    /// the full actuation state.
    pub fn bind_physics(&mut self, physics: P) -> Option<P> {
        self.link.bind(physics)
    }

    pub fn unbind_physics(&mut self) -> Option<P> {
        self.link.unbind()
    }

    pub fn physics(&self) -> Option<&P> {
        self.link.physics()
    }

    pub fn physics_mut(&mut self) -> Option<&mut P> {
        self.link.physics_mut()
    }

    /// Start listening on `hub`, replacing any previous listener.  No-op for
    /// uncontrollable vehicles.
    pub fn attach_keyboard(&mut self, hub: &KeyboardHub) {
        if self.options.controllable {
            self.listener = Some(hub.listen());
        }
    }

    /// Stop listening and release every held key.
    pub fn detach_keyboard(&mut self) {
        self.listener = None;
        self.input.clear();
    }

    pub fn input(&self) -> &InputState {
        &self.input
    }

    /// Direct access for hosts that feed input without a [`KeyboardHub`].
    pub fn input_mut(&mut self) -> &mut InputState {
        &mut self.input
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn options(&self) -> &VehicleOptions {
        &self.options
    }

    pub fn drive(&self) -> &DriveController {
        &self.drive
    }

    pub fn ring(&self) -> &SensorRing {
        self.sampler.ring()
    }

    pub fn obstacles(&self) -> &ObstacleIndex {
        &self.index
    }

    /// The last sampled distances.
    pub fn sensors(&self) -> &[Option<f32>] {
        self.sampler.vector()
    }

    pub fn frames_published(&self) -> u64 {
        self.sampler.published()
    }

    pub fn chassis_pose(&self) -> Option<Pose> {
        self.link.chassis_pose()
    }

    /// World-space ray segments for debug drawing, when
    /// `render.visible_sensors` is set and a pose is available.
    pub fn ring_segments(&self) -> Option<Vec<(Vec3, Vec3)>> {
        if !self.options.render.visible_sensors {
            return None;
        }
        let pose = self.link.chassis_pose()?;
        Some(self.sampler.ring().debug_segments(&pose, self.sampler.vector()))
    }

    /// Release the key listener, drop any pending sensor publish and clear
    /// input.  Idempotent; also run on drop.
    pub fn teardown(&mut self) {
        self.listener = None;
        self.sampler.cancel();
        self.input.clear();
        if !std::mem::replace(&mut self.torn_down, true) {
            info!(node = ?self.node, "vehicle torn down");
        }
    }
}

impl<P: RaycastVehicle> Drop for Vehicle<P> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesim_hal::SimVehicle;
    use drivesim_perception::raycast::Aabb;
    use drivesim_perception::scene::NodeKind;
    use drivesim_types::ControlKey;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Frames = Rc<RefCell<Vec<SensorFrame>>>;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn recorder() -> (Frames, impl SensorConsumer + 'static) {
        let frames: Frames = Rc::new(RefCell::new(Vec::new()));
        let sink = frames.clone();
        (frames, move |f: &SensorFrame| sink.borrow_mut().push(f.clone()))
    }

    /// Scene with the vehicle's own group plus one wall straight ahead.
    fn course() -> (Scene, NodeId) {
        let mut scene = Scene::new();
        let own = scene.add_obstacle(
            "car",
            "chassis",
            Aabb::from_center(Vec3::new(0.0, 0.64, 0.0), Vec3::new(0.6, 0.3, 1.2)),
        );
        scene.add_obstacle(
            "wall",
            "chassis",
            Aabb::new(Vec3::new(-2.0, 0.0, 5.0), Vec3::new(2.0, 2.0, 6.0)),
        );
        (scene, own)
    }

    #[test]
    fn rejects_non_positive_sensor_count() {
        let hub = KeyboardHub::new();
        let options = VehicleOptions {
            sensors_num: 0,
            ..VehicleOptions::default()
        };
        let result = Vehicle::<SimVehicle>::builder(NodeId(0))
            .options(options)
            .keyboard(&hub)
            .build();
        assert!(matches!(result, Err(SimError::InvalidConfiguration(_))));
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn senses_the_wall_but_not_itself() {
        let (scene, own) = course();
        let mut car = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .build()
            .unwrap();
        let report = car.tick(Duration::ZERO, &scene);
        assert_eq!(report.obstacles, 1);
        assert!(report.sampled);

        let d = car.sensors()[0].unwrap();
        assert!((d - 5.0).abs() < 1e-4, "d={d}");
        assert!(car.sensors()[1..].iter().all(Option::is_none));
    }

    #[test]
    fn input_reaches_wheels_in_same_tick() {
        let (scene, own) = course();
        let hub = KeyboardHub::new();
        let mut car = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .keyboard(&hub)
            .build()
            .unwrap();

        hub.key_down("w");
        hub.key_down("a");
        car.tick(ms(0), &scene);
        let sim = car.physics().unwrap();
        assert_eq!(sim.engine_forces(), [0.0, 0.0, -1000.0, -1000.0]);
        assert_eq!(sim.steering_values(), [0.5, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn removed_obstacle_is_gone_next_tick() {
        let (mut scene, own) = course();
        let mut car = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .build()
            .unwrap();
        car.tick(ms(0), &scene);
        assert!(car.sensors()[0].is_some());

        let wall = scene.roots().find(|n| n.name == "wall").unwrap().id;
        scene.remove(wall);
        let report = car.tick(ms(16), &scene);
        assert_eq!(report.obstacles, 0);
        assert!(car.sensors().iter().all(Option::is_none));
    }

    #[test]
    fn publishes_leading_then_trailing() {
        let (scene, own) = course();
        let (frames, sink) = recorder();
        let mut car = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .consumer(sink)
            .build()
            .unwrap();

        assert!(car.tick(ms(0), &scene).published);
        assert!(!car.tick(ms(10), &scene).published);
        assert!(!car.tick(ms(20), &scene).published);
        assert_eq!(car.next_timer_deadline(), Some(ms(50)));
        assert!(car.fire_timers(ms(50)));

        let frames = frames.borrow();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1].at_ms, 50);
        assert_eq!(frames[1].distances.len(), 8);
    }

    #[test]
    fn unbound_vehicle_skips_sensing_and_heals_on_bind() {
        let (scene, own) = course();
        let (frames, sink) = recorder();
        let mut car: Vehicle<SimVehicle> = Vehicle::builder(own).consumer(sink).build().unwrap();
        car.input_mut().press(ControlKey::Forward);

        let report = car.tick(ms(0), &scene);
        assert!(!report.sampled);
        assert!(!report.drive.pushed.engine);
        assert!(frames.borrow().is_empty());

        car.bind_physics(SimVehicle::new(true));
        let report = car.tick(ms(16), &scene);
        assert!(report.sampled);
        assert!(report.drive.pushed.engine);
        assert!(report.drive.pushed.steering);
        assert!(report.drive.pushed.brake);
        assert_eq!(car.physics().unwrap().engine_forces()[2], -1000.0);
        assert_eq!(frames.borrow().len(), 1);
    }

    #[test]
    fn uncontrollable_vehicle_registers_no_listener() {
        let (scene, own) = course();
        let hub = KeyboardHub::new();
        let options = VehicleOptions {
            controllable: false,
            ..VehicleOptions::default()
        };
        let mut car = Vehicle::builder(own)
            .options(options)
            .physics(SimVehicle::new(true))
            .keyboard(&hub)
            .build()
            .unwrap();
        assert_eq!(hub.listener_count(), 0);

        car.input_mut().press(ControlKey::Forward);
        let report = car.tick(ms(0), &scene);
        assert!(!report.drive.pushed.any());
        assert_eq!(car.physics().unwrap().command_count(), 0);
        // Passive vehicles still sense.
        assert!(report.sampled);
    }

    #[test]
    fn teardown_releases_listener_and_pending_publish() {
        let (scene, own) = course();
        let hub = KeyboardHub::new();
        let (frames, sink) = recorder();
        let mut car = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .keyboard(&hub)
            .consumer(sink)
            .build()
            .unwrap();
        assert_eq!(hub.listener_count(), 1);

        hub.key_down("w");
        car.tick(ms(0), &scene);
        car.tick(ms(10), &scene);
        assert!(car.next_timer_deadline().is_some());

        car.teardown();
        assert_eq!(hub.listener_count(), 0);
        assert!(car.next_timer_deadline().is_none());
        assert!(!car.input().is_held(ControlKey::Forward));
        assert!(!car.fire_timers(ms(50)));
        assert_eq!(frames.borrow().len(), 1);

        car.teardown();
    }

    #[test]
    fn drop_releases_listener() {
        let hub = KeyboardHub::new();
        {
            let _car = Vehicle::builder(NodeId(0))
                .physics(SimVehicle::new(true))
                .keyboard(&hub)
                .build()
                .unwrap();
            assert_eq!(hub.listener_count(), 1);
        }
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn reattaching_keyboard_replaces_listener() {
        let hub = KeyboardHub::new();
        let mut car = Vehicle::builder(NodeId(0))
            .physics(SimVehicle::new(true))
            .keyboard(&hub)
            .build()
            .unwrap();
        car.attach_keyboard(&hub);
        assert_eq!(hub.listener_count(), 1);
        car.detach_keyboard();
        assert_eq!(hub.listener_count(), 0);
    }

    #[test]
    fn ring_segments_only_when_visible() {
        let (scene, own) = course();
        let mut hidden = Vehicle::builder(own)
            .physics(SimVehicle::new(true))
            .build()
            .unwrap();
        hidden.tick(ms(0), &scene);
        assert!(hidden.ring_segments().is_none());

        let mut options = VehicleOptions::default();
        options.render.visible_sensors = true;
        let mut shown = Vehicle::builder(own)
            .options(options)
            .physics(SimVehicle::new(true))
            .build()
            .unwrap();
        shown.tick(ms(0), &scene);
        let segments = shown.ring_segments().unwrap();
        assert_eq!(segments.len(), 8);
    }
}
