//! Builds the scene and the key script from a [`Config`].

use std::time::Duration;

use drivesim_control::KeyboardHub;
use drivesim_hal::{AxisMapping, BodyHandle, SimVehicle, VehicleAssembly, WheelActuatorBinding};
use drivesim_perception::{Aabb, NodeId, NodeKind, Scene};
use drivesim_types::Vec3;
use tracing::{debug, info};

use crate::config::{Config, ScriptStep};

/// The static world the vehicle drives in.
pub struct Course {
    pub scene: Scene,
    /// The vehicle's own group node.
    pub vehicle: NodeId,
    /// The chassis child under [`vehicle`][Self::vehicle].  Untagged, so it
    /// never shows up as an obstacle.
    pub vehicle_body: Option<NodeId>,
}

impl Course {
    pub fn from_config(cfg: &Config) -> Self {
        let mut scene = Scene::new();
        let vehicle = scene.add_root(NodeKind::Group, "vehicle");
        let vehicle_body =
            scene.add_child(vehicle, NodeKind::Mesh, cfg.vehicle.chassis_child.clone());
        debug_assert!(vehicle_body.is_some(), "vehicle group was just added");

        for spec in &cfg.obstacles {
            let [cx, cy, cz] = spec.center;
            let [hx, hy, hz] = spec.half_extents;
            let bounds = Aabb::from_center(Vec3::new(cx, cy, cz), Vec3::new(hx, hy, hz));
            scene.add_obstacle(spec.name.clone(), &cfg.vehicle.chassis_child, bounds);
        }
        info!(obstacles = cfg.obstacles.len(), "course built");

        Self {
            scene,
            vehicle,
            vehicle_body,
        }
    }
}

/// A kinematic stand-in assembled from the configured chassis.
pub fn sim_vehicle(cfg: &Config) -> SimVehicle {
    let binding = WheelActuatorBinding::new(cfg.chassis, cfg.suspension, cfg.vehicle.wheel_radius);
    let assembly = VehicleAssembly {
        chassis: BodyHandle(0),
        wheels: [BodyHandle(1), BodyHandle(2), BodyHandle(3), BodyHandle(4)],
        slots: *binding.slots(),
        axes: AxisMapping::default(),
    };
    SimVehicle::from_assembly(assembly, cfg.chassis.wheelbase(), cfg.vehicle.movable)
}

/// Replays [`ScriptStep`]s through a [`KeyboardHub`] as time passes.
pub struct Script {
    steps: Vec<ScriptStep>,
    next: usize,
}

impl Script {
    pub fn new(mut steps: Vec<ScriptStep>) -> Self {
        // Stable sort keeps same-instant edges in file order.
        steps.sort_by_key(|s| s.at_ms);
        Self { steps, next: 0 }
    }

    /// Emit every step scheduled at or before `now`.  Returns how many were
    /// emitted.
    pub fn emit_due(&mut self, now: Duration, hub: &KeyboardHub) -> usize {
        let now_ms = now.as_millis() as u64;
        let start = self.next;
        while let Some(step) = self.steps.get(self.next)
            && step.at_ms <= now_ms
        {
            debug!(at_ms = step.at_ms, key = %step.key, pressed = step.pressed, "scripted key");
            if step.pressed {
                hub.key_down(&step.key);
            } else {
                hub.key_up(&step.key);
            }
            self.next += 1;
        }
        self.next - start
    }

    /// Every step has been emitted.
    pub fn is_done(&self) -> bool {
        self.next >= self.steps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesim_perception::ObstacleIndex;

    fn step(at_ms: u64, key: &str, pressed: bool) -> ScriptStep {
        ScriptStep {
            at_ms,
            key: key.to_string(),
            pressed,
        }
    }

    #[test]
    fn course_indexes_obstacles_but_not_vehicle() {
        let cfg = Config::default();
        let course = Course::from_config(&cfg);
        let mut index = ObstacleIndex::new("chassis").excluding(course.vehicle);
        assert_eq!(index.refresh(&course.scene), cfg.obstacles.len());
    }

    #[test]
    fn vehicle_body_is_kept_and_untagged() {
        let course = Course::from_config(&Config::default());
        let body = course.vehicle_body.expect("vehicle body");
        let node = course.scene.node(body).expect("body in scene");
        assert_eq!(node.parent(), Some(course.vehicle));
        assert_eq!(node.name, "chassis");
        assert!(!node.has(drivesim_perception::NodeCapability::SensorObstacle));
    }

    #[test]
    fn sim_vehicle_follows_configured_geometry() {
        let mut cfg = Config::default();
        cfg.chassis.width = 2.0;
        let sim = sim_vehicle(&cfg);
        assert_eq!(sim.assembly().slots[0].connection_point.x, -1.0);
        assert_eq!(sim.assembly().slots[1].connection_point.x, 1.0);
    }

    #[test]
    fn script_emits_in_time_order() {
        let hub = KeyboardHub::new();
        let mut listener = hub.listen();
        let mut script = Script::new(vec![
            step(200, "w", false),
            step(0, "w", true),
            step(100, "a", true),
        ]);

        assert_eq!(script.emit_due(Duration::from_millis(50), &hub), 1);
        assert_eq!(listener.try_next().map(|e| e.pressed), Some(true));
        assert_eq!(script.emit_due(Duration::from_millis(50), &hub), 0);
        assert_eq!(script.emit_due(Duration::from_millis(250), &hub), 2);
        assert!(script.is_done());

        let a = listener.try_next().unwrap();
        assert_eq!(a.code, "a");
        let w = listener.try_next().unwrap();
        assert_eq!((w.code.as_str(), w.pressed), ("w", false));
    }
}
