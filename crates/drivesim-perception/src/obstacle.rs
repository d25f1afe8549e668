//! [`ObstacleIndex`] – the per-tick set of bodies sensor rays can hit.
//!
//! The index is rebuilt from scratch on every [`refresh`][ObstacleIndex::refresh]:
//! only top-level [`NodeKind::Group`] nodes are scanned, each group's body
//! child (by name) is looked up, and the body is kept only if it carries
//! [`NodeCapability::SensorObstacle`].  Rebuilding every tick keeps the set
//! fresh: an object removed from the scene is gone from the index one tick
//! later.
//!
//! Entries are [`NodeId`] handles.  Bounds are resolved through the scene at
//! cast time, and a handle that no longer resolves is a miss.

use tracing::debug;

use crate::raycast::WorldRay;
use crate::scene::{NodeCapability, NodeId, NodeKind, Scene};

/// One indexed obstacle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Obstacle {
    /// The top-level group.
    pub group: NodeId,
    /// The body child whose bounds are cast against.
    pub body: NodeId,
}

#[derive(Debug, Clone)]
pub struct ObstacleIndex {
    body_name: String,
    exclude: Option<NodeId>,
    obstacles: Vec<Obstacle>,
}

impl ObstacleIndex {
    /// An empty index that looks for body children called `body_name`.
    pub fn new(body_name: impl Into<String>) -> Self {
        Self {
            body_name: body_name.into(),
            exclude: None,
            obstacles: Vec::new(),
        }
    }

    /// Never index the group `own` (the sensing vehicle itself).
    pub fn excluding(mut self, own: NodeId) -> Self {
        self.exclude = Some(own);
        self
    }

    /// Rebuild the index from `scene`.  Returns the obstacle count.
    pub fn refresh(&mut self, scene: &Scene) -> usize {
        self.obstacles.clear();
        for root in scene.roots() {
            if root.kind != NodeKind::Group || Some(root.id) == self.exclude {
                continue;
            }
            let Some(body) = scene.child_named(root.id, &self.body_name) else {
                continue;
            };
            if body.has(NodeCapability::SensorObstacle) {
                self.obstacles.push(Obstacle {
                    group: root.id,
                    body: body.id,
                });
            }
        }
        self.obstacles.len()
    }

    pub fn obstacles(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// Distance to the nearest indexed obstacle along `ray`, or `None`.
    pub fn nearest_hit(&self, scene: &Scene, ray: &WorldRay) -> Option<f32> {
        let mut nearest: Option<f32> = None;
        for obstacle in &self.obstacles {
            let Some(bounds) = scene.node(obstacle.body).and_then(|n| n.bounds) else {
                debug!(body = ?obstacle.body, "stale obstacle reference, treating as miss");
                continue;
            };
            if let Some(t) = ray.intersect_aabb(&bounds) {
                nearest = Some(nearest.map_or(t, |best| best.min(t)));
            }
        }
        nearest
    }
}
