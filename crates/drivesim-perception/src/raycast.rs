//! Ray / bounding-box intersection.
//!
//! Obstacles are approximated by world-space axis-aligned boxes; a sensor
//! ray reports the distance to the first box surface it touches.
//!
//! # Example
//!
//! ```rust
//! use drivesim_perception::raycast::{Aabb, WorldRay};
//! use drivesim_types::Vec3;
//!
//! let wall = Aabb::new(Vec3::new(-1.0, 0.0, 4.0), Vec3::new(1.0, 2.0, 5.0));
//! let ray = WorldRay::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, 1.0), 10.0).unwrap();
//! assert_eq!(ray.intersect_aabb(&wall), Some(4.0));
//! ```

use drivesim_types::Vec3;

/// Direction components smaller than this are treated as parallel to a slab.
const PARALLEL_EPSILON: f32 = 1e-8;

/// An axis-aligned bounding box, defined by its minimum and maximum corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Create a bounding box from two opposite corners.  The corners are
    /// normalised so that `min <= max` per axis.
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self {
            min: Vec3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Vec3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box centred on `center` extending `half_extents` along each axis.
    pub fn from_center(center: Vec3, half_extents: Vec3) -> Self {
        Self::new(center.sub(half_extents), center.add(half_extents))
    }

    /// True when the point lies inside or on the boundary of the box.
    pub fn contains_point(&self, p: Vec3) -> bool {
        p.x >= self.min.x
            && p.x <= self.max.x
            && p.y >= self.min.y
            && p.y <= self.max.y
            && p.z >= self.min.z
            && p.z <= self.max.z
    }
}

/// A sensor ray in world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldRay {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
    pub max_distance: f32,
}

impl WorldRay {
    /// Build a ray, normalising `direction`.  Returns `None` for a zero
    /// direction.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Option<Self> {
        Some(Self {
            origin,
            direction: direction.normalized()?,
            max_distance,
        })
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin.add(self.direction.scale(t))
    }

    /// Distance along the ray to the first point inside `b`, if it lies
    /// within `[0, max_distance]`.  A ray that starts inside the box hits at
    /// distance `0`.
    pub fn intersect_aabb(&self, b: &Aabb) -> Option<f32> {
        if b.contains_point(self.origin) {
            return Some(0.0);
        }
        let origin = [self.origin.x, self.origin.y, self.origin.z];
        let dir = [self.direction.x, self.direction.y, self.direction.z];
        let lo = [b.min.x, b.min.y, b.min.z];
        let hi = [b.max.x, b.max.y, b.max.z];

        let mut t_enter = 0.0_f32;
        let mut t_exit = self.max_distance;
        for axis in 0..3 {
            if dir[axis].abs() < PARALLEL_EPSILON {
                if origin[axis] < lo[axis] || origin[axis] > hi[axis] {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / dir[axis];
            let mut t1 = (lo[axis] - origin[axis]) * inv;
            let mut t2 = (hi[axis] - origin[axis]) * inv;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
            }
            t_enter = t_enter.max(t1);
            t_exit = t_exit.min(t2);
            if t_enter > t_exit {
                return None;
            }
        }
        Some(t_enter)
    }
}
