//! [`SensorRing`] – the fixed fan of radial distance rays.
//!
//! Ray `i` starts at chassis-local `(0, H, 0)` and points along local +Z
//! rotated by `i · 2π / N` about the up axis, reaching `(0, H, D)` before
//! rotation.
//!
//! # Example
//!
//! ```rust
//! use drivesim_perception::ring::SensorRing;
//!
//! let ring = SensorRing::new(4, 0.5, 10.0).unwrap();
//! assert_eq!(ring.len(), 4);
//! assert!((ring.ray(1).angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
//! assert!(SensorRing::new(0, 0.5, 10.0).is_err());
//! ```

use std::f32::consts::TAU;

use drivesim_types::{Pose, Quaternion, SimError, Vec3, VehicleOptions};

use crate::raycast::WorldRay;

/// One sensor ray in the chassis frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub index: usize,
    pub origin_local: Vec3,
    /// Rotation about the up axis, radians.
    pub angle: f32,
    pub max_distance: f32,
    direction_local: Vec3,
}

impl Ray {
    /// Chassis-local end point at full range.
    pub fn end_local(&self) -> Vec3 {
        self.origin_local.add(self.direction_local.scale(self.max_distance))
    }

    pub fn direction_local(&self) -> Vec3 {
        self.direction_local
    }

    /// This ray expressed in world space for a chassis at `pose`.
    pub fn to_world(&self, pose: &Pose) -> WorldRay {
        WorldRay {
            origin: pose.transform_point(self.origin_local),
            direction: pose.transform_vector(self.direction_local),
            max_distance: self.max_distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorRing {
    rays: Vec<Ray>,
    angle_step: f32,
}

impl SensorRing {
    /// Build `sensors_num` rays at `height` reaching `range`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfiguration`] when `sensors_num <= 0` or
    /// `range` is not a positive number.  No ray is built in that case.
    pub fn new(sensors_num: i32, height: f32, range: f32) -> Result<Self, SimError> {
        if sensors_num <= 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "sensors_num must be >= 1, got {sensors_num}"
            )));
        }
        if !(range.is_finite() && range > 0.0) || !height.is_finite() {
            return Err(SimError::InvalidConfiguration(format!(
                "sensor ring needs a finite height and positive range, got height={height} range={range}"
            )));
        }

        let count = sensors_num as usize;
        let angle_step = TAU / count as f32;
        let origin_local = Vec3::new(0.0, height, 0.0);
        let rays = (0..count)
            .map(|index| {
                let angle = angle_step * index as f32;
                Ray {
                    index,
                    origin_local,
                    angle,
                    max_distance: range,
                    direction_local: Quaternion::from_axis_angle(Vec3::up(), angle)
                        .rotate(Vec3::new(0.0, 0.0, 1.0)),
                }
            })
            .collect();
        Ok(Self { rays, angle_step })
    }

    /// Build from the sensor fields of `options`.
    pub fn from_options(options: &VehicleOptions) -> Result<Self, SimError> {
        Self::new(options.sensors_num, options.sensor_height, options.sensor_range)
    }

    pub fn rays(&self) -> &[Ray] {
        &self.rays
    }

    /// # Panics
    ///
    /// Panics when `index >= self.len()`.
    pub fn ray(&self, index: usize) -> &Ray {
        &self.rays[index]
    }

    pub fn len(&self) -> usize {
        self.rays.len()
    }

    /// Always `false`: a ring has at least one ray.
    pub fn is_empty(&self) -> bool {
        self.rays.is_empty()
    }

    pub fn angle_step(&self) -> f32 {
        self.angle_step
    }

    /// World-space segments for drawing the rays: each runs from the ray
    /// origin to its hit point, or to full range on a miss.
    pub fn debug_segments(&self, pose: &Pose, distances: &[Option<f32>]) -> Vec<(Vec3, Vec3)> {
        self.rays
            .iter()
            .map(|ray| {
                let world = ray.to_world(pose);
                let reach = distances
                    .get(ray.index)
                    .copied()
                    .flatten()
                    .unwrap_or(ray.max_distance);
                (world.origin, world.point_at(reach))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_4, PI};

    #[test]
    fn eight_rays_at_quarter_pi_steps() {
        let ring = SensorRing::new(8, 0.5, 10.0).unwrap();
        assert_eq!(ring.len(), 8);
        for (i, ray) in ring.rays().iter().enumerate() {
            assert_eq!(ray.index, i);
            let expected = FRAC_PI_4 * i as f32;
            assert!((ray.angle - expected).abs() < 1e-6, "ray {i}: {}", ray.angle);
        }
        assert!((ring.angle_step() - FRAC_PI_4).abs() < 1e-6);
    }

    #[test]
    fn non_positive_count_is_rejected() {
        for n in [0, -1, i32::MIN] {
            assert!(matches!(
                SensorRing::new(n, 0.5, 10.0),
                Err(SimError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn bad_range_is_rejected() {
        assert!(SensorRing::new(4, 0.5, 0.0).is_err());
        assert!(SensorRing::new(4, 0.5, f32::INFINITY).is_err());
    }

    #[test]
    fn first_ray_runs_along_local_z() {
        let ring = SensorRing::new(4, 0.5, 10.0).unwrap();
        let ray = ring.ray(0);
        assert_eq!(ray.origin_local, Vec3::new(0.0, 0.5, 0.0));
        let end = ray.end_local();
        assert!(end.x.abs() < 1e-6);
        assert!((end.y - 0.5).abs() < 1e-6);
        assert!((end.z - 10.0).abs() < 1e-5);
    }

    #[test]
    fn quarter_turn_ray_points_along_x() {
        let ring = SensorRing::new(4, 0.5, 10.0).unwrap();
        let d = ring.ray(1).direction_local();
        assert!((d.x - 1.0).abs() < 1e-6);
        assert!(d.z.abs() < 1e-6);
    }

    #[test]
    fn to_world_follows_chassis_pose() {
        let ring = SensorRing::new(1, 0.5, 10.0).unwrap();
        let pose = Pose::new(
            Vec3::new(2.0, 1.0, 0.0),
            Quaternion::from_axis_angle(Vec3::up(), PI),
        );
        let world = ring.ray(0).to_world(&pose);
        assert!((world.origin.x - 2.0).abs() < 1e-6);
        assert!((world.origin.y - 1.5).abs() < 1e-6);
        assert!((world.direction.z + 1.0).abs() < 1e-5);
    }

    #[test]
    fn debug_segments_stop_at_hits() {
        let ring = SensorRing::new(2, 0.0, 10.0).unwrap();
        let segments = ring.debug_segments(&Pose::default(), &[Some(3.0), None]);
        assert_eq!(segments.len(), 2);
        assert!((segments[0].1.z - 3.0).abs() < 1e-5);
        assert!((segments[1].1.z + 10.0).abs() < 1e-4);
    }

    #[test]
    fn from_options_uses_sensor_fields() {
        let options = VehicleOptions {
            sensors_num: 3,
            sensor_range: 4.0,
            ..VehicleOptions::default()
        };
        let ring = SensorRing::from_options(&options).unwrap();
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.ray(2).max_distance, 4.0);
    }
}
