use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Discrete driver commands.  The host maps raw key codes onto these; the
/// drive controller only ever sees the six flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKey {
    Forward,
    Backward,
    Left,
    Right,
    Brake,
    Reset,
}

impl ControlKey {
    /// Every key, in the order used for flag storage.
    pub const ALL: [ControlKey; 6] = [
        ControlKey::Forward,
        ControlKey::Backward,
        ControlKey::Left,
        ControlKey::Right,
        ControlKey::Brake,
        ControlKey::Reset,
    ];

    /// Stable slot of this key inside a `[bool; 6]` flag array.
    pub fn index(self) -> usize {
        match self {
            ControlKey::Forward => 0,
            ControlKey::Backward => 1,
            ControlKey::Left => 2,
            ControlKey::Right => 3,
            ControlKey::Brake => 4,
            ControlKey::Reset => 5,
        }
    }
}

/// The three continuous actuation scalars owned by the drive controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActuationState {
    /// Front-wheel steering angle, in `[-max_steer_val, max_steer_val]`.
    pub steering_value: f32,
    /// Rear-wheel engine force, in `[-max_force, max_force]`.  Negative
    /// values drive the vehicle forward along +Z.
    pub engine_force: f32,
    /// Brake force applied to all four wheels, in `[0, max_brake_force]`.
    pub brake_force: f32,
}

// ────────────────────────────────────────────────────────────────────────────
// Geometry
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D vector.  Axis convention: X right, Y up, Z forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector along +Y.
    pub const fn up() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }

    pub fn scale(self, k: f32) -> Self {
        Self::new(self.x * k, self.y * k, self.z * k)
    }

    pub fn dot(self, rhs: Self) -> f32 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Return the unit vector in the same direction, or `None` for a
    /// (near-)zero vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if len <= f32::EPSILON || !len.is_finite() {
            return None;
        }
        Some(self.scale(1.0 / len))
    }

    /// True when all components are finite.
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A unit quaternion representing a 3-D rotation (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

impl Quaternion {
    /// Create a quaternion.  The caller is responsible for providing a unit
    /// quaternion (|q| = 1).
    pub const fn new(w: f32, x: f32, y: f32, z: f32) -> Self {
        Self { w, x, y, z }
    }

    pub const fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Rotation of `angle` radians about the unit vector `axis`.
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let (s, c) = (angle * 0.5).sin_cos();
        Self::new(c, axis.x * s, axis.y * s, axis.z * s)
    }

    /// Build a rotation from Euler angles applied in intrinsic X, Y, Z
    /// order, the convention chassis rotation setters use.
    pub fn from_euler_xyz(euler: Vec3) -> Self {
        let (s1, c1) = (euler.x * 0.5).sin_cos();
        let (s2, c2) = (euler.y * 0.5).sin_cos();
        let (s3, c3) = (euler.z * 0.5).sin_cos();
        Self::new(
            c1 * c2 * c3 - s1 * s2 * s3,
            s1 * c2 * c3 + c1 * s2 * s3,
            c1 * s2 * c3 - s1 * c2 * s3,
            c1 * c2 * s3 + s1 * s2 * c3,
        )
    }

    /// Hamilton product: `self` applied after `rhs`.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector by this quaternion: p' = q * p * q*.
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let r = self.mul(p).mul(self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }
}

/// World transform of a rigid body: rotate, then translate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quaternion) -> Self {
        Self { position, rotation }
    }

    /// Map a point from the body frame into the world frame.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local).add(self.position)
    }

    /// Map a direction from the body frame into the world frame (no
    /// translation).
    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Construction-time options
// ────────────────────────────────────────────────────────────────────────────

/// Presentation options.  Carried through to the host renderer; the control
/// and perception core never reads them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderHints {
    pub wireframe: bool,
    pub styled: bool,
    pub base_color: String,
    /// Draw the sensor rays (see `SensorRing::debug_segments`).
    pub visible_sensors: bool,
}

impl Default for RenderHints {
    fn default() -> Self {
        Self {
            wireframe: false,
            styled: true,
            base_color: "#e53935".to_string(),
            visible_sensors: false,
        }
    }
}

/// Options a vehicle is built from.  Every field has a default so a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleOptions {
    pub wheel_radius: f32,
    /// When `false` the vehicle never reads input and is fully passive.
    pub controllable: bool,
    /// When `false` the physics body is static.
    pub movable: bool,
    /// Number of radial distance rays.  Signed so that a bad config value is
    /// rejected instead of wrapping.
    pub sensors_num: i32,
    /// Ray origin height above the chassis origin (metres).
    pub sensor_height: f32,
    /// Maximum ray length (metres).
    pub sensor_range: f32,
    /// Sensor publish window (milliseconds).
    pub throttle_ms: u64,
    /// Name of the child node that carries an obstacle's body.
    pub chassis_child: String,
    pub render: RenderHints,
}

impl Default for VehicleOptions {
    fn default() -> Self {
        Self {
            wheel_radius: 0.3,
            controllable: true,
            movable: true,
            sensors_num: 8,
            sensor_height: 0.5,
            sensor_range: 10.0,
            throttle_ms: 50,
            chassis_child: "chassis".to_string(),
            render: RenderHints::default(),
        }
    }
}

impl VehicleOptions {
    /// Reject options that cannot produce a working vehicle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidConfiguration`] naming the first bad field.
    pub fn validate(&self) -> Result<(), SimError> {
        if self.sensors_num <= 0 {
            return Err(SimError::InvalidConfiguration(format!(
                "sensors_num must be >= 1, got {}",
                self.sensors_num
            )));
        }
        if !(self.wheel_radius.is_finite() && self.wheel_radius > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "wheel_radius must be a positive number, got {}",
                self.wheel_radius
            )));
        }
        if !(self.sensor_range.is_finite() && self.sensor_range > 0.0) {
            return Err(SimError::InvalidConfiguration(format!(
                "sensor_range must be a positive number, got {}",
                self.sensor_range
            )));
        }
        if !self.sensor_height.is_finite() {
            return Err(SimError::InvalidConfiguration(
                "sensor_height must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Error type shared by every drivesim crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SimError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// An actuation call arrived before the physics handles were bound.
    /// Callers absorb this; it is never fatal.
    #[error("Missing collaborator: {component}")]
    MissingCollaborator { component: String },

    #[error("Config error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn control_key_indices_are_unique_and_dense() {
        let mut seen = [false; 6];
        for key in ControlKey::ALL {
            assert!(!seen[key.index()]);
            seen[key.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn control_key_serializes_snake_case() {
        let json = serde_json::to_string(&ControlKey::Backward).unwrap();
        assert_eq!(json, "\"backward\"");
    }

    #[test]
    fn yaw_rotation_maps_forward_into_xz_plane() {
        let q = Quaternion::from_axis_angle(Vec3::up(), FRAC_PI_2);
        let r = q.rotate(Vec3::new(0.0, 0.0, 1.0));
        assert!((r.x - 1.0).abs() < 1e-5, "x={}", r.x);
        assert!(r.y.abs() < 1e-5);
        assert!(r.z.abs() < 1e-5, "z={}", r.z);
    }

    #[test]
    fn euler_pure_yaw_matches_axis_angle() {
        let a = Quaternion::from_euler_xyz(Vec3::new(0.0, -FRAC_PI_4, 0.0));
        let b = Quaternion::from_axis_angle(Vec3::up(), -FRAC_PI_4);
        assert!((a.w - b.w).abs() < 1e-6);
        assert!((a.y - b.y).abs() < 1e-6);
        assert!(a.x.abs() < 1e-6 && a.z.abs() < 1e-6);
    }

    #[test]
    fn pose_transforms_point_then_translates() {
        let pose = Pose::new(
            Vec3::new(1.0, 0.0, 0.0),
            Quaternion::from_axis_angle(Vec3::up(), FRAC_PI_2),
        );
        let p = pose.transform_point(Vec3::new(0.0, 0.0, 2.0));
        assert!((p.x - 3.0).abs() < 1e-5);
        assert!(p.z.abs() < 1e-5);
    }

    #[test]
    fn normalized_rejects_zero_vector() {
        assert!(Vec3::zero().normalized().is_none());
        let n = Vec3::new(3.0, 0.0, 4.0).normalized().unwrap();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_options_validate() {
        assert!(VehicleOptions::default().validate().is_ok());
    }

    #[test]
    fn non_positive_sensor_count_is_invalid() {
        for n in [0, -3] {
            let opts = VehicleOptions {
                sensors_num: n,
                ..VehicleOptions::default()
            };
            assert!(matches!(
                opts.validate(),
                Err(SimError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn malformed_body_properties_are_invalid() {
        let opts = VehicleOptions {
            wheel_radius: f32::NAN,
            ..VehicleOptions::default()
        };
        assert!(opts.validate().is_err());

        let opts = VehicleOptions {
            sensor_range: 0.0,
            ..VehicleOptions::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn partial_options_fill_defaults() {
        let opts: VehicleOptions = serde_json::from_str(r#"{"sensors_num": 16}"#).unwrap();
        assert_eq!(opts.sensors_num, 16);
        assert_eq!(opts.throttle_ms, 50);
        assert_eq!(opts.chassis_child, "chassis");
        assert!(opts.render.styled);
    }

    #[test]
    fn sim_error_display() {
        let err = SimError::InvalidConfiguration("sensors_num must be >= 1".into());
        assert!(err.to_string().contains("Invalid configuration"));

        let err = SimError::MissingCollaborator {
            component: "raycast_vehicle".into(),
        };
        assert!(err.to_string().contains("raycast_vehicle"));
    }
}
