//! Course configuration – reads/writes `~/.drivesim/config.toml`.
//!
//! Every section is optional; whatever the file leaves out falls back to the
//! built-in demo course.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use drivesim_control::DriveLimits;
use drivesim_hal::{ChassisGeometry, SuspensionConfig};
use drivesim_types::{ControlKey, SimError, VehicleOptions};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A box obstacle placed in the scene at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleSpec {
    pub name: String,
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
}

/// One scripted key edge, replayed through the keyboard hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptStep {
    pub at_ms: u64,
    pub key: String,
    #[serde(default = "default_pressed")]
    pub pressed: bool,
}

/// Persisted course configuration stored in `~/.drivesim/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Frame rate of the tick loop.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// How long the course runs before shutting down.
    #[serde(default = "default_duration_ms")]
    pub duration_ms: u64,

    #[serde(default)]
    pub vehicle: VehicleOptions,

    #[serde(default)]
    pub drive: DriveLimits,

    #[serde(default)]
    pub chassis: ChassisGeometry,

    #[serde(default)]
    pub suspension: SuspensionConfig,

    /// Extra key bindings layered over the defaults (`code = "control"`).
    #[serde(default)]
    pub keys: BTreeMap<String, ControlKey>,

    #[serde(default = "default_obstacles")]
    pub obstacles: Vec<ObstacleSpec>,

    #[serde(default = "default_script")]
    pub script: Vec<ScriptStep>,
}

fn default_pressed() -> bool {
    true
}
fn default_tick_hz() -> u32 {
    60
}
fn default_duration_ms() -> u64 {
    5000
}

fn default_obstacles() -> Vec<ObstacleSpec> {
    let obstacle = |name: &str, center: [f32; 3], half_extents: [f32; 3]| ObstacleSpec {
        name: name.to_string(),
        center,
        half_extents,
    };
    vec![
        obstacle("wall_north", [0.0, 1.0, 8.0], [3.0, 1.0, 0.5]),
        obstacle("crate_east", [4.0, 0.5, 2.0], [0.5, 0.5, 0.5]),
        obstacle("pillar_west", [-5.0, 1.5, 4.0], [0.4, 1.5, 0.4]),
    ]
}

fn default_script() -> Vec<ScriptStep> {
    let step = |at_ms: u64, key: &str, pressed: bool| ScriptStep {
        at_ms,
        key: key.to_string(),
        pressed,
    };
    vec![
        step(0, "w", true),
        step(1500, "a", true),
        step(2500, "a", false),
        step(3000, "w", false),
        step(3000, " ", true),
        step(3500, " ", false),
        step(4000, "r", true),
        step(4100, "r", false),
    ]
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            duration_ms: default_duration_ms(),
            vehicle: VehicleOptions::default(),
            drive: DriveLimits::default(),
            chassis: ChassisGeometry::default(),
            suspension: SuspensionConfig::default(),
            keys: BTreeMap::new(),
            obstacles: default_obstacles(),
            script: default_script(),
        }
    }
}

/// Return the config path: `DRIVESIM_CONFIG` if set, else
/// `~/.drivesim/config.toml`.
pub fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("DRIVESIM_CONFIG") {
        return PathBuf::from(path);
    }
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".drivesim").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, SimError> {
    load_from(&config_path())
}

/// Load the config from a specific path.  Env overrides are not applied.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, SimError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        SimError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    let cfg = toml::from_str(&raw)
        .map_err(|e| SimError::Config(format!("failed to parse {}: {e}", path.display())))?;
    Ok(Some(cfg))
}

/// Apply `DRIVESIM_*` environment variable overrides to `cfg`, whether it
/// came from disk or from defaults.  Values that do not parse are ignored
/// with a warning.
///
/// | Variable | Config field |
/// |---|---|
/// | `DRIVESIM_SENSORS_NUM` | `vehicle.sensors_num` |
/// | `DRIVESIM_THROTTLE_MS` | `vehicle.throttle_ms` |
/// | `DRIVESIM_TICK_HZ` | `tick_hz` |
/// | `DRIVESIM_DURATION_MS` | `duration_ms` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(v) = env_parse("DRIVESIM_SENSORS_NUM") {
        cfg.vehicle.sensors_num = v;
    }
    if let Some(v) = env_parse("DRIVESIM_THROTTLE_MS") {
        cfg.vehicle.throttle_ms = v;
    }
    if let Some(v) = env_parse("DRIVESIM_TICK_HZ") {
        cfg.tick_hz = v;
    }
    if let Some(v) = env_parse("DRIVESIM_DURATION_MS") {
        cfg.duration_ms = v;
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable override");
            None
        }
    }
}

/// Save the config to disk, creating `~/.drivesim/` if necessary.
pub fn save(cfg: &Config) -> Result<(), SimError> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), SimError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SimError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| SimError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw)
        .map_err(|e| SimError::Config(format!("failed to write {}: {e}", path.display())))
}
