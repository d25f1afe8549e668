//! `drivesim` – headless vehicle course runner
//!
//! This binary runs one controllable vehicle through a course:
//!
//! 1. Loads `~/.drivesim/config.toml` (or the built-in demo course when the
//!    file is absent).  `drivesim init` writes the demo course to disk.
//! 2. Builds the scene, a kinematic stand-in vehicle and a keyboard hub.
//! 3. Ticks the vehicle at `tick_hz` on a Tokio current-thread runtime while
//!    replaying the configured key script; the sensor throttle's trailing
//!    edge is fired from the same loop.
//! 4. Prints every published sensor frame to stdout as one JSON line.
//! 5. Intercepts **Ctrl-C** to stop the course after the current tick.
//!
//! Logs and the banner go to stderr so stdout stays machine-readable.

mod config;
mod course;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use drivesim_control::{KeyMap, KeyboardHub, SimClock, TickReport, Vehicle};
use drivesim_perception::SensorFrame;
use drivesim_types::{Pose, SimError};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // RUST_LOG selects the level (default "info").  DRIVESIM_LOG_FORMAT=json
    // switches to newline-delimited JSON.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("DRIVESIM_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }

    print_banner();

    if std::env::args().nth(1).as_deref() == Some("init") {
        write_default_config();
        return;
    }

    // ── Shared shutdown flag ──────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_clone = shutdown.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("{}", "⚠  Ctrl-C received – stopping the course …".yellow().bold());
        shutdown_clone.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the course will run to completion");
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let mut cfg = match config::load() {
        Ok(Some(cfg)) => {
            eprintln!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            eprintln!("  {}", "No config found – running the demo course.".dimmed());
            config::Config::default()
        }
        Err(e) => {
            eprintln!("{}: {}", "Config error".red(), e);
            eprintln!("  Using default configuration.");
            config::Config::default()
        }
    };
    config::apply_env_overrides(&mut cfg);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Runtime error".red(), e);
            std::process::exit(1);
        }
    };

    match runtime.block_on(run(cfg, shutdown)) {
        Ok(summary) => summary.print(),
        Err(e) => {
            eprintln!("{}: {}", "Error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Course loop
// ─────────────────────────────────────────────────────────────────────────────

async fn run(cfg: config::Config, shutdown: Arc<AtomicBool>) -> Result<Summary, SimError> {
    let course = course::Course::from_config(&cfg);
    let hub = KeyboardHub::new();

    let mut keymap = KeyMap::default();
    for (code, key) in &cfg.keys {
        keymap.bind(code.clone(), *key);
    }

    let mut vehicle = Vehicle::builder(course.vehicle)
        .options(cfg.vehicle.clone())
        .limits(cfg.drive)
        .geometry(cfg.chassis)
        .suspension(cfg.suspension)
        .keymap(keymap)
        .physics(course::sim_vehicle(&cfg))
        .keyboard(&hub)
        .consumer(print_frame)
        .build()?;

    let step = SimClock::at_hz(cfg.tick_hz)?.step();
    let until = Duration::from_millis(cfg.duration_ms);
    let mut script = course::Script::new(cfg.script.clone());
    let mut summary = Summary::default();

    info!(
        tick_hz = cfg.tick_hz,
        duration_ms = cfg.duration_ms,
        sensors = vehicle.ring().len(),
        body = ?course.vehicle_body,
        "course started"
    );

    let start = Instant::now();
    let mut interval = tokio::time::interval(step);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        let deadline = vehicle.next_timer_deadline();
        let wake = start + deadline.unwrap_or(until);

        tokio::select! {
            _ = interval.tick() => {
                let now = start.elapsed();
                if now > until || shutdown.load(Ordering::SeqCst) {
                    break;
                }
                if script.emit_due(now, &hub) > 0 && script.is_done() {
                    info!(at_ms = now.as_millis() as u64, "key script finished");
                }
                let report = vehicle.tick(now, &course.scene);
                if let Some(sim) = vehicle.physics_mut() {
                    sim.step(step.as_secs_f32());
                }
                summary.record(&report);
            }
            _ = tokio::time::sleep_until(wake), if deadline.is_some() => {
                vehicle.fire_timers(start.elapsed());
            }
        }
    }

    // Flush the last state of an open burst unless the operator interrupted.
    if !shutdown.load(Ordering::SeqCst)
        && let Some(deadline) = vehicle.next_timer_deadline()
    {
        tokio::time::sleep_until(start + deadline).await;
        vehicle.fire_timers(start.elapsed());
    }

    summary.frames = vehicle.frames_published();
    summary.final_pose = vehicle.chassis_pose();
    vehicle.teardown();

    info!(
        ticks = summary.ticks,
        frames = summary.frames,
        pushes = summary.pushes,
        resets = summary.resets,
        "course finished"
    );
    Ok(summary)
}

fn print_frame(frame: &SensorFrame) {
    match serde_json::to_string(frame) {
        Ok(line) => println!("{line}"),
        Err(e) => warn!(seq = frame.seq, error = %e, "failed to encode sensor frame"),
    }
}

#[derive(Debug, Default)]
struct Summary {
    ticks: u64,
    pushes: u64,
    resets: u64,
    frames: u64,
    final_pose: Option<Pose>,
}

impl Summary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        let pushed = report.drive.pushed;
        self.pushes += [pushed.engine, pushed.steering, pushed.brake]
            .into_iter()
            .filter(|p| *p)
            .count() as u64;
        if report.drive.reset {
            self.resets += 1;
        }
    }

    fn print(&self) {
        eprintln!();
        eprintln!("  {} {} ticks, {} frames", "✓".green().bold(), self.ticks, self.frames);
        eprintln!("    actuation pushes: {}", self.pushes);
        eprintln!("    reset ticks:      {}", self.resets);
        if let Some(pose) = self.final_pose {
            let p = pose.position;
            eprintln!("    final position:   ({:.2}, {:.2}, {:.2})", p.x, p.y, p.z);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Init
// ─────────────────────────────────────────────────────────────────────────────

fn write_default_config() {
    let path = config::config_path();
    if path.exists() {
        eprintln!(
            "  {} already exists; leaving it untouched.",
            path.display().to_string().bold()
        );
        return;
    }
    match config::save(&config::Config::default()) {
        Ok(()) => eprintln!(
            "  {} Demo course saved to {}",
            "✓".green().bold(),
            path.display().to_string().bold()
        ),
        Err(e) => eprintln!("{}: {}", "Error saving config".red(), e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    eprintln!();
    eprintln!("{}", r#"     __     _                _         "#.bold().cyan());
    eprintln!("{}", r#"  __/ /____(_)   _____  ___(_)___ ___ "#.bold().cyan());
    eprintln!("{}", r#" / _  / __/ / | / / -_)(_-</ / _ `_ \"#.bold().cyan());
    eprintln!("{}", r#" \_,_/_/ /_/|___/\__//___/_/_/ /_/ /_/"#.bold().cyan());
    eprintln!();
    eprintln!(
        "  {} {}",
        "drivesim".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    eprintln!("  Raycast vehicle course runner");
    eprintln!();
}
