//! Rerun visualization of formation runs.
//!
//! Available only with the `visualization` feature; without it the observer
//! is a no-op so callers never need their own `cfg` gates.
//!
//! # What Gets Logged
//!
//! - Robot positions as points, one colour per robot
//! - Heading arrows from each robot
//! - Fleet spread as a scalar timeline

#[cfg(feature = "visualization")]
use rerun::{Arrows3D, Color, Points3D, Position3D, Radius, RecordingStream};

use formation_core::PoseSet;
use formation_env::{Callback, HookError, Logs};

/// Streams each step of a run to a Rerun viewer.
pub struct RerunObserver {
    #[cfg(feature = "visualization")]
    rec: Option<RecordingStream>,

    /// Whether visualization is enabled
    enabled: bool,
}

impl RerunObserver {
    /// Creates an observer with visualization disabled.
    pub fn disabled() -> Self {
        Self {
            #[cfg(feature = "visualization")]
            rec: None,
            enabled: false,
        }
    }

    /// Spawns a viewer; falls back to disabled if that fails.
    #[cfg(feature = "visualization")]
    pub fn new(name: &str) -> Self {
        match rerun::RecordingStreamBuilder::new(name).spawn() {
            Ok(rec) => {
                tracing::info!("Rerun visualization enabled");
                Self {
                    rec: Some(rec),
                    enabled: true,
                }
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Rerun: {:?}", e);
                Self::disabled()
            }
        }
    }

    #[cfg(not(feature = "visualization"))]
    pub fn new(_name: &str) -> Self {
        tracing::info!("Rerun visualization not available (compile with --features visualization)");
        Self::disabled()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[cfg(feature = "visualization")]
    fn log_fleet(&self, seconds: f64, poses: &PoseSet) {
        let Some(rec) = &self.rec else {
            return;
        };
        rec.set_time_seconds("sim_time", seconds);

        let points: Vec<Position3D> = poses
            .iter()
            .map(|p| Position3D::new(p.x as f32, p.y as f32, 0.0))
            .collect();
        let colors: Vec<Color> = (0..poses.len()).map(robot_color).collect();
        let arrows: Vec<[f32; 3]> = poses
            .iter()
            .map(|p| [0.3 * p.theta.cos() as f32, 0.3 * p.theta.sin() as f32, 0.0])
            .collect();

        let _ = rec.log(
            "fleet/robots",
            &Points3D::new(points.clone())
                .with_colors(colors.clone())
                .with_radii([Radius::new_scene_units(0.08)]),
        );
        let _ = rec.log(
            "fleet/headings",
            &Arrows3D::from_vectors(arrows)
                .with_origins(points)
                .with_colors(colors),
        );
        let _ = rec.log("metrics/spread", &rerun::Scalar::new(poses.spread()));
    }

    #[cfg(not(feature = "visualization"))]
    fn log_fleet(&self, _seconds: f64, _poses: &PoseSet) {}
}

#[cfg(feature = "visualization")]
fn robot_color(index: usize) -> Color {
    match index % 6 {
        0 => Color::from_rgb(255, 100, 100), // Red
        1 => Color::from_rgb(100, 100, 255), // Blue
        2 => Color::from_rgb(255, 255, 100), // Yellow
        3 => Color::from_rgb(100, 255, 255), // Cyan
        4 => Color::from_rgb(255, 100, 255), // Magenta
        _ => Color::from_rgb(255, 165, 0),   // Orange
    }
}

impl Callback for RerunObserver {
    fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        self.log_fleet(0.0, logs.initial_poses());
        Ok(())
    }

    fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
        self.log_fleet((step + 1) as f64 * logs.step_time(), logs.poses());
        Ok(())
    }

    fn name(&self) -> &str {
        "rerun"
    }
}
