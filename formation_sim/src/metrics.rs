//! Run metrics collected through the lifecycle hooks.

use formation_env::{Callback, HookError, Logs};
use serde::Serialize;

/// Summary of a run as seen by [`MetricsObserver`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunMetrics {
    /// Steps completed
    pub steps: usize,

    /// Fleet spread (max distance to centroid) before the first step
    pub initial_spread: f64,

    /// Fleet spread after the last completed step
    pub final_spread: f64,

    /// Smallest spread seen during the run
    pub min_spread: f64,

    /// Largest |θ| seen in any snapshot
    pub max_abs_heading: f64,

    /// Simulated seconds covered by the completed steps
    pub simulated_secs: f64,

    /// Mean wall-clock seconds per step
    pub mean_step_secs: f64,

    /// Slowest step in wall-clock seconds
    pub max_step_secs: f64,

    /// Wall-clock seconds of the whole run, known once it ends
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall_secs: Option<f64>,
}

/// Tracks fleet spread and step timing; publishes `metrics.spread`.
#[derive(Debug, Default)]
pub struct MetricsObserver {
    metrics: RunMetrics,
    step_secs_total: f64,
}

impl MetricsObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn metrics(&self) -> &RunMetrics {
        &self.metrics
    }

    pub fn into_metrics(self) -> RunMetrics {
        self.metrics
    }
}

impl Callback for MetricsObserver {
    fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        let spread = logs.initial_poses().spread();
        self.step_secs_total = 0.0;
        self.metrics = RunMetrics {
            initial_spread: spread,
            final_spread: spread,
            min_spread: spread,
            max_abs_heading: max_abs_heading(logs),
            ..RunMetrics::default()
        };
        logs.annotate("metrics", "spread", spread);
        Ok(())
    }

    fn on_step_end(&mut self, _step: usize, logs: &mut Logs) -> Result<(), HookError> {
        let m = &mut self.metrics;
        let spread = logs.poses().spread();

        m.steps += 1;
        m.final_spread = spread;
        m.min_spread = m.min_spread.min(spread);
        m.max_abs_heading = m.max_abs_heading.max(max_abs_heading(logs));
        m.simulated_secs = m.steps as f64 * logs.step_time();

        if let Some(dt) = logs.dt_step() {
            self.step_secs_total += dt;
            m.max_step_secs = m.max_step_secs.max(dt);
            m.mean_step_secs = self.step_secs_total / m.steps as f64;
        }

        logs.annotate("metrics", "spread", spread);
        Ok(())
    }

    fn on_sim_end(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        self.metrics.wall_secs = logs.dt_sim();
        Ok(())
    }

    fn name(&self) -> &str {
        "metrics"
    }
}

fn max_abs_heading(logs: &Logs) -> f64 {
    logs.poses().iter().map(|p| p.theta.abs()).fold(0.0, f64::max)
}
