//! Lifecycle logging through `tracing`.

use formation_env::{Callback, HookError, Logs};
use tracing::{debug, info};

/// Logs run start, every `interval`-th step, and run end.
#[derive(Debug, Clone)]
pub struct TracingObserver {
    interval: usize,
    logged_steps: usize,
}

impl TracingObserver {
    /// Logs every `interval` steps; 0 is treated as 1.
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            logged_steps: 0,
        }
    }

    /// Number of step events written so far.
    pub fn logged_steps(&self) -> usize {
        self.logged_steps
    }

    fn should_log(&self, step: usize, n_steps: usize) -> bool {
        step % self.interval == 0 || step + 1 == n_steps
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(10)
    }
}

impl Callback for TracingObserver {
    fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        self.logged_steps = 0;
        info!(
            "sim begin: {} robots, {} steps, dt={}s, spread={:.4}",
            logs.initial_poses().len(),
            logs.n_steps(),
            logs.step_time(),
            logs.initial_poses().spread()
        );
        Ok(())
    }

    fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
        if !self.should_log(step, logs.n_steps()) {
            return Ok(());
        }
        self.logged_steps += 1;
        info!(
            step,
            t = (step + 1) as f64 * logs.step_time(),
            spread = logs.poses().spread(),
            dt_step = logs.dt_step().unwrap_or_default(),
            "step"
        );
        for (name, value) in logs.annotations() {
            debug!(step, name, value, "annotation");
        }
        Ok(())
    }

    fn on_sim_end(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        info!(
            "sim end: final spread={:.6}, wall time={:.3}ms",
            logs.poses().spread(),
            logs.dt_sim().unwrap_or_default() * 1000.0
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}
