//! Shared run log handed to every lifecycle hook.

use formation_core::PoseSet;
use serde::Serialize;
use std::collections::BTreeMap;

/// Run configuration, live fleet state, and timing for one simulation.
///
/// The engine owns the logs for the duration of a run. Observers read the
/// configuration and poses, and may add their own values under a namespace
/// with [`Logs::annotate`]. `poses` is a copy of the engine's working fleet,
/// so nothing written here can reach the integrator.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Logs {
    n_steps: usize,
    step_time: f64,
    initial_poses: PoseSet,
    poses: PoseSet,

    /// Wall-clock seconds of the last step, set once a callback is registered
    #[serde(skip_serializing_if = "Option::is_none")]
    dt_step: Option<f64>,

    /// Wall-clock seconds of the whole run, set at the end
    #[serde(skip_serializing_if = "Option::is_none")]
    dt_sim: Option<f64>,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    annotations: BTreeMap<String, f64>,
}

impl Logs {
    /// Creates the logs for a run; `poses` starts as a copy of the initial fleet.
    pub fn new(n_steps: usize, step_time: f64, initial_poses: PoseSet) -> Self {
        Self {
            n_steps,
            step_time,
            poses: initial_poses.clone(),
            initial_poses,
            dt_step: None,
            dt_sim: None,
            annotations: BTreeMap::new(),
        }
    }

    /// Number of steps the run will execute.
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Simulated seconds per step.
    pub fn step_time(&self) -> f64 {
        self.step_time
    }

    /// Fleet as it was before the first step.
    pub fn initial_poses(&self) -> &PoseSet {
        &self.initial_poses
    }

    /// Fleet after the most recent step.
    pub fn poses(&self) -> &PoseSet {
        &self.poses
    }

    /// Wall-clock duration of the last completed step, in seconds.
    pub fn dt_step(&self) -> Option<f64> {
        self.dt_step
    }

    /// Wall-clock duration of the run, in seconds.
    pub fn dt_sim(&self) -> Option<f64> {
        self.dt_sim
    }

    /// Stores `value` under `"{namespace}.{key}"`.
    pub fn annotate(&mut self, namespace: &str, key: &str, value: f64) {
        self.annotations.insert(format!("{}.{}", namespace, key), value);
    }

    /// Reads an annotation by its full `"namespace.key"` name.
    pub fn annotation(&self, name: &str) -> Option<f64> {
        self.annotations.get(name).copied()
    }

    /// All annotations in name order.
    pub fn annotations(&self) -> impl Iterator<Item = (&str, f64)> {
        self.annotations.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub(crate) fn update_poses(&mut self, poses: &PoseSet) {
        self.poses.clone_from(poses);
    }

    pub(crate) fn record_dt_step(&mut self, seconds: f64) {
        self.dt_step = Some(seconds);
    }

    pub(crate) fn record_dt_sim(&mut self, seconds: f64) {
        self.dt_sim = Some(seconds);
    }
}

/// Owner's handle on the logs of a run.
///
/// Hooks only ever see `&mut Logs`, which lets them add annotations but not
/// touch the poses or timings. Those are written here, by the engine and the
/// callback registry that hold the `RunLog`.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLog {
    logs: Logs,
}

impl RunLog {
    pub fn new(n_steps: usize, step_time: f64, initial_poses: PoseSet) -> Self {
        Self {
            logs: Logs::new(n_steps, step_time, initial_poses),
        }
    }

    pub fn logs(&self) -> &Logs {
        &self.logs
    }

    /// The view handed to lifecycle hooks.
    pub fn logs_mut(&mut self) -> &mut Logs {
        &mut self.logs
    }

    /// Replaces the live-pose entry after a step.
    pub fn update_poses(&mut self, poses: &PoseSet) {
        self.logs.update_poses(poses);
    }

    /// Records the elapsed time of a step.
    pub fn record_dt_step(&mut self, seconds: f64) {
        self.logs.record_dt_step(seconds);
    }

    /// Records the elapsed time of the run.
    pub fn record_dt_sim(&mut self, seconds: f64) {
        self.logs.record_dt_sim(seconds);
    }

    pub fn into_logs(self) -> Logs {
        self.logs
    }
}
