//! Time-stepping simulation engine.
//!
//! One [`Simulation`] executes one run:
//!
//! ```text
//! on_sim_begin
//! for step in 0..n_steps:
//!     on_step_begin(step)
//!     poses ─► Controller ─► velocities ─► DynamicsModel ─► Euler step ─► wrap θ
//!     history.push(poses); log.poses = poses
//!     on_step_end(step)
//! on_sim_end
//! ```
//!
//! A run either returns the full [`History`] or the first error; nothing is
//! retried and no partial history escapes.

use crate::error::SimError;
use crate::history::History;
use crate::registry::CallbackList;
use formation_core::{
    normalize_heading, wrap_angle, Controller, DynamicsModel, FormationError, PoseSet, Velocity,
};
use formation_env::{Callback, Clock, RunLog};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Textual tracing emitted by the step loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verbosity {
    /// Nothing from the step loop
    #[default]
    Silent,

    /// One pose snapshot per step (`info`)
    Poses,

    /// Also desired velocities and unicycle inputs (`debug`)
    Detailed,
}

impl Verbosity {
    /// Maps a `-v` count onto a level; anything above 2 is `Detailed`.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Silent,
            1 => Verbosity::Poses,
            _ => Verbosity::Detailed,
        }
    }
}

/// Configuration of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Number of integration steps
    pub n_steps: usize,

    /// Simulated seconds per step
    pub step_time: f64,

    /// How desired velocities move the robots
    pub dynamics: DynamicsModel,

    /// Step-loop tracing level
    pub verbosity: Verbosity,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            n_steps: 100,
            step_time: 0.1,
            dynamics: DynamicsModel::default(),
            verbosity: Verbosity::Silent,
        }
    }
}

impl SimConfig {
    /// Checks the configuration before any step executes.
    pub fn validate(&self) -> Result<(), FormationError> {
        if self.n_steps == 0 {
            return Err(FormationError::config("n_steps", "must be > 0"));
        }
        if !self.step_time.is_finite() || self.step_time <= 0.0 {
            return Err(FormationError::config(
                "step_time",
                format!("must be finite and > 0, got {}", self.step_time),
            ));
        }
        Ok(())
    }
}

/// Lifecycle of a [`Simulation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimState {
    NotStarted,
    Running,
    Finished,

    /// A step, the controller, or a callback failed
    Aborted,
}

/// A single simulation run.
pub struct Simulation {
    config: SimConfig,
    state: SimState,

    /// Clock handed to the callback registry; wall clock when `None`
    clock: Option<Arc<dyn Clock>>,
}

impl Simulation {
    /// Creates a simulation, rejecting invalid configuration up front.
    pub fn new(config: SimConfig) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            config,
            state: SimState::NotStarted,
            clock: None,
        })
    }

    /// Times callbacks with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    /// Executes the run.
    ///
    /// Headings of `initial_poses` are wrapped into `(-π, π]` before the
    /// first snapshot is recorded. Callbacks are invoked in the order given.
    /// A simulation runs once; calling `run` again returns
    /// [`SimError::InvalidState`].
    pub fn run<C>(
        &mut self,
        controller: &C,
        initial_poses: &PoseSet,
        callbacks: Vec<&mut dyn Callback>,
    ) -> Result<History, SimError>
    where
        C: Controller + ?Sized,
    {
        if self.state != SimState::NotStarted {
            return Err(SimError::InvalidState(self.state));
        }
        if initial_poses.is_empty() {
            return Err(SimError::Config(FormationError::config(
                "initial_poses",
                "fleet must contain at least one robot",
            )));
        }

        self.state = SimState::Running;
        info!(
            "Simulation start: {} robots, {} steps of {}s, controller={}, dynamics={}",
            initial_poses.len(),
            self.config.n_steps,
            self.config.step_time,
            controller.name(),
            self.config.dynamics.name()
        );

        let initial_poses = initial_poses.normalized();
        let result = self.execute(controller, &initial_poses, callbacks);
        self.state = match result {
            Ok(_) => SimState::Finished,
            Err(_) => SimState::Aborted,
        };
        result
    }

    fn execute<C>(
        &self,
        controller: &C,
        initial_poses: &PoseSet,
        callbacks: Vec<&mut dyn Callback>,
    ) -> Result<History, SimError>
    where
        C: Controller + ?Sized,
    {
        let config = &self.config;
        let mut registry = match &self.clock {
            Some(clock) => CallbackList::with_clock(callbacks, Arc::clone(clock)),
            None => CallbackList::new(callbacks),
        };

        let mut log = RunLog::new(config.n_steps, config.step_time, initial_poses.clone());
        registry.on_sim_begin(&mut log)?;

        let mut poses = initial_poses.clone();
        let mut history = History::with_capacity(config.n_steps + 1);
        history.push(&poses);

        for step in 0..config.n_steps {
            registry.on_step_begin(step, &mut log)?;

            let velocities = controller
                .velocities(&poses)
                .map_err(|source| SimError::Step { step, source })?;
            if velocities.len() != poses.len() {
                return Err(SimError::Step {
                    step,
                    source: FormationError::mismatch(
                        "controller output",
                        poses.len(),
                        velocities.len(),
                    ),
                });
            }

            integrate(config, step, &mut poses, &velocities)?;

            history.push(&poses);
            log.update_poses(&poses);
            if config.verbosity >= Verbosity::Poses {
                info!(step, "poses:\n{}", poses);
            }

            registry.on_step_end(step, &mut log)?;
        }

        registry.on_sim_end(&mut log)?;
        Ok(history)
    }
}

/// Advances `poses` by one explicit Euler step.
fn integrate(
    config: &SimConfig,
    step: usize,
    poses: &mut PoseSet,
    velocities: &[Velocity],
) -> Result<(), SimError> {
    let dt = config.step_time;
    let detailed = config.verbosity >= Verbosity::Detailed;

    if detailed {
        for (robot, v) in velocities.iter().enumerate() {
            debug!(step, robot, vx = v.x, vy = v.y, "desired velocity");
        }
    }

    match &config.dynamics {
        DynamicsModel::Unicycle(mapper) => {
            let inputs = mapper
                .map_fleet(velocities, poses)
                .map_err(|source| SimError::Step { step, source })?;
            for (robot, (pose, input)) in poses.iter_mut().zip(&inputs).enumerate() {
                if detailed {
                    debug!(step, robot, v = input.v, omega = input.omega, "unicycle input");
                }
                let (s, c) = pose.theta.sin_cos();
                pose.x += dt * input.v * c;
                pose.y += dt * input.v * s;
                pose.theta = wrap_angle(pose.theta + dt * input.omega);
            }
        }
        DynamicsModel::SingleIntegrator => {
            for (pose, v) in poses.iter_mut().zip(velocities) {
                pose.x += dt * v.x;
                pose.y += dt * v.y;
                pose.theta = normalize_heading(pose.theta);
            }
        }
    }
    Ok(())
}

/// Runs one simulation with the default unicycle mapper.
///
/// `verbose` is 0 (silent), 1 (pose per step) or 2 (also velocities and
/// unicycle inputs).
pub fn run<C>(
    n_steps: usize,
    controller: &C,
    initial_poses: &PoseSet,
    step_time: f64,
    callbacks: Vec<&mut dyn Callback>,
    verbose: u8,
) -> Result<History, SimError>
where
    C: Controller + ?Sized,
{
    let config = SimConfig {
        n_steps,
        step_time,
        verbosity: Verbosity::from_level(verbose),
        ..SimConfig::default()
    };
    Simulation::new(config)?.run(controller, initial_poses, callbacks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ManualClock;
    use approx::assert_relative_eq;
    use formation_core::{ConsensusController, LinearDecayController, UnicycleMapper};
    use formation_env::{HookError, Logs};
    use proptest::prelude::*;
    use std::f64::consts::PI;
    use std::time::Duration;

    fn square() -> PoseSet {
        PoseSet::from_positions(&[(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)])
    }

    fn single_integrator(n_steps: usize, step_time: f64) -> SimConfig {
        SimConfig {
            n_steps,
            step_time,
            dynamics: DynamicsModel::SingleIntegrator,
            verbosity: Verbosity::Silent,
        }
    }

    fn spin(poses: &PoseSet) -> Vec<Velocity> {
        poses
            .iter()
            .map(|p| Velocity::new(-p.theta.sin(), p.theta.cos()))
            .collect()
    }

    /// Records what observers see at each hook.
    #[derive(Default)]
    struct Probe {
        begin_poses: Option<PoseSet>,
        step_poses: Vec<PoseSet>,
        dt_steps: Vec<Option<f64>>,
        dt_sim: Option<f64>,
        fail_at: Option<usize>,
    }

    impl Callback for Probe {
        fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
            assert_eq!(logs.poses(), logs.initial_poses());
            self.begin_poses = Some(logs.poses().clone());
            Ok(())
        }

        fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
            if self.fail_at == Some(step) {
                return Err(HookError::failed("on_step_end", "probe failure"));
            }
            self.step_poses.push(logs.poses().clone());
            self.dt_steps.push(logs.dt_step());
            Ok(())
        }

        fn on_sim_end(&mut self, logs: &mut Logs) -> Result<(), HookError> {
            self.dt_sim = logs.dt_sim();
            Ok(())
        }

        fn name(&self) -> &str {
            "probe"
        }
    }

    #[test]
    fn test_history_length() {
        let controller = ConsensusController::new(0.25);
        let history = run(12, &controller, &square(), 0.1, Vec::new(), 0).unwrap();

        assert_eq!(history.len(), 13);
        assert_eq!(history.initial(), Some(&square()));
    }

    #[test]
    fn test_rejects_invalid_config() {
        let controller = ConsensusController::new(1.0);

        for (n_steps, step_time) in [(0, 0.1), (10, 0.0), (10, -0.1), (10, f64::NAN)] {
            let err = run(n_steps, &controller, &square(), step_time, Vec::new(), 0).unwrap_err();
            assert!(matches!(err, SimError::Config(_)), "{:?}", err);
        }

        let err = run(10, &controller, &PoseSet::default(), 0.1, Vec::new(), 0).unwrap_err();
        assert!(matches!(
            err,
            SimError::Config(FormationError::InvalidConfig { field: "initial_poses", .. })
        ));
    }

    #[test]
    fn test_controller_output_mismatch_aborts() {
        let short = |_: &PoseSet| vec![Velocity::zeros()];
        let mut sim = Simulation::new(SimConfig::default()).unwrap();

        let err = sim.run(&short, &square(), Vec::new()).unwrap_err();
        assert_eq!(err.step(), Some(0));
        assert!(matches!(
            err,
            SimError::Step {
                source: FormationError::DimensionMismatch { expected: 4, actual: 1, .. },
                ..
            }
        ));
        assert_eq!(sim.state(), SimState::Aborted);
    }

    #[test]
    fn test_adjacency_mismatch_reported_at_step() {
        let controller = ConsensusController::new(1.0)
            .with_topology(formation_core::Topology::Custom {
                weights: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
            });
        let err = run(3, &controller, &square(), 0.1, Vec::new(), 0).unwrap_err();
        assert_eq!(err.step(), Some(0));
    }

    #[test]
    fn test_simulation_runs_once() {
        let controller = ConsensusController::new(0.25);
        let mut sim = Simulation::new(single_integrator(3, 0.1)).unwrap();
        assert_eq!(sim.state(), SimState::NotStarted);

        sim.run(&controller, &square(), Vec::new()).unwrap();
        assert_eq!(sim.state(), SimState::Finished);

        let err = sim.run(&controller, &square(), Vec::new()).unwrap_err();
        assert!(matches!(err, SimError::InvalidState(SimState::Finished)));
    }

    #[test]
    fn test_linear_decay_closed_form() {
        let controller = LinearDecayController::new(0.1);
        let initial = PoseSet::from_positions(&[(4.2, -3.7)]);
        let mut sim = Simulation::new(single_integrator(5, 0.1)).unwrap();

        let history = sim.run(&controller, &initial, Vec::new()).unwrap();
        let last = history.final_poses().unwrap().get(0).unwrap();
        let factor = 0.99f64.powi(5);

        assert_relative_eq!(last.x, 4.2 * factor, epsilon = 1e-12);
        assert_relative_eq!(last.y, -3.7 * factor, epsilon = 1e-12);
    }

    #[test]
    fn test_unicycle_drives_forward() {
        let ahead = |poses: &PoseSet| vec![Velocity::new(1.0, 0.0); poses.len()];
        let initial = PoseSet::from_positions(&[(0.0, 0.0)]);

        let history = run(10, &ahead, &initial, 0.1, Vec::new(), 0).unwrap();
        let last = history.final_poses().unwrap().get(0).unwrap();

        assert_relative_eq!(last.x, 1.0, epsilon = 1e-12);
        assert_eq!(last.y, 0.0);
        assert_eq!(last.theta, 0.0);
    }

    #[test]
    fn test_heading_wraps_under_saturated_spin() {
        let initial = PoseSet::from_rows(&[[0.0, 0.0, 3.0], [2.0, -1.0, -3.0]]);
        let history = run(400, &spin, &initial, 0.1, Vec::new(), 2).unwrap();

        for snapshot in &history {
            for pose in snapshot {
                assert!(pose.theta > -PI && pose.theta <= PI, "θ = {}", pose.theta);
            }
        }
        // Pure rotation: v is exactly zero
        assert_eq!(history.final_poses().unwrap().positions(), initial.positions());
    }

    #[test]
    fn test_initial_headings_are_wrapped() {
        let mut initial = PoseSet::from_positions(&[(0.0, 0.0), (1.0, 0.0)]);
        for pose in initial.iter_mut() {
            pose.theta = 10.0;
        }
        let expected = wrap_angle(10.0);

        for dynamics in [DynamicsModel::default(), DynamicsModel::SingleIntegrator] {
            let hold = |poses: &PoseSet| vec![Velocity::zeros(); poses.len()];
            let mut probe = Probe::default();
            let config = SimConfig {
                n_steps: 3,
                dynamics,
                ..SimConfig::default()
            };

            let callbacks: Vec<&mut dyn Callback> = vec![&mut probe];
            let history = Simulation::new(config).unwrap().run(&hold, &initial, callbacks).unwrap();

            for snapshot in &history {
                for pose in snapshot {
                    assert!(pose.theta > -PI && pose.theta <= PI, "θ = {}", pose.theta);
                }
            }
            let first = history.initial().unwrap();
            assert_eq!(first.get(0).unwrap().theta, expected);
            assert_eq!(probe.begin_poses.as_ref(), Some(first));
        }
    }

    #[test]
    fn test_deterministic_replay() {
        let controller = ConsensusController::new(0.25);
        let initial = PoseSet::from_rows(&[
            [1.0, 1.0, 0.3],
            [1.0, -1.0, -2.0],
            [-1.0, 1.0, 3.1],
            [-1.0, -1.0, 1.0],
        ]);

        let first = run(50, &controller, &initial, 0.05, Vec::new(), 0).unwrap();
        let second = run(50, &controller, &initial, 0.05, Vec::new(), 0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_callbacks_observe_each_step() {
        let controller = ConsensusController::new(0.25);
        let clock = Arc::new(ManualClock::auto_advancing(Duration::from_millis(1)));
        let mut probe = Probe::default();

        let mut sim = Simulation::new(SimConfig::default())
            .unwrap()
            .with_clock(clock);
        let callbacks: Vec<&mut dyn Callback> = vec![&mut probe];
        let history = sim.run(&controller, &square(), callbacks).unwrap();

        assert_eq!(probe.begin_poses.as_ref(), history.initial());
        assert_eq!(probe.step_poses.len(), 100);
        for (k, poses) in probe.step_poses.iter().enumerate() {
            assert_eq!(Some(poses), history.get(k + 1));
        }
        assert!(probe.dt_steps.iter().all(|dt| *dt == Some(0.001)));
        assert!(probe.dt_sim.is_some());
    }

    #[test]
    fn test_callback_error_aborts_run() {
        let controller = ConsensusController::new(0.25);
        let mut probe = Probe {
            fail_at: Some(2),
            ..Probe::default()
        };

        let mut sim = Simulation::new(SimConfig::default()).unwrap();
        let callbacks: Vec<&mut dyn Callback> = vec![&mut probe];
        let err = sim.run(&controller, &square(), callbacks).unwrap_err();

        assert_eq!(err.step(), Some(2));
        assert!(matches!(err, SimError::Hook { .. }));
        assert_eq!(sim.state(), SimState::Aborted);
        assert_eq!(probe.step_poses.len(), 2);
        assert!(probe.dt_sim.is_none());
    }

    #[test]
    fn test_config_from_json() {
        let config: SimConfig = serde_json::from_str(r#"{"n_steps": 5}"#).unwrap();
        assert_eq!(config.n_steps, 5);
        assert_eq!(config.step_time, 0.1);
        assert_eq!(config.dynamics, DynamicsModel::default());

        let config: SimConfig = serde_json::from_str(
            r#"{"dynamics": {"model": "unicycle", "projection_distance": 0.05, "angular_velocity_limit": 1.0},
                "verbosity": "detailed"}"#,
        )
        .unwrap();
        assert_eq!(
            config.dynamics,
            DynamicsModel::Unicycle(UnicycleMapper::new(0.05, 1.0).unwrap())
        );
        assert_eq!(config.verbosity, Verbosity::Detailed);

        let config: SimConfig =
            serde_json::from_str(r#"{"dynamics": {"model": "single_integrator"}}"#).unwrap();
        assert_eq!(config.dynamics, DynamicsModel::SingleIntegrator);

        let bad = serde_json::from_str::<SimConfig>(
            r#"{"dynamics": {"model": "unicycle", "projection_distance": 0.0, "angular_velocity_limit": 1.0}}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(Verbosity::from_level(0), Verbosity::Silent);
        assert_eq!(Verbosity::from_level(1), Verbosity::Poses);
        assert_eq!(Verbosity::from_level(2), Verbosity::Detailed);
        assert_eq!(Verbosity::from_level(9), Verbosity::Detailed);
    }

    fn fleet() -> impl Strategy<Value = PoseSet> {
        prop::collection::vec((-10.0f64..10.0, -10.0f64..10.0, -10.0f64..10.0), 1..8).prop_map(
            |rows| {
                let rows: Vec<[f64; 3]> = rows.into_iter().map(|(x, y, t)| [x, y, t]).collect();
                PoseSet::from_rows(&rows)
            },
        )
    }

    proptest! {
        #[test]
        fn test_prop_heading_stays_wrapped(initial in fleet(), gain in -2.0f64..2.0, n_steps in 1usize..60) {
            let controller = ConsensusController::new(gain);
            let history = run(n_steps, &controller, &initial, 0.1, Vec::new(), 0).unwrap();

            prop_assert_eq!(history.len(), n_steps + 1);
            for snapshot in &history {
                prop_assert_eq!(snapshot.len(), initial.len());
                for pose in snapshot {
                    prop_assert!(pose.theta > -PI && pose.theta <= PI);
                }
            }
        }

        #[test]
        fn test_prop_replay_is_identical(initial in fleet(), n_steps in 1usize..40) {
            let controller = ConsensusController::new(1.0 / initial.len() as f64);
            let first = run(n_steps, &controller, &initial, 0.05, Vec::new(), 0).unwrap();
            let second = run(n_steps, &controller, &initial, 0.05, Vec::new(), 0).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
