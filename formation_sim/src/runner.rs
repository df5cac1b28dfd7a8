//! Scenario runner - builds, runs, and checks formation scenarios.

use crate::engine::{SimConfig, Simulation, Verbosity};
use crate::error::SimError;
use crate::history::History;
use crate::metrics::{MetricsObserver, RunMetrics};
use crate::scenarios::ScenarioId;

use formation_core::{
    wrap_angle, ConsensusController, Controller, DynamicsModel, LinearDecayController, Pose,
    PoseSet, Topology, Velocity,
};
use formation_env::{Callback, Clock};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};
use serde::Serialize;
use std::f64::consts::{PI, TAU};
use std::sync::Arc;
use tracing::{info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether the scenario's assertion held
    pub passed: bool,

    /// Fleet size
    pub robots: usize,

    /// Dynamics model the run actually used
    pub dynamics: &'static str,

    /// Steps executed
    pub total_steps: usize,

    /// Simulated time at the end of the run
    pub simulated_secs: f64,

    pub initial_spread: f64,
    pub final_spread: f64,

    /// Failure message if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    /// Metrics collected during the run
    pub metrics: RunMetrics,
}

/// A scenario ready to run.
struct Setup {
    initial: PoseSet,
    controller: Box<dyn Controller>,
    dynamics: DynamicsModel,
    gain: f64,
}

/// Runs formation scenarios.
pub struct ScenarioRunner {
    /// Seed for randomized fleets
    seed: u64,

    /// Fleet size for scenarios that accept one
    num_robots: usize,

    n_steps: Option<usize>,
    step_time: Option<f64>,
    gain: Option<f64>,

    /// Requested dynamics; scenarios with a required model override it
    dynamics: Option<DynamicsModel>,
    verbosity: Verbosity,
    clock: Option<Arc<dyn Clock>>,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64, num_robots: usize) -> Self {
        Self {
            seed,
            num_robots,
            n_steps: None,
            step_time: None,
            gain: None,
            dynamics: None,
            verbosity: Verbosity::Silent,
            clock: None,
        }
    }

    /// Overrides every scenario's step count.
    pub fn with_steps(mut self, n_steps: usize) -> Self {
        self.n_steps = Some(n_steps);
        self
    }

    /// Overrides the step time.
    pub fn with_step_time(mut self, step_time: f64) -> Self {
        self.step_time = Some(step_time);
        self
    }

    /// Overrides the controller gain.
    pub fn with_gain(mut self, gain: f64) -> Self {
        self.gain = Some(gain);
        self
    }

    /// Requests a dynamics model. Scenarios that require a different model
    /// run under their own and log a warning.
    pub fn with_dynamics(mut self, dynamics: DynamicsModel) -> Self {
        self.dynamics = Some(dynamics);
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Times callbacks with `clock` instead of the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Applies a loaded configuration: its steps and step time become
    /// overrides, its dynamics and verbosity replace the current ones.
    pub fn with_config(mut self, config: &SimConfig) -> Self {
        self.n_steps = Some(config.n_steps);
        self.step_time = Some(config.step_time);
        self.dynamics = Some(config.dynamics);
        self.verbosity = config.verbosity;
        self
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> Result<ScenarioResult, SimError> {
        self.run_with(scenario, Vec::new())
    }

    /// Runs a scenario with extra observers, called before the runner's own
    /// metrics observer.
    pub fn run_with(
        &self,
        scenario: ScenarioId,
        observers: Vec<&mut dyn Callback>,
    ) -> Result<ScenarioResult, SimError> {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let setup = self.setup(scenario)?;
        let config = SimConfig {
            n_steps: self.n_steps.unwrap_or(scenario.default_steps()),
            step_time: self.step_time.unwrap_or(SimConfig::default().step_time),
            dynamics: setup.dynamics,
            verbosity: self.verbosity,
        };

        let mut sim = Simulation::new(config)?;
        if let Some(clock) = &self.clock {
            sim = sim.with_clock(Arc::clone(clock));
        }

        let mut metrics = MetricsObserver::new();
        let mut callbacks: Vec<&mut dyn Callback> = Vec::with_capacity(observers.len() + 1);
        for observer in observers {
            callbacks.push(observer);
        }
        callbacks.push(&mut metrics);

        let history = sim.run(setup.controller.as_ref(), &setup.initial, callbacks)?;
        let verdict = evaluate(scenario, &setup, sim.config(), &history);
        let metrics = metrics.into_metrics();

        match &verdict {
            Ok(()) => info!(
                "✓ {} passed ({}): spread {:.4} -> {:.3e}",
                scenario.name(),
                setup.dynamics.name(),
                metrics.initial_spread,
                metrics.final_spread
            ),
            Err(reason) => warn!("✗ {} failed: {}", scenario.name(), reason),
        }

        Ok(ScenarioResult {
            scenario,
            seed: self.seed,
            passed: verdict.is_ok(),
            robots: setup.initial.len(),
            dynamics: setup.dynamics.name(),
            total_steps: metrics.steps,
            simulated_secs: metrics.simulated_secs,
            initial_spread: metrics.initial_spread,
            final_spread: metrics.final_spread,
            failure_reason: verdict.err(),
            metrics,
        })
    }

    fn setup(&self, scenario: ScenarioId) -> Result<Setup, SimError> {
        let n = self.num_robots;
        if n < scenario.min_robots() {
            return Err(SimError::Scenario(format!(
                "{} needs at least {} robots, got {}",
                scenario.name(),
                scenario.min_robots(),
                n
            )));
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let initial = match scenario {
            ScenarioId::SquareConsensus => facing_centroid(&[(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]),
            ScenarioId::LinearDecay => {
                PoseSet::from_positions(&[(0.0, 1.0), (1.0, 0.0), (0.0, 0.0), (-1.0, 0.0), (4.2, -3.7)])
            }
            ScenarioId::Scatter => {
                let coord = Uniform::new(-5.0, 5.0);
                let heading = Uniform::new_inclusive(-PI, PI);
                (0..n)
                    .map(|_| Pose::new(coord.sample(&mut rng), coord.sample(&mut rng), heading.sample(&mut rng)))
                    .collect::<Vec<_>>()
                    .into()
            }
            ScenarioId::Ring => polygon((0.0, 0.0), RING_RADIUS, n),
            ScenarioId::LeaderFollower => {
                let mut poses = vec![Pose::at(LEADER.0, LEADER.1)];
                poses.extend(polygon(LEADER, 4.0, n - 1).iter().copied());
                PoseSet::new(poses)
            }
            ScenarioId::Spin => {
                let heading = Uniform::new_inclusive(-PI, PI);
                (0..n)
                    .map(|i| Pose::new(1.5 * (i % 4) as f64, 1.5 * (i / 4) as f64, heading.sample(&mut rng)))
                    .collect::<Vec<_>>()
                    .into()
            }
        };

        let gain = self
            .gain
            .or_else(|| scenario.default_gain(initial.len()))
            .unwrap_or_default();
        let controller: Box<dyn Controller> = match scenario {
            ScenarioId::SquareConsensus | ScenarioId::Scatter => Box::new(ConsensusController::new(gain)),
            ScenarioId::LinearDecay => Box::new(LinearDecayController::new(gain)),
            ScenarioId::Ring => Box::new(ConsensusController::new(gain).with_topology(Topology::Ring)),
            ScenarioId::LeaderFollower => {
                Box::new(ConsensusController::new(gain).with_topology(Topology::Star { leader: 0 }))
            }
            ScenarioId::Spin => Box::new(spin),
        };

        Ok(Setup {
            initial,
            controller,
            dynamics: self.resolve_dynamics(scenario),
            gain,
        })
    }

    /// Picks the model a scenario runs under: the requested one unless the
    /// scenario requires another kind.
    fn resolve_dynamics(&self, scenario: ScenarioId) -> DynamicsModel {
        let Some(required) = scenario.required_dynamics() else {
            return self.dynamics.unwrap_or_default();
        };
        match self.dynamics {
            Some(requested) if requested.name() == required.name() => requested,
            Some(requested) => {
                warn!(
                    "{} requires {} dynamics, ignoring requested {}",
                    scenario.name(),
                    required.name(),
                    requested.name()
                );
                required
            }
            None => required,
        }
    }
}

const RING_RADIUS: f64 = 3.0;
const LEADER: (f64, f64) = (1.0, -2.0);

/// Steers the virtual point sideways: pure rotation for a unicycle.
fn spin(poses: &PoseSet) -> Vec<Velocity> {
    poses
        .iter()
        .map(|p| Velocity::new(-p.theta.sin(), p.theta.cos()))
        .collect()
}

/// Robots at `positions`, each facing the fleet centroid.
fn facing_centroid(positions: &[(f64, f64)]) -> PoseSet {
    let n = positions.len().max(1) as f64;
    let cx = positions.iter().map(|p| p.0).sum::<f64>() / n;
    let cy = positions.iter().map(|p| p.1).sum::<f64>() / n;
    positions
        .iter()
        .map(|&(x, y)| Pose::new(x, y, (cy - y).atan2(cx - x)))
        .collect::<Vec<_>>()
        .into()
}

/// Regular `n`-gon of `radius` around `center`, every robot facing the centre.
fn polygon(center: (f64, f64), radius: f64, n: usize) -> PoseSet {
    (0..n)
        .map(|i| {
            let phi = TAU * i as f64 / n as f64;
            Pose::new(
                center.0 + radius * phi.cos(),
                center.1 + radius * phi.sin(),
                wrap_angle(phi + PI),
            )
        })
        .collect::<Vec<_>>()
        .into()
}

fn evaluate(
    scenario: ScenarioId,
    setup: &Setup,
    config: &SimConfig,
    history: &History,
) -> Result<(), String> {
    let (Some(initial), Some(last)) = (history.initial(), history.final_poses()) else {
        return Err("empty history".to_string());
    };
    let k = config.n_steps as i32;
    let dt = config.step_time;

    match scenario {
        ScenarioId::SquareConsensus => check_contraction(initial, last, 1e-2),
        ScenarioId::Scatter => check_contraction(initial, last, 0.25),
        ScenarioId::LinearDecay => {
            let factor = (1.0 - setup.gain * dt).powi(k);
            check_scaled(initial, last, factor, (0.0, 0.0), 0.0, 1e-9)
        }
        ScenarioId::Ring => {
            let lambda = 2.0 - 2.0 * (TAU / initial.len() as f64).cos();
            let factor = (1.0 - setup.gain * dt * lambda).powi(k);
            check_scaled(initial, last, factor, (0.0, 0.0), 1e-6, 1e-12)
        }
        ScenarioId::LeaderFollower => {
            let (Some(leader0), Some(leader)) = (initial.get(0), last.get(0)) else {
                return Err("missing leader".to_string());
            };
            if leader.position() != leader0.position() {
                return Err(format!("leader moved from {} to {}", leader0, leader));
            }
            let reach = |poses: &PoseSet| {
                poses
                    .iter()
                    .map(|p| (p.position() - leader.position()).norm())
                    .fold(0.0, f64::max)
            };
            let (before, after) = (reach(initial), reach(last));
            if after > 1e-3 * before {
                return Err(format!("followers still {:.3e} m from the leader (started at {:.3})", after, before));
            }
            Ok(())
        }
        ScenarioId::Spin => {
            for (step, snapshot) in history.iter().enumerate() {
                if let Some(pose) = snapshot.iter().find(|p| !(p.theta > -PI && p.theta <= PI)) {
                    return Err(format!("heading {} out of range at snapshot {}", pose.theta, step));
                }
            }
            if last.positions() != initial.positions() {
                return Err("robots translated while spinning in place".to_string());
            }
            Ok(())
        }
    }
}

/// Passes if the final spread is below `ratio` times the initial spread.
fn check_contraction(initial: &PoseSet, last: &PoseSet, ratio: f64) -> Result<(), String> {
    let (before, after) = (initial.spread(), last.spread());
    if after < ratio * before {
        Ok(())
    } else {
        Err(format!(
            "spread {:.4} -> {:.4}, expected below {:.4}",
            before,
            after,
            ratio * before
        ))
    }
}

/// Passes if every robot sits at `center + factor · (p0 - center)`.
fn check_scaled(
    initial: &PoseSet,
    last: &PoseSet,
    factor: f64,
    center: (f64, f64),
    rel_tol: f64,
    abs_tol: f64,
) -> Result<(), String> {
    let center = Velocity::new(center.0, center.1);
    for (i, (p0, p)) in initial.iter().zip(last).enumerate() {
        let expected = center + factor * (p0.position() - center);
        let error = (p.position() - expected).norm();
        if error > rel_tol * expected.norm() + abs_tol {
            return Err(format!(
                "robot {} at ({:.6e}, {:.6e}), expected ({:.6e}, {:.6e})",
                i, p.x, p.y, expected.x, expected.y
            ));
        }
    }
    Ok(())
}
