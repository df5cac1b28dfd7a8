//! Formation scenarios.

use crate::error::SimError;
use formation_core::DynamicsModel;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioId {
    /// Four robots on a unit square converge on the centroid
    SquareConsensus,

    /// Planar decay toward the origin, checked against the closed form
    LinearDecay,

    /// Seeded random fleet, complete-graph consensus
    Scatter,

    /// Regular polygon contracting under ring-topology consensus, planar dynamics
    Ring,

    /// Followers converge on a fixed leader (star topology)
    LeaderFollower,

    /// Saturated turning for hundreds of steps; headings must stay wrapped
    Spin,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::SquareConsensus,
            ScenarioId::LinearDecay,
            ScenarioId::Scatter,
            ScenarioId::Ring,
            ScenarioId::LeaderFollower,
            ScenarioId::Spin,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::SquareConsensus => "square_consensus",
            ScenarioId::LinearDecay => "linear_decay",
            ScenarioId::Scatter => "scatter",
            ScenarioId::Ring => "ring",
            ScenarioId::LeaderFollower => "leader_follower",
            ScenarioId::Spin => "spin",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::SquareConsensus => "4 robots at (±1, ±1) facing inward, gain 1/n, spread must shrink 100x",
            ScenarioId::LinearDecay => "v = -0.1·p, single-integrator, must match (1 - g·dt)^k · p0",
            ScenarioId::Scatter => "Seeded random fleet in [-5, 5]², random headings, spread must shrink 4x",
            ScenarioId::Ring => "Regular polygon, ring topology, single-integrator, must match the analytic contraction rate",
            ScenarioId::LeaderFollower => "Star topology around robot 0, followers must reach the still leader",
            ScenarioId::Spin => "Saturated turning for 400 steps, headings stay in (-π, π], robots stay put",
        }
    }

    /// Step count used unless the runner overrides it.
    pub fn default_steps(&self) -> usize {
        match self {
            ScenarioId::SquareConsensus => 100,
            ScenarioId::LinearDecay => 5,
            ScenarioId::Scatter | ScenarioId::Ring => 200,
            ScenarioId::LeaderFollower => 150,
            ScenarioId::Spin => 400,
        }
    }

    /// Gain used unless the runner overrides it; `None` for gainless controllers.
    pub fn default_gain(&self, num_robots: usize) -> Option<f64> {
        match self {
            ScenarioId::SquareConsensus | ScenarioId::Scatter => {
                Some(1.0 / num_robots.max(1) as f64)
            }
            ScenarioId::LinearDecay => Some(0.1),
            ScenarioId::Ring | ScenarioId::LeaderFollower => Some(1.0),
            ScenarioId::Spin => None,
        }
    }

    /// Dynamics the scenario's check is written for, if it depends on one.
    ///
    /// The closed-form checks only hold for planar integration; spinning in
    /// place needs a heading that turns.
    pub fn required_dynamics(&self) -> Option<DynamicsModel> {
        match self {
            ScenarioId::LinearDecay | ScenarioId::Ring => Some(DynamicsModel::SingleIntegrator),
            ScenarioId::Spin => Some(DynamicsModel::default()),
            _ => None,
        }
    }

    /// Minimum fleet size the scenario can be built with.
    pub fn min_robots(&self) -> usize {
        match self {
            ScenarioId::Ring => 3,
            ScenarioId::Scatter | ScenarioId::LeaderFollower => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenarioId {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ScenarioId::all()
            .into_iter()
            .find(|id| id.name() == s)
            .ok_or_else(|| SimError::Scenario(format!("unknown scenario `{}`", s)))
    }
}
