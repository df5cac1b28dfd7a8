//! Fleet controllers.
//!
//! A [`Controller`] maps the current fleet poses to one desired planar
//! velocity per robot, in robot order. Controllers are stateless: the output
//! depends only on the poses passed in and on parameters fixed at
//! construction time.
//!
//! # Consensus
//!
//! ```text
//! v_i = -gain * Σ_j a_ij * (p_i - p_j)
//! ```
//!
//! With the complete graph this is `-gain * n * (p_i - mean(p))`, pulling
//! every robot toward the fleet centroid.

use crate::error::FormationError;
use crate::pose::{PoseSet, Velocity};
use crate::topology::{Adjacency, Topology};

/// Maps fleet poses to desired single-integrator velocities.
///
/// Closures `Fn(&PoseSet) -> Vec<Velocity>` implement this trait, so test
/// stubs can be passed directly.
pub trait Controller {
    /// Computes one velocity per robot, same order as `poses`.
    fn velocities(&self, poses: &PoseSet) -> Result<Vec<Velocity>, FormationError>;

    /// Short name used in logs.
    fn name(&self) -> &str {
        "controller"
    }
}

impl<F> Controller for F
where
    F: Fn(&PoseSet) -> Vec<Velocity>,
{
    fn velocities(&self, poses: &PoseSet) -> Result<Vec<Velocity>, FormationError> {
        Ok(self(poses))
    }
}

/// Consensus kernel over an explicit adjacency.
///
/// Heading is ignored. A single robot gets a zero velocity; an empty fleet
/// gets an empty vector. Negative gains are accepted and push robots apart.
pub fn consensus(
    poses: &PoseSet,
    adjacency: &Adjacency,
    gain: f64,
) -> Result<Vec<Velocity>, FormationError> {
    let n = poses.len();
    if n <= 1 {
        return Ok(vec![Velocity::zeros(); n]);
    }
    if adjacency.size() != n {
        return Err(FormationError::mismatch("adjacency", n, adjacency.size()));
    }

    let positions = poses.positions();
    let velocities = positions
        .iter()
        .enumerate()
        .map(|(i, p_i)| {
            let pull = positions
                .iter()
                .enumerate()
                .fold(Velocity::zeros(), |acc, (j, p_j)| {
                    acc + adjacency.weight(i, j) * (p_i - p_j)
                });
            -gain * pull
        })
        .collect();

    Ok(velocities)
}

/// Consensus controller with a fixed gain and sensing topology.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsensusController {
    gain: f64,
    topology: Topology,
}

impl ConsensusController {
    /// Creates a consensus controller over the complete graph.
    pub fn new(gain: f64) -> Self {
        Self {
            gain,
            topology: Topology::Complete,
        }
    }

    /// Sets the sensing topology.
    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    /// Returns the gain.
    pub fn gain(&self) -> f64 {
        self.gain
    }

    /// Returns the topology.
    pub fn topology(&self) -> &Topology {
        &self.topology
    }
}

impl Controller for ConsensusController {
    fn velocities(&self, poses: &PoseSet) -> Result<Vec<Velocity>, FormationError> {
        if poses.len() <= 1 {
            return Ok(vec![Velocity::zeros(); poses.len()]);
        }
        let adjacency = self.topology.adjacency(poses.len())?;
        consensus(poses, &adjacency, self.gain)
    }

    fn name(&self) -> &str {
        "consensus"
    }
}

/// Drives every robot toward the origin: `v_i = -gain * p_i`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearDecayController {
    /// Decay rate (1/s)
    pub gain: f64,
}

impl LinearDecayController {
    /// Creates a linear-decay controller.
    pub fn new(gain: f64) -> Self {
        Self { gain }
    }
}

impl Controller for LinearDecayController {
    fn velocities(&self, poses: &PoseSet) -> Result<Vec<Velocity>, FormationError> {
        Ok(poses.iter().map(|p| -self.gain * p.position()).collect())
    }

    fn name(&self) -> &str {
        "linear_decay"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    fn square_fleet() -> PoseSet {
        PoseSet::from_rows(&[
            [1.0, 1.0, -3.0 * PI / 4.0],
            [1.0, -1.0, 3.0 * PI / 4.0],
            [-1.0, 1.0, -PI / 4.0],
            [-1.0, -1.0, PI / 4.0],
        ])
    }

    #[test]
    fn test_consensus_points_to_centroid() {
        let poses = square_fleet();
        let gain = 1.0 / poses.len() as f64;
        let centroid = poses.centroid().unwrap();

        let velocities = ConsensusController::new(gain).velocities(&poses).unwrap();

        for (pose, v) in poses.iter().zip(&velocities) {
            let expected = centroid - pose.position();
            assert_eq!(*v, expected);
        }
        assert_eq!(velocities[0], Velocity::new(-1.0, -1.0));
    }

    #[test]
    fn test_consensus_single_robot_is_zero() {
        let poses = PoseSet::from_positions(&[(3.0, -2.0)]);
        for gain in [0.0, 1.0, -5.0, 1e9] {
            let v = ConsensusController::new(gain).velocities(&poses).unwrap();
            assert_eq!(v, vec![Velocity::zeros()]);
        }
    }

    #[test]
    fn test_consensus_empty_fleet() {
        let v = ConsensusController::new(1.0)
            .velocities(&PoseSet::default())
            .unwrap();
        assert!(v.is_empty());
    }

    #[test]
    fn test_consensus_adjacency_mismatch() {
        let poses = square_fleet();
        let result = consensus(&poses, &Adjacency::complete(3), 1.0);
        assert_eq!(result, Err(FormationError::mismatch("adjacency", 4, 3)));
    }

    #[test]
    fn test_negative_gain_diverges() {
        let poses = PoseSet::from_positions(&[(1.0, 0.0), (-1.0, 0.0)]);
        let v = ConsensusController::new(-1.0).velocities(&poses).unwrap();
        assert!(v[0].x > 0.0);
        assert!(v[1].x < 0.0);
    }

    #[test]
    fn test_consensus_ignores_heading() {
        let a = PoseSet::from_rows(&[[0.0, 0.0, 0.0], [2.0, 0.0, 1.0]]);
        let b = PoseSet::from_rows(&[[0.0, 0.0, 2.0], [2.0, 0.0, -1.0]]);
        let controller = ConsensusController::new(0.5);
        assert_eq!(
            controller.velocities(&a).unwrap(),
            controller.velocities(&b).unwrap()
        );
    }

    #[test]
    fn test_star_topology_leader_holds_still() {
        let poses = PoseSet::from_positions(&[(0.0, 0.0), (2.0, 0.0), (0.0, 4.0)]);
        let controller = ConsensusController::new(1.0).with_topology(Topology::Star { leader: 0 });
        let v = controller.velocities(&poses).unwrap();
        assert_eq!(v[0], Velocity::zeros());
        assert_relative_eq!(v[1].x, -2.0);
        assert_relative_eq!(v[2].y, -4.0);
    }

    #[test]
    fn test_consensus_is_deterministic() {
        let poses = square_fleet();
        let controller = ConsensusController::new(0.3).with_topology(Topology::Ring);
        assert_eq!(
            controller.velocities(&poses).unwrap(),
            controller.velocities(&poses).unwrap()
        );
    }

    #[test]
    fn test_linear_decay() {
        let poses = PoseSet::from_positions(&[(4.2, -3.7)]);
        let v = LinearDecayController::new(0.1).velocities(&poses).unwrap();
        assert_relative_eq!(v[0].x, -0.42, epsilon = 1e-12);
        assert_relative_eq!(v[0].y, 0.37, epsilon = 1e-12);
    }

    #[test]
    fn test_closure_controller() {
        let stub = |poses: &PoseSet| vec![Velocity::new(1.0, 0.0); poses.len()];
        let v = stub.velocities(&square_fleet()).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(stub.name(), "controller");
    }
}
