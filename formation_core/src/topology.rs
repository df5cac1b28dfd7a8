//! Communication graphs between robots.
//!
//! An [`Adjacency`] is an `n × n` weight matrix with a zero diagonal:
//! `weight(i, j) > 0` means robot `i` senses robot `j`. The matrix does not
//! have to be symmetric, so directed graphs (leader-follower) are allowed.
//!
//! [`Topology`] is the serializable policy that builds an adjacency for a
//! given fleet size.

use crate::error::FormationError;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

/// Weighted sensing graph over `n` robots.
#[derive(Debug, Clone, PartialEq)]
pub struct Adjacency {
    weights: DMatrix<f64>,
}

impl Adjacency {
    /// Every robot senses every other robot with weight 1.
    pub fn complete(n: usize) -> Self {
        let weights = DMatrix::from_fn(n, n, |i, j| if i == j { 0.0 } else { 1.0 });
        Self { weights }
    }

    /// Bidirectional cycle: robot `i` senses `i - 1` and `i + 1` (mod n).
    ///
    /// For `n <= 2` this degenerates to the complete graph.
    pub fn ring(n: usize) -> Self {
        if n <= 2 {
            return Self::complete(n);
        }
        let weights = DMatrix::from_fn(n, n, |i, j| {
            if (i + 1) % n == j || (j + 1) % n == i {
                1.0
            } else {
                0.0
            }
        });
        Self { weights }
    }

    /// Followers sense only the leader; the leader senses nobody.
    pub fn star(n: usize, leader: usize) -> Result<Self, FormationError> {
        if n > 0 && leader >= n {
            return Err(FormationError::InvalidAdjacency(format!(
                "leader index {} out of range for {} robots",
                leader, n
            )));
        }
        let weights = DMatrix::from_fn(n, n, |i, j| {
            if i != leader && j == leader {
                1.0
            } else {
                0.0
            }
        });
        Ok(Self { weights })
    }

    /// Builds an adjacency from an explicit matrix.
    ///
    /// The matrix must be square, finite, and have a zero diagonal.
    pub fn from_matrix(weights: DMatrix<f64>) -> Result<Self, FormationError> {
        if weights.nrows() != weights.ncols() {
            return Err(FormationError::InvalidAdjacency(format!(
                "matrix must be square, got {}x{}",
                weights.nrows(),
                weights.ncols()
            )));
        }
        if weights.iter().any(|w| !w.is_finite()) {
            return Err(FormationError::InvalidAdjacency(
                "weights must be finite".to_string(),
            ));
        }
        for i in 0..weights.nrows() {
            if weights[(i, i)] != 0.0 {
                return Err(FormationError::InvalidAdjacency(format!(
                    "diagonal entry ({}, {}) must be zero, got {}",
                    i,
                    i,
                    weights[(i, i)]
                )));
            }
        }
        Ok(Self { weights })
    }

    /// Builds an adjacency from row vectors.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, FormationError> {
        let n = rows.len();
        if let Some(bad) = rows.iter().find(|r| r.len() != n) {
            return Err(FormationError::InvalidAdjacency(format!(
                "matrix must be square, got a row of length {} in a {}-row matrix",
                bad.len(),
                n
            )));
        }
        Self::from_matrix(DMatrix::from_fn(n, n, |i, j| rows[i][j]))
    }

    /// Number of robots the graph covers.
    pub fn size(&self) -> usize {
        self.weights.nrows()
    }

    /// Influence of robot `j` on robot `i`.
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[(i, j)]
    }

    /// Returns true if `weight(i, j) == weight(j, i)` for all pairs.
    pub fn is_symmetric(&self) -> bool {
        self.weights == self.weights.transpose()
    }

    /// Underlying weight matrix.
    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.weights
    }
}

/// Policy for building the sensing graph of a fleet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "topology", rename_all = "snake_case")]
pub enum Topology {
    /// Every robot senses every other robot
    #[default]
    Complete,

    /// Bidirectional cycle in robot index order
    Ring,

    /// Leader-follower: followers sense `leader`, the leader holds still
    Star { leader: usize },

    /// Explicit weight rows; must match the fleet size
    Custom { weights: Vec<Vec<f64>> },
}

impl Topology {
    /// Builds the adjacency for a fleet of `n` robots.
    pub fn adjacency(&self, n: usize) -> Result<Adjacency, FormationError> {
        match self {
            Topology::Complete => Ok(Adjacency::complete(n)),
            Topology::Ring => Ok(Adjacency::ring(n)),
            Topology::Star { leader } => Adjacency::star(n, *leader),
            Topology::Custom { weights } => {
                let adjacency = Adjacency::from_rows(weights)?;
                if adjacency.size() != n {
                    return Err(FormationError::mismatch("adjacency", n, adjacency.size()));
                }
                Ok(adjacency)
            }
        }
    }

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Complete => "complete",
            Topology::Ring => "ring",
            Topology::Star { .. } => "star",
            Topology::Custom { .. } => "custom",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complete_graph_zero_diagonal() {
        let adj = Adjacency::complete(4);
        assert_eq!(adj.size(), 4);
        for i in 0..4 {
            for j in 0..4 {
                let expected = if i == j { 0.0 } else { 1.0 };
                assert_eq!(adj.weight(i, j), expected);
            }
        }
        assert!(adj.is_symmetric());
    }

    #[test]
    fn test_ring_neighbours() {
        let adj = Adjacency::ring(5);
        assert_eq!(adj.weight(0, 1), 1.0);
        assert_eq!(adj.weight(0, 4), 1.0);
        assert_eq!(adj.weight(0, 2), 0.0);
        assert_eq!(adj.weight(2, 2), 0.0);
        assert!(adj.is_symmetric());
    }

    #[test]
    fn test_star_is_directed() {
        let adj = Adjacency::star(3, 0).unwrap();
        assert_eq!(adj.weight(1, 0), 1.0);
        assert_eq!(adj.weight(0, 1), 0.0);
        assert_eq!(adj.weight(1, 2), 0.0);
        assert!(!adj.is_symmetric());

        assert!(Adjacency::star(3, 3).is_err());
    }

    #[test]
    fn test_from_matrix_rejects_bad_shapes() {
        assert!(Adjacency::from_matrix(DMatrix::zeros(2, 3)).is_err());
        assert!(Adjacency::from_rows(&[vec![1.0, 1.0], vec![1.0, 0.0]]).is_err());
        assert!(Adjacency::from_rows(&[vec![0.0, f64::NAN], vec![1.0, 0.0]]).is_err());
        assert!(Adjacency::from_rows(&[vec![0.0, 1.0], vec![1.0]]).is_err());
        assert!(Adjacency::from_rows(&[vec![0.0, 2.0], vec![0.5, 0.0]]).is_ok());
    }

    #[test]
    fn test_custom_topology_size_mismatch() {
        let topology = Topology::Custom {
            weights: vec![vec![0.0, 1.0], vec![1.0, 0.0]],
        };
        assert!(topology.adjacency(2).is_ok());
        assert_eq!(
            topology.adjacency(3),
            Err(FormationError::mismatch("adjacency", 3, 2))
        );
    }

    #[test]
    fn test_topology_serde_tag() {
        let json = serde_json::to_string(&Topology::Star { leader: 2 }).unwrap();
        assert_eq!(json, r#"{"topology":"star","leader":2}"#);

        let parsed: Topology = serde_json::from_str(r#"{"topology":"ring"}"#).unwrap();
        assert_eq!(parsed, Topology::Ring);
    }
}
