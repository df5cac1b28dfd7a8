//! Recorded fleet snapshots of one run.

use formation_core::{Pose, PoseSet};
use serde::Serialize;

/// Append-only sequence of fleet snapshots.
///
/// Entry 0 is the initial fleet; entry `k` is the fleet after step `k - 1`.
/// A completed run holds `n_steps + 1` snapshots. Each snapshot is an
/// independent copy of the engine's working fleet.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(transparent)]
pub struct History {
    snapshots: Vec<PoseSet>,
}

impl History {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            snapshots: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, poses: &PoseSet) {
        self.snapshots.push(poses.clone());
    }

    /// Number of snapshots.
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Snapshot at index `k`.
    pub fn get(&self, k: usize) -> Option<&PoseSet> {
        self.snapshots.get(k)
    }

    /// Fleet before the first step.
    pub fn initial(&self) -> Option<&PoseSet> {
        self.snapshots.first()
    }

    /// Fleet after the last step.
    pub fn final_poses(&self) -> Option<&PoseSet> {
        self.snapshots.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PoseSet> {
        self.snapshots.iter()
    }

    /// Poses of one robot across the run; empty if the index is out of range.
    pub fn trajectory(&self, robot: usize) -> Vec<Pose> {
        self.snapshots
            .iter()
            .filter_map(|snapshot| snapshot.get(robot).copied())
            .collect()
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a PoseSet;
    type IntoIter = std::slice::Iter<'a, PoseSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.snapshots.iter()
    }
}
