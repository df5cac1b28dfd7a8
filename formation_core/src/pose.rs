//! Planar robot poses and fleet snapshots.
//!
//! A [`Pose`] is `(x, y, θ)` with θ kept in `(-π, π]`. A [`PoseSet`] holds one
//! pose per robot; the index of a pose is the robot's identity for the whole
//! run.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Planar velocity command `(vx, vy)` with single-integrator semantics.
pub type Velocity = Vector2<f64>;

/// Wraps an angle into `(-π, π]` using `atan2(sin θ, cos θ)`.
///
/// `atan2` may round to exactly `-π`; that value is folded onto `π` so the
/// lower bound stays open.
pub fn wrap_angle(theta: f64) -> f64 {
    let wrapped = theta.sin().atan2(theta.cos());
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Returns the heading unchanged when it already lies in `(-π, π]`, otherwise
/// wraps it.
pub fn normalize_heading(theta: f64) -> f64 {
    if theta > -PI && theta <= PI {
        theta
    } else {
        wrap_angle(theta)
    }
}

/// A planar pose: position in meters, heading in radians.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    /// World-frame x position (m)
    pub x: f64,

    /// World-frame y position (m)
    pub y: f64,

    /// Heading (rad), counter-clockwise from the x-axis
    pub theta: f64,
}

impl Pose {
    /// Creates a pose, wrapping the heading into `(-π, π]`.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self {
            x,
            y,
            theta: normalize_heading(theta),
        }
    }

    /// Creates a pose facing along +x.
    pub fn at(x: f64, y: f64) -> Self {
        Self { x, y, theta: 0.0 }
    }

    /// Returns the position `(x, y)`.
    pub fn position(&self) -> Vector2<f64> {
        Vector2::new(self.x, self.y)
    }

    /// Returns the unit heading vector `(cos θ, sin θ)`.
    pub fn heading(&self) -> Vector2<f64> {
        Vector2::new(self.theta.cos(), self.theta.sin())
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(x: {:.3}, y: {:.3}, θ: {:.3} rad)", self.x, self.y, self.theta)
    }
}

/// Ordered poses of a fleet, one per robot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Pose>", into = "Vec<Pose>")]
pub struct PoseSet {
    poses: Vec<Pose>,
}

impl PoseSet {
    /// Creates a fleet snapshot from poses; headings are wrapped.
    pub fn new(poses: Vec<Pose>) -> Self {
        let poses = poses
            .into_iter()
            .map(|p| Pose::new(p.x, p.y, p.theta))
            .collect();
        Self { poses }
    }

    /// Creates a fleet from `(x, y)` positions, every robot facing +x.
    pub fn from_positions(positions: &[(f64, f64)]) -> Self {
        Self {
            poses: positions.iter().map(|&(x, y)| Pose::at(x, y)).collect(),
        }
    }

    /// Creates a fleet from `[x, y, θ]` rows.
    pub fn from_rows(rows: &[[f64; 3]]) -> Self {
        Self {
            poses: rows.iter().map(|r| Pose::new(r[0], r[1], r[2])).collect(),
        }
    }

    /// Number of robots.
    pub fn len(&self) -> usize {
        self.poses.len()
    }

    /// Returns true if the fleet has no robots.
    pub fn is_empty(&self) -> bool {
        self.poses.is_empty()
    }

    /// Returns the pose of robot `i`.
    pub fn get(&self, i: usize) -> Option<&Pose> {
        self.poses.get(i)
    }

    /// Iterates over poses in robot order.
    pub fn iter(&self) -> std::slice::Iter<'_, Pose> {
        self.poses.iter()
    }

    /// Returns a copy with every heading brought into `(-π, π]`.
    ///
    /// Headings already in range are kept bit-for-bit.
    pub fn normalized(&self) -> PoseSet {
        Self::new(self.poses.clone())
    }

    /// Mutable access for the integrator. Headings written here are not
    /// wrapped; see [`PoseSet::normalized`].
    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Pose> {
        self.poses.iter_mut()
    }

    /// Returns the poses as a slice.
    pub fn as_slice(&self) -> &[Pose] {
        &self.poses
    }

    /// Positions in robot order.
    pub fn positions(&self) -> Vec<Vector2<f64>> {
        self.poses.iter().map(Pose::position).collect()
    }

    /// Mean position of the fleet, `None` when empty.
    pub fn centroid(&self) -> Option<Vector2<f64>> {
        if self.poses.is_empty() {
            return None;
        }
        let sum = self
            .poses
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.position());
        Some(sum / self.poses.len() as f64)
    }

    /// Largest distance from any robot to the centroid (0 for an empty fleet).
    pub fn spread(&self) -> f64 {
        match self.centroid() {
            Some(c) => self
                .poses
                .iter()
                .map(|p| (p.position() - c).norm())
                .fold(0.0, f64::max),
            None => 0.0,
        }
    }
}

impl From<Vec<Pose>> for PoseSet {
    fn from(poses: Vec<Pose>) -> Self {
        Self::new(poses)
    }
}

impl From<PoseSet> for Vec<Pose> {
    fn from(set: PoseSet) -> Self {
        set.poses
    }
}

impl<'a> IntoIterator for &'a PoseSet {
    type Item = &'a Pose;
    type IntoIter = std::slice::Iter<'a, Pose>;

    fn into_iter(self) -> Self::IntoIter {
        self.poses.iter()
    }
}

impl fmt::Display for PoseSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, pose) in self.poses.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "  #{}: {}", i, pose)?;
        }
        Ok(())
    }
}
