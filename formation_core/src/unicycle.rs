//! Single-integrator to unicycle mapping.
//!
//! A virtual steering point is placed `projection_distance` ahead of the
//! robot along its heading. A desired planar velocity `(dx, dy)` for that
//! point becomes a unicycle input:
//!
//! ```text
//! v =  cos θ · dx + sin θ · dy
//! ω = (−sin θ · dx + cos θ · dy) / projection_distance,  clamped to ±limit
//! ```
//!
//! Forward speed `v` is not saturated.

use crate::error::{require_non_negative, require_positive, FormationError};
use crate::pose::{Pose, PoseSet, Velocity};
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;
use std::fmt;

/// Unicycle control input: forward speed and turn rate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UnicycleInput {
    /// Forward speed (m/s)
    pub v: f64,

    /// Angular rate (rad/s)
    pub omega: f64,
}

impl fmt::Display for UnicycleInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {:.3} m/s, ω: {:.3} rad/s)", self.v, self.omega)
    }
}

/// Converts desired planar velocities into unicycle inputs and back.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct UnicycleMapper {
    projection_distance: f64,
    angular_velocity_limit: f64,
}

impl UnicycleMapper {
    /// Creates a mapper.
    ///
    /// Fails if `projection_distance` is not finite and positive, or if
    /// `angular_velocity_limit` is negative or not finite.
    pub fn new(projection_distance: f64, angular_velocity_limit: f64) -> Result<Self, FormationError> {
        require_positive("projection_distance", projection_distance)?;
        require_non_negative("angular_velocity_limit", angular_velocity_limit)?;
        Ok(Self {
            projection_distance,
            angular_velocity_limit,
        })
    }

    /// Distance of the steering point ahead of the robot (m).
    pub fn projection_distance(&self) -> f64 {
        self.projection_distance
    }

    /// Maximum magnitude of the angular rate (rad/s).
    pub fn angular_velocity_limit(&self) -> f64 {
        self.angular_velocity_limit
    }

    /// Maps one desired velocity at `pose` to a unicycle input.
    pub fn to_unicycle(&self, velocity: &Velocity, pose: &Pose) -> UnicycleInput {
        let (s, c) = pose.theta.sin_cos();
        let v = c * velocity.x + s * velocity.y;
        let omega = (1.0 / self.projection_distance) * (-s * velocity.x + c * velocity.y);
        UnicycleInput {
            v,
            omega: omega.clamp(-self.angular_velocity_limit, self.angular_velocity_limit),
        }
    }

    /// Position of the steering point for `pose`.
    pub fn to_single_integrator(&self, pose: &Pose) -> Vector2<f64> {
        pose.position() + self.projection_distance * pose.heading()
    }

    /// Maps a whole fleet; `velocities` must line up with `poses`.
    pub fn map_fleet(
        &self,
        velocities: &[Velocity],
        poses: &PoseSet,
    ) -> Result<Vec<UnicycleInput>, FormationError> {
        if velocities.len() != poses.len() {
            return Err(FormationError::mismatch(
                "desired velocities",
                poses.len(),
                velocities.len(),
            ));
        }
        Ok(velocities
            .iter()
            .zip(poses)
            .map(|(v, pose)| self.to_unicycle(v, pose))
            .collect())
    }

    /// Steering-point positions for a whole fleet.
    pub fn to_single_integrator_states(&self, poses: &PoseSet) -> Vec<Vector2<f64>> {
        poses.iter().map(|p| self.to_single_integrator(p)).collect()
    }
}

impl Default for UnicycleMapper {
    fn default() -> Self {
        Self {
            projection_distance: 0.01,
            angular_velocity_limit: FRAC_PI_2,
        }
    }
}

#[derive(Deserialize)]
struct RawMapper {
    projection_distance: f64,
    angular_velocity_limit: f64,
}

impl<'de> Deserialize<'de> for UnicycleMapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawMapper::deserialize(deserializer)?;
        UnicycleMapper::new(raw.projection_distance, raw.angular_velocity_limit)
            .map_err(serde::de::Error::custom)
    }
}

/// How desired planar velocities move the robots.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum DynamicsModel {
    /// Route through the unicycle mapper (heading-dependent motion)
    Unicycle(UnicycleMapper),

    /// Integrate planar velocity directly; heading is left unchanged
    SingleIntegrator,
}

impl DynamicsModel {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            DynamicsModel::Unicycle(_) => "unicycle",
            DynamicsModel::SingleIntegrator => "single_integrator",
        }
    }
}

impl Default for DynamicsModel {
    fn default() -> Self {
        DynamicsModel::Unicycle(UnicycleMapper::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_rejects_zero_projection_distance() {
        assert!(matches!(
            UnicycleMapper::new(0.0, 1.0),
            Err(FormationError::InvalidConfig { field: "projection_distance", .. })
        ));
        assert!(UnicycleMapper::new(-0.1, 1.0).is_err());
        assert!(UnicycleMapper::new(f64::NAN, 1.0).is_err());
        assert!(UnicycleMapper::new(0.1, -1.0).is_err());
        assert!(UnicycleMapper::new(0.1, 0.0).is_ok());
    }

    #[test]
    fn test_aligned_velocity_is_pure_forward() {
        let mapper = UnicycleMapper::new(0.1, PI).unwrap();
        let input = mapper.to_unicycle(&Velocity::new(2.0, 0.0), &Pose::at(0.0, 0.0));
        assert_eq!(input.v, 2.0);
        assert_eq!(input.omega, 0.0);
    }

    #[test]
    fn test_projection_formula() {
        let mapper = UnicycleMapper::new(0.5, 100.0).unwrap();
        let pose = Pose::new(0.0, 0.0, PI / 6.0);
        let input = mapper.to_unicycle(&Velocity::new(1.0, 2.0), &pose);

        let (s, c) = (PI / 6.0).sin_cos();
        assert_relative_eq!(input.v, c + 2.0 * s, epsilon = 1e-12);
        assert_relative_eq!(input.omega, (-s + 2.0 * c) / 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_angular_saturation_preserves_sign() {
        let limit = FRAC_PI_2;
        let mapper = UnicycleMapper::new(0.01, limit).unwrap();
        let pose = Pose::at(0.0, 0.0);

        let left = mapper.to_unicycle(&Velocity::new(0.0, 1.0), &pose);
        assert_eq!(left.omega, limit);

        let right = mapper.to_unicycle(&Velocity::new(0.0, -1.0), &pose);
        assert_eq!(right.omega, -limit);
    }

    #[test]
    fn test_zero_limit_disables_turning() {
        let mapper = UnicycleMapper::new(0.1, 0.0).unwrap();
        let input = mapper.to_unicycle(&Velocity::new(0.3, 5.0), &Pose::at(1.0, 1.0));
        assert_eq!(input.omega, 0.0);
        assert_eq!(input.v, 0.3);
    }

    #[test]
    fn test_forward_speed_unbounded() {
        let mapper = UnicycleMapper::default();
        let input = mapper.to_unicycle(&Velocity::new(1e6, 0.0), &Pose::at(0.0, 0.0));
        assert_eq!(input.v, 1e6);
    }

    #[test]
    fn test_single_integrator_state() {
        let mapper = UnicycleMapper::new(0.2, PI).unwrap();
        let point = mapper.to_single_integrator(&Pose::new(1.0, 2.0, PI / 2.0));
        assert_relative_eq!(point.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(point.y, 2.2, epsilon = 1e-12);
    }

    #[test]
    fn test_map_fleet_dimension_mismatch() {
        let mapper = UnicycleMapper::default();
        let poses = PoseSet::from_positions(&[(0.0, 0.0), (1.0, 1.0)]);
        let result = mapper.map_fleet(&[Velocity::zeros()], &poses);
        assert_eq!(
            result,
            Err(FormationError::mismatch("desired velocities", 2, 1))
        );
    }

    #[test]
    fn test_dynamics_model_serde() {
        let json = serde_json::to_string(&DynamicsModel::SingleIntegrator).unwrap();
        assert_eq!(json, r#"{"model":"single_integrator"}"#);

        let parsed: DynamicsModel = serde_json::from_str(
            r#"{"model":"unicycle","projection_distance":0.05,"angular_velocity_limit":1.0}"#,
        )
        .unwrap();
        assert_eq!(parsed, DynamicsModel::Unicycle(UnicycleMapper::new(0.05, 1.0).unwrap()));

        let invalid = serde_json::from_str::<DynamicsModel>(
            r#"{"model":"unicycle","projection_distance":0.0,"angular_velocity_limit":1.0}"#,
        );
        assert!(invalid.is_err());
    }
}
