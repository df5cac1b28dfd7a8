//! Formation Core - fleet kinematics and distributed control laws
//!
//! Pure math, no I/O:
//! 1. **Poses**: planar `(x, y, θ)` with θ kept in `(-π, π]`
//! 2. **Control**: stateless controllers, consensus over an explicit sensing graph
//! 3. **Dynamics**: single-integrator to unicycle mapping with angular saturation
//! 4. **Perception glue**: bounding box to bearing angle conversion

pub mod bearing;
pub mod controller;
pub mod error;
pub mod pose;
pub mod topology;
pub mod unicycle;

// Re-export key types for convenience
pub use bearing::{parse_labels, BearingConverter, LabelBox, DEFAULT_HORIZONTAL_FOV_DEG};
pub use controller::{consensus, ConsensusController, Controller, LinearDecayController};
pub use error::FormationError;
pub use pose::{normalize_heading, wrap_angle, Pose, PoseSet, Velocity};
pub use topology::{Adjacency, Topology};
pub use unicycle::{DynamicsModel, UnicycleInput, UnicycleMapper};
