//! Formation Simulation Harness
//!
//! This crate runs a fleet of planar robots through discrete time steps:
//! a controller proposes planar velocities, the dynamics model turns them
//! into motion, and observers watch through four lifecycle hooks.
//!
//! # Core Principle: Deterministic Replay
//!
//! - **Numerics**: plain IEEE doubles, forward Euler, no randomness in a run
//! - **Scenarios**: randomized fleets come from a single 64-bit seed
//! - **Time**: hook timing goes through a [`Clock`](formation_env::Clock);
//!   tests use [`ManualClock`] for exact values
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        Simulation                            │
//! │                                                              │
//! │  PoseSet ──► Controller ──► DynamicsModel ──► Euler + wrap θ │
//! │     ▲                                              │         │
//! │     └──────────────────────────────────────────────┘         │
//! │                         │                                    │
//! │                  History + Logs                              │
//! │                         │                                    │
//! │  ┌──────────────────────▼──────────────────────────┐         │
//! │  │ CallbackList (registration order, dt timing)    │         │
//! │  └─────┬───────────┬──────────────┬────────────┬───┘         │
//! │    Tracing     Metrics     TerminalRenderer   Rerun          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use formation_core::{ConsensusController, PoseSet};
//! use formation_sim::run;
//!
//! let poses = PoseSet::from_positions(&[(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)]);
//! let history = run(100, &ConsensusController::new(0.25), &poses, 0.1, Vec::new(), 0)?;
//! assert_eq!(history.len(), 101);
//! ```

mod context;
mod engine;
mod error;
mod history;
mod metrics;
mod registry;
#[cfg(feature = "dashboard")]
mod render;
mod runner;
pub mod scenarios;
mod trace;
mod visualizer;

pub use context::ManualClock;
pub use engine::{run, SimConfig, SimState, Simulation, Verbosity};
pub use error::SimError;
pub use history::History;
pub use metrics::{MetricsObserver, RunMetrics};
pub use registry::CallbackList;
#[cfg(feature = "dashboard")]
pub use render::{StdoutRenderer, TerminalRenderer};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use trace::TracingObserver;
pub use visualizer::RerunObserver;
