//! Error types for simulation runs.

use crate::engine::SimState;
use formation_core::FormationError;
use formation_env::HookError;
use thiserror::Error;

/// Errors that abort a simulation run.
///
/// A run either returns a complete history or one of these; partial
/// histories are never returned.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration rejected before any step executed
    #[error("Invalid simulation configuration: {0}")]
    Config(#[source] FormationError),

    /// Controller or dynamics failure at a given step
    #[error("Step {step} failed: {source}")]
    Step {
        step: usize,
        #[source]
        source: FormationError,
    },

    /// A lifecycle observer returned an error
    #[error("Callback `{callback}` failed in {event}: {source}")]
    Hook {
        callback: String,
        event: &'static str,
        step: Option<usize>,
        #[source]
        source: HookError,
    },

    /// `run` was called on a simulation that is not in `NotStarted`
    #[error("Simulation cannot run from state {0:?}")]
    InvalidState(SimState),

    /// Scenario setup failed
    #[error("Scenario error: {0}")]
    Scenario(String),
}

impl SimError {
    /// Step index at which the run aborted, if it aborted inside a step.
    pub fn step(&self) -> Option<usize> {
        match self {
            SimError::Step { step, .. } => Some(*step),
            SimError::Hook { step, .. } => *step,
            _ => None,
        }
    }
}

impl From<FormationError> for SimError {
    fn from(err: FormationError) -> Self {
        SimError::Config(err)
    }
}
