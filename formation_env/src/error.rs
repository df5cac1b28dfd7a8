//! Error types for lifecycle observers.

use thiserror::Error;

/// Errors raised by a lifecycle hook.
///
/// A hook error aborts the run that dispatched it.
#[derive(Debug, Error)]
pub enum HookError {
    /// The observer could not handle the event
    #[error("Hook `{hook}` failed: {reason}")]
    Failed {
        hook: &'static str,
        reason: String,
    },

    /// Output for the observer could not be written
    #[error("Observer I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HookError {
    /// Creates a hook failure.
    pub fn failed(hook: &'static str, reason: impl Into<String>) -> Self {
        Self::Failed {
            hook,
            reason: reason.into(),
        }
    }

    /// Name of the hook that failed, when known.
    pub fn hook(&self) -> Option<&'static str> {
        match self {
            Self::Failed { hook, .. } => Some(*hook),
            Self::Io(_) => None,
        }
    }
}
