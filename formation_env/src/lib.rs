//! Formation Environment Abstraction Layer
//!
//! This crate defines how the outside world watches a formation run without
//! the simulation knowing who is watching:
//! - Lifecycle hooks (`on_sim_begin`, `on_step_begin`, `on_step_end`, `on_sim_end`)
//! - The shared [`Logs`] handed to each hook, and the [`RunLog`] its owner
//!   writes through
//! - The [`Clock`] used to time hooks and pace real-time observers
//!
//! # Example
//!
//! ```ignore
//! use formation_env::{Callback, HookError, Logs};
//!
//! struct PrintSpread;
//!
//! impl Callback for PrintSpread {
//!     fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
//!         println!("step {}: spread {:.3}", step, logs.poses().spread());
//!         Ok(())
//!     }
//! }
//! ```

mod callback;
mod clock;
mod error;
mod logs;

pub use callback::Callback;
pub use clock::{Clock, WallClock};
pub use error::HookError;
pub use logs::{Logs, RunLog};
