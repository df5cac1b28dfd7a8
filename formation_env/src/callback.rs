//! Lifecycle observer interface.

use crate::error::HookError;
use crate::logs::Logs;

/// Observer of simulation lifecycle events.
///
/// Every hook is optional and defaults to a no-op. Hooks are called
/// synchronously, in registration order, exactly once per event. Returning
/// an error aborts the run.
///
/// # Event order
///
/// ```text
/// on_sim_begin
///   on_step_begin(0)  on_step_end(0)
///   on_step_begin(1)  on_step_end(1)
///   ...
/// on_sim_end
/// ```
///
/// Rendering, logging, and metrics are all implemented against this trait;
/// the engine never inspects the concrete observer type.
pub trait Callback {
    /// Called once before the first step, with `poses == initial_poses`.
    fn on_sim_begin(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        let _ = logs;
        Ok(())
    }

    /// Called before step `step` queries the controller.
    fn on_step_begin(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
        let _ = (step, logs);
        Ok(())
    }

    /// Called after step `step` has been integrated and recorded.
    ///
    /// `logs.dt_step()` holds the wall-clock duration of this step.
    fn on_step_end(&mut self, step: usize, logs: &mut Logs) -> Result<(), HookError> {
        let _ = (step, logs);
        Ok(())
    }

    /// Called once after the last step; `logs.dt_sim()` holds the run time.
    fn on_sim_end(&mut self, logs: &mut Logs) -> Result<(), HookError> {
        let _ = logs;
        Ok(())
    }

    /// Short name used in logs and error reports.
    fn name(&self) -> &str {
        "callback"
    }
}
