//! Ordered dispatch of lifecycle hooks.
//!
//! The registry calls each observer in registration order and times every
//! `*_begin` / `*_end` pair, writing `dt_step` / `dt_sim` into the run log before
//! the matching `*_end` hooks run. With no observers registered nothing is
//! timed and every call returns immediately.

use crate::error::SimError;
use formation_env::{Callback, Clock, Logs, RunLog, WallClock};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    SimBegin,
    StepBegin(usize),
    StepEnd(usize),
    SimEnd,
}

impl Event {
    fn name(self) -> &'static str {
        match self {
            Event::SimBegin => "on_sim_begin",
            Event::StepBegin(_) => "on_step_begin",
            Event::StepEnd(_) => "on_step_end",
            Event::SimEnd => "on_sim_end",
        }
    }

    fn step(self) -> Option<usize> {
        match self {
            Event::StepBegin(step) | Event::StepEnd(step) => Some(step),
            Event::SimBegin | Event::SimEnd => None,
        }
    }
}

/// Observers of one run, in registration order.
pub struct CallbackList<'a> {
    callbacks: Vec<&'a mut dyn Callback>,
    clock: Arc<dyn Clock>,
    t_sim_begin: Option<Duration>,
    t_step_begin: Option<Duration>,
}

impl<'a> CallbackList<'a> {
    /// Creates a registry timed by the wall clock.
    pub fn new(callbacks: Vec<&'a mut dyn Callback>) -> Self {
        Self::with_clock(callbacks, WallClock::shared())
    }

    /// Creates a registry timed by `clock`.
    pub fn with_clock(callbacks: Vec<&'a mut dyn Callback>, clock: Arc<dyn Clock>) -> Self {
        Self {
            callbacks,
            clock,
            t_sim_begin: None,
            t_step_begin: None,
        }
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Returns true if no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }

    /// Starts the run timer and calls every `on_sim_begin`.
    pub fn on_sim_begin(&mut self, log: &mut RunLog) -> Result<(), SimError> {
        if self.callbacks.is_empty() {
            return Ok(());
        }
        self.t_sim_begin = Some(self.clock.now());
        self.dispatch(Event::SimBegin, log.logs_mut())
    }

    /// Starts the step timer and calls every `on_step_begin`.
    pub fn on_step_begin(&mut self, step: usize, log: &mut RunLog) -> Result<(), SimError> {
        if self.callbacks.is_empty() {
            return Ok(());
        }
        self.t_step_begin = Some(self.clock.now());
        self.dispatch(Event::StepBegin(step), log.logs_mut())
    }

    /// Records `dt_step`, then calls every `on_step_end`.
    pub fn on_step_end(&mut self, step: usize, log: &mut RunLog) -> Result<(), SimError> {
        if self.callbacks.is_empty() {
            return Ok(());
        }
        let elapsed = self.elapsed_since(self.t_step_begin);
        log.record_dt_step(elapsed.as_secs_f64());
        self.dispatch(Event::StepEnd(step), log.logs_mut())
    }

    /// Records `dt_sim`, then calls every `on_sim_end`.
    pub fn on_sim_end(&mut self, log: &mut RunLog) -> Result<(), SimError> {
        if self.callbacks.is_empty() {
            return Ok(());
        }
        let elapsed = self.elapsed_since(self.t_sim_begin);
        log.record_dt_sim(elapsed.as_secs_f64());
        self.dispatch(Event::SimEnd, log.logs_mut())
    }

    fn elapsed_since(&self, begin: Option<Duration>) -> Duration {
        match begin {
            Some(t) => self.clock.now().saturating_sub(t),
            None => Duration::ZERO,
        }
    }

    fn dispatch(&mut self, event: Event, logs: &mut Logs) -> Result<(), SimError> {
        for callback in self.callbacks.iter_mut() {
            let result = match event {
                Event::SimBegin => callback.on_sim_begin(logs),
                Event::StepBegin(step) => callback.on_step_begin(step, logs),
                Event::StepEnd(step) => callback.on_step_end(step, logs),
                Event::SimEnd => callback.on_sim_end(logs),
            };
            result.map_err(|source| SimError::Hook {
                callback: callback.name().to_string(),
                event: event.name(),
                step: event.step(),
                source,
            })?;
        }
        Ok(())
    }
}
