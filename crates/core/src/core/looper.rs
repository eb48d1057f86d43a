//! Nested run / epoch / trial loop over an [`Env`].
//!
//! Execution is synchronous: one trial is stepped, handed to the hooks, and
//! finished before the next begins. The stop flag is only checked between
//! trials, so cancellation never splits a trial.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::counter::TimeScale;
use crate::env::Env;
use crate::prng::Prng;

/// Cooperative stop request, shareable with another thread (e.g. a signal
/// handler or UI).
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Callbacks invoked by [`Looper`].
pub trait LoopHooks<E: Env> {
    /// Called once per trial, after `Env::step`.
    fn trial(&mut self, env: &E);

    /// Called after the last trial of each epoch, with the run's random
    /// stream so test passes draw from it too. `Break` ends the run early.
    fn epoch_end(&mut self, _run: i32, _epoch: i32, _env: &E, _rng: &mut Prng) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn run_end(&mut self, _run: i32, _env: &E) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochOutcome {
    /// The epoch counter advanced after `trials` trials.
    Completed { trials: usize },
    /// The stop flag was raised after `trials` trials.
    Stopped { trials: usize },
    /// The environment had nothing to present.
    Empty,
    /// The environment keeps no `Epoch` counter, so no epoch can end.
    NoEpochCounter,
}

#[derive(Debug)]
pub struct Looper {
    pub runs: i32,
    pub epochs: i32,
    stop: StopFlag,
    // The step that crossed an epoch boundary belongs to the next epoch.
    pending: bool,
}

impl Looper {
    pub fn new(runs: i32, epochs: i32) -> Self {
        Self {
            runs: runs.max(1),
            epochs: epochs.max(1),
            stop: StopFlag::new(),
            pending: false,
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    /// Forget a held-over boundary trial (call after `Env::init`).
    pub fn reset(&mut self) {
        self.pending = false;
    }

    /// Step `env` until its epoch counter changes.
    pub fn run_epoch<E, H>(&mut self, env: &mut E, rng: &mut Prng, hooks: &mut H) -> EpochOutcome
    where
        E: Env,
        H: LoopHooks<E>,
    {
        if env.counter(TimeScale::Epoch).is_none() {
            return EpochOutcome::NoEpochCounter;
        }
        let mut trials = 0usize;
        loop {
            if self.stop.is_set() {
                return EpochOutcome::Stopped { trials };
            }
            if self.pending {
                self.pending = false;
            } else {
                if !env.step(rng) {
                    return EpochOutcome::Empty;
                }
                let epoch_changed = env
                    .counter(TimeScale::Epoch)
                    .is_some_and(|c| c.changed);
                if trials > 0 && epoch_changed {
                    self.pending = true;
                    return EpochOutcome::Completed { trials };
                }
            }
            hooks.trial(env);
            trials += 1;
        }
    }

    /// Run every configured run and epoch. Returns `false` if stopped early
    /// by the stop flag.
    pub fn run_all<E, H>(&mut self, env: &mut E, rng: &mut Prng, hooks: &mut H) -> bool
    where
        E: Env,
        H: LoopHooks<E>,
    {
        for run in 0..self.runs {
            env.init(run, rng);
            self.reset();
            tracing::info!(env = env.name(), run, "run start");
            for epoch in 0..self.epochs {
                match self.run_epoch(env, rng, hooks) {
                    EpochOutcome::Completed { trials } => {
                        tracing::info!(run, epoch, trials, "epoch done");
                        if hooks.epoch_end(run, epoch, env, rng).is_break() {
                            break;
                        }
                    }
                    EpochOutcome::Stopped { trials } => {
                        tracing::info!(run, epoch, trials, "stop requested");
                        hooks.run_end(run, env);
                        return false;
                    }
                    EpochOutcome::Empty => {
                        tracing::warn!(env = env.name(), "environment has no items");
                        break;
                    }
                    EpochOutcome::NoEpochCounter => {
                        tracing::error!(env = env.name(), "environment has no epoch counter");
                        break;
                    }
                }
            }
            hooks.run_end(run, env);
        }
        true
    }
}
