//! The environment role shared by every task.
//!
//! A driver calls [`Env::init`] once per run and [`Env::step`] once per
//! trial, then pulls named tensors with [`Env::state`] and applies them to the
//! matching network layers. That pull is the only coupling to the network.

use crate::counter::{CounterState, TimeScale};
use crate::prng::Prng;
use crate::tensor::Tensor;

/// Element names shared by the built-in environments.
pub mod elements {
    pub const INPUT: &str = "Input";
    pub const OUTPUT: &str = "Output";
    pub const TARGET: &str = "Target";
}

pub trait Env {
    fn name(&self) -> &str;

    /// Reset every counter and draw fresh orderings for run `run`.
    fn init(&mut self, run: i32, rng: &mut Prng);

    /// Advance one trial. Returns `false` if the environment has nothing to
    /// present (e.g. an empty item list); counters are left untouched then.
    fn step(&mut self, rng: &mut Prng) -> bool;

    /// Current buffer for a named element, if this environment has one.
    fn state(&self, element: &str) -> Option<&Tensor>;

    /// Counter state at `scale`, or `None` if the environment does not keep
    /// that scale. `TimeScale::Epoch` is required: the looper ends an epoch
    /// when it reports `changed`, and refuses environments without one.
    fn counter(&self, scale: TimeScale) -> Option<CounterState>;

    /// Human-readable name of the current trial for logs.
    fn label(&self) -> String;
}
