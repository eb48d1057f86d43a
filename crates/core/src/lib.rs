//! # trialsim
//!
//! Trial sequencing and recall scoring for small neural-network teaching
//! simulations.
//!
//! The network itself is external. This crate owns everything around it:
//! nested run/epoch/trial counters, reproducible trial orderings,
//! grammar-driven symbol sequences, corpus vocabularies with multi-hot
//! encoding, and pattern-completion recall scoring.
//!
//! ## Quick Start
//!
//! ```
//! use trialsim::prelude::*;
//!
//! let mut rng = Prng::new(42);
//! let mut gen = SequenceGenerator::new(TransitionModel::reber());
//! let seq = gen.generate_sequence(&mut rng, 100);
//! assert!(seq.last().unwrap().terminal);
//!
//! let scorer = MemoryScorer::default();
//! let target = [1.0, 1.0, 0.0, 0.0];
//! let cue = [1.0, 0.0, 0.0, 0.0];
//! let stat = scorer.score_test("ab_0", &target, &target, &cue);
//! assert!(stat.recalled);
//! ```
//!
//! ## Determinism
//!
//! All sampling goes through one [`prng::Prng`] owned by the experiment run.
//! Components draw the same number of values whatever the presentation flags,
//! so a run with `sequential = true` and one with `sequential = false` stay in
//! lockstep on the random stream.
//!
//! ## Feature Flags
//!
//! - `serde` (default): serialization for data types and the JSON
//!   [`config`] module.
//!
//! ## Modules
//!
//! - [`counter`]: time-scale counters with carry
//! - [`order`]: per-epoch permutations
//! - [`grammar`]: probabilistic finite-state grammars
//! - [`vocab`]: corpus paragraphs and vocabularies
//! - [`memory`]: recall scoring
//! - [`env`]: the environment interface
//! - [`looper`]: nested experiment loop

#[path = "core/prng.rs"]
pub mod prng;

#[path = "core/counter.rs"]
pub mod counter;

#[path = "core/order.rs"]
pub mod order;

#[path = "core/error.rs"]
pub mod error;

#[path = "core/grammar.rs"]
pub mod grammar;

#[path = "core/vocab.rs"]
pub mod vocab;

#[path = "core/memory.rs"]
pub mod memory;

#[path = "core/tensor.rs"]
pub mod tensor;

#[path = "core/env.rs"]
pub mod env;

#[path = "core/looper.rs"]
pub mod looper;

#[cfg(feature = "serde")]
#[path = "core/config.rs"]
pub mod config;

/// Prelude module for convenient imports.
///
/// ```
/// use trialsim::prelude::*;
/// ```
pub mod prelude {
    pub use crate::counter::{Counter, CounterState, TimeScale};
    pub use crate::env::{elements, Env};
    pub use crate::error::{ConfigError, VocabularyError};
    pub use crate::grammar::{
        Alternative, RowPolicy, SequenceGenerator, Transition, TransitionModel, TransitionSpec,
    };
    pub use crate::looper::{EpochOutcome, LoopHooks, Looper, StopFlag};
    pub use crate::memory::{MemCategory, MemoryScorer, MemoryStat, ScoreMode};
    pub use crate::order::Order;
    pub use crate::prng::Prng;
    pub use crate::tensor::Tensor;
    pub use crate::vocab::{parse_paragraphs, read_corpus, Paragraph, Vocabulary};
}
