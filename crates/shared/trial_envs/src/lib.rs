//! Concrete environments for `trialsim`.
//!
//! Each environment owns its counters and orderings and is stepped through
//! the common [`trialsim::env::Env`] interface. [`ActiveEnv`] selects one at
//! runtime.

pub mod active;
pub mod corpus;
pub mod fsa;
pub mod stats;
pub mod table;

pub use active::ActiveEnv;
pub use corpus::CorpusEnv;
pub use fsa::FsaEnv;
pub use stats::{CategoryTally, EpochMemStats, RecallHistory};
pub use table::{AbAcParams, AbAcTables, TableEnv, TableRow};
