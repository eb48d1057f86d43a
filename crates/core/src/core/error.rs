//! Setup-time error types.
//!
//! Nothing here is produced mid-trial: per-trial anomalies are clamped and
//! logged by the component that sees them.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no transitions configured")]
    EmptyTransitions,

    #[error("transition {from} -> {to} outside state range [0, {states})")]
    StateOutOfRange {
        from: usize,
        to: usize,
        states: usize,
    },

    #[error("transition {from} -> {to} has invalid probability {p}")]
    InvalidProbability { from: usize, to: usize, p: f64 },

    #[error("row {state} sums to {sum}, expected 1")]
    RowNotNormalized { state: usize, sum: f64 },

    #[error("start state {state} is also the terminal state")]
    StartIsTerminal { state: usize },

    #[error("state {state} is not terminal but has no outgoing transitions")]
    DeadEnd { state: usize },

    #[error("no corpus files given")]
    NoCorpusFiles,

    #[error("vocabulary is empty")]
    EmptyVocabulary,

    #[error("pattern table has no rows")]
    EmptyTable,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(String),
}

/// Every word that failed to resolve, collected into one value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown words: {}", .missing.join(", "))]
pub struct VocabularyError {
    pub missing: Vec<String>,
}

impl VocabularyError {
    /// `Some` only if at least one word is missing.
    pub fn from_missing(missing: Vec<String>) -> Option<Self> {
        if missing.is_empty() {
            None
        } else {
            Some(Self { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_error_names_every_word() {
        let e = VocabularyError::from_missing(vec!["zzz".into(), "qqq".into()]).unwrap();
        assert_eq!(e.to_string(), "unknown words: zzz, qqq");
        assert!(VocabularyError::from_missing(Vec::new()).is_none());
    }

    #[test]
    fn config_error_messages_carry_context() {
        let e = ConfigError::DeadEnd { state: 3 };
        assert!(e.to_string().contains('3'));
        let e = ConfigError::StateOutOfRange {
            from: 1,
            to: 9,
            states: 4,
        };
        assert!(e.to_string().contains("[0, 4)"));
    }
}
