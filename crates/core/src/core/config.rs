//! JSON experiment configuration.
//!
//! Missing fields fall back to the defaults below, so a config can be as
//! small as `{"env": {"type": "fsa"}}`.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::grammar::{RowPolicy, TransitionModel, TransitionSpec};
use crate::memory::{MemoryScorer, DEFAULT_ACT_THRESHOLD, DEFAULT_MEM_THRESHOLD};

fn default_seed() -> u64 {
    1
}

fn default_runs() -> i32 {
    1
}

fn default_epochs() -> i32 {
    10
}

fn default_act_threshold() -> f32 {
    DEFAULT_ACT_THRESHOLD
}

fn default_mem_threshold() -> f32 {
    DEFAULT_MEM_THRESHOLD
}

fn default_sequences_per_epoch() -> i32 {
    25
}

fn default_max_sequence_len() -> usize {
    50
}

fn default_list_size() -> usize {
    10
}

fn default_pattern_size() -> usize {
    48
}

fn default_active() -> usize {
    6
}

fn default_lures() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_runs")]
    pub runs: i32,
    #[serde(default = "default_epochs")]
    pub epochs: i32,
    /// Present items in index order instead of the per-epoch permutation.
    /// Random draws are identical either way.
    #[serde(default)]
    pub sequential: bool,
    #[serde(default = "default_act_threshold")]
    pub act_threshold: f32,
    #[serde(default = "default_mem_threshold")]
    pub mem_threshold: f32,
    /// End a run at the first epoch where every scored trial was recalled.
    #[serde(default)]
    pub stop_after_recall: bool,
    pub env: EnvConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvConfig {
    Corpus {
        #[serde(default)]
        files: Vec<PathBuf>,
        /// Inline paragraphs, appended after the files.
        #[serde(default)]
        paragraphs: Vec<String>,
        #[serde(default)]
        vocab: VocabSource,
    },
    Fsa {
        #[serde(default)]
        grammar: GrammarSource,
        #[serde(default = "default_sequences_per_epoch")]
        sequences_per_epoch: i32,
        #[serde(default = "default_max_sequence_len")]
        max_sequence_len: usize,
    },
    Table {
        #[serde(default = "default_list_size")]
        list_size: usize,
        #[serde(default = "default_pattern_size")]
        pattern_size: usize,
        #[serde(default = "default_active")]
        active: usize,
        #[serde(default = "default_lures")]
        lures: usize,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabSource {
    /// Every word in the corpus, sorted.
    #[default]
    Scan,
    /// A fixed word list, in the given order.
    List(Vec<String>),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarSource {
    #[default]
    Reber,
    Custom {
        states: usize,
        #[serde(default)]
        start: usize,
        terminal: usize,
        transitions: Vec<TransitionSpec>,
        #[serde(default)]
        policy: RowPolicy,
    },
}

impl GrammarSource {
    pub fn build(&self) -> Result<TransitionModel, ConfigError> {
        match self {
            GrammarSource::Reber => Ok(TransitionModel::reber()),
            GrammarSource::Custom {
                states,
                start,
                terminal,
                transitions,
                policy,
            } => TransitionModel::from_transitions(*states, *start, *terminal, transitions, *policy),
        }
    }
}

impl ExperimentConfig {
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.runs < 1 || self.epochs < 1 {
            return Err(ConfigError::Parse(format!(
                "runs and epochs must be >= 1 (got runs={}, epochs={})",
                self.runs, self.epochs
            )));
        }
        match &self.env {
            EnvConfig::Corpus {
                files, paragraphs, ..
            } if files.is_empty() && paragraphs.is_empty() => Err(ConfigError::NoCorpusFiles),
            EnvConfig::Fsa { grammar, .. } => grammar.build().map(|_| ()),
            EnvConfig::Table {
                list_size,
                pattern_size,
                active,
                ..
            } if *list_size == 0 || *pattern_size == 0 || *active == 0 => Err(ConfigError::EmptyTable),
            _ => Ok(()),
        }
    }

    pub fn scorer(&self) -> MemoryScorer {
        MemoryScorer::new(self.act_threshold, self.mem_threshold)
    }
}
