//! Pattern-completion recall scoring.
//!
//! Each trial compares three equal-length vectors:
//! - `target`: the full pattern that should end up represented,
//! - `actual`: what the network produced,
//! - `cue`: what was given as input (a subset of `target` at test).
//!
//! Test scoring counts completion misses only over target units that were
//! absent from the cue. Training scoring has no cue and counts misses over
//! every target-on unit. The two rates are not comparable and must not be
//! mixed in one aggregate.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const DEFAULT_ACT_THRESHOLD: f32 = 0.5;
pub const DEFAULT_MEM_THRESHOLD: f32 = 0.34;

/// Which list a trial belongs to, from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemCategory {
    /// First paired-associate list ("ab").
    FirstList,
    /// Second, interfering list ("ac").
    SecondList,
    /// Novel items never trained ("lure").
    Lure,
    Other,
}

impl MemCategory {
    /// Case-insensitive match on the alphabetic tokens of the trial name
    /// (`ab_3`, `AC-12`, `lure_ab_0`). Whole tokens only, so `table_3` or
    /// `lab` stay `Other`. "lure" wins over the list tags.
    pub fn from_trial_name(name: &str) -> Self {
        let tokens: Vec<String> = name
            .split(|c: char| !c.is_ascii_alphabetic())
            .filter(|t| !t.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        let has = |tag: &str| tokens.iter().any(|t| t == tag);
        if has("lure") {
            MemCategory::Lure
        } else if has("ab") {
            MemCategory::FirstList
        } else if has("ac") {
            MemCategory::SecondList
        } else {
            MemCategory::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MemCategory::FirstList => "AB",
            MemCategory::SecondList => "AC",
            MemCategory::Lure => "Lure",
            MemCategory::Other => "Other",
        }
    }

    pub const ALL: [MemCategory; 4] = [
        MemCategory::FirstList,
        MemCategory::SecondList,
        MemCategory::Lure,
        MemCategory::Other,
    ];
}

impl fmt::Display for MemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ScoreMode {
    Train,
    Test,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryStat {
    pub mode: ScoreMode,
    pub category: MemCategory,
    pub target_on: usize,
    pub target_off: usize,
    /// Target-on units absent from the cue. Equals `target_on` in training.
    pub to_complete: usize,
    pub completion_misses: usize,
    pub confabulations: usize,
    pub completion_miss_rate: f32,
    pub confabulation_rate: f32,
    pub recalled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MemoryScorer {
    /// Unit counts as on when strictly above this.
    pub act_threshold: f32,
    /// Both rates must be strictly below this for a trial to count as recalled.
    pub mem_threshold: f32,
}

impl Default for MemoryScorer {
    fn default() -> Self {
        Self {
            act_threshold: DEFAULT_ACT_THRESHOLD,
            mem_threshold: DEFAULT_MEM_THRESHOLD,
        }
    }
}

#[inline]
fn rate(n: usize, d: usize) -> f32 {
    if d == 0 {
        0.0
    } else {
        n as f32 / d as f32
    }
}

impl MemoryScorer {
    pub fn new(act_threshold: f32, mem_threshold: f32) -> Self {
        Self {
            act_threshold,
            mem_threshold,
        }
    }

    /// Score a test trial. Only target-on units missing from `cue` count
    /// toward the completion-miss rate. With nothing to complete the rate is
    /// 0 and the verdict rests on confabulation alone.
    ///
    /// Vectors of unequal length are scored over their common prefix.
    pub fn score_test(&self, name: &str, target: &[f32], actual: &[f32], cue: &[f32]) -> MemoryStat {
        self.score(ScoreMode::Test, name, target, actual, Some(cue))
    }

    /// Score a training trial: misses are counted over all target-on units.
    pub fn score_train(&self, name: &str, target: &[f32], actual: &[f32]) -> MemoryStat {
        self.score(ScoreMode::Train, name, target, actual, None)
    }

    fn score(
        &self,
        mode: ScoreMode,
        name: &str,
        target: &[f32],
        actual: &[f32],
        cue: Option<&[f32]>,
    ) -> MemoryStat {
        let thr = self.act_threshold;
        let n = match cue {
            Some(c) => target.len().min(actual.len()).min(c.len()),
            None => target.len().min(actual.len()),
        };
        if target.len() != actual.len() || cue.is_some_and(|c| c.len() != target.len()) {
            tracing::warn!(
                target = target.len(),
                actual = actual.len(),
                cue = cue.map(<[f32]>::len),
                "memory scoring on mismatched lengths"
            );
        }

        let mut target_on = 0;
        let mut target_off = 0;
        let mut to_complete = 0;
        let mut all_misses = 0;
        let mut cmp_misses = 0;
        let mut confabulations = 0;

        for i in 0..n {
            let out_on = actual[i] > thr;
            if target[i] > thr {
                target_on += 1;
                let cued = cue.is_some_and(|c| c[i] > thr);
                if !out_on {
                    all_misses += 1;
                }
                if !cued {
                    to_complete += 1;
                    if !out_on {
                        cmp_misses += 1;
                    }
                }
            } else {
                target_off += 1;
                if out_on {
                    confabulations += 1;
                }
            }
        }

        let (completion_misses, denom) = match mode {
            ScoreMode::Train => (all_misses, target_on),
            ScoreMode::Test => (cmp_misses, to_complete),
        };
        let completion_miss_rate = rate(completion_misses, denom);
        let confabulation_rate = rate(confabulations, target_off);
        let recalled =
            completion_miss_rate < self.mem_threshold && confabulation_rate < self.mem_threshold;

        MemoryStat {
            mode,
            category: MemCategory::from_trial_name(name),
            target_on,
            target_off,
            to_complete: if mode == ScoreMode::Train { target_on } else { to_complete },
            completion_misses,
            confabulations,
            completion_miss_rate,
            confabulation_rate,
            recalled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(n: usize, on: &[usize]) -> Vec<f32> {
        let mut v = vec![0.0; n];
        for &i in on {
            v[i] = 1.0;
        }
        v
    }

    #[test]
    fn missing_completion_fails_recall() {
        let s = MemoryScorer::default();
        let target = pattern(8, &[0, 1, 2, 5]);
        let cue = pattern(8, &[0, 5]);
        let actual = pattern(8, &[0, 5]);
        let m = s.score_test("ab_0", &target, &actual, &cue);
        assert_eq!(m.to_complete, 2);
        assert_eq!(m.completion_misses, 2);
        assert_eq!(m.completion_miss_rate, 1.0);
        assert_eq!(m.confabulation_rate, 0.0);
        assert!(!m.recalled);
    }

    #[test]
    fn exact_completion_is_recalled() {
        let s = MemoryScorer::default();
        let target = pattern(8, &[0, 1, 2, 5]);
        let cue = pattern(8, &[0, 5]);
        let m = s.score_test("ab_0", &target, &target, &cue);
        assert_eq!(m.completion_miss_rate, 0.0);
        assert_eq!(m.confabulation_rate, 0.0);
        assert!(m.recalled);
    }

    #[test]
    fn training_rate_counts_all_target_units() {
        let s = MemoryScorer::default();
        let target = pattern(8, &[0, 1, 2, 5]);
        let cue = pattern(8, &[0, 5]);
        let actual = pattern(8, &[0, 5]);
        let train = s.score_train("ab_0", &target, &actual);
        let test = s.score_test("ab_0", &target, &actual, &cue);
        assert_eq!(train.to_complete, 4);
        assert_eq!(train.completion_miss_rate, 0.5);
        assert_ne!(train.completion_miss_rate, test.completion_miss_rate);
        assert!(!train.recalled);
    }

    #[test]
    fn confabulation_counts_target_off_units() {
        let s = MemoryScorer::default();
        let target = pattern(10, &[0, 1]);
        let cue = pattern(10, &[0]);
        // 3 of 8 off-units wrongly on: 0.375 >= 0.34.
        let actual = pattern(10, &[0, 1, 4, 6, 8]);
        let m = s.score_test("ac_1", &target, &actual, &cue);
        assert_eq!(m.confabulations, 3);
        assert!((m.confabulation_rate - 0.375).abs() < 1e-6);
        assert_eq!(m.completion_miss_rate, 0.0);
        assert!(!m.recalled);
        assert_eq!(m.category, MemCategory::SecondList);

        // 2 of 8: 0.25 < 0.34.
        let actual = pattern(10, &[0, 1, 4, 6]);
        assert!(s.score_test("ac_1", &target, &actual, &cue).recalled);
    }

    #[test]
    fn thresholds_are_strict() {
        let s = MemoryScorer::new(0.5, 0.5);
        let target = pattern(4, &[0, 1]);
        let cue = pattern(4, &[]);
        // Exactly 0.5 miss rate is not below 0.5.
        let m = s.score_test("x", &target, &pattern(4, &[0]), &cue);
        assert_eq!(m.completion_miss_rate, 0.5);
        assert!(!m.recalled);
        // An activation of exactly the threshold is off.
        let m = s.score_test("x", &target, &[0.5, 0.5, 0.0, 0.0], &cue);
        assert_eq!(m.completion_misses, 2);
    }

    #[test]
    fn empty_denominators_give_zero_rates() {
        let s = MemoryScorer::default();
        let target = pattern(3, &[0, 1, 2]);
        let m = s.score_test("lure_2", &target, &target, &target);
        assert_eq!(m.to_complete, 0);
        assert_eq!(m.target_off, 0);
        assert_eq!(m.completion_miss_rate, 0.0);
        assert_eq!(m.confabulation_rate, 0.0);
        assert!(m.recalled);
        assert_eq!(m.category, MemCategory::Lure);

        let empty: [f32; 0] = [];
        let m = s.score_train("", &empty, &empty);
        assert_eq!(m.completion_miss_rate, 0.0);
    }

    #[test]
    fn category_from_name() {
        assert_eq!(MemCategory::from_trial_name("AB_12"), MemCategory::FirstList);
        assert_eq!(MemCategory::from_trial_name("ac_3"), MemCategory::SecondList);
        assert_eq!(MemCategory::from_trial_name("Lure_ab_3"), MemCategory::Lure);
        assert_eq!(MemCategory::from_trial_name("trial_7"), MemCategory::Other);
        assert_eq!(MemCategory::from_trial_name("ab3"), MemCategory::FirstList);
    }

    #[test]
    fn category_ignores_tags_inside_words() {
        for name in ["table_3", "lab", "Abacus", "react_1", "allure", "cab ac"] {
            let want = if name == "cab ac" {
                MemCategory::SecondList
            } else {
                MemCategory::Other
            };
            assert_eq!(MemCategory::from_trial_name(name), want, "{name}");
        }
    }
}
