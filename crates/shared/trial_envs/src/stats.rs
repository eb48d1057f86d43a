use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use trialsim::memory::{MemCategory, MemoryStat};

/// Per-category recall tallies for one epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryTally {
    pub trials: u32,
    pub recalled: u32,
}

impl CategoryTally {
    pub fn rate(&self) -> Option<f32> {
        if self.trials == 0 {
            None
        } else {
            Some(self.recalled as f32 / self.trials as f32)
        }
    }
}

/// Accumulates [`MemoryStat`]s over one epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EpochMemStats {
    pub by_category: BTreeMap<MemCategory, CategoryTally>,
    pub trials: u32,
    pub completion_miss_sum: f32,
    pub confabulation_sum: f32,
}

impl EpochMemStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, stat: &MemoryStat) {
        let t = self.by_category.entry(stat.category).or_default();
        t.trials += 1;
        if stat.recalled {
            t.recalled += 1;
        }
        self.trials += 1;
        self.completion_miss_sum += stat.completion_miss_rate;
        self.confabulation_sum += stat.confabulation_rate;
    }

    pub fn recall_rate(&self, category: MemCategory) -> Option<f32> {
        self.by_category.get(&category).and_then(CategoryTally::rate)
    }

    /// Recall over every scored trial.
    pub fn overall_rate(&self) -> f32 {
        if self.trials == 0 {
            return 0.0;
        }
        let recalled: u32 = self.by_category.values().map(|t| t.recalled).sum();
        recalled as f32 / self.trials as f32
    }

    pub fn mean_completion_miss(&self) -> f32 {
        if self.trials == 0 {
            0.0
        } else {
            self.completion_miss_sum / self.trials as f32
        }
    }

    pub fn mean_confabulation(&self) -> f32 {
        if self.trials == 0 {
            0.0
        } else {
            self.confabulation_sum / self.trials as f32
        }
    }

    pub fn all_recalled(&self) -> bool {
        self.trials > 0 && self.by_category.values().all(|t| t.recalled == t.trials)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Epoch-to-epoch recall history with learning milestones.
#[derive(Debug, Clone)]
pub struct RecallHistory {
    pub epochs: u32,
    pub recent: Vec<f32>,
    window: usize,
    pub learning_at_epoch: Option<u32>,
    pub learned_at_epoch: Option<u32>,
    pub mastered_at_epoch: Option<u32>,
}

impl RecallHistory {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            epochs: 0,
            recent: Vec::with_capacity(window),
            window,
            learning_at_epoch: None,
            learned_at_epoch: None,
            mastered_at_epoch: None,
        }
    }

    fn update_milestones(&mut self) {
        let r = self.trailing_rate();
        if self.learning_at_epoch.is_none() && r >= 0.70 {
            self.learning_at_epoch = Some(self.epochs);
        }
        if self.learned_at_epoch.is_none() && r >= 0.85 {
            self.learned_at_epoch = Some(self.epochs);
        }
        if self.mastered_at_epoch.is_none() && r >= 0.95 {
            self.mastered_at_epoch = Some(self.epochs);
        }
    }

    pub fn record_epoch(&mut self, rate: f32) {
        self.recent.push(rate);
        if self.recent.len() > self.window {
            self.recent.remove(0);
        }
        self.epochs += 1;
        self.update_milestones();
    }

    pub fn trailing_rate(&self) -> f32 {
        if self.recent.is_empty() {
            return 0.0;
        }
        self.recent.iter().sum::<f32>() / self.recent.len() as f32
    }
}

impl Default for RecallHistory {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialsim::memory::MemoryScorer;

    fn stat(name: &str, recalled: bool) -> MemoryStat {
        let s = MemoryScorer::default();
        let target = [1.0, 1.0, 0.0, 0.0];
        let cue = [1.0, 0.0, 0.0, 0.0];
        let actual = if recalled { target } else { cue };
        s.score_test(name, &target, &actual, &cue)
    }

    #[test]
    fn routes_recall_by_category() {
        let mut e = EpochMemStats::new();
        e.record(&stat("ab_0", true));
        e.record(&stat("ab_1", false));
        e.record(&stat("ac_0", true));
        e.record(&stat("lure_0", false));
        assert_eq!(e.recall_rate(MemCategory::FirstList), Some(0.5));
        assert_eq!(e.recall_rate(MemCategory::SecondList), Some(1.0));
        assert_eq!(e.recall_rate(MemCategory::Lure), Some(0.0));
        assert_eq!(e.recall_rate(MemCategory::Other), None);
        assert_eq!(e.overall_rate(), 0.5);
        assert_eq!(e.mean_completion_miss(), 0.5);
        assert!(!e.all_recalled());
        e.clear();
        assert_eq!(e.trials, 0);
        assert!(!e.all_recalled());
    }

    #[test]
    fn milestones_use_trailing_window() {
        let mut h = RecallHistory::new(2);
        h.record_epoch(0.5);
        h.record_epoch(1.0);
        assert_eq!(h.learning_at_epoch, Some(2));
        assert_eq!(h.learned_at_epoch, None);
        h.record_epoch(0.75);
        assert_eq!(h.learned_at_epoch, Some(3));
        h.record_epoch(1.0);
        assert_eq!(h.mastered_at_epoch, None);
        h.record_epoch(1.0);
        assert_eq!(h.mastered_at_epoch, Some(5));
        assert_eq!(h.recent.len(), 2);
    }
}
