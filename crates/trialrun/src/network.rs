//! Stand-in networks.
//!
//! The real network is an external engine; these are just enough to
//! exercise the trial loop and the recall scorer end to end.

use std::collections::VecDeque;

/// Capacity-limited pattern store that completes a cue with the stored
/// pattern it overlaps most. Old patterns are evicted first, which gives the
/// AB-AC task its interference.
#[derive(Debug, Clone)]
pub struct PatternMemory {
    capacity: usize,
    threshold: f32,
    stored: VecDeque<Vec<f32>>,
}

impl PatternMemory {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            capacity: capacity.max(1),
            threshold,
            stored: VecDeque::new(),
        }
    }

    pub fn learn(&mut self, pattern: &[f32]) {
        if let Some(pos) = self.stored.iter().position(|p| p.as_slice() == pattern) {
            self.stored.remove(pos);
        }
        self.stored.push_back(pattern.to_vec());
        while self.stored.len() > self.capacity {
            self.stored.pop_front();
        }
    }

    /// Best match for `cue`, or the cue itself if nothing stored covers at
    /// least half of its active units. Ties go to the most recent pattern.
    pub fn recall(&self, cue: &[f32]) -> Vec<f32> {
        let thr = self.threshold;
        let cue_on = cue.iter().filter(|&&x| x > thr).count();
        let mut best: Option<(usize, &Vec<f32>)> = None;
        for p in self.stored.iter().rev() {
            let overlap = cue
                .iter()
                .zip(p)
                .filter(|(&c, &v)| c > thr && v > thr)
                .count();
            match best {
                Some((b, _)) if overlap <= b => {}
                _ => best = Some((overlap, p)),
            }
        }
        match best {
            Some((overlap, p)) if cue_on > 0 && overlap * 2 >= cue_on => p.clone(),
            _ => cue.to_vec(),
        }
    }
}

/// Symbol-to-symbol transition counts, predicting every successor seen at
/// least `min_share` of the time after the previous symbol.
#[derive(Debug, Clone)]
pub struct BigramPredictor {
    n: usize,
    // Row `n` is the sequence-start context.
    counts: Vec<u32>,
    prev: Option<usize>,
    min_share: f32,
}

impl BigramPredictor {
    pub fn new(n: usize, min_share: f32) -> Self {
        Self {
            n,
            counts: vec![0; (n + 1) * n],
            prev: None,
            min_share,
        }
    }

    fn row(&self) -> &[u32] {
        let r = self.prev.unwrap_or(self.n);
        &self.counts[r * self.n..(r + 1) * self.n]
    }

    pub fn predict(&self) -> Vec<f32> {
        let row = self.row();
        let total: u32 = row.iter().sum();
        row.iter()
            .map(|&c| {
                if total > 0 && c as f32 / total as f32 >= self.min_share {
                    1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    pub fn observe(&mut self, symbol: usize, sequence_ended: bool) {
        if symbol < self.n {
            let r = self.prev.unwrap_or(self.n);
            self.counts[r * self.n + symbol] += 1;
        }
        self.prev = if sequence_ended || symbol >= self.n {
            None
        } else {
            Some(symbol)
        };
    }
}
