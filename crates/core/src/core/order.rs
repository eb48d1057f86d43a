//! Trial presentation order.
//!
//! An [`Order`] holds a permutation of `0..n` that is redrawn in full every
//! time the owning trial counter wraps. The redraw happens whether or not the
//! environment presents items sequentially, so flipping the sequential flag
//! never shifts the random stream seen by anything sampled later in the run.

use crate::counter::Counter;
use crate::prng::Prng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Order {
    slots: Vec<usize>,
}

impl Order {
    /// Draw the initial permutation of `0..n`.
    pub fn new(n: usize, rng: &mut Prng) -> Self {
        Self { slots: rng.perm(n) }
    }

    /// Identity order; consumes no draws. Useful for fixtures.
    pub fn identity(n: usize) -> Self {
        Self {
            slots: (0..n).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.slots
    }

    /// Replace with a brand-new permutation of the same length.
    pub fn regenerate(&mut self, rng: &mut Prng) {
        let n = self.slots.len();
        for (i, s) in self.slots.iter_mut().enumerate() {
            *s = i;
        }
        rng.permute(&mut self.slots);
        tracing::debug!(n, "order regenerated");
    }

    /// Resize to `n` items and redraw.
    pub fn reset(&mut self, n: usize, rng: &mut Prng) {
        self.slots = rng.perm(n);
    }

    /// Item presented at the counter's current position.
    ///
    /// `None` before the first step (`cur == -1`) and for any position past
    /// the end of the order.
    pub fn index(&self, counter: &Counter, sequential: bool) -> Option<usize> {
        let i = counter.index()?;
        if i >= self.slots.len() {
            return None;
        }
        if sequential {
            Some(i)
        } else {
            Some(self.slots[i])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counter::TimeScale;

    fn sorted(o: &Order) -> Vec<usize> {
        let mut v = o.as_slice().to_vec();
        v.sort_unstable();
        v
    }

    #[test]
    fn always_a_permutation() {
        let mut rng = Prng::new(9);
        for n in 0..64 {
            let mut o = Order::new(n, &mut rng);
            assert_eq!(sorted(&o), (0..n).collect::<Vec<_>>());
            o.regenerate(&mut rng);
            assert_eq!(sorted(&o), (0..n).collect::<Vec<_>>());
        }
    }

    #[test]
    fn pre_first_step_yields_no_item() {
        let mut rng = Prng::new(1);
        let o = Order::new(4, &mut rng);
        let c = Counter::new(TimeScale::Trial, 4);
        assert_eq!(o.index(&c, true), None);
        assert_eq!(o.index(&c, false), None);
    }

    #[test]
    fn sequential_ignores_permutation() {
        let mut rng = Prng::new(5);
        let o = Order::new(6, &mut rng);
        let mut c = Counter::new(TimeScale::Trial, 6);
        for i in 0..6 {
            c.incr();
            assert_eq!(o.index(&c, true), Some(i));
            assert_eq!(o.index(&c, false), Some(o.as_slice()[i]));
        }
    }

    #[test]
    fn regeneration_draws_do_not_depend_on_mode() {
        // Same protocol for both modes: draw on init, redraw on every wrap.
        fn pass(sequential: bool) -> (Vec<usize>, u64) {
            let mut rng = Prng::new(77);
            let mut o = Order::new(5, &mut rng);
            let mut c = Counter::new(TimeScale::Trial, 5);
            let mut shown = Vec::new();
            for _ in 0..15 {
                if c.incr() {
                    o.regenerate(&mut rng);
                }
                shown.push(o.index(&c, sequential).unwrap_or(usize::MAX));
            }
            (shown, rng.draws())
        }
        let (seq, seq_draws) = pass(true);
        let (perm, perm_draws) = pass(false);
        assert_eq!(seq_draws, perm_draws);
        assert_eq!(&seq[..5], &[0, 1, 2, 3, 4]);
        let mut first = perm[..5].to_vec();
        first.sort_unstable();
        assert_eq!(first, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_counter_is_not_read() {
        let o = Order::identity(2);
        let mut c = Counter::new(TimeScale::Trial, 0);
        c.set(5);
        assert_eq!(o.index(&c, false), None);
    }
}
