//! Time-scale counters with wraparound / carry semantics.
//!
//! Every environment keeps one [`Counter`] per nested loop (run, epoch,
//! sequence, trial, tick, cycle). Within a single step the outer-scale
//! counters must be touched with [`Counter::same`] *before* the inner-scale
//! counter is advanced with [`Counter::incr`]; a carry from the inner counter
//! then calls `incr` on the next scale out. Skipping the `same` call leaves a
//! stale `changed` flag on the outer scale, and a driver watching for epoch
//! boundaries will see every subsequent trial as a new epoch.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The nested loop levels an experiment iterates over, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TimeScale {
    Run,
    Epoch,
    Sequence,
    Trial,
    Tick,
    Cycle,
}

impl TimeScale {
    pub fn label(self) -> &'static str {
        match self {
            TimeScale::Run => "Run",
            TimeScale::Epoch => "Epoch",
            TimeScale::Sequence => "Sequence",
            TimeScale::Trial => "Trial",
            TimeScale::Tick => "Tick",
            TimeScale::Cycle => "Cycle",
        }
    }
}

impl fmt::Display for TimeScale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Result of [`Counter::query`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    pub cur: i32,
    pub prv: i32,
    pub changed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Counter {
    pub scale: TimeScale,
    cur: i32,
    prv: i32,
    /// Wrap point. `<= 0` never wraps.
    max: i32,
    chg: bool,
}

impl Counter {
    /// A fresh, already-initialized counter (`cur == -1`).
    pub fn new(scale: TimeScale, max: i32) -> Self {
        Self {
            scale,
            cur: -1,
            prv: -1,
            max,
            chg: false,
        }
    }

    pub fn init(&mut self) {
        self.cur = -1;
        self.prv = -1;
        self.chg = false;
    }

    /// Advance by one. Returns `true` exactly when the counter wrapped to 0.
    pub fn incr(&mut self) -> bool {
        self.prv = self.cur;
        self.cur += 1;
        let carried = if self.max > 0 && self.cur >= self.max {
            self.cur = 0;
            true
        } else {
            false
        };
        self.chg = self.cur != self.prv;
        carried
    }

    /// Mark a step on which this scale did not advance.
    ///
    /// `cur` and `prv` are left as they are; only the changed flag is
    /// cleared so `query` reports no change for this step.
    pub fn same(&mut self) {
        self.chg = false;
    }

    pub fn query(&self) -> CounterState {
        CounterState {
            cur: self.cur,
            prv: self.prv,
            changed: self.chg,
        }
    }

    pub fn cur(&self) -> i32 {
        self.cur
    }

    pub fn prv(&self) -> i32 {
        self.prv
    }

    pub fn max(&self) -> i32 {
        self.max
    }

    pub fn changed(&self) -> bool {
        self.chg
    }

    /// Current index as a slot, or `None` before the first `incr`.
    pub fn index(&self) -> Option<usize> {
        usize::try_from(self.cur).ok()
    }

    pub fn set_max(&mut self, max: i32) {
        self.max = max;
    }

    /// Jump to `cur`, recording the old value as previous.
    pub fn set(&mut self, cur: i32) {
        self.prv = self.cur;
        self.cur = cur;
        self.chg = self.cur != self.prv;
    }
}

impl fmt::Display for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.max > 0 {
            write!(f, "{}: {}/{}", self.scale, self.cur, self.max)
        } else {
            write!(f, "{}: {}", self.scale, self.cur)
        }
    }
}
