//! Probabilistic finite-state grammar.
//!
//! A [`TransitionModel`] is a square matrix of edge weights plus a parallel
//! matrix of output labels. A [`SequenceGenerator`] walks it with weighted
//! random choice among the legal edges of the current state, reporting the
//! edges it did *not* take so tasks can score against the full set of
//! grammatical continuations.
//!
//! Row weights: under [`RowPolicy::Normalize`] a row is sampled in proportion
//! to its own total, so ad hoc fractional weights work. [`RowPolicy::Strict`]
//! rejects any non-terminal row whose weights do not sum to 1 at build time.
//! Both policies sample the same way; strictness is purely a setup check.

use crate::error::ConfigError;
use crate::prng::Prng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

const ROW_SUM_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum RowPolicy {
    #[default]
    Normalize,
    Strict,
}

/// One `(from, to, probability, label)` edge.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitionSpec {
    pub from: usize,
    pub to: usize,
    #[cfg_attr(feature = "serde", serde(alias = "p"))]
    pub prob: f64,
    pub label: String,
}

impl TransitionSpec {
    pub fn new(from: usize, to: usize, prob: f64, label: &str) -> Self {
        Self {
            from,
            to,
            prob,
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransitionModel {
    states: usize,
    start: usize,
    terminal: usize,
    probs: Vec<f64>,
    labels: Vec<String>,
    policy: RowPolicy,
}

impl TransitionModel {
    /// Build and validate a model. `start` must differ from `terminal` and
    /// every other state, `start` included, needs an outgoing edge. Later
    /// duplicates of an edge overwrite earlier ones. Edges leaving the terminal state are ignored: reaching
    /// it ends the sequence and the next step restarts at `start`.
    pub fn from_transitions(
        states: usize,
        start: usize,
        terminal: usize,
        edges: &[TransitionSpec],
        policy: RowPolicy,
    ) -> Result<Self, ConfigError> {
        if states == 0 || edges.is_empty() {
            return Err(ConfigError::EmptyTransitions);
        }
        if start >= states || terminal >= states {
            return Err(ConfigError::StateOutOfRange {
                from: start,
                to: terminal,
                states,
            });
        }

        if start == terminal {
            return Err(ConfigError::StartIsTerminal { state: start });
        }

        let mut probs = vec![0.0; states * states];
        let mut labels = vec![String::new(); states * states];
        for e in edges {
            if e.from >= states || e.to >= states {
                return Err(ConfigError::StateOutOfRange {
                    from: e.from,
                    to: e.to,
                    states,
                });
            }
            if !e.prob.is_finite() || e.prob < 0.0 {
                return Err(ConfigError::InvalidProbability {
                    from: e.from,
                    to: e.to,
                    p: e.prob,
                });
            }
            if e.from == terminal {
                continue;
            }
            let k = e.from * states + e.to;
            probs[k] = e.prob;
            labels[k] = e.label.clone();
        }

        let model = Self {
            states,
            start,
            terminal,
            probs,
            labels,
            policy,
        };
        model.validate_rows()?;
        Ok(model)
    }

    fn validate_rows(&self) -> Result<(), ConfigError> {
        for s in 0..self.states {
            if s == self.terminal {
                continue;
            }
            let sum: f64 = self.row(s).iter().sum();
            if sum <= 0.0 {
                return Err(ConfigError::DeadEnd { state: s });
            }
            if self.policy == RowPolicy::Strict && (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
                return Err(ConfigError::RowNotNormalized { state: s, sum });
            }
        }
        Ok(())
    }

    /// The Reber grammar: B (T S* X | P T* V) ... E.
    ///
    /// States: 0 start, 1..=5 interior, 6 pre-end, 7 terminal.
    pub fn reber() -> Self {
        let edges = [
            TransitionSpec::new(0, 1, 1.0, "B"),
            TransitionSpec::new(1, 2, 0.5, "T"),
            TransitionSpec::new(1, 3, 0.5, "P"),
            TransitionSpec::new(2, 2, 0.5, "S"),
            TransitionSpec::new(2, 4, 0.5, "X"),
            TransitionSpec::new(3, 3, 0.5, "T"),
            TransitionSpec::new(3, 5, 0.5, "V"),
            TransitionSpec::new(4, 3, 0.5, "X"),
            TransitionSpec::new(4, 6, 0.5, "S"),
            TransitionSpec::new(5, 4, 0.5, "P"),
            TransitionSpec::new(5, 6, 0.5, "V"),
            TransitionSpec::new(6, 7, 1.0, "E"),
        ];
        Self::from_transitions(8, 0, 7, &edges, RowPolicy::Strict)
            .unwrap_or_else(|e| unreachable!("builtin reber grammar is valid: {e}"))
    }

    pub fn states(&self) -> usize {
        self.states
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn terminal(&self) -> usize {
        self.terminal
    }

    pub fn policy(&self) -> RowPolicy {
        self.policy
    }

    pub fn row(&self, from: usize) -> &[f64] {
        &self.probs[from * self.states..(from + 1) * self.states]
    }

    pub fn prob(&self, from: usize, to: usize) -> f64 {
        self.probs[from * self.states + to]
    }

    pub fn label(&self, from: usize, to: usize) -> &str {
        &self.labels[from * self.states + to]
    }

    /// States reachable in one step from `from`, in index order.
    pub fn candidates(&self, from: usize) -> impl Iterator<Item = usize> + '_ {
        self.row(from)
            .iter()
            .enumerate()
            .filter(|(_, &p)| p > 0.0)
            .map(|(j, _)| j)
    }

    /// Sorted, de-duplicated set of every edge label.
    pub fn alphabet(&self) -> Vec<String> {
        let mut out: Vec<String> = self
            .probs
            .iter()
            .zip(&self.labels)
            .filter(|(&p, _)| p > 0.0)
            .map(|(_, l)| l.clone())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// Labels along a state path, or `None` if any step is not a legal edge.
    pub fn label_path(&self, path: &[usize]) -> Option<Vec<&str>> {
        path.windows(2)
            .map(|w| {
                let (a, b) = (w[0], w[1]);
                if a < self.states && b < self.states && self.prob(a, b) > 0.0 {
                    Some(self.label(a, b))
                } else {
                    None
                }
            })
            .collect()
    }

    /// Whether a label string is a complete start-to-terminal word.
    pub fn accepts(&self, labels: &[&str]) -> bool {
        let mut frontier = vec![self.start];
        for &l in labels {
            let mut next: Vec<usize> = Vec::new();
            for &s in &frontier {
                if s == self.terminal {
                    continue;
                }
                for j in self.candidates(s) {
                    if self.label(s, j) == l && !next.contains(&j) {
                        next.push(j);
                    }
                }
            }
            if next.is_empty() {
                return false;
            }
            frontier = next;
        }
        frontier.contains(&self.terminal)
    }
}

/// A legal edge from the current state that was not taken.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alternative {
    pub state: usize,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transition {
    pub from: usize,
    pub to: usize,
    pub label: String,
    pub alternatives: Vec<Alternative>,
    /// `to` is the terminal state.
    pub terminal: bool,
}

#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    model: TransitionModel,
    state: i64,
}

impl SequenceGenerator {
    pub fn new(model: TransitionModel) -> Self {
        let state = model.start() as i64;
        Self { model, state }
    }

    pub fn model(&self) -> &TransitionModel {
        &self.model
    }

    pub fn state(&self) -> i64 {
        self.state
    }

    pub fn reset(&mut self) {
        self.state = self.model.start() as i64;
    }

    /// Force the current state, e.g. when restoring a checkpoint. Values
    /// outside the model are accepted and recovered on the next step.
    pub fn set_state(&mut self, state: i64) {
        self.state = state;
    }

    /// Take one weighted random edge. Consumes exactly one draw.
    pub fn next_state(&mut self, rng: &mut Prng) -> Transition {
        let k = self.model.states();
        let cur = match usize::try_from(self.state) {
            Ok(s) if s < k => s,
            _ => {
                tracing::warn!(state = self.state, states = k, "automaton state out of range; restarting");
                self.model.start()
            }
        };
        let cur = if cur == self.model.terminal() {
            self.model.start()
        } else {
            cur
        };

        let row = self.model.row(cur);
        let total: f64 = row.iter().sum();
        let r = rng.next_f64_01() * total;

        let mut chosen = None;
        let mut last = cur;
        let mut cum = 0.0;
        for (j, &p) in row.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            last = j;
            cum += p;
            if r < cum {
                chosen = Some(j);
                break;
            }
        }
        // Rounding can leave r == total; fall back to the last candidate.
        let to = chosen.unwrap_or(last);

        let alternatives = self
            .model
            .candidates(cur)
            .filter(|&j| j != to)
            .map(|j| Alternative {
                state: j,
                label: self.model.label(cur, j).to_string(),
            })
            .collect();

        self.state = to as i64;
        Transition {
            from: cur,
            to,
            label: self.model.label(cur, to).to_string(),
            alternatives,
            terminal: to == self.model.terminal(),
        }
    }

    /// Walk from the start state until the terminal state or `max_len`
    /// transitions, whichever comes first.
    pub fn generate_sequence(&mut self, rng: &mut Prng, max_len: usize) -> Vec<Transition> {
        self.reset();
        let mut out = Vec::new();
        while out.len() < max_len {
            let t = self.next_state(rng);
            let done = t.terminal;
            out.push(t);
            if done {
                break;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_way(policy: RowPolicy, a: f64, b: f64) -> Result<TransitionModel, ConfigError> {
        TransitionModel::from_transitions(
            4,
            0,
            3,
            &[
                TransitionSpec::new(0, 1, a, "a"),
                TransitionSpec::new(0, 2, b, "b"),
                TransitionSpec::new(1, 3, 1.0, "x"),
                TransitionSpec::new(2, 3, 1.0, "y"),
            ],
            policy,
        )
    }

    #[test]
    fn empty_model_is_a_setup_error() {
        let e = TransitionModel::from_transitions(0, 0, 0, &[], RowPolicy::Normalize);
        assert!(matches!(e, Err(ConfigError::EmptyTransitions)));
        let e = TransitionModel::from_transitions(3, 0, 2, &[], RowPolicy::Normalize);
        assert!(matches!(e, Err(ConfigError::EmptyTransitions)));
    }

    #[test]
    fn dead_end_rows_are_rejected() {
        let e = TransitionModel::from_transitions(
            3,
            0,
            2,
            &[TransitionSpec::new(0, 1, 1.0, "a")],
            RowPolicy::Normalize,
        );
        assert!(matches!(e, Err(ConfigError::DeadEnd { state: 1 })));
    }

    #[test]
    fn start_must_differ_from_terminal_and_lead_somewhere() {
        let e = TransitionModel::from_transitions(
            2,
            0,
            0,
            &[
                TransitionSpec::new(0, 1, 1.0, "a"),
                TransitionSpec::new(1, 0, 1.0, "b"),
            ],
            RowPolicy::Strict,
        );
        assert!(matches!(e, Err(ConfigError::StartIsTerminal { state: 0 })));

        let e = TransitionModel::from_transitions(
            3,
            0,
            2,
            &[TransitionSpec::new(1, 2, 1.0, "a")],
            RowPolicy::Normalize,
        );
        assert!(matches!(e, Err(ConfigError::DeadEnd { state: 0 })));
    }

    #[test]
    fn bad_edges_are_rejected() {
        let e = TransitionModel::from_transitions(
            2,
            0,
            1,
            &[TransitionSpec::new(0, 5, 1.0, "a")],
            RowPolicy::Normalize,
        );
        assert!(matches!(e, Err(ConfigError::StateOutOfRange { .. })));
        let e = TransitionModel::from_transitions(
            2,
            0,
            1,
            &[TransitionSpec::new(0, 1, -0.5, "a")],
            RowPolicy::Normalize,
        );
        assert!(matches!(e, Err(ConfigError::InvalidProbability { .. })));
    }

    #[test]
    fn strict_policy_requires_unit_rows() {
        assert!(matches!(
            two_way(RowPolicy::Strict, 1.0, 3.0),
            Err(ConfigError::RowNotNormalized { state: 0, .. })
        ));
        assert!(two_way(RowPolicy::Strict, 0.25, 0.75).is_ok());
        assert!(two_way(RowPolicy::Normalize, 1.0, 3.0).is_ok());
    }

    #[test]
    fn unnormalized_row_samples_in_proportion_to_weight() {
        // 1:3 weights must behave like 0.25 / 0.75.
        let raw = two_way(RowPolicy::Normalize, 1.0, 3.0).unwrap();
        let unit = two_way(RowPolicy::Strict, 0.25, 0.75).unwrap();
        let mut g_raw = SequenceGenerator::new(raw);
        let mut g_unit = SequenceGenerator::new(unit);
        let mut r1 = Prng::new(2024);
        let mut r2 = Prng::new(2024);
        let mut a_count = 0usize;
        let n = 20_000;
        for _ in 0..n {
            g_raw.reset();
            g_unit.reset();
            let t1 = g_raw.next_state(&mut r1);
            let t2 = g_unit.next_state(&mut r2);
            assert_eq!(t1.to, t2.to);
            if t1.label == "a" {
                a_count += 1;
            }
        }
        let frac = a_count as f64 / n as f64;
        assert!((frac - 0.25).abs() < 0.02, "frac={frac}");
    }

    #[test]
    fn alternatives_are_the_untaken_candidates() {
        let mut g = SequenceGenerator::new(TransitionModel::reber());
        let mut rng = Prng::new(3);
        let b = g.next_state(&mut rng);
        assert_eq!(b.label, "B");
        assert!(b.alternatives.is_empty());
        let t = g.next_state(&mut rng);
        assert_eq!(t.from, 1);
        assert_eq!(t.alternatives.len(), 1);
        let alt = &t.alternatives[0];
        assert_ne!(alt.state, t.to);
        assert!(alt.label == "T" || alt.label == "P");
        assert_ne!(alt.label, t.label);
    }

    #[test]
    fn generated_sequences_replay_through_the_model() {
        let model = TransitionModel::reber();
        let mut g = SequenceGenerator::new(model.clone());
        let mut rng = Prng::new(99);
        for _ in 0..500 {
            let seq = g.generate_sequence(&mut rng, 1000);
            let last = seq.last().unwrap();
            assert!(last.terminal);
            assert_eq!(last.to, model.terminal());
            assert!(seq[..seq.len() - 1].iter().all(|t| !t.terminal));

            let mut path = vec![seq[0].from];
            path.extend(seq.iter().map(|t| t.to));
            let labels = model.label_path(&path).expect("every step is a legal edge");
            for (t, l) in seq.iter().zip(&labels) {
                assert_eq!(t.label, *l);
                assert!(model.prob(t.from, t.to) > 0.0);
            }
            assert!(model.accepts(&labels));
        }
    }

    #[test]
    fn out_of_range_state_restarts_at_start() {
        let mut g = SequenceGenerator::new(TransitionModel::reber());
        let mut rng = Prng::new(1);
        for bad in [-1, 8, 1_000] {
            g.set_state(bad);
            let t = g.next_state(&mut rng);
            assert_eq!(t.from, 0);
            assert_eq!(t.label, "B");
        }
    }

    #[test]
    fn terminal_state_rolls_over_to_a_new_sequence() {
        let mut g = SequenceGenerator::new(TransitionModel::reber());
        let mut rng = Prng::new(8);
        let seq = g.generate_sequence(&mut rng, 100);
        assert!(seq.last().unwrap().terminal);
        let t = g.next_state(&mut rng);
        assert_eq!(t.from, 0);
    }

    #[test]
    fn one_draw_per_step() {
        let mut g = SequenceGenerator::new(TransitionModel::reber());
        let mut rng = Prng::new(5);
        for i in 1..=50 {
            g.next_state(&mut rng);
            assert_eq!(rng.draws(), i);
        }
    }

    #[test]
    fn accepts_known_reber_words() {
        let m = TransitionModel::reber();
        assert!(m.accepts(&["B", "T", "X", "S", "E"]));
        assert!(m.accepts(&["B", "P", "V", "V", "E"]));
        assert!(m.accepts(&["B", "T", "S", "S", "X", "X", "V", "V", "E"]));
        assert!(!m.accepts(&["B", "T", "V", "E"]));
        assert!(!m.accepts(&["B", "T", "X", "S"]));
        assert_eq!(m.alphabet(), vec!["B", "E", "P", "S", "T", "V", "X"]);
    }
}
