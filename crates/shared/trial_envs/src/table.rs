use serde::{Deserialize, Serialize};

use trialsim::counter::{Counter, CounterState, TimeScale};
use trialsim::env::{elements, Env};
use trialsim::error::ConfigError;
use trialsim::order::Order;
use trialsim::prng::Prng;
use trialsim::tensor::Tensor;

/// One named item of a fixed pattern table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    pub name: String,
    /// Presented to the network (the cue at test).
    pub input: Vec<f32>,
    /// Full pattern the network should end up representing.
    pub target: Vec<f32>,
}

/// Fixed-table task: every epoch presents each row once.
#[derive(Debug)]
pub struct TableEnv {
    name: String,
    pub sequential: bool,
    rows: Vec<TableRow>,
    order: Order,

    run: Counter,
    epoch: Counter,
    trial: Counter,

    input: Tensor,
    target: Tensor,
    current: Option<usize>,
}

impl TableEnv {
    /// All rows must share one input width and one target width.
    pub fn new(name: &str, rows: Vec<TableRow>, rng: &mut Prng) -> Result<Self, ConfigError> {
        let first = rows.first().ok_or(ConfigError::EmptyTable)?;
        let (ni, nt) = (first.input.len(), first.target.len());
        if let Some(bad) = rows
            .iter()
            .find(|r| r.input.len() != ni || r.target.len() != nt)
        {
            return Err(ConfigError::Parse(format!(
                "row {:?} has shape {}/{}, expected {ni}/{nt}",
                bad.name,
                bad.input.len(),
                bad.target.len()
            )));
        }
        let n = rows.len();
        let mut env = Self {
            name: name.to_string(),
            sequential: false,
            rows,
            order: Order::identity(n),
            run: Counter::new(TimeScale::Run, 0),
            epoch: Counter::new(TimeScale::Epoch, 0),
            trial: Counter::new(TimeScale::Trial, n as i32),
            input: Tensor::zeros(&[ni]),
            target: Tensor::zeros(&[nt]),
            current: None,
        };
        env.init(0, rng);
        Ok(env)
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    /// Row shown on the current trial; `None` before the first step.
    pub fn current(&self) -> Option<&TableRow> {
        self.current.and_then(|i| self.rows.get(i))
    }

    fn render(&mut self) {
        match self.order.index(&self.trial, self.sequential) {
            Some(i) => {
                let row = &self.rows[i];
                self.input.values_mut().copy_from_slice(&row.input);
                self.target.values_mut().copy_from_slice(&row.target);
                self.current = Some(i);
            }
            None => {
                self.input.set_zero();
                self.target.set_zero();
                self.current = None;
            }
        }
    }
}

impl Env for TableEnv {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, run: i32, rng: &mut Prng) {
        self.run.init();
        self.run.set(run);
        self.epoch.init();
        self.epoch.incr();
        self.trial.init();
        self.order.reset(self.rows.len(), rng);
        self.input.set_zero();
        self.target.set_zero();
        self.current = None;
    }

    fn step(&mut self, rng: &mut Prng) -> bool {
        self.run.same();
        self.epoch.same();
        if self.trial.incr() {
            self.order.regenerate(rng);
            self.epoch.incr();
        }
        self.render();
        true
    }

    fn state(&self, element: &str) -> Option<&Tensor> {
        match element {
            elements::INPUT => Some(&self.input),
            elements::TARGET => Some(&self.target),
            _ => None,
        }
    }

    fn counter(&self, scale: TimeScale) -> Option<CounterState> {
        match scale {
            TimeScale::Run => Some(self.run.query()),
            TimeScale::Epoch => Some(self.epoch.query()),
            TimeScale::Trial => Some(self.trial.query()),
            _ => None,
        }
    }

    fn label(&self) -> String {
        self.current().map(|r| r.name.clone()).unwrap_or_default()
    }
}

/// Sizes for [`AbAcTables::generate`].
///
/// Patterns have three equal slots: item A, associate (B, C or a lure
/// associate) and list context. Each slot has `pattern_size` units with
/// `active` of them on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbAcParams {
    pub list_size: usize,
    pub pattern_size: usize,
    pub active: usize,
    pub lures: usize,
}

impl Default for AbAcParams {
    fn default() -> Self {
        Self {
            list_size: 10,
            pattern_size: 48,
            active: 6,
            lures: 4,
        }
    }
}

/// Paired-associate lists: A-B learned first, then A-C over the same A items.
///
/// Training rows present the whole pattern. Test rows cue with A plus
/// context and expect the associate to be completed. Lure rows use novel A
/// items with an untrained associate, so a healthy memory should fail them.
#[derive(Debug, Clone)]
pub struct AbAcTables {
    pub params: AbAcParams,
    pub train_ab: Vec<TableRow>,
    pub train_ac: Vec<TableRow>,
    pub test_ab: Vec<TableRow>,
    pub test_ac: Vec<TableRow>,
    pub test_lure: Vec<TableRow>,
}

fn sparse_pattern(size: usize, active: usize, rng: &mut Prng) -> Vec<f32> {
    let mut v = vec![0.0; size];
    for &i in rng.perm(size).iter().take(active.min(size)) {
        v[i] = 1.0;
    }
    v
}

fn concat(parts: &[&[f32]]) -> Vec<f32> {
    parts.iter().flat_map(|p| p.iter().copied()).collect()
}

impl AbAcTables {
    pub fn generate(params: AbAcParams, rng: &mut Prng) -> Self {
        let AbAcParams {
            list_size,
            pattern_size,
            active,
            lures,
        } = params;
        let blank = vec![0.0; pattern_size];
        let ctx_ab = sparse_pattern(pattern_size, active, rng);
        let ctx_ac = sparse_pattern(pattern_size, active, rng);
        let ctx_lure = sparse_pattern(pattern_size, active, rng);

        let mut t = Self {
            params,
            train_ab: Vec::with_capacity(list_size),
            train_ac: Vec::with_capacity(list_size),
            test_ab: Vec::with_capacity(list_size),
            test_ac: Vec::with_capacity(list_size),
            test_lure: Vec::with_capacity(lures),
        };

        for i in 0..list_size {
            let a = sparse_pattern(pattern_size, active, rng);
            let b = sparse_pattern(pattern_size, active, rng);
            let c = sparse_pattern(pattern_size, active, rng);

            let ab = concat(&[&a, &b, &ctx_ab]);
            let ac = concat(&[&a, &c, &ctx_ac]);
            t.train_ab.push(TableRow {
                name: format!("ab_{i}"),
                input: ab.clone(),
                target: ab.clone(),
            });
            t.train_ac.push(TableRow {
                name: format!("ac_{i}"),
                input: ac.clone(),
                target: ac.clone(),
            });
            t.test_ab.push(TableRow {
                name: format!("ab_{i}"),
                input: concat(&[&a, &blank, &ctx_ab]),
                target: ab,
            });
            t.test_ac.push(TableRow {
                name: format!("ac_{i}"),
                input: concat(&[&a, &blank, &ctx_ac]),
                target: ac,
            });
        }

        for i in 0..lures {
            let a = sparse_pattern(pattern_size, active, rng);
            let l = sparse_pattern(pattern_size, active, rng);
            t.test_lure.push(TableRow {
                name: format!("lure_{i}"),
                input: concat(&[&a, &blank, &ctx_lure]),
                target: concat(&[&a, &l, &ctx_lure]),
            });
        }
        t
    }

    /// All test rows (AB, AC, lures) in one table.
    pub fn all_tests(&self) -> Vec<TableRow> {
        self.test_ab
            .iter()
            .chain(&self.test_ac)
            .chain(&self.test_lure)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trialsim::memory::{MemCategory, MemoryScorer};

    fn row(name: &str, on: usize) -> TableRow {
        let mut v = vec![0.0; 3];
        v[on] = 1.0;
        TableRow {
            name: name.to_string(),
            input: v.clone(),
            target: v,
        }
    }

    #[test]
    fn empty_and_ragged_tables_are_rejected() {
        let mut rng = Prng::new(1);
        assert!(matches!(
            TableEnv::new("t", Vec::new(), &mut rng),
            Err(ConfigError::EmptyTable)
        ));
        let mut bad = row("b", 1);
        bad.target.push(0.0);
        assert!(matches!(
            TableEnv::new("t", vec![row("a", 0), bad], &mut rng),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn permuted_epochs_cover_every_row() {
        let mut rng = Prng::new(6);
        let rows = vec![row("r0", 0), row("r1", 1), row("r2", 2)];
        let mut env = TableEnv::new("t", rows, &mut rng).unwrap();
        assert_eq!(env.label(), "");
        for _ in 0..4 {
            let mut names: Vec<String> = (0..3)
                .map(|_| {
                    env.step(&mut rng);
                    env.label()
                })
                .collect();
            names.sort();
            assert_eq!(names, vec!["r0", "r1", "r2"]);
        }
        assert_eq!(env.counter(TimeScale::Epoch).unwrap().cur, 3);
    }

    #[test]
    fn state_tracks_current_row() {
        let mut rng = Prng::new(2);
        let rows = vec![row("r0", 0), row("r1", 1), row("r2", 2)];
        let mut env = TableEnv::new("t", rows, &mut rng).unwrap();
        env.sequential = true;
        env.step(&mut rng);
        env.step(&mut rng);
        assert_eq!(env.label(), "r1");
        assert_eq!(env.state("Input").unwrap().values(), &[0.0, 1.0, 0.0]);
        assert_eq!(env.state("Target").unwrap().values(), &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn ab_ac_lists_share_items_and_cue_omits_associate() {
        let mut rng = Prng::new(31);
        let p = AbAcParams {
            list_size: 5,
            pattern_size: 20,
            active: 4,
            lures: 2,
        };
        let t = AbAcTables::generate(p, &mut rng);
        assert_eq!(t.train_ab.len(), 5);
        assert_eq!(t.test_lure.len(), 2);
        assert_eq!(t.all_tests().len(), 12);

        let w = p.pattern_size;
        for (ab, ac) in t.train_ab.iter().zip(&t.train_ac) {
            assert_eq!(&ab.target[..w], &ac.target[..w]);
            assert_eq!(ab.target.iter().filter(|&&x| x > 0.5).count(), 3 * p.active);
        }
        for r in &t.test_ab {
            assert!(r.input[w..2 * w].iter().all(|&x| x == 0.0));
            assert_eq!(MemCategory::from_trial_name(&r.name), MemCategory::FirstList);
        }
        for r in &t.test_lure {
            assert_eq!(MemCategory::from_trial_name(&r.name), MemCategory::Lure);
        }
    }

    #[test]
    fn perfect_completion_scores_as_recalled() {
        let mut rng = Prng::new(8);
        let t = AbAcTables::generate(AbAcParams::default(), &mut rng);
        let scorer = MemoryScorer::default();
        for r in &t.test_ac {
            let s = scorer.score_test(&r.name, &r.target, &r.target, &r.input);
            assert!(s.recalled);
            assert_eq!(s.to_complete, AbAcParams::default().active);
            // Echoing the cue leaves the associate uncompleted.
            let s = scorer.score_test(&r.name, &r.target, &r.input, &r.input);
            assert!(!s.recalled);
        }
    }
}
