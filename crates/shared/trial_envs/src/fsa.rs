use trialsim::counter::{Counter, CounterState, TimeScale};
use trialsim::env::{elements, Env};
use trialsim::grammar::{SequenceGenerator, Transition, TransitionModel};
use trialsim::prng::Prng;
use trialsim::tensor::Tensor;

/// Grammar sequence task.
///
/// Every trial takes one transition of the grammar. `"Input"` is a one-hot
/// code of the emitted symbol; `"Output"` marks every symbol that was legal
/// at this step (the one taken plus the alternatives), which is what a
/// predictor fed the previous symbol can be expected to produce.
///
/// Counters: `Tick` is the position within the current sequence, `Trial`
/// counts transitions since init, `Sequence` counts completed sequences and
/// carries into `Epoch`.
#[derive(Debug)]
pub struct FsaEnv {
    name: String,
    gen: SequenceGenerator,
    alphabet: Vec<String>,
    max_sequence_len: usize,

    run: Counter,
    epoch: Counter,
    seq: Counter,
    trial: Counter,
    tick: Counter,

    input: Tensor,
    output: Tensor,
    last: Option<Transition>,
    // The current trial hit the length cutoff before the terminal state.
    truncated: bool,
    current_string: String,
}

impl FsaEnv {
    pub fn new(name: &str, model: TransitionModel, sequences_per_epoch: i32) -> Self {
        let alphabet = model.alphabet();
        let n = alphabet.len().max(1);
        Self {
            name: name.to_string(),
            gen: SequenceGenerator::new(model),
            alphabet,
            max_sequence_len: 50,
            run: Counter::new(TimeScale::Run, 0),
            epoch: Counter::new(TimeScale::Epoch, 0),
            seq: Counter::new(TimeScale::Sequence, sequences_per_epoch.max(1)),
            trial: Counter::new(TimeScale::Trial, 0),
            tick: Counter::new(TimeScale::Tick, 0),
            input: Tensor::zeros(&[n]),
            output: Tensor::zeros(&[n]),
            last: None,
            truncated: false,
            current_string: String::new(),
        }
    }

    pub fn reber(sequences_per_epoch: i32) -> Self {
        Self::new("fsa_reber", TransitionModel::reber(), sequences_per_epoch)
    }

    /// Sequences longer than this are cut off and restarted.
    pub fn set_max_sequence_len(&mut self, n: usize) {
        self.max_sequence_len = n.max(1);
    }

    pub fn model(&self) -> &TransitionModel {
        self.gen.model()
    }

    pub fn alphabet(&self) -> &[String] {
        &self.alphabet
    }

    /// The transition taken on the current trial.
    pub fn last_transition(&self) -> Option<&Transition> {
        self.last.as_ref()
    }

    /// Symbols emitted so far in the current sequence.
    pub fn current_string(&self) -> &str {
        &self.current_string
    }

    /// The current trial ended a sequence, either at the terminal state or
    /// at the length cutoff.
    pub fn sequence_ended(&self) -> bool {
        self.truncated || self.last.as_ref().is_some_and(|t| t.terminal)
    }

    /// The current sequence was cut off by the length limit. Its string is a
    /// prefix, not a complete sentence of the grammar.
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    fn symbol_index(&self, label: &str) -> Option<usize> {
        self.alphabet.binary_search_by(|s| s.as_str().cmp(label)).ok()
    }

    fn render(&mut self, t: &Transition) {
        self.input.set_zero();
        self.output.set_zero();
        if let Some(i) = self.symbol_index(&t.label) {
            self.input.set_on(i);
            self.output.set_on(i);
        }
        for alt in &t.alternatives {
            if let Some(i) = self.symbol_index(&alt.label) {
                self.output.set_on(i);
            }
        }
    }
}

impl Env for FsaEnv {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, run: i32, _rng: &mut Prng) {
        self.run.init();
        self.run.set(run);
        self.epoch.init();
        self.epoch.incr();
        self.seq.init();
        self.seq.incr();
        self.trial.init();
        self.tick.init();
        self.gen.reset();
        self.input.set_zero();
        self.output.set_zero();
        self.last = None;
        self.truncated = false;
        self.current_string.clear();
    }

    fn step(&mut self, rng: &mut Prng) -> bool {
        self.run.same();
        self.epoch.same();
        self.seq.same();

        if self.sequence_ended() {
            self.current_string.clear();
        }

        let t = self.gen.next_state(rng);
        self.trial.incr();
        self.tick.incr();
        if t.from == self.gen.model().start() {
            self.current_string.clear();
        }
        self.current_string.push_str(&t.label);

        if !t.terminal && self.tick.cur() as usize + 1 >= self.max_sequence_len {
            tracing::warn!(
                env = %self.name,
                len = self.max_sequence_len,
                "sequence exceeded max length; restarting"
            );
            self.gen.reset();
            self.truncated = true;
        } else {
            self.truncated = false;
        }

        self.render(&t);
        if t.terminal || self.truncated {
            tracing::debug!(env = %self.name, seq = %self.current_string, "sequence end");
            self.tick.init();
            if self.seq.incr() {
                self.epoch.incr();
            }
        }
        self.last = Some(t);
        true
    }

    fn state(&self, element: &str) -> Option<&Tensor> {
        match element {
            elements::INPUT => Some(&self.input),
            elements::OUTPUT => Some(&self.output),
            _ => None,
        }
    }

    fn counter(&self, scale: TimeScale) -> Option<CounterState> {
        match scale {
            TimeScale::Run => Some(self.run.query()),
            TimeScale::Epoch => Some(self.epoch.query()),
            TimeScale::Sequence => Some(self.seq.query()),
            TimeScale::Trial => Some(self.trial.query()),
            TimeScale::Tick => Some(self.tick.query()),
            TimeScale::Cycle => None,
        }
    }

    fn label(&self) -> String {
        match &self.last {
            Some(t) => format!("{} {}->{}", self.current_string, t.from, t.to),
            None => String::new(),
        }
    }
}
