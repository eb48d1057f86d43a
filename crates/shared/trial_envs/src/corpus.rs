use std::path::Path;

use trialsim::counter::{Counter, CounterState, TimeScale};
use trialsim::env::{elements, Env};
use trialsim::error::{ConfigError, VocabularyError};
use trialsim::order::Order;
use trialsim::prng::Prng;
use trialsim::tensor::Tensor;
use trialsim::vocab::{read_corpus, Paragraph, Vocabulary};

/// Paragraph presentation task.
///
/// Each trial presents one paragraph as a multi-hot vector over the
/// vocabulary on the `"Input"` element. One epoch shows every paragraph once,
/// in a fresh random order unless `sequential` is set.
#[derive(Debug)]
pub struct CorpusEnv {
    name: String,
    pub sequential: bool,

    vocab: Vocabulary,
    paras: Vec<Paragraph>,
    order: Order,

    run: Counter,
    epoch: Counter,
    trial: Counter,

    input: Tensor,
    current: Option<usize>,
}

impl CorpusEnv {
    /// An environment over a fixed vocabulary with no paragraphs yet.
    pub fn new(name: &str, vocab: Vocabulary) -> Result<Self, ConfigError> {
        if vocab.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }
        let n = vocab.len();
        Ok(Self {
            name: name.to_string(),
            sequential: false,
            vocab,
            paras: Vec::new(),
            order: Order::identity(0),
            run: Counter::new(TimeScale::Run, 0),
            epoch: Counter::new(TimeScale::Epoch, 0),
            trial: Counter::new(TimeScale::Trial, 0),
            input: Tensor::zeros(&[n]),
            current: None,
        })
    }

    /// Vocabulary scanned from `paras`; every paragraph is therefore valid.
    pub fn from_paragraphs(
        name: &str,
        paras: Vec<Paragraph>,
        rng: &mut Prng,
    ) -> Result<Self, ConfigError> {
        let vocab = Vocabulary::scan(&paras);
        let mut env = Self::new(name, vocab)?;
        env.paras = paras;
        env.init(0, rng);
        Ok(env)
    }

    /// Read, concatenate and scan the given text files.
    pub fn from_files<P: AsRef<Path>>(
        name: &str,
        files: &[P],
        rng: &mut Prng,
    ) -> Result<Self, ConfigError> {
        let paras = read_corpus(files)?;
        Self::from_paragraphs(name, paras, rng)
    }

    /// Replace the paragraph set and re-init.
    ///
    /// Paragraphs containing unknown words are dropped and reported together
    /// in the error; the valid ones are installed either way.
    pub fn set_paragraphs(
        &mut self,
        paras: Vec<Paragraph>,
        rng: &mut Prng,
    ) -> Result<(), VocabularyError> {
        let (ok, err) = self.vocab.partition(paras);
        if let Some(e) = &err {
            tracing::warn!(env = %self.name, kept = ok.len(), error = %e, "paragraphs rejected");
        }
        self.paras = ok;
        let run = self.run.cur().max(0);
        self.init(run, rng);
        match err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Parse each string as one paragraph and install them.
    pub fn set_texts<S: AsRef<str>>(
        &mut self,
        texts: &[S],
        rng: &mut Prng,
    ) -> Result<(), VocabularyError> {
        let paras = texts.iter().map(|t| Paragraph::parse(t.as_ref())).collect();
        self.set_paragraphs(paras, rng)
    }

    pub fn check_words<S: AsRef<str>>(&self, words: &[S]) -> Result<(), VocabularyError> {
        self.vocab.check_words(words)
    }

    pub fn vocab(&self) -> &Vocabulary {
        &self.vocab
    }

    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paras
    }

    /// Paragraph shown on the current trial; `None` before the first step.
    pub fn current(&self) -> Option<&Paragraph> {
        self.current.and_then(|i| self.paras.get(i))
    }

    fn render(&mut self) {
        match self.order.index(&self.trial, self.sequential) {
            Some(i) if i < self.paras.len() => {
                self.vocab.encode(&self.paras[i], self.input.values_mut());
                self.current = Some(i);
            }
            _ => {
                self.input.set_zero();
                self.current = None;
            }
        }
    }
}

impl Env for CorpusEnv {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self, run: i32, rng: &mut Prng) {
        self.run.init();
        self.run.set(run);
        self.epoch.init();
        self.epoch.incr();
        self.trial.init();
        self.trial.set_max(self.paras.len() as i32);
        self.order.reset(self.paras.len(), rng);
        self.input.set_zero();
        self.current = None;
    }

    fn step(&mut self, rng: &mut Prng) -> bool {
        if self.paras.is_empty() {
            return false;
        }
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
        self.current().map(Paragraph::display).unwrap_or_default()
    }
}
