use trialsim::counter::{CounterState, TimeScale};
use trialsim::env::Env;
use trialsim::prng::Prng;
use trialsim::tensor::Tensor;

use crate::corpus::CorpusEnv;
use crate::fsa::FsaEnv;
use crate::table::TableEnv;

/// Runtime-selected environment.
#[allow(clippy::large_enum_variant)]
#[derive(Debug)]
pub enum ActiveEnv {
    Corpus(CorpusEnv),
    Fsa(FsaEnv),
    Table(TableEnv),
}

impl ActiveEnv {
    pub fn kind(&self) -> &'static str {
        match self {
            ActiveEnv::Corpus(_) => "corpus",
            ActiveEnv::Fsa(_) => "fsa",
            ActiveEnv::Table(_) => "table",
        }
    }

    fn as_env(&self) -> &dyn Env {
        match self {
            ActiveEnv::Corpus(e) => e,
            ActiveEnv::Fsa(e) => e,
            ActiveEnv::Table(e) => e,
        }
    }

    fn as_env_mut(&mut self) -> &mut dyn Env {
        match self {
            ActiveEnv::Corpus(e) => e,
            ActiveEnv::Fsa(e) => e,
            ActiveEnv::Table(e) => e,
        }
    }

    /// Switch presentation order for the environments that have one.
    pub fn set_sequential(&mut self, sequential: bool) {
        match self {
            ActiveEnv::Corpus(e) => e.sequential = sequential,
            ActiveEnv::Table(e) => e.sequential = sequential,
            ActiveEnv::Fsa(_) => {}
        }
    }
}

impl Env for ActiveEnv {
    fn name(&self) -> &str {
        self.as_env().name()
    }

    fn init(&mut self, run: i32, rng: &mut Prng) {
        self.as_env_mut().init(run, rng)
    }

    fn step(&mut self, rng: &mut Prng) -> bool {
        self.as_env_mut().step(rng)
    }

    fn state(&self, element: &str) -> Option<&Tensor> {
        self.as_env().state(element)
    }

    fn counter(&self, scale: TimeScale) -> Option<CounterState> {
        self.as_env().counter(scale)
    }

    fn label(&self) -> String {
        self.as_env().label()
    }
}

impl From<CorpusEnv> for ActiveEnv {
    fn from(e: CorpusEnv) -> Self {
        ActiveEnv::Corpus(e)
    }
}

impl From<FsaEnv> for ActiveEnv {
    fn from(e: FsaEnv) -> Self {
        ActiveEnv::Fsa(e)
    }
}

impl From<TableEnv> for ActiveEnv {
    fn from(e: TableEnv) -> Self {
        ActiveEnv::Table(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::TableRow;
    use trialsim::env::elements;

    #[test]
    fn dispatches_to_the_wrapped_env() {
        let mut rng = Prng::new(1);
        let mut env: ActiveEnv = FsaEnv::reber(3).into();
        assert_eq!(env.kind(), "fsa");
        env.init(0, &mut rng);
        assert!(env.step(&mut rng));
        assert!(env.label().starts_with('B'));
        assert!(env.state(elements::OUTPUT).is_some());
        assert!(env.counter(TimeScale::Tick).is_some());

        let rows = vec![TableRow {
            name: "ab_0".into(),
            input: vec![1.0, 0.0],
            target: vec![1.0, 1.0],
        }];
        let mut env: ActiveEnv = TableEnv::new("t", rows, &mut rng).unwrap().into();
        env.set_sequential(true);
        env.step(&mut rng);
        assert_eq!(env.label(), "ab_0");
        assert_eq!(env.state(elements::TARGET).unwrap().values(), &[1.0, 1.0]);
        assert!(env.counter(TimeScale::Tick).is_none());
    }
}
