//! `trialrun`: drive one configured experiment from the command line.
//!
//! ```text
//! trialrun [config.json] [summary.json]
//! ```
//!
//! Without a config the AB-AC paired-associate task runs with default
//! sizes. Per-epoch progress is logged through `tracing` (`RUST_LOG`
//! controls the level); the per-run summary is written as JSON to the
//! second argument, or to stdout.

mod error;
mod network;

use std::fs;
use std::ops::ControlFlow;
use std::path::Path;
use std::process::ExitCode;

use serde::Serialize;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use trialsim::config::{EnvConfig, ExperimentConfig, VocabSource};
use trialsim::prelude::*;
use trialsim_envs::{
    AbAcParams, AbAcTables, ActiveEnv, CorpusEnv, EpochMemStats, FsaEnv, RecallHistory, TableEnv,
};

use crate::error::RunError;
use crate::network::{BigramPredictor, PatternMemory};

const DEFAULT_CONFIG: &str = r#"{"epochs": 5, "env": {"type": "table"}}"#;

/// Share of observed successors a symbol needs before it is predicted.
const PREDICT_MIN_SHARE: f32 = 0.1;

#[derive(Debug, Clone)]
enum Network {
    Memory(PatternMemory),
    Predictor(BigramPredictor),
}

#[derive(Debug, Serialize)]
struct RunSummary {
    env: String,
    phase: Option<String>,
    run: i32,
    epochs: u32,
    trailing_recall: f32,
    learning_at_epoch: Option<u32>,
    learned_at_epoch: Option<u32>,
    mastered_at_epoch: Option<u32>,
    last_train: EpochMemStats,
    last_test: Option<EpochMemStats>,
}

/// Scores every test row against the memory without training it.
struct Tester<'a> {
    memory: &'a PatternMemory,
    scorer: &'a MemoryScorer,
    stats: EpochMemStats,
}

impl LoopHooks<TableEnv> for Tester<'_> {
    fn trial(&mut self, env: &TableEnv) {
        let Some(row) = env.current() else {
            return;
        };
        let actual = self.memory.recall(&row.input);
        let stat = self
            .scorer
            .score_test(&row.name, &row.target, &actual, &row.input);
        debug!(row = %row.name, recalled = stat.recalled, "test");
        self.stats.record(&stat);
    }
}

struct Trainer {
    scorer: MemoryScorer,
    net: Network,
    fresh: Network,
    reset_each_run: bool,
    stop_after_recall: bool,

    tests: Option<TableEnv>,
    phase: Option<(String, MemCategory)>,

    train: EpochMemStats,
    last_train: EpochMemStats,
    last_test: Option<EpochMemStats>,
    history: RecallHistory,
    summaries: Vec<RunSummary>,
}

impl Trainer {
    fn new(cfg: &ExperimentConfig, net: Network) -> Self {
        Self {
            scorer: cfg.scorer(),
            fresh: net.clone(),
            net,
            reset_each_run: true,
            stop_after_recall: cfg.stop_after_recall,
            tests: None,
            phase: None,
            train: EpochMemStats::new(),
            last_train: EpochMemStats::new(),
            last_test: None,
            history: RecallHistory::default(),
            summaries: Vec::new(),
        }
    }

    /// Start a training phase whose progress is judged on `focus` test rows.
    fn begin_phase(&mut self, name: &str, focus: MemCategory) {
        self.phase = Some((name.to_string(), focus));
        self.history = RecallHistory::default();
        self.last_test = None;
    }

    fn test_pass(&mut self, run: i32, rng: &mut Prng) -> Option<EpochMemStats> {
        let Network::Memory(memory) = &self.net else {
            return None;
        };
        let tests = self.tests.as_mut()?;
        tests.init(run, rng);
        let mut tester = Tester {
            memory,
            scorer: &self.scorer,
            stats: EpochMemStats::new(),
        };
        let mut looper = Looper::new(1, 1);
        looper.run_epoch(tests, rng, &mut tester);
        Some(tester.stats)
    }
}

impl LoopHooks<ActiveEnv> for Trainer {
    fn trial(&mut self, env: &ActiveEnv) {
        let Some(input) = env.state(elements::INPUT) else {
            return;
        };
        // Only table rows carry list names worth categorizing.
        let name = match env {
            ActiveEnv::Table(_) => env.label(),
            _ => env.name().to_string(),
        };
        let stat = match (&mut self.net, env) {
            (Network::Predictor(p), ActiveEnv::Fsa(fsa)) => {
                let Some(target) = env.state(elements::OUTPUT) else {
                    return;
                };
                let guess = p.predict();
                let stat = self.scorer.score_train(&name, target.values(), &guess);
                if let Some(&sym) = input.active(self.scorer.act_threshold).first() {
                    p.observe(sym, fsa.sequence_ended());
                }
                stat
            }
            (Network::Memory(m), _) => {
                let target = env.state(elements::TARGET).unwrap_or(input);
                let actual = m.recall(input.values());
                let stat = self.scorer.score_train(&name, target.values(), &actual);
                m.learn(target.values());
                stat
            }
            (Network::Predictor(_), _) => return,
        };
        debug!(trial = %env.label(), recalled = stat.recalled, "train");
        self.train.record(&stat);
    }

    fn epoch_end(
        &mut self,
        run: i32,
        epoch: i32,
        _env: &ActiveEnv,
        rng: &mut Prng,
    ) -> ControlFlow<()> {
        let train = std::mem::take(&mut self.train);
        info!(
            run,
            epoch,
            trials = train.trials,
            recall = train.overall_rate(),
            miss = train.mean_completion_miss(),
            confab = train.mean_confabulation(),
            "train epoch"
        );

        let test = self.test_pass(run, rng);
        let (rate, done) = match (&test, &self.phase) {
            (Some(t), Some((phase, focus))) => {
                for cat in MemCategory::ALL {
                    if let Some(r) = t.recall_rate(cat) {
                        info!(run, epoch, phase = %phase, category = %cat, recall = r, "test");
                    }
                }
                let r = t.recall_rate(*focus).unwrap_or(0.0);
                (r, r >= 1.0)
            }
            _ => (train.overall_rate(), train.all_recalled()),
        };

        let before = (
            self.history.learning_at_epoch,
            self.history.learned_at_epoch,
            self.history.mastered_at_epoch,
        );
        self.history.record_epoch(rate);
        if before.0.is_none() && self.history.learning_at_epoch.is_some() {
            info!(run, epoch, "milestone: learning");
        }
        if before.1.is_none() && self.history.learned_at_epoch.is_some() {
            info!(run, epoch, "milestone: learned");
        }
        if before.2.is_none() && self.history.mastered_at_epoch.is_some() {
            info!(run, epoch, "milestone: mastered");
        }

        self.last_train = train;
        self.last_test = test;

        if self.stop_after_recall && done {
            info!(run, epoch, "everything recalled; ending run");
            return ControlFlow::Break(());
        }
        ControlFlow::Continue(())
    }

    fn run_end(&mut self, run: i32, env: &ActiveEnv) {
        self.summaries.push(RunSummary {
            env: env.name().to_string(),
            phase: self.phase.as_ref().map(|(p, _)| p.clone()),
            run,
            epochs: self.history.epochs,
            trailing_recall: self.history.trailing_rate(),
            learning_at_epoch: self.history.learning_at_epoch,
            learned_at_epoch: self.history.learned_at_epoch,
            mastered_at_epoch: self.history.mastered_at_epoch,
            last_train: std::mem::take(&mut self.last_train),
            last_test: self.last_test.take(),
        });
        self.train.clear();
        self.history = RecallHistory::default();
        if self.reset_each_run {
            self.net = self.fresh.clone();
        }
    }
}

fn build_corpus(
    files: &[std::path::PathBuf],
    inline: &[String],
    vocab: &VocabSource,
    rng: &mut Prng,
) -> Result<CorpusEnv, RunError> {
    let mut paras = if files.is_empty() {
        Vec::new()
    } else {
        read_corpus(files)?
    };
    paras.extend(
        inline
            .iter()
            .map(|p| Paragraph::parse(p))
            .filter(|p| !p.is_empty()),
    );
    let env = match vocab {
        VocabSource::Scan => CorpusEnv::from_paragraphs("corpus", paras, rng)?,
        VocabSource::List(words) => {
            let mut env = CorpusEnv::new("corpus", Vocabulary::from_words(words.as_slice()))?;
            if let Err(e) = env.set_paragraphs(paras, rng) {
                warn!(error = %e, kept = env.paragraphs().len(), "continuing without rejected paragraphs");
            }
            env
        }
    };
    info!(
        paragraphs = env.paragraphs().len(),
        vocab = env.vocab().len(),
        "corpus loaded"
    );
    Ok(env)
}

fn run_single(
    cfg: &ExperimentConfig,
    mut env: ActiveEnv,
    net: Network,
    rng: &mut Prng,
) -> Vec<RunSummary> {
    env.set_sequential(cfg.sequential);
    let mut trainer = Trainer::new(cfg, net);
    let mut looper = Looper::new(cfg.runs, cfg.epochs);
    if !looper.run_all(&mut env, rng, &mut trainer) {
        warn!("stopped early");
    }
    trainer.summaries
}

/// AB then AC training on one memory per run, tested on every list after
/// each epoch.
fn run_ab_ac(
    cfg: &ExperimentConfig,
    params: AbAcParams,
    rng: &mut Prng,
) -> Result<Vec<RunSummary>, RunError> {
    let mut summaries = Vec::new();
    for run in 0..cfg.runs {
        let _span = tracing::info_span!("run", run).entered();
        let tables = AbAcTables::generate(params, rng);
        let memory = PatternMemory::new(params.list_size, cfg.act_threshold);

        let mut trainer = Trainer::new(cfg, Network::Memory(memory));
        trainer.reset_each_run = false;
        let mut tests = TableEnv::new("abac_test", tables.all_tests(), rng)?;
        tests.sequential = true;
        trainer.tests = Some(tests);

        let phases = [
            ("ab", &tables.train_ab, MemCategory::FirstList),
            ("ac", &tables.train_ac, MemCategory::SecondList),
        ];
        for (phase, rows, focus) in phases {
            let mut env: ActiveEnv = TableEnv::new(&format!("train_{phase}"), rows.clone(), rng)?.into();
            env.set_sequential(cfg.sequential);
            trainer.begin_phase(phase, focus);
            let mut looper = Looper::new(1, cfg.epochs);
            if !looper.run_all(&mut env, rng, &mut trainer) {
                warn!(phase, "stopped early");
                break;
            }
        }
        summaries.extend(trainer.summaries.into_iter().map(|mut s| {
            s.run = run;
            s
        }));
    }
    Ok(summaries)
}

fn run(config: Option<&Path>, summary_out: Option<&Path>) -> Result<(), RunError> {
    let cfg = match config {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            ExperimentConfig::load(path)?
        }
        None => ExperimentConfig::from_json_str(DEFAULT_CONFIG)?,
    };
    let mut rng = Prng::new(cfg.seed);
    info!(seed = cfg.seed, runs = cfg.runs, epochs = cfg.epochs, "experiment start");

    let summaries = match &cfg.env {
        EnvConfig::Corpus {
            files,
            paragraphs,
            vocab,
        } => {
            let env = build_corpus(files, paragraphs, vocab, &mut rng)?;
            let net = Network::Memory(PatternMemory::new(
                env.paragraphs().len().max(1),
                cfg.act_threshold,
            ));
            run_single(&cfg, env.into(), net, &mut rng)
        }
        EnvConfig::Fsa {
            grammar,
            sequences_per_epoch,
            max_sequence_len,
        } => {
            let mut env = FsaEnv::new("fsa", grammar.build()?, *sequences_per_epoch);
            env.set_max_sequence_len(*max_sequence_len);
            info!(alphabet = ?env.alphabet(), "grammar ready");
            let net = Network::Predictor(BigramPredictor::new(
                env.alphabet().len(),
                PREDICT_MIN_SHARE,
            ));
            run_single(&cfg, env.into(), net, &mut rng)
        }
        EnvConfig::Table {
            list_size,
            pattern_size,
            active,
            lures,
        } => {
            let params = AbAcParams {
                list_size: *list_size,
                pattern_size: *pattern_size,
                active: *active,
                lures: *lures,
            };
            run_ab_ac(&cfg, params, &mut rng)?
        }
    };

    let json = serde_json::to_string_pretty(&summaries)?;
    match summary_out {
        Some(path) => {
            fs::write(path, json)?;
            info!(path = %path.display(), "summary written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = args.first().map(Path::new);
    let summary_out = args.get(1).map(Path::new);

    match run(config, summary_out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_configs_parse() {
        for text in [
            include_str!("../../../demos/abac.json"),
            include_str!("../../../demos/reber.json"),
            include_str!("../../../demos/custom_grammar.json"),
            include_str!("../../../demos/corpus.json"),
            DEFAULT_CONFIG,
        ] {
            ExperimentConfig::from_json_str(text).unwrap();
        }
    }

    #[test]
    fn second_list_overwrites_first() {
        let cfg = ExperimentConfig::from_json_str(
            r#"{"epochs": 2, "env": {"type": "table", "list_size": 5}}"#,
        )
        .unwrap();
        let params = AbAcParams {
            list_size: 5,
            ..Default::default()
        };
        let mut rng = Prng::new(3);
        let s = run_ab_ac(&cfg, params, &mut rng).unwrap();
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].phase.as_deref(), Some("ab"));

        let after_ab = s[0].last_test.as_ref().unwrap();
        assert_eq!(after_ab.recall_rate(MemCategory::FirstList), Some(1.0));

        let after_ac = s[1].last_test.as_ref().unwrap();
        assert_eq!(after_ac.recall_rate(MemCategory::SecondList), Some(1.0));
        assert!(after_ac.recall_rate(MemCategory::FirstList).unwrap() < 1.0);
    }

    #[test]
    fn predictor_runs_on_grammar() {
        let cfg = ExperimentConfig::from_json_str(
            r#"{"runs": 2, "epochs": 3, "env": {"type": "fsa", "sequences_per_epoch": 5}}"#,
        )
        .unwrap();
        let mut rng = Prng::new(1);
        let env = FsaEnv::reber(5);
        let net = Network::Predictor(BigramPredictor::new(env.alphabet().len(), PREDICT_MIN_SHARE));
        let s = run_single(&cfg, env.into(), net, &mut rng);
        assert_eq!(s.len(), 2);
        assert!(s.iter().all(|r| r.epochs == 3 && r.last_test.is_none()));
        assert!(s[0].last_train.trials > 0);
    }
}
