use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use libafl_bolts::rands::StdRand;

use crate::config::Config;
use crate::corpus::CorpusManager;
use crate::coverage::CoverageTracker;
use crate::crash::ErrorDetector;
use crate::driver::ExecutionDriver;
use crate::error::is_target_exception_message;
use crate::mutate::InputGenerator;

const PROGRESS_LOG_INTERVAL: u64 = 1000;

/// Snapshot emitted periodically during a run and returned at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzProgress {
    pub iteration: u64,
    pub corpus_size: usize,
    pub covered_edges: usize,
    pub crash_count: usize,
}

/// Terminal result of a [`FuzzerEngine::run`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuzzSummary {
    pub iterations: u64,
    pub corpus_size: usize,
    pub covered_edges: usize,
    pub crash_count: usize,
}

/// The single-threaded cooperative scheduler: repeatedly picks a corpus
/// member, mutates it `mutate_count` times, and folds the coverage/crash
/// signal from each execution back into its own state.
pub struct FuzzerEngine<D: ExecutionDriver> {
    config: Config,
    driver: D,
    generator: InputGenerator,
    corpus: CorpusManager,
    tracker: CoverageTracker,
    detector: ErrorDetector,
    pick_rng: StdRand,
}

impl<D: ExecutionDriver> FuzzerEngine<D> {
    pub fn new(config: Config, driver: D) -> Self {
        let generator = InputGenerator::new(config.rng_seed, config.input_arity);
        let tracker = CoverageTracker::new(config.bitmap_size);
        let pick_rng = StdRand::with_seed(config.rng_seed);
        Self {
            config,
            driver,
            generator,
            corpus: CorpusManager::new(),
            tracker,
            detector: ErrorDetector::new(),
            pick_rng,
        }
    }

    /// Seeds the corpus. Idempotent-ish in effect: re-seeding only adds
    /// inputs the corpus doesn't already contain.
    pub fn initialize(&mut self) {
        for seed in self.generator.generate_seeds(self.config.seed_count) {
            self.corpus.add(seed);
        }
    }

    fn progress(&self, iteration: u64) -> FuzzProgress {
        FuzzProgress {
            iteration,
            corpus_size: self.corpus.size(),
            covered_edges: self.tracker.stats().covered_edges,
            crash_count: self.detector.count(),
        }
    }

    fn summary(&self, iterations: u64) -> FuzzSummary {
        FuzzSummary {
            iterations,
            corpus_size: self.corpus.size(),
            covered_edges: self.tracker.stats().covered_edges,
            crash_count: self.detector.count(),
        }
    }

    /// Runs until `max_iterations`, an empty corpus, or `cancel` is
    /// observed at an iteration boundary. Never panics on driver/spawn
    /// failure or timeout — those iterations are simply no-ops for the
    /// corpus and crash list.
    pub fn run(&mut self, cancel: &AtomicBool) -> FuzzSummary {
        self.initialize();

        let mut iteration = 0u64;
        while iteration < self.config.max_iterations && !self.corpus.is_empty() {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            iteration += 1;

            let Some(base) = self.corpus.pick(&mut self.pick_rng).map(<[i64]>::to_vec) else {
                break;
            };

            for _ in 0..self.config.mutate_count {
                let candidate = self.generator.mutate(&base);
                let (trace, err) = self.driver.run(&candidate);

                let novel = trace.as_deref().is_some_and(|t| self.tracker.update_from_trace(t));

                if let Some(message) = &err {
                    if is_target_exception_message(message) {
                        self.detector.record(&candidate, Some(message));
                    }
                }

                if novel {
                    self.corpus.add(candidate);
                }
            }

            if iteration % PROGRESS_LOG_INTERVAL == 0 {
                let snapshot = self.progress(iteration);
                tracing::info!(
                    iteration = snapshot.iteration,
                    corpus_size = snapshot.corpus_size,
                    covered_edges = snapshot.covered_edges,
                    crash_count = snapshot.crash_count,
                    "fuzzing progress"
                );
            }
        }

        let summary = self.summary(iteration);
        tracing::info!(
            iterations = summary.iterations,
            corpus_size = summary.corpus_size,
            covered_edges = summary.covered_edges,
            crash_count = summary.crash_count,
            "fuzzing run complete"
        );
        summary
    }

    pub fn corpus_size(&self) -> usize {
        self.corpus.size()
    }

    pub fn crash_count(&self) -> usize {
        self.detector.count()
    }

    pub fn covered_edges(&self) -> usize {
        self.tracker.stats().covered_edges
    }
}

/// Shared, lock-protected state for the optional multi-worker mode: one
/// mutex per component, coarse locking rather than per-cell atomics.
pub struct SharedState {
    pub corpus: Mutex<CorpusManager>,
    pub tracker: Mutex<CoverageTracker>,
    pub detector: Mutex<ErrorDetector>,
}

impl SharedState {
    pub fn new(bitmap_size: usize) -> Self {
        Self {
            corpus: Mutex::new(CorpusManager::new()),
            tracker: Mutex::new(CoverageTracker::new(bitmap_size)),
            detector: Mutex::new(ErrorDetector::new()),
        }
    }
}

/// One worker's iteration loop against the shared state, mirroring
/// `run_loop1_threaded`'s per-thread body in the teacher crate.
fn run_worker<D: ExecutionDriver>(
    worker_id: usize,
    config: &Config,
    mut driver: D,
    shared: &Arc<SharedState>,
    cancel: &Arc<AtomicBool>,
) -> u64 {
    let mut generator = InputGenerator::new(config.rng_seed.wrapping_add(worker_id as u64), config.input_arity);
    let mut pick_rng = StdRand::with_seed(config.rng_seed.wrapping_add(worker_id as u64));

    let mut iteration = 0u64;
    loop {
        if iteration >= config.max_iterations || cancel.load(Ordering::Relaxed) {
            break;
        }

        let base = {
            let corpus = shared.corpus.lock().unwrap();
            match corpus.pick(&mut pick_rng) {
                Some(base) => base.to_vec(),
                None => break,
            }
        };
        iteration += 1;

        for _ in 0..config.mutate_count {
            let candidate = generator.mutate(&base);
            let (trace, err) = driver.run(&candidate);

            let novel = {
                let mut tracker = shared.tracker.lock().unwrap();
                trace.as_deref().is_some_and(|t| tracker.update_from_trace(t))
            };

            if let Some(message) = &err {
                if is_target_exception_message(message) {
                    shared.detector.lock().unwrap().record(&candidate, Some(message));
                }
            }

            if novel {
                shared.corpus.lock().unwrap().add(candidate);
            }
        }
    }
    iteration
}

/// Spawns `drivers.len()` worker threads sharing one [`SharedState`],
/// named and stack-sized the way `run_loop1_threaded` spawns its workers
/// in the teacher crate. Each worker owns its own [`ExecutionDriver`] (the
/// caller is responsible for giving each one a unique shm/map/CSV path —
/// the agent is not safe to share those files across workers).
pub fn run_parallel<D>(
    config: Config,
    drivers: Vec<D>,
    seed_count: usize,
    cancel: Arc<AtomicBool>,
) -> FuzzSummary
where
    D: ExecutionDriver + Send + 'static,
{
    let shared = Arc::new(SharedState::new(config.bitmap_size));

    {
        let mut generator = InputGenerator::new(config.rng_seed, config.input_arity);
        let mut corpus = shared.corpus.lock().unwrap();
        for seed in generator.generate_seeds(seed_count) {
            corpus.add(seed);
        }
    }

    let config = Arc::new(config);
    let handles: Vec<_> = drivers
        .into_iter()
        .enumerate()
        .map(|(worker_id, driver)| {
            let shared = Arc::clone(&shared);
            let cancel = Arc::clone(&cancel);
            let config = Arc::clone(&config);
            std::thread::Builder::new()
                .name(format!("bytescribe-worker-{worker_id}"))
                .stack_size(8 * 1024 * 1024)
                .spawn(move || run_worker(worker_id, &config, driver, &shared, &cancel))
                .expect("failed to spawn fuzzing worker thread")
        })
        .collect();

    let iterations = handles.into_iter().map(|h| h.join().unwrap_or(0)).sum();

    let corpus_size = shared.corpus.lock().unwrap().size();
    let covered_edges = shared.tracker.lock().unwrap().stats().covered_edges;
    let crash_count = shared.detector.lock().unwrap().count();

    FuzzSummary { iterations, corpus_size, covered_edges, crash_count }
}
