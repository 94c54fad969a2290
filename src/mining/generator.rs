use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;

use super::{report, state::MiningState};
use crate::{
    Cascade,
    Config,
    MiningConfig,
    Patch,
    Shape,
    config::DEFAULT_PATCH_SIZE,
    patch::load_gray,
};


/// Summary of one mining round.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MiningStats {
    /// Number of requested hard negatives.
    pub requested: usize,
    /// Backgrounds claimed during the round.
    pub nega_n: usize,
    /// Carts evaluated during the round.
    pub carts_n: usize,
    /// Found over requested.
    pub ratio: f64,
    /// Hard negatives taken from the pool.
    pub hard_used: usize,
    /// Backgrounds consumed since the last rewind, over every round.
    pub bg_used: usize,
    /// Wall-clock time of the round.
    pub elapsed: Duration,
}


/// Hard negatives found by one mining round.
/// The three columns are index-aligned.
#[derive(Debug, Clone, Default)]
pub struct MiningOutcome {
    /// Accepted patches.
    pub images: Vec<Patch>,
    /// Cascade score of each patch.
    pub scores: Vec<f64>,
    /// Shape estimate of each patch.
    pub shapes: Vec<Shape>,
    /// Counters of the round.
    pub stats: MiningStats,
}


impl MiningOutcome {
    /// Number of mined samples.
    /// May fall short of, or slightly exceed, the request.
    #[inline]
    pub fn real_size(&self) -> usize {
        self.images.len()
    }
}


#[derive(Debug, Default)]
struct Hits {
    images: Vec<Patch>,
    scores: Vec<f64>,
    shapes: Vec<Shape>,
    nega_n: usize,
    carts_n: usize,
    ratio: f64,
}


/// Accumulator shared by the workers of a mining round.
///
/// The lock is taken once per evaluated batch.
/// The hit count is mirrored in an atomic
/// so workers check the stop condition without locking.
#[derive(Debug)]
pub struct MiningSink {
    inner: Mutex<Hits>,
    found: AtomicUsize,
    target: usize,
}


impl MiningSink {
    /// An empty accumulator aiming at `target` hits.
    pub fn new(target: usize) -> Self {
        Self {
            inner: Mutex::new(Hits::default()),
            found: AtomicUsize::new(0),
            target,
        }
    }


    /// Number of hits so far.
    #[inline]
    pub fn found(&self) -> usize {
        self.found.load(Ordering::Acquire)
    }


    /// Returns `true` once the target is reached.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.found() >= self.target
    }


    fn record(
        &self,
        hits: Vec<(Patch, f64, Shape)>,
        carts_n: usize,
        nega_n: usize,
    )
    {
        let mut inner = self.inner.lock()
            .unwrap_or_else(PoisonError::into_inner);
        for (image, score, shape) in hits {
            inner.images.push(image);
            inner.scores.push(score);
            inner.shapes.push(shape);
        }
        inner.carts_n += carts_n;
        inner.nega_n += nega_n;

        let found = inner.images.len();
        inner.ratio = found as f64 / self.target.max(1) as f64;
        self.found.store(found, Ordering::Release);
    }


    fn into_hits(self) -> Hits {
        self.inner.into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }


    /// Consume the accumulator.
    /// Only the counters kept under the lock are filled in the stats.
    pub fn into_outcome(self) -> MiningOutcome {
        let requested = self.target;
        let Hits { images, scores, shapes, nega_n, carts_n, ratio } = self.into_hits();
        let stats = MiningStats {
            requested,
            nega_n,
            carts_n,
            ratio,
            ..MiningStats::default()
        };
        MiningOutcome { images, scores, shapes, stats }
    }
}


/// Mines hard negatives from background images.
///
/// The generator owns the background list and the pool of hard negatives.
/// Both are only modified between mining rounds.
/// Backgrounds are consumed through a cursor that persists across rounds,
/// so every background is scanned once until [`NegGenerator::rewind`].
/// The worker states persist too: a background left half-scanned
/// when a round reaches its target is resumed by the next round.
///
/// # Example
/// ```no_run
/// use jda::prelude::*;
///
/// let config = Config::default().n_threads(4);
/// let mut generator = NegGenerator::new(&config);
/// generator.load(read_nested_list("data/bg.txt").unwrap());
///
/// let cascade = StagedCascade::<Box<dyn Cart>>::new(Shape::zeros(5));
/// let outcome = generator.generate(&cascade, 1000);
/// println!("mined {} hard negatives", outcome.real_size());
/// ```
#[derive(Debug)]
pub struct NegGenerator {
    list: Vec<PathBuf>,
    hds: Vec<Patch>,
    config: MiningConfig,
    patch_size: u32,
    n_workers: usize,
    states: Vec<MiningState>,
    bg_cursor: AtomicUsize,
    hd_cursor: AtomicUsize,
}


impl Default for NegGenerator {
    fn default() -> Self {
        Self {
            list: Vec::new(),
            hds: Vec::new(),
            config: MiningConfig::default(),
            patch_size: DEFAULT_PATCH_SIZE,
            n_workers: 0,
            states: Vec::new(),
            bg_cursor: AtomicUsize::new(0),
            hd_cursor: AtomicUsize::new(0),
        }
    }
}


impl NegGenerator {
    /// An empty generator configured by `config`.
    pub fn new(config: &Config) -> Self {
        Self {
            config: config.mining.clone(),
            patch_size: config.patch_size,
            n_workers: config.n_threads,
            ..Self::default()
        }
    }


    /// Set the number of workers. `0` means every rayon thread.
    pub fn workers(mut self, n_workers: usize) -> Self {
        self.n_workers = n_workers;
        self
    }


    /// Mining parameters.
    pub fn config(&self) -> &MiningConfig {
        &self.config
    }


    /// Side length of the mined patches.
    pub fn patch_size(&self) -> u32 {
        self.patch_size
    }


    /// Append background image paths.
    pub fn load<I>(&mut self, paths: I)
        where I: IntoIterator<Item = PathBuf>
    {
        self.list.extend(paths);
    }


    /// Append patches to the hard negative pool.
    /// They are tried before any background in the next round.
    pub fn push_hard_negatives<I>(&mut self, patches: I)
        where I: IntoIterator<Item = Patch>
    {
        self.hds.extend(patches);
    }


    /// Number of background images.
    pub fn n_backgrounds(&self) -> usize {
        self.list.len()
    }


    /// Number of hard negatives waiting in the pool.
    pub fn n_hard_negatives(&self) -> usize {
        self.hds.len()
    }


    /// Scan the backgrounds again from the first one.
    /// Backgrounds in flight are dropped.
    pub fn rewind(&mut self) {
        self.bg_cursor.store(0, Ordering::Relaxed);
        self.states.clear();
    }


    /// Number of backgrounds consumed so far.
    ///
    /// The counter is read with relaxed ordering,
    /// so the value is approximate while a round is running.
    pub fn report_bg_image_used(&self) -> usize {
        self.bg_cursor
            .load(Ordering::Relaxed)
            .min(self.list.len())
    }


    /// The next candidate for `state`.
    ///
    /// Hard negatives in the pool come first.
    /// Then `state` sweeps its background and claims a new one
    /// from the shared cursor when exhausted.
    /// Unreadable backgrounds are skipped.
    /// Returns `None` once both sources are exhausted.
    pub fn next_image(&self, state: &mut MiningState) -> Option<Patch> {
        if self.hd_cursor.load(Ordering::Relaxed) < self.hds.len() {
            let idx = self.hd_cursor.fetch_add(1, Ordering::Relaxed);
            if let Some(patch) = self.hds.get(idx) {
                state.current_hd_idx = Some(idx);
                return Some(patch.clone());
            }
        }

        loop {
            if let Some(patch) = state.next_patch(&self.config, self.patch_size) {
                return Some(patch);
            }

            let idx = self.bg_cursor.fetch_add(1, Ordering::Relaxed);
            let path = self.list.get(idx)?;
            state.claimed += 1;
            match load_gray(path) {
                Ok(image) => {
                    if !state.begin(idx, image, &self.config) {
                        tracing::debug!(
                            path = %path.display(),
                            "background smaller than the minimal window"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        thread = state.thread_id(),
                        error = %e,
                        "skipping unreadable background"
                    );
                },
            }
        }
    }


    /// Mine `size` hard negatives passing every stage of `cascade`.
    ///
    /// The round stops when `size` hits are found
    /// or when the backgrounds run out.
    /// Each worker may finish the batch in flight after the target
    /// is reached, so the outcome can exceed `size` by less than
    /// `n_workers * pool_size`.
    pub fn generate<K>(&mut self, cascade: &K, size: usize) -> MiningOutcome
        where K: Cascade,
    {
        if size == 0 {
            return MiningOutcome::default();
        }

        let now = Instant::now();
        let n_workers = match self.n_workers {
            0 => rayon::current_num_threads(),
            n => n,
        };
        if self.config.verbose {
            report::print_header();
        }

        let sink = MiningSink::new(size);
        let mut states = std::mem::take(&mut self.states);
        if states.len() > n_workers {
            tracing::debug!(
                from = states.len(),
                to = n_workers,
                "fewer workers, dropping the extra states"
            );
            states.truncate(n_workers);
        }
        let n_states = states.len();
        states.extend((n_states..n_workers).map(MiningState::new));

        let this = &*self;
        let mut run = || {
            states.par_iter_mut()
                .for_each(|state| this.parallel_mining(cascade, size, state, &sink));
        };
        match ThreadPoolBuilder::new().num_threads(n_workers).build() {
            Ok(pool) => pool.install(run),
            Err(e) => {
                tracing::warn!(error = %e, "falling back to the global thread pool");
                run();
            },
        }
        self.states = states;

        let hard_used = self.hd_cursor
            .load(Ordering::Relaxed)
            .min(self.hds.len());
        self.hds.drain(..hard_used);
        self.hd_cursor.store(0, Ordering::Relaxed);

        let mut outcome = sink.into_outcome();
        outcome.stats.hard_used = hard_used;
        outcome.stats.bg_used = self.report_bg_image_used();
        outcome.stats.elapsed = now.elapsed();

        tracing::info!(
            requested = size,
            found = outcome.images.len(),
            backgrounds = outcome.stats.nega_n,
            carts = outcome.stats.carts_n,
            hard_used,
            "mining round finished"
        );
        if self.config.verbose {
            report::print_round(&outcome.stats, outcome.images.len(), self.list.len());
        }

        outcome
    }


    /// The work of one worker.
    ///
    /// Pulls batches of `pool_size` candidates through `state`,
    /// evaluates them without any lock, and records the accepted ones
    /// in `sink` with a single lock per batch.
    /// Returns when `sink` holds `size` hits or the inputs run out.
    pub fn parallel_mining<K>(
        &self,
        cascade: &K,
        size: usize,
        state: &mut MiningState,
        sink: &MiningSink,
    )
        where K: Cascade,
    {
        let pool_size = self.config.pool_size.max(1);
        let mut batch = Vec::with_capacity(pool_size);

        while sink.found() < size {
            batch.extend(
                std::iter::from_fn(|| self.next_image(state)).take(pool_size)
            );
            if batch.is_empty() {
                break;
            }
            let exhausted = batch.len() < pool_size;

            let mut carts_n = 0;
            let hits = batch.drain(..)
                .filter_map(|patch| {
                    let verdict = cascade.validate(&patch);
                    carts_n += verdict.n_carts;
                    verdict.is_face
                        .then(|| (patch, verdict.score, verdict.shape))
                })
                .collect::<Vec<_>>();

            let claimed = std::mem::take(&mut state.claimed);
            sink.record(hits, carts_n, claimed);

            if exhausted {
                break;
            }
        }

        let claimed = std::mem::take(&mut state.claimed);
        if claimed > 0 {
            sink.record(Vec::new(), 0, claimed);
        }
    }
}
