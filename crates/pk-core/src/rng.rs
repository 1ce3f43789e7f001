//! Named random streams.
//!
//! A replication declares a set of [`RngId`]s; each one names a stream that
//! the model draws from for a single purpose (transmission, vaccination
//! uptake, sampling, ...).  Streams are seeded once from the replication
//! seed and never touch each other's state, so adding draws to one purpose
//! leaves every other purpose's sequence exactly as it was.
//!
//! A stream's seed is `replication_seed ^ id * GOLDEN`, where `GOLDEN` is the
//! 64-bit fractional golden ratio.  Neighbouring ids therefore land far
//! apart in seed space, and declaring a new stream never reseeds an old one.
//!
//! [`StreamRng`] implements [`RngCore`], so the whole `rand::Rng` API is
//! available; the inherent helpers cover what the kernel itself draws.

use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand::{Rng, RngCore, SeedableRng};

use crate::{CoreError, CoreResult, RngId};

const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

// ── StreamRng ─────────────────────────────────────────────────────────────────

/// The stream behind one [`RngId`].  Counts the words it has produced.
pub struct StreamRng {
    id:    RngId,
    words: u64,
    rng:   SmallRng,
}

impl StreamRng {
    pub fn new(replication_seed: u64, id: RngId) -> Self {
        let seed = replication_seed ^ u64::from(id.0).wrapping_mul(GOLDEN);
        Self { id, words: 0, rng: SmallRng::seed_from_u64(seed) }
    }

    pub fn id(&self) -> RngId {
        self.id
    }

    /// Words drawn since seeding.  Two streams with the same seed and the
    /// same count are in the same state.
    pub fn words_drawn(&self) -> u64 {
        self.words
    }

    /// Uniform on `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.r#gen()
    }

    /// Uniform on `0..n`.  `n` must be positive.
    pub fn below(&mut self, n: usize) -> usize {
        self.gen_range(0..n)
    }

    /// `true` with probability `p`; values outside `[0, 1]` saturate.
    pub fn chance(&mut self, p: f64) -> bool {
        if p.is_nan() || p <= 0.0 {
            return false;
        }
        p >= 1.0 || self.uniform() < p
    }

    /// Waiting time until the next event of a Poisson process with `rate`.
    /// `None` unless `rate` is positive and finite.
    pub fn exponential(&mut self, rate: f64) -> Option<f64> {
        if !(rate.is_finite() && rate > 0.0) {
            return None;
        }
        // 1 - u lies in (0, 1], so the logarithm is finite.
        Some(-(1.0 - self.uniform()).ln() / rate)
    }

    /// One element of `items`, each equally likely.
    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(self)
    }
}

impl RngCore for StreamRng {
    fn next_u32(&mut self) -> u32 {
        self.words += 1;
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.words += 1;
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.words += dest.len().div_ceil(8) as u64;
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

// ── RngStreams ────────────────────────────────────────────────────────────────

/// Every stream declared for one replication, addressed by [`RngId`].
pub struct RngStreams {
    streams: Vec<Option<StreamRng>>,
}

impl RngStreams {
    /// Seed a stream for each id in `declared`; repeats are ignored.
    pub fn new(replication_seed: u64, declared: &[RngId]) -> Self {
        let mut streams: Vec<Option<StreamRng>> = Vec::new();
        for &id in declared {
            if streams.len() <= id.index() {
                streams.resize_with(id.index() + 1, || None);
            }
            streams[id.index()].get_or_insert_with(|| StreamRng::new(replication_seed, id));
        }
        Self { streams }
    }

    /// The stream for `id`, or `UnknownRandomNumberGeneratorId` if it was
    /// never declared.
    pub fn get_mut(&mut self, id: RngId) -> CoreResult<&mut StreamRng> {
        match self.streams.get_mut(id.index()) {
            Some(Some(stream)) => Ok(stream),
            _ => Err(CoreError::UnknownRandomNumberGeneratorId(id)),
        }
    }

    pub fn contains(&self, id: RngId) -> bool {
        matches!(self.streams.get(id.index()), Some(Some(_)))
    }

    /// Number of declared streams.
    pub fn len(&self) -> usize {
        self.streams.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Declared ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = RngId> + '_ {
        self.streams.iter().flatten().map(StreamRng::id)
    }
}
