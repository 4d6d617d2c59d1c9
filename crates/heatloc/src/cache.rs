use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::candidates::{CandidateGenerator, CandidateSet};

/// Image shape as `(height, width)`.
pub type Shape = (usize, usize);

/// Bounded, least recently used cache of candidate sets, keyed by image shape.
///
/// Candidate sets only depend on the image shape, and the shapes repeat across an evaluation
/// run. The cache can be shared between threads, a missing shape is generated once while the
/// cache is locked and every later lookup gets the same [`Arc`].
#[derive(Debug)]
pub struct CandidateCache {
    generator: CandidateGenerator,
    capacity: usize,
    inner: Mutex<LruSets>,
}

#[derive(Debug, Default)]
struct LruSets {
    sets: HashMap<Shape, Arc<CandidateSet>>,
    /// Least recently used shape at the front.
    recency: VecDeque<Shape>,
}

impl LruSets {
    fn touch(&mut self, shape: Shape) {
        if let Some(position) = self.recency.iter().position(|s| *s == shape) {
            self.recency.remove(position);
        }
        self.recency.push_back(shape);
    }
}

impl CandidateCache {
    /// Create a cache that retains the candidate sets of at most `capacity` shapes.
    ///
    /// A capacity of zero is raised to one.
    pub fn new(generator: CandidateGenerator, capacity: usize) -> Self {
        Self {
            generator,
            capacity: capacity.max(1),
            inner: Mutex::new(LruSets::default()),
        }
    }

    pub fn generator(&self) -> &CandidateGenerator {
        &self.generator
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of shapes currently cached.
    pub fn len(&self) -> usize {
        self.lock().sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().sets.is_empty()
    }

    pub fn contains(&self, shape: Shape) -> bool {
        self.lock().sets.contains_key(&shape)
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.sets.clear();
        inner.recency.clear();
    }

    /// Get the candidate set for `shape`, generating it on first use.
    ///
    /// When the cache is full, the least recently used shape is evicted.
    pub fn get_or_generate(&self, shape: Shape) -> Arc<CandidateSet> {
        let mut inner = self.lock();

        if let Some(set) = inner.sets.get(&shape).cloned() {
            tracing::trace!(?shape, "candidate cache hit");
            inner.touch(shape);
            return set;
        }

        let set = Arc::new(self.generator.generate(shape));

        if inner.sets.len() >= self.capacity {
            if let Some(evicted) = inner.recency.pop_front() {
                inner.sets.remove(&evicted);
                tracing::debug!(?evicted, "evicted candidate set");
            }
        }

        inner.sets.insert(shape, Arc::clone(&set));
        inner.touch(shape);

        set
    }

    fn lock(&self) -> MutexGuard<'_, LruSets> {
        // entries are only ever inserted whole, so a poisoned lock still guards consistent data
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CandidateCache {
    fn default() -> Self {
        Self::new(CandidateGenerator::default(), 32)
    }
}
