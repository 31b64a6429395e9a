//! Reusable node and buffer storage.
//!
//! A bounded free-list keeps cleared nodes around so the hot parse path can
//! skip the allocator.  Acquire hands out a [`Pooled`] guard; dropping the
//! guard clears the node and returns it to the free list.  When the list is
//! full, released nodes are simply dropped (direct allocation instead of
//! blocking), and when it is empty, acquire allocates fresh.

use log::warn;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, OnceLock, Weak};

use crate::diagnostics::{Diagnostic, DiagnosticCode, PathLocator};

/// Types that can live in an [`ObjectPool`].  `reset` must return the value
/// to its freshly-constructed state without giving up its allocations.
pub trait Poolable: Default {
    fn reset(&mut self);
}

impl<T> Poolable for Vec<T> {
    fn reset(&mut self) {
        self.clear();
    }
}

impl Poolable for String {
    fn reset(&mut self) {
        self.clear();
    }
}

/// Counters exposed by [`ObjectPool::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PoolStats {
    /// Acquisitions served from the free list.
    pub hits: u64,
    /// Acquisitions that had to allocate.
    pub misses: u64,
    /// Nodes returned to the free list.
    pub released: u64,
    /// Nodes dropped because the free list was full.
    pub discarded: u64,
    /// Largest free-list size observed.
    pub high_water: usize,
}

impl PoolStats {
    /// Fraction of acquisitions served without allocating.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            return 1.0;
        }
        self.hits as f64 / total as f64
    }

    pub fn allocations(&self) -> u64 {
        self.misses
    }
}

/// A bounded free-list of reusable nodes.
pub struct ObjectPool<T: Poolable> {
    free: Mutex<Vec<T>>,
    max_size: usize,
    hit_rate_floor: f64,
    stats: Mutex<PoolStats>,
}

/// Acquisitions below this count never trip the hit-rate warning; a cold
/// pool always starts with misses.
const HIT_RATE_SAMPLE_FLOOR: u64 = 64;

impl<T: Poolable> ObjectPool<T> {
    pub fn new(max_size: usize) -> Self {
        ObjectPool {
            free: Mutex::new(Vec::new()),
            max_size,
            hit_rate_floor: 0.0,
            stats: Mutex::new(PoolStats::default()),
        }
    }

    /// Set the hit-rate floor below which [`ObjectPool::health_check`]
    /// reports a warning.
    pub fn with_hit_rate_floor(mut self, floor: f64) -> Self {
        self.hit_rate_floor = floor;
        self
    }

    /// Take a node from the free list, or allocate one when the list is
    /// empty.  The returned guard hands the node back on drop.
    pub fn acquire(self: &Arc<Self>) -> Pooled<T> {
        let value = {
            let mut free = self.free.lock().unwrap();
            free.pop()
        };

        let mut stats = self.stats.lock().unwrap();
        let value = match value {
            Some(v) => {
                stats.hits += 1;
                v
            }
            None => {
                stats.misses += 1;
                T::default()
            }
        };
        drop(stats);

        Pooled {
            value: Some(value),
            pool: Arc::downgrade(self),
        }
    }

    /// Clear a node and return it to the free list.  Called by the
    /// [`Pooled`] guard; also usable directly for detached values.
    pub fn release(&self, mut value: T) {
        value.reset();
        let mut free = self.free.lock().unwrap();
        let mut stats = self.stats.lock().unwrap();
        if free.len() < self.max_size {
            free.push(value);
            stats.released += 1;
            if free.len() > stats.high_water {
                stats.high_water = free.len();
            }
        } else {
            stats.discarded += 1;
        }
    }

    pub fn stats(&self) -> PoolStats {
        *self.stats.lock().unwrap()
    }

    /// Current free-list length.
    pub fn available(&self) -> usize {
        self.free.lock().unwrap().len()
    }

    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Reports a warning diagnostic when the hit rate has dropped below the
    /// configured floor, once enough acquisitions have been sampled.
    pub fn health_check(&self) -> Option<Diagnostic> {
        let stats = self.stats();
        let sampled = stats.hits + stats.misses;
        if sampled < HIT_RATE_SAMPLE_FLOOR || stats.hit_rate() >= self.hit_rate_floor {
            return None;
        }

        let message = format!(
            "pool hit rate {:.2} below floor {:.2} after {} acquisitions",
            stats.hit_rate(),
            self.hit_rate_floor,
            sampled
        );
        warn!("{}", message);
        Some(Diagnostic::warning(
            DiagnosticCode::PoolHitRateLow,
            PathLocator::new(),
            message,
        ))
    }
}

/// Guard for a pooled node.  Deref to use it; drop to hand it back.
pub struct Pooled<T: Poolable> {
    value: Option<T>,
    pool: Weak<ObjectPool<T>>,
}

impl<T: Poolable> Pooled<T> {
    /// Detach the node from the pool; it will never be returned.
    pub fn into_inner(mut self) -> T {
        self.value.take().expect("pooled value already taken")
    }
}

impl<T: Poolable> Deref for Pooled<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value.as_ref().expect("pooled value already taken")
    }
}

impl<T: Poolable> DerefMut for Pooled<T> {
    fn deref_mut(&mut self) -> &mut T {
        self.value.as_mut().expect("pooled value already taken")
    }
}

impl<T: Poolable> Drop for Pooled<T> {
    fn drop(&mut self) {
        if let (Some(value), Some(pool)) = (self.value.take(), self.pool.upgrade()) {
            pool.release(value);
        }
    }
}

/// Default capacity of the process-wide buffer pool.
pub const DEFAULT_POOL_CAPACITY: usize = 128;

/// The process-wide byte-buffer pool shared by the streaming parser and the
/// MLLP framer.  Scoped pools can be injected instead wherever an
/// `Arc<ObjectPool<Vec<u8>>>` is accepted.
pub fn global_buffer_pool() -> Arc<ObjectPool<Vec<u8>>> {
    static POOL: OnceLock<Arc<ObjectPool<Vec<u8>>>> = OnceLock::new();
    POOL.get_or_init(|| Arc::new(ObjectPool::new(DEFAULT_POOL_CAPACITY)))
        .clone()
}
