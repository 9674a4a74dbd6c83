use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use super::Context;

/// Default number of idle contexts kept for reuse.
pub const DEFAULT_POOL_CAPACITY: usize = 1024;

/// Snapshot of pool activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    /// Contexts allocated because the free list was empty.
    pub created: usize,
    /// Acquisitions served from the free list.
    pub reused: usize,
    /// Released contexts dropped because the pool was full.
    pub discarded: usize,
    /// Contexts currently idle in the pool.
    pub idle: usize,
}

/// Thread-safe free list of reset [`Context`]s.
///
/// `release` resets before pushing, so `acquire` never hands out state from a
/// previous request. When the pool is full the released context is dropped.
#[derive(Debug)]
pub struct ContextPool {
    free: Mutex<Vec<Box<Context>>>,
    capacity: usize,
    created: AtomicUsize,
    reused: AtomicUsize,
    discarded: AtomicUsize,
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(DEFAULT_POOL_CAPACITY)
    }
}

impl ContextPool {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity.min(DEFAULT_POOL_CAPACITY))),
            capacity,
            created: AtomicUsize::new(0),
            reused: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
        }
    }

    /// Pool with `prewarm` contexts allocated up front (bounded by `capacity`).
    #[must_use]
    pub fn with_prewarm(capacity: usize, prewarm: usize) -> Self {
        let pool = Self::new(capacity);
        let count = prewarm.min(capacity);
        {
            let mut free = pool.lock();
            free.extend((0..count).map(|_| Box::new(Context::new())));
        }
        pool.created.fetch_add(count, Ordering::Relaxed);
        debug!(capacity, prewarm = count, "Context pool prewarmed");
        pool
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<Context>>> {
        // a panicking holder cannot leave the Vec itself inconsistent
        self.free.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take a clean context, allocating one if the pool is empty.
    #[must_use]
    pub fn acquire(&self) -> Box<Context> {
        let recycled = self.lock().pop();
        match recycled {
            Some(ctx) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                ctx
            }
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Box::new(Context::new())
            }
        }
    }

    /// Reset `ctx` and return it to the pool.
    pub fn release(&self, mut ctx: Box<Context>) {
        ctx.reset();
        let mut free = self.lock();
        if free.len() < self.capacity {
            free.push(ctx);
        } else {
            drop(free);
            self.discarded.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            created: self.created.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle: self.idle(),
        }
    }
}
