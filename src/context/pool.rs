//! Reuse of evaluation contexts across events.

use super::EvaluationContext;
use crate::config::PoolConfig;
use crate::event::Event;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

/// Counters describing pool behavior since creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts handed out.
    pub acquired: u64,
    /// Acquisitions served from an idle context.
    pub reused: u64,
    /// Acquisitions that had to allocate a new context.
    pub allocated: u64,
    /// Contexts returned to the pool.
    pub released: u64,
    /// Returned contexts dropped because the pool was full.
    pub discarded: u64,
    /// Contexts currently idle.
    pub idle: usize,
}

/// Thread-safe pool of reset evaluation contexts.
///
/// [`acquire`](Self::acquire) hands out a context already bound to an event,
/// wrapped in a [`PooledContext`] guard. Dropping the guard resets the context
/// and returns its storage to the pool, so a context can never be released
/// twice or used after release. Idle contexts beyond `max_idle` are freed.
///
/// # Example
/// ```rust,ignore
/// let pool = ContextPool::new();
/// {
///     let mut ctx = pool.acquire(&event);
///     let path = ctx.strings("open.file.path")?;
/// } // reset and returned here
/// assert_eq!(pool.idle_count(), 1);
/// ```
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<EvaluationContext<'static>>>,
    max_idle: usize,
    acquired: AtomicU64,
    reused: AtomicU64,
    allocated: AtomicU64,
    released: AtomicU64,
    discarded: AtomicU64,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::with_config(&PoolConfig::default())
    }

    /// Create a pool holding at most `config.max_idle` idle contexts, with
    /// `config.prewarm` of them allocated up front.
    pub fn with_config(config: &PoolConfig) -> Self {
        let prewarm = config.prewarm.min(config.max_idle);
        let idle = (0..prewarm).map(|_| EvaluationContext::new()).collect();
        Self {
            idle: Mutex::new(idle),
            max_idle: config.max_idle,
            acquired: AtomicU64::new(0),
            reused: AtomicU64::new(0),
            allocated: AtomicU64::new(0),
            released: AtomicU64::new(0),
            discarded: AtomicU64::new(0),
        }
    }

    /// Get a context bound to `event`.
    pub fn acquire<'p, 'e>(&'p self, event: &'e dyn Event) -> PooledContext<'p, 'e> {
        self.acquired.fetch_add(1, Ordering::Relaxed);
        let pooled = self.idle.lock().ok().and_then(|mut idle| idle.pop());
        let mut context: EvaluationContext<'e> = match pooled {
            Some(context) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                context
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                debug!("allocating evaluation context");
                EvaluationContext::new()
            }
        };
        context.bind(event);
        PooledContext {
            pool: self,
            context,
        }
    }

    /// Return a context early. Equivalent to dropping the guard.
    pub fn release(&self, context: PooledContext<'_, '_>) {
        drop(context);
    }

    pub fn idle_count(&self) -> usize {
        self.idle.lock().map(|idle| idle.len()).unwrap_or(0)
    }

    pub fn max_idle(&self) -> usize {
        self.max_idle
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquired: self.acquired.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
            allocated: self.allocated.load(Ordering::Relaxed),
            released: self.released.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            idle: self.idle_count(),
        }
    }

    fn give_back(&self, context: EvaluationContext<'_>) {
        self.released.fetch_add(1, Ordering::Relaxed);
        let context = context.detach();
        if let Ok(mut idle) = self.idle.lock() {
            if idle.len() < self.max_idle {
                idle.push(context);
                return;
            }
        }
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new()
    }
}

/// Context on loan from a [`ContextPool`].
///
/// Dereferences to [`EvaluationContext`]. Dropping it resets the context and
/// returns it to the pool.
#[derive(Debug)]
pub struct PooledContext<'p, 'e> {
    pool: &'p ContextPool,
    context: EvaluationContext<'e>,
}

impl<'e> Deref for PooledContext<'_, 'e> {
    type Target = EvaluationContext<'e>;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

impl<'e> DerefMut for PooledContext<'_, 'e> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.context
    }
}

impl Drop for PooledContext<'_, '_> {
    fn drop(&mut self) {
        let context = std::mem::take(&mut self.context);
        self.pool.give_back(context);
    }
}
