//! A bounded pool of FerroHash contexts.
//!
//! Every context carries a ~256 KiB dataset, so handing each thread its
//! own context would let memory grow with concurrency. The pool instead:
//!
//! 1. Caps the total number of contexts at `max_contexts`
//! 2. Hands contexts out through RAII guards that return the slot on drop
//! 3. Reuses contexts already keyed for the requested key block, evicting
//!    the least recently used free context otherwise
//! 4. Blocks callers when every slot is busy, with priority-dependent
//!    timeouts
//!
//! Block validation acquires at [`AcquisitionPriority::ConsensusCritical`]
//! and never times out: rejecting a valid block because the pool was busy
//! would be a consensus failure. Mining uses `High`, RPC and diagnostics
//! use `Normal`; both may observe a timeout under sustained exhaustion.
//!
//! Two condition variables implement the priority ordering: `slot_cv`
//! parks waiters for a free slot, `priority_cv` parks lower-priority
//! waiters whenever a higher-priority waiter exists. At the moment a slot
//! frees, any consensus-critical waiter is served before any high waiter,
//! and any high waiter before any normal one. Ordering within a class is
//! best effort.

use crate::ferrohash::FerrohashContext;
use ferrite_primitives::Hash256;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, warn};

/// Default cap on pooled contexts. Eight contexts keep worst-case pool
/// memory near 2 MiB while covering typical validation parallelism.
pub const DEFAULT_MAX_CONTEXTS: usize = 8;

/// How long a `Normal` acquisition waits before giving up.
const NORMAL_TIMEOUT: Duration = Duration::from_secs(30);

/// How long a `High` acquisition waits before giving up.
const HIGH_TIMEOUT: Duration = Duration::from_secs(120);

/// Below this many lifetime acquisitions the reinitialization rate is
/// statistically meaningless and never warned about.
const REINIT_WARN_MIN_ACQUISITIONS: u64 = 64;

/// Priority levels for context acquisition.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum AcquisitionPriority {
    /// RPC queries and other non-critical operations.
    Normal,
    /// Mining and other important operations.
    High,
    /// Block validation. Must never time out, otherwise a loaded node
    /// could reject a valid chain.
    ConsensusCritical,
}

impl AcquisitionPriority {
    fn default_timeout(self) -> Option<Duration> {
        match self {
            AcquisitionPriority::Normal => Some(NORMAL_TIMEOUT),
            AcquisitionPriority::High => Some(HIGH_TIMEOUT),
            AcquisitionPriority::ConsensusCritical => None,
        }
    }
}

/// Pool counters for monitoring.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Contexts created so far.
    pub total_contexts: usize,
    /// Contexts currently checked out.
    pub active_contexts: usize,
    /// Contexts ready for use.
    pub available_contexts: usize,
    /// Successful acquisitions.
    pub total_acquisitions: u64,
    /// Acquisitions that had to wait.
    pub total_waits: u64,
    /// Acquisitions that gave up waiting.
    pub total_timeouts: u64,
    /// Contexts reinitialized for a new key.
    pub key_reinitializations: u64,
    /// Acquisitions at consensus-critical priority.
    pub consensus_critical_acquisitions: u64,
    /// Acquisitions at high priority.
    pub high_priority_acquisitions: u64,
    /// Freed slots yielded by a waiting normal caller to a
    /// higher-priority waiter.
    pub priority_preemptions: u64,
}

/// Error from pool reconfiguration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolConfigError {
    /// The pool has already served an acquisition; the cap is frozen.
    #[error("context pool is already in use; max_contexts can no longer change")]
    AlreadyInUse,
    /// A pool needs at least one slot.
    #[error("max_contexts must be at least 1")]
    ZeroContexts,
}

struct PoolEntry {
    /// `None` exactly while a guard holds the context.
    context: Option<Box<FerrohashContext>>,
    key: Hash256,
    last_used: Instant,
    in_use: bool,
}

struct PoolState {
    entries: Vec<PoolEntry>,
    max_contexts: usize,
    /// Set on the first acquisition attempt; freezes `max_contexts`.
    acquired_once: bool,

    waiting_critical: usize,
    waiting_high: usize,
    waiting_normal: usize,

    total_acquisitions: u64,
    total_waits: u64,
    total_timeouts: u64,
    key_reinitializations: u64,
    consensus_critical_acquisitions: u64,
    high_priority_acquisitions: u64,
    priority_preemptions: u64,
}

impl PoolState {
    fn waiting_mut(&mut self, priority: AcquisitionPriority) -> &mut usize {
        match priority {
            AcquisitionPriority::Normal => &mut self.waiting_normal,
            AcquisitionPriority::High => &mut self.waiting_high,
            AcquisitionPriority::ConsensusCritical => &mut self.waiting_critical,
        }
    }

    /// Whether a waiter at `priority` must stand aside for a
    /// higher-priority waiter.
    fn should_yield(&self, priority: AcquisitionPriority) -> bool {
        match priority {
            AcquisitionPriority::ConsensusCritical => false,
            AcquisitionPriority::High => self.waiting_critical > 0,
            AcquisitionPriority::Normal => self.waiting_critical > 0 || self.waiting_high > 0,
        }
    }

    /// Find or materialize a free slot for `key` and mark it in use.
    fn claim_slot(&mut self, key: &Hash256) -> Option<usize> {
        // A free context already keyed for us is the cheap path.
        if let Some(index) = self
            .entries
            .iter()
            .position(|e| !e.in_use && e.key == *key)
        {
            self.entries[index].in_use = true;
            return Some(index);
        }

        // Grow while below the cap rather than re-keying a warm context.
        if self.entries.len() < self.max_contexts {
            self.entries.push(PoolEntry {
                context: Some(Box::new(FerrohashContext::new(*key))),
                key: *key,
                last_used: Instant::now(),
                in_use: true,
            });
            debug!(
                total_contexts = self.entries.len(),
                key = %key,
                "created ferrohash context"
            );
            return Some(self.entries.len() - 1);
        }

        // Full pool: evict the least recently used free context.
        let index = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.in_use)
            .min_by_key(|(_, e)| e.last_used)
            .map(|(i, _)| i)?;

        let entry = &mut self.entries[index];
        if let Some(context) = entry.context.as_mut() {
            context.rekey(*key);
        }
        entry.key = *key;
        entry.in_use = true;
        self.key_reinitializations += 1;
        debug!(key = %key, reinitializations = self.key_reinitializations,
               "reinitialized ferrohash context for new key");
        if self.total_acquisitions >= REINIT_WARN_MIN_ACQUISITIONS
            && self.key_reinitializations * 4 > self.total_acquisitions
        {
            warn!(
                reinitializations = self.key_reinitializations,
                acquisitions = self.total_acquisitions,
                "high ferrohash key reinitialization rate; consider raising max_contexts"
            );
        }
        Some(index)
    }

    fn slot_claimable(&self) -> bool {
        self.entries.len() < self.max_contexts || self.entries.iter().any(|e| !e.in_use)
    }
}

/// A bounded pool of [`FerrohashContext`]s with priority acquisition.
pub struct FerrohashContextPool {
    state: Mutex<PoolState>,
    /// Waiters for a free slot.
    slot_cv: Condvar,
    /// Lower-priority waiters yielding to higher-priority ones.
    priority_cv: Condvar,
}

impl Default for FerrohashContextPool {
    fn default() -> Self {
        Self::new()
    }
}

impl FerrohashContextPool {
    /// Create a pool with the default context cap.
    pub fn new() -> Self {
        FerrohashContextPool {
            state: Mutex::new(PoolState {
                entries: Vec::new(),
                max_contexts: DEFAULT_MAX_CONTEXTS,
                acquired_once: false,
                waiting_critical: 0,
                waiting_high: 0,
                waiting_normal: 0,
                total_acquisitions: 0,
                total_waits: 0,
                total_timeouts: 0,
                key_reinitializations: 0,
                consensus_critical_acquisitions: 0,
                high_priority_acquisitions: 0,
                priority_preemptions: 0,
            }),
            slot_cv: Condvar::new(),
            priority_cv: Condvar::new(),
        }
    }

    /// Create a pool capped at `max_contexts`.
    pub fn with_max_contexts(max_contexts: usize) -> Result<Self, PoolConfigError> {
        let pool = Self::new();
        pool.set_max_contexts(max_contexts)?;
        Ok(pool)
    }

    /// Change the context cap. Only legal before the first acquisition.
    pub fn set_max_contexts(&self, max_contexts: usize) -> Result<(), PoolConfigError> {
        if max_contexts == 0 {
            return Err(PoolConfigError::ZeroContexts);
        }
        let mut state = self.state.lock();
        if state.acquired_once {
            return Err(PoolConfigError::AlreadyInUse);
        }
        state.max_contexts = max_contexts;
        Ok(())
    }

    /// Acquire a context initialized for `key`.
    ///
    /// Blocks while the pool is exhausted. `Normal` and `High` callers
    /// give up after their priority's timeout and receive `None`;
    /// `ConsensusCritical` callers wait indefinitely and always receive a
    /// guard.
    pub fn acquire(
        &self,
        key: &Hash256,
        priority: AcquisitionPriority,
    ) -> Option<ContextGuard<'_>> {
        self.acquire_inner(key, priority, None)
    }

    /// Acquisition with an optional timeout override, used by tests to
    /// exercise the timeout path without real 30 s waits. Overrides are
    /// ignored at consensus-critical priority, which is always untimed.
    fn acquire_inner(
        &self,
        key: &Hash256,
        priority: AcquisitionPriority,
        timeout_override: Option<Duration>,
    ) -> Option<ContextGuard<'_>> {
        let deadline = priority
            .default_timeout()
            .map(|default| Instant::now() + timeout_override.unwrap_or(default));

        let mut state = self.state.lock();
        state.acquired_once = true;
        *state.waiting_mut(priority) += 1;
        let mut counted_wait = false;

        loop {
            if state.should_yield(priority) {
                if !counted_wait {
                    state.total_waits += 1;
                    counted_wait = true;
                }
                if !self.wait(&self.priority_cv, &mut state, deadline) {
                    return self.bail_timeout(state, priority);
                }
                continue;
            }

            if let Some(index) = state.claim_slot(key) {
                return Some(self.finish_acquire(state, index, priority));
            }

            // Every slot is busy.
            if !counted_wait {
                state.total_waits += 1;
                counted_wait = true;
            }
            if !self.wait(&self.slot_cv, &mut state, deadline) {
                // A release may have raced the deadline; take the slot if
                // one appeared and nothing outranks us.
                if !state.should_yield(priority) {
                    if let Some(index) = state.claim_slot(key) {
                        return Some(self.finish_acquire(state, index, priority));
                    }
                }
                return self.bail_timeout(state, priority);
            }
        }
    }

    /// Wait on `cv`, bounded by `deadline` when present. Returns `false`
    /// once the deadline has passed.
    fn wait(
        &self,
        cv: &Condvar,
        state: &mut MutexGuard<'_, PoolState>,
        deadline: Option<Instant>,
    ) -> bool {
        match deadline {
            None => {
                cv.wait(state);
                true
            }
            Some(deadline) => !cv.wait_until(state, deadline).timed_out(),
        }
    }

    fn finish_acquire(
        &self,
        mut state: MutexGuard<'_, PoolState>,
        index: usize,
        priority: AcquisitionPriority,
    ) -> ContextGuard<'_> {
        *state.waiting_mut(priority) -= 1;
        state.total_acquisitions += 1;
        match priority {
            AcquisitionPriority::Normal => {}
            AcquisitionPriority::High => state.high_priority_acquisitions += 1,
            AcquisitionPriority::ConsensusCritical => {
                state.consensus_critical_acquisitions += 1
            }
        }
        let context = state.entries[index]
            .context
            .take()
            .expect("claimed entry holds its context");
        drop(state);
        // A waiter count just dropped; yielding waiters must re-check.
        self.priority_cv.notify_all();
        ContextGuard {
            pool: self,
            index,
            context: Some(context),
        }
    }

    fn bail_timeout(
        &self,
        mut state: MutexGuard<'_, PoolState>,
        priority: AcquisitionPriority,
    ) -> Option<ContextGuard<'_>> {
        *state.waiting_mut(priority) -= 1;
        state.total_timeouts += 1;
        debug!(?priority, "ferrohash context acquisition timed out");
        drop(state);
        self.priority_cv.notify_all();
        None
    }

    /// Return a context to its slot. Sole release path, called from the
    /// guard's drop.
    fn release(&self, index: usize, context: Box<FerrohashContext>) {
        let mut state = self.state.lock();
        let entry = &mut state.entries[index];
        entry.context = Some(context);
        entry.in_use = false;
        entry.last_used = Instant::now();
        if state.waiting_normal > 0 && (state.waiting_critical > 0 || state.waiting_high > 0) {
            // A normal waiter is standing aside for this freed slot.
            state.priority_preemptions += 1;
        }
        drop(state);
        self.slot_cv.notify_all();
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        let active = state.entries.iter().filter(|e| e.in_use).count();
        PoolStats {
            total_contexts: state.entries.len(),
            active_contexts: active,
            available_contexts: state.entries.len() - active,
            total_acquisitions: state.total_acquisitions,
            total_waits: state.total_waits,
            total_timeouts: state.total_timeouts,
            key_reinitializations: state.key_reinitializations,
            consensus_critical_acquisitions: state.consensus_critical_acquisitions,
            high_priority_acquisitions: state.high_priority_acquisitions,
            priority_preemptions: state.priority_preemptions,
        }
    }
}

/// Scoped handle to a pooled context. Returns the slot to the pool on
/// drop, on every exit path including panics. Move-only.
pub struct ContextGuard<'a> {
    pool: &'a FerrohashContextPool,
    index: usize,
    context: Option<Box<FerrohashContext>>,
}

impl ContextGuard<'_> {
    /// Hash `data` under the key this guard's context is initialized for.
    pub fn hash(&self, data: &[u8]) -> Hash256 {
        self.context().hash(data)
    }

    /// The key the held context is initialized for.
    pub fn key(&self) -> &Hash256 {
        self.context().key()
    }

    fn context(&self) -> &FerrohashContext {
        // The context moves back to the pool only in drop.
        self.context
            .as_deref()
            .expect("guard holds its context until drop")
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool.release(self.index, context);
        }
    }
}
