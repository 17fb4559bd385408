//! Timer scheduling abstraction.
//!
//! All deferred work in the engine (debounce settle, banner expiry) goes
//! through the [`Scheduler`] trait: `schedule(delay, callback)` returns a
//! [`TimerHandle`] whose `cancel` guarantees the callback never runs.
//!
//! Two implementations are provided: [`TokioScheduler`] for production
//! (spawned sleep tasks, aborted on cancel) and [`ManualScheduler`], a
//! simulated clock driven by `advance`, so timing behavior is testable
//! without wall-clock sleeps.

use std::fmt;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

/// Deferred work unit.
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a pending timer.
///
/// Dropping the handle leaves the timer running; only an explicit
/// [`TimerHandle::cancel`] stops it. A cancelled timer's callback never
/// executes.
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl TimerHandle {
    /// Wrap a cancellation action.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancel the pending timer. Consumes the handle.
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TimerHandle")
    }
}

/// Scheduling seam between the engine and its clock.
pub trait Scheduler: Send + Sync {
    /// Run `callback` once after `delay`, unless the returned handle is
    /// cancelled first.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

// ---------------------------------------------------------------------------
// Tokio-backed scheduler
// ---------------------------------------------------------------------------

/// Production scheduler backed by spawned `tokio::time::sleep` tasks.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Capture the current runtime handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, same as
    /// [`tokio::runtime::Handle::current`].
    pub fn new() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }

    /// Use an explicit runtime handle.
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        // Anchor the deadline at schedule time, not at the task's first
        // poll: under a paused test clock that is advanced before the
        // spawned task runs, a lazily computed deadline would land one
        // full delay late. ManualScheduler anchors eagerly too.
        let deadline = tokio::time::Instant::now() + delay;
        let task = self.handle.spawn(async move {
            tokio::time::sleep_until(deadline).await;
            callback();
        });
        // Abort during the sleep prevents the callback outright; abort after
        // completion is a no-op.
        TimerHandle::new(move || task.abort())
    }
}

// ---------------------------------------------------------------------------
// Simulated clock
// ---------------------------------------------------------------------------

/// Deterministic scheduler for tests: time only moves when
/// [`ManualScheduler::advance`] is called.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Arc<Mutex<ManualQueue>>,
}

#[derive(Default)]
struct ManualQueue {
    now: Duration,
    next_id: u64,
    timers: Vec<ManualTimer>,
}

struct ManualTimer {
    id: u64,
    deadline: Duration,
    callback: TimerCallback,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current simulated time.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of timers not yet fired or cancelled.
    pub fn pending(&self) -> usize {
        self.lock().timers.len()
    }

    /// Move the clock forward, firing due timers in deadline order.
    ///
    /// Callbacks run with the queue unlocked, so a callback may schedule or
    /// cancel further timers; newly scheduled timers that fall within the
    /// advanced window fire in the same call.
    pub fn advance(&self, by: Duration) {
        let target = {
            let queue = self.lock();
            queue.now + by
        };

        loop {
            let due = {
                let mut queue = self.lock();
                let next = queue
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.id))
                    .map(|(i, _)| i);
                match next {
                    Some(i) => {
                        let timer = queue.timers.swap_remove(i);
                        queue.now = timer.deadline;
                        Some(timer)
                    }
                    None => {
                        queue.now = target;
                        None
                    }
                }
            };

            match due {
                Some(timer) => (timer.callback)(),
                None => break,
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManualQueue> {
        // Test clock: a poisoned queue means a callback already panicked
        // and the test is failing anyway.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut queue = self.lock();
        let id = queue.next_id;
        queue.next_id += 1;
        let deadline = queue.now + delay;
        queue.timers.push(ManualTimer {
            id,
            deadline,
            callback,
        });

        let weak: Weak<Mutex<ManualQueue>> = Arc::downgrade(&self.inner);
        TimerHandle::new(move || {
            if let Some(inner) = weak.upgrade() {
                let mut queue = inner.lock().unwrap_or_else(|e| e.into_inner());
                queue.timers.retain(|t| t.id != id);
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
