//! The deferred-execution capability the codec relies on.
//!
//! Dictionary-change notifications are coalesced on a short timer, but this
//! crate performs no waiting itself: the host supplies a [`Scheduler`] and
//! decides when scheduled callbacks actually run. [`ManualScheduler`] is a
//! deterministic implementation for tests and single-threaded hosts.

use std::{cell::RefCell, rc::Rc, time::Duration};

/// Identifies one scheduled callback for cancellation.
pub type TimerHandle = u64;

/// A deferred callback. Runs at most once.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Schedule-once, cancelable, minimum-delay semantics.
///
/// The codec only ever keeps one timer in flight: scheduling while a timer is
/// pending is preceded by a [`cancel`](Scheduler::cancel) of the old handle.
/// Implementations may treat `delay` as a minimum; exact timing is not
/// observable by the codec.
pub trait Scheduler {
    /// Arranges for `callback` to run once, no sooner than `delay` from now.
    fn schedule_once(&mut self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Drops a pending callback. Unknown or already-fired handles are
    /// ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

struct PendingTimer {
    handle: TimerHandle,
    delay: Duration,
    callback: TimerCallback,
}

#[derive(Default)]
struct ManualInner {
    next_handle: TimerHandle,
    pending: Vec<PendingTimer>,
}

/// A [`Scheduler`] that fires only when told to.
///
/// Cloning is shallow: clones share the same timer queue, so a test can hand
/// one clone to a codec and keep another to drive time forward.
///
/// # Examples
///
/// ```
/// use keywire::{ManualScheduler, Scheduler};
/// use std::time::Duration;
///
/// let scheduler = ManualScheduler::new();
/// let mut handle = scheduler.clone();
/// handle.schedule_once(Duration::from_millis(1), Box::new(|| {}));
/// assert_eq!(scheduler.pending(), 1);
/// scheduler.fire_all();
/// assert_eq!(scheduler.pending(), 0);
/// ```
#[derive(Clone, Default)]
pub struct ManualScheduler {
    inner: Rc<RefCell<ManualInner>>,
}

impl ManualScheduler {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of callbacks waiting to fire.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    /// The requested delays of all pending callbacks, in scheduling order.
    #[must_use]
    pub fn pending_delays(&self) -> Vec<Duration> {
        self.inner
            .borrow()
            .pending
            .iter()
            .map(|timer| timer.delay)
            .collect()
    }

    /// Runs the oldest pending callback. Returns `false` when none was
    /// pending.
    pub fn fire_next(&self) -> bool {
        // Take the callback out before running it so a callback that
        // schedules or cancels does not observe a borrowed queue.
        let timer = {
            let mut inner = self.inner.borrow_mut();
            if inner.pending.is_empty() {
                None
            } else {
                Some(inner.pending.remove(0))
            }
        };
        match timer {
            Some(timer) => {
                (timer.callback)();
                true
            }
            None => false,
        }
    }

    /// Runs pending callbacks until the queue is empty, including callbacks
    /// scheduled while firing.
    pub fn fire_all(&self) {
        while self.fire_next() {}
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_once(&mut self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let mut inner = self.inner.borrow_mut();
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.pending.push(PendingTimer {
            handle,
            delay,
            callback,
        });
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.inner
            .borrow_mut()
            .pending
            .retain(|timer| timer.handle != handle);
    }
}
