//! FIFO condition variable built from two auto-reset events
//!
//! Waiters queue in arrival order. Only the queue head blocks on `wake`;
//! everyone else blocks on `turn`, a token that is passed from waiter to
//! waiter until the head changes. Bookkeeping lives under an internal
//! spinlock:
//!
//! - `waiters`: queued threads
//! - `wakens`: wakeups granted but not yet consumed, `<= waiters`
//!
//! `wake` is armed exactly when `wakens > 0` and the head has not consumed
//! its wakeup yet. A head that consumes one and finds more pending re-arms
//! `wake` for the next head and passes `turn` along so it notices.
//!
//! Waiters enqueue before releasing the caller's mutex, so a signal sent by
//! anyone who takes that mutex afterwards cannot miss them.

use std::cell::Cell;
use std::ptr;
use std::thread;
use std::time::Duration;

use strand_core::{ktrace, SpinLock, StrandResult};

use super::CondBackend;
use crate::event::{BinaryEvent, Deadline};
use crate::mutex::RawMutex;

/// Queue entry, owned by the waiting thread's stack frame
struct WaitNode {
    next: Cell<*const WaitNode>,
}

struct WaitQueue {
    head: *const WaitNode,
    tail: *const WaitNode,
    waiters: usize,
    wakens: usize,
}

// Safety: nodes are only dereferenced under the spinlock, and every node is
// unlinked before the `wait` call owning it returns.
unsafe impl Send for WaitQueue {}

impl WaitQueue {
    const fn new() -> Self {
        Self {
            head: ptr::null(),
            tail: ptr::null(),
            waiters: 0,
            wakens: 0,
        }
    }

    fn push_back(&mut self, node: &WaitNode) {
        let p = node as *const WaitNode;
        node.next.set(ptr::null());
        if self.tail.is_null() {
            self.head = p;
        } else {
            unsafe { (*self.tail).next.set(p) };
        }
        self.tail = p;
        self.waiters += 1;
    }

    #[inline]
    fn is_head(&self, node: &WaitNode) -> bool {
        ptr::eq(self.head, node)
    }

    fn remove(&mut self, node: &WaitNode) {
        let target = node as *const WaitNode;
        let mut prev: *const WaitNode = ptr::null();
        let mut cur = self.head;
        while !cur.is_null() {
            let next = unsafe { (*cur).next.get() };
            if cur == target {
                if prev.is_null() {
                    self.head = next;
                } else {
                    unsafe { (*prev).next.set(next) };
                }
                if self.tail == target {
                    self.tail = prev;
                }
                self.waiters -= 1;
                return;
            }
            prev = cur;
            cur = next;
        }
        debug_assert!(false, "wait node not queued");
    }
}

/// Strict-FIFO condition variable
pub struct EmulatedCond<E: BinaryEvent> {
    /// Armed while the head has a wakeup to consume
    wake: E,
    /// Token circulated among non-head waiters
    turn: E,
    queue: SpinLock<WaitQueue>,
}

impl<E: BinaryEvent> EmulatedCond<E> {
    /// Threads currently queued
    pub fn waiters(&self) -> usize {
        self.queue.lock().waiters
    }

    /// Wakeups granted but not yet consumed
    pub fn pending_wakeups(&self) -> usize {
        self.queue.lock().wakens
    }

    /// Wait until `node` heads the queue; `false` on timeout
    fn take_turn(&self, node: &WaitNode, deadline: &Deadline) -> bool {
        loop {
            let pending = {
                let q = self.queue.lock();
                if q.is_head(node) {
                    return true;
                }
                q.wakens > 0
            };
            if pending {
                // Someone ahead has a wakeup coming; keep the token moving
                // so the next head hears about it.
                self.turn.set();
                thread::yield_now();
            }
            if !self.turn.wait(deadline.remaining()) && deadline.expired() {
                return false;
            }
        }
    }

    /// As head, consume one wakeup; `false` on timeout
    fn consume_wake(&self, node: &WaitNode, deadline: &Deadline) -> bool {
        if !self.wake.wait(deadline.remaining()) {
            return self.abandon(node);
        }
        let mut q = self.queue.lock();
        debug_assert!(q.is_head(node) && q.wakens > 0);
        q.remove(node);
        q.wakens -= 1;
        if q.wakens > 0 {
            self.wake.set();
            self.turn.set();
        }
        true
    }

    /// Leave the queue after a timeout
    ///
    /// A head whose wakeup was granted right at the deadline still takes
    /// it, so the wakeup isn't stranded; that wait reports success.
    fn abandon(&self, node: &WaitNode) -> bool {
        let mut q = self.queue.lock();
        if q.is_head(node) && q.wakens > 0 && self.wake.try_acquire() {
            q.remove(node);
            q.wakens -= 1;
            if q.wakens > 0 {
                self.wake.set();
                self.turn.set();
            }
            return true;
        }
        q.remove(node);
        q.wakens = q.wakens.min(q.waiters);
        if q.wakens > 0 {
            self.turn.set();
        }
        ktrace!("cond wait timed out ({} still queued)", q.waiters);
        false
    }
}

impl<E: BinaryEvent> CondBackend for EmulatedCond<E> {
    fn new() -> StrandResult<Self> {
        Ok(Self {
            wake: E::new()?,
            turn: E::new()?,
            queue: SpinLock::new(WaitQueue::new()),
        })
    }

    unsafe fn wait(&self, lock: &RawMutex, timeout: Option<Duration>) -> bool {
        let deadline = Deadline::after(timeout);
        let node = WaitNode {
            next: Cell::new(ptr::null()),
        };
        self.queue.lock().push_back(&node);
        lock.unlock();

        let woken = if self.take_turn(&node, &deadline) {
            self.consume_wake(&node, &deadline)
        } else {
            self.abandon(&node)
        };

        lock.lock();
        woken
    }

    fn signal(&self) {
        let mut q = self.queue.lock();
        if q.wakens >= q.waiters {
            return;
        }
        if q.wakens == 0 {
            self.wake.set();
        }
        q.wakens += 1;
        self.turn.set();
    }

    fn broadcast(&self) {
        let mut q = self.queue.lock();
        if q.wakens >= q.waiters {
            return;
        }
        if q.wakens == 0 {
            self.wake.set();
        }
        q.wakens = q.waiters;
        self.turn.set();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cond::tests::{
        check_broadcast_wakes_all, check_no_lost_wakeup, check_signal_without_waiters,
        check_timeout,
    };
    use crate::cond::Condvar;
    use crate::event::{FallbackEvent, PlatformEvent};
    use crate::mutex::Mutex;
    use std::sync::Arc;
    use std::time::Instant;

    struct Fifo<E: BinaryEvent> {
        lock: Mutex<Vec<usize>>,
        cv: Condvar<EmulatedCond<E>>,
    }

    fn wait_until(mut cond: impl FnMut() -> bool) {
        let start = Instant::now();
        while !cond() {
            assert!(start.elapsed() < Duration::from_secs(10), "condition never reached");
            thread::yield_now();
        }
    }

    /// Waiters queued in order 0..W wake in order 0..W, one per signal
    fn check_fifo_order<E: BinaryEvent + 'static>() {
        const WAITERS: usize = 5;
        let s = Arc::new(Fifo::<E> {
            lock: Mutex::new(Vec::new()).unwrap(),
            cv: Condvar::with_backend().unwrap(),
        });

        let mut handles = Vec::new();
        for id in 0..WAITERS {
            let s2 = Arc::clone(&s);
            handles.push(thread::spawn(move || {
                let mut g = s2.lock.lock();
                s2.cv.wait(&mut g);
                g.push(id);
            }));
            // Next waiter only starts once this one is queued
            wait_until(|| s.cv.backend().waiters() == id + 1);
        }

        for n in 1..=WAITERS {
            s.cv.signal();
            wait_until(|| s.lock.lock().len() == n);
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(*s.lock.lock(), (0..WAITERS).collect::<Vec<_>>());
        assert_eq!(s.cv.backend().waiters(), 0);
        assert_eq!(s.cv.backend().pending_wakeups(), 0);
    }

    /// Broadcast drains the whole queue
    ///
    /// Waiters leave the queue in order but race for the mutex afterwards,
    /// so only the set of woken ids is checked.
    fn check_broadcast_drains_queue<E: BinaryEvent + 'static>() {
        const WAITERS: usize = 4;
        let s = Arc::new(Fifo::<E> {
            lock: Mutex::new(Vec::new()).unwrap(),
            cv: Condvar::with_backend().unwrap(),
        });
        let handles: Vec<_> = (0..WAITERS)
            .map(|id| {
                let s2 = Arc::clone(&s);
                let h = thread::spawn(move || {
                    let mut g = s2.lock.lock();
                    s2.cv.wait(&mut g);
                    g.push(id);
                });
                wait_until(|| s.cv.backend().waiters() == id + 1);
                h
            })
            .collect();

        s.cv.broadcast();
        for h in handles {
            h.join().unwrap();
        }
        let mut woken = s.lock.lock().clone();
        woken.sort_unstable();
        assert_eq!(woken, (0..WAITERS).collect::<Vec<_>>());
        assert_eq!(s.cv.backend().waiters(), 0);
        assert_eq!(s.cv.backend().pending_wakeups(), 0);
    }

    /// A waiter that timed out leaves no stale state behind
    fn check_timeout_then_signal<E: BinaryEvent + 'static>() {
        let s = Arc::new(Fifo::<E> {
            lock: Mutex::new(Vec::new()).unwrap(),
            cv: Condvar::with_backend().unwrap(),
        });

        {
            let mut g = s.lock.lock();
            assert!(!s.cv.wait_timeout(&mut g, Duration::from_millis(20)));
        }
        assert_eq!(s.cv.backend().waiters(), 0);
        assert_eq!(s.cv.backend().pending_wakeups(), 0);

        // An earlier timed-out waiter ahead in the queue must not swallow
        // the signal meant for the one behind it
        let impatient = {
            let s2 = Arc::clone(&s);
            thread::spawn(move || {
                let mut g = s2.lock.lock();
                s2.cv.wait_timeout(&mut g, Duration::from_millis(300))
            })
        };
        wait_until(|| s.cv.backend().waiters() == 1);
        let patient = {
            let s2 = Arc::clone(&s);
            thread::spawn(move || {
                let mut g = s2.lock.lock();
                s2.cv.wait_timeout(&mut g, Duration::from_secs(10))
            })
        };
        wait_until(|| s.cv.backend().waiters() == 2);

        assert!(!impatient.join().unwrap());
        wait_until(|| s.cv.backend().waiters() == 1);
        s.cv.signal();
        assert!(patient.join().unwrap());
        assert_eq!(s.cv.backend().waiters(), 0);
        assert_eq!(s.cv.backend().pending_wakeups(), 0);
    }

    #[test]
    fn test_emulated_platform_event() {
        check_fifo_order::<PlatformEvent>();
        check_broadcast_drains_queue::<PlatformEvent>();
        check_timeout_then_signal::<PlatformEvent>();
        check_broadcast_wakes_all::<EmulatedCond<PlatformEvent>>();
        check_no_lost_wakeup::<EmulatedCond<PlatformEvent>>();
        check_timeout::<EmulatedCond<PlatformEvent>>();
        check_signal_without_waiters::<EmulatedCond<PlatformEvent>>();
    }

    #[test]
    fn test_emulated_fallback_event() {
        check_fifo_order::<FallbackEvent>();
        check_broadcast_drains_queue::<FallbackEvent>();
        check_timeout_then_signal::<FallbackEvent>();
        check_no_lost_wakeup::<EmulatedCond<FallbackEvent>>();
    }

    #[test]
    fn test_signal_caps_at_waiters() {
        let cv = EmulatedCond::<PlatformEvent>::new().unwrap();
        cv.signal();
        cv.broadcast();
        assert_eq!(cv.pending_wakeups(), 0);
        assert!(!cv.wake.try_acquire());
    }
}
