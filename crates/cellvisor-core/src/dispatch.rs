//! Shared dispatch loop.
//!
//! The loop exists for queues nobody else is draining: queues whose domain
//! has not been associated yet, and queues whose domain has been destroyed
//! but which are still registered. Each pass snapshots the unassociated
//! queues under the registry lock, then drains them with the lock released,
//! so domain creation never waits on a drain.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, error, info};

use crate::error::{KernelError, KernelResult};
use crate::message_queue::MessageQueue;
use crate::metrics::LoopMetrics;
use crate::state::LoopState;

/// Wakes the dispatch loop when kernel-owned work arrives.
///
/// A notification sent while the loop is busy is remembered, so the next
/// wait returns immediately.
#[derive(Debug, Default)]
pub struct LoopWaker {
    pending: Mutex<bool>,
    signal: Condvar,
}

impl LoopWaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake the loop.
    pub fn notify(&self) {
        *self.pending.lock() = true;
        self.signal.notify_one();
    }

    /// Park until notified or `timeout` elapses. Returns whether a
    /// notification was consumed.
    pub fn wait(&self, timeout: Duration) -> bool {
        let mut pending = self.pending.lock();
        if !*pending {
            self.signal.wait_for(&mut pending, timeout);
        }
        std::mem::replace(&mut *pending, false)
    }

    /// Consume a pending notification without waiting.
    pub fn take_pending(&self) -> bool {
        std::mem::replace(&mut *self.pending.lock(), false)
    }
}

/// Queue registry plus the loop that drains its unassociated members.
pub(crate) struct Dispatcher {
    queues: Mutex<Vec<Arc<MessageQueue>>>,
    interrupt: AtomicBool,
    state: AtomicU8,
    waker: Arc<LoopWaker>,
    metrics: LoopMetrics,
    idle_wait: Duration,
}

impl Dispatcher {
    pub(crate) fn new(idle_wait: Duration) -> Self {
        Self {
            queues: Mutex::new(Vec::new()),
            interrupt: AtomicBool::new(false),
            state: AtomicU8::new(LoopState::Idle as u8),
            waker: Arc::new(LoopWaker::new()),
            metrics: LoopMetrics::new(),
            idle_wait,
        }
    }

    pub(crate) fn waker(&self) -> Arc<LoopWaker> {
        self.waker.clone()
    }

    pub(crate) fn metrics(&self) -> &LoopMetrics {
        &self.metrics
    }

    pub(crate) fn state(&self) -> LoopState {
        LoopState::from(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: LoopState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    /// Add a queue to the registry.
    pub(crate) fn register(&self, queue: Arc<MessageQueue>) {
        self.queues.lock().push(queue);
    }

    pub(crate) fn queue_count(&self) -> usize {
        self.queues.lock().len()
    }

    /// Remove and return every registered queue.
    pub(crate) fn take_queues(&self) -> Vec<Arc<MessageQueue>> {
        std::mem::take(&mut *self.queues.lock())
    }

    /// Run the loop on the calling thread until interrupted.
    pub(crate) fn run(&self) -> KernelResult<()> {
        self.state
            .compare_exchange(
                LoopState::Idle as u8,
                LoopState::Running as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .map_err(|_| KernelError::AlreadyStarted)?;

        let _exit = StopOnExit(self);
        info!(target: crate::KERNEL_TARGET, "started kernel loop");
        self.metrics.mark_start();

        while !self.interrupt.load(Ordering::SeqCst) {
            let drained = self.scan_once();
            if drained == 0 {
                let started = Instant::now();
                if self.waker.wait(self.idle_wait) {
                    self.metrics.record_wakeup();
                }
                self.metrics.record_idle_time(started.elapsed());
            }
        }

        self.set_state(LoopState::Interrupted);
        info!(target: crate::KERNEL_TARGET, "finished kernel loop");
        Ok(())
    }

    /// One full pass: drain every queue that is unassociated right now.
    pub(crate) fn scan_once(&self) -> usize {
        let unassociated: Vec<Arc<MessageQueue>> = self
            .queues
            .lock()
            .iter()
            .filter(|queue| !queue.is_associated())
            .cloned()
            .collect();

        let mut drained = 0;
        for queue in &unassociated {
            let count = queue.drain_at_kernel_scope();
            if count > 0 {
                debug!(
                    target: crate::KERNEL_TARGET,
                    "drained {} message(s) from queue {}",
                    count,
                    queue.id()
                );
            }
            drained += count;
        }

        self.metrics.record_scan(drained as u64);
        drained
    }

    /// Ask the loop to exit after its current pass.
    pub(crate) fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
        self.waker.notify();
    }
}

/// Marks the loop stopped however `run` is left, unwinding included.
struct StopOnExit<'a>(&'a Dispatcher);

impl Drop for StopOnExit<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!(target: crate::KERNEL_TARGET, "kernel loop unwinding");
        }
        self.0.set_state(LoopState::Stopped);
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
