//! Dispatch loop control (`start`, `run`, `stop`).

use std::sync::Arc;
use std::thread;

use tracing::{error, warn};

use crate::error::{KernelError, KernelResult};
use crate::kernel::Kernel;
use crate::metrics::LoopMetrics;
use crate::state::LoopState;

impl Kernel {
    /// Start the dispatch loop on its own thread.
    pub fn start(&self) -> KernelResult<()> {
        let mut slot = self.loop_thread.lock();
        if slot.is_some() || self.loop_state() != LoopState::Idle {
            return Err(KernelError::AlreadyStarted);
        }

        let dispatcher = Arc::clone(&self.dispatcher);
        let handle = thread::Builder::new()
            .name(self.config.dispatch.thread_name.clone())
            .spawn(move || {
                if let Err(e) = dispatcher.run() {
                    error!(target: crate::KERNEL_TARGET, "kernel loop did not run: {}", e);
                }
            })?;
        *slot = Some(handle);
        Ok(())
    }

    /// Run the dispatch loop on the calling thread until [`Kernel::stop`]
    /// is called from another thread.
    pub fn run(&self) -> KernelResult<()> {
        self.dispatcher.run()
    }

    /// Interrupt the loop and wait for its thread to exit.
    ///
    /// A drain in progress finishes first. Calling this again is harmless.
    /// Called before the loop starts, the loop exits on its first check.
    pub fn stop(&self) -> KernelResult<()> {
        self.dispatcher.interrupt();
        let handle = self.loop_thread.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                warn!(target: crate::KERNEL_TARGET, "kernel loop thread panicked");
                return Err(KernelError::LoopPanicked);
            }
        }
        Ok(())
    }

    pub fn loop_state(&self) -> LoopState {
        self.dispatcher.state()
    }

    /// Whether the dispatch loop is running.
    pub fn is_running(&self) -> bool {
        self.loop_state() == LoopState::Running
    }

    /// Dispatch loop counters.
    pub fn metrics(&self) -> &LoopMetrics {
        self.dispatcher.metrics()
    }
}
