//! Kernel teardown.

use tracing::{info, warn};

use crate::fatal::kernel_assert;
use crate::kernel::Kernel;

impl Drop for Kernel {
    fn drop(&mut self) {
        // Already unwinding from a contract violation: release what we can
        // without piling a second panic on top.
        let unwinding = std::thread::panicking();

        // The loop thread must not outlive the kernel, even on a violation.
        if let Err(e) = self.stop() {
            warn!(target: crate::KERNEL_TARGET, "kernel loop did not stop cleanly: {}", e);
        }

        let live = self.domains.get_mut().len();
        if unwinding {
            if live > 0 {
                warn!(target: crate::KERNEL_TARGET, "dropping kernel with {} live domain(s) during panic", live);
            }
        } else {
            kernel_assert!(
                live == 0,
                "Kernel has {} live domain(s), join all domains before dropping the kernel.",
                live
            );
        }

        drop(self.task_handles.drain());
        drop(self.port_handles.drain());
        drop(self.dom_handles.drain());

        for queue in self.dispatcher.take_queues() {
            if !unwinding {
                kernel_assert!(
                    queue.is_empty(),
                    "Kernel message queue {} should be empty before dropping the kernel ({} pending).",
                    queue.id(),
                    queue.len()
                );
            }
            drop(queue);
        }

        info!(
            target: crate::KERNEL_TARGET,
            "kernel torn down, {} region object(s) still live",
            self.region.live_objects()
        );
    }
}
