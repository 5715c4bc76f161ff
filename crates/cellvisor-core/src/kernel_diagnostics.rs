//! Diagnostics: domain state dumps and the deadlock heuristic.

use tracing::{info, warn};

use crate::kernel::Kernel;

impl Kernel {
    /// Log the state of every registered domain.
    pub fn log_all_domain_state(&self) {
        let domains = self.domains();
        info!(
            target: crate::KERNEL_TARGET,
            "log_all_domain_state: {} domains",
            domains.len()
        );
        for domain in &domains {
            domain.log_state();
        }
    }

    /// Check for the one deadlock shape the kernel can recognise.
    ///
    /// True only when exactly one domain exists, it has no running tasks,
    /// its queue is empty and at least one task is blocked. Anything else is
    /// reported as false. Disabled unless `diagnostics.deadlock_detection`
    /// is set. This is a signal for humans; callers must not act on it.
    pub fn is_deadlocked(&self) -> bool {
        if !self.config.diagnostics.deadlock_detection {
            return false;
        }

        let suspect = {
            let domains = self.domains.lock();
            if domains.len() != 1 {
                return false;
            }
            let domain = &domains[0];
            domain.running_tasks() == 0
                && domain.message_queue().is_empty()
                && domain.blocked_tasks() > 0
        };

        if suspect {
            warn!(target: crate::KERNEL_TARGET, "single remaining domain looks deadlocked");
            self.log_all_domain_state();
        }
        suspect
    }
}
