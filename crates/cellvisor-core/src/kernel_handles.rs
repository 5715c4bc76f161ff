//! Handle lookups (`get_dom_handle`, `get_task_handle`, `get_port_handle`).

use std::sync::Arc;

use crate::domain::{Domain, Port, Task};
use crate::handle::Handle;
use crate::kernel::Kernel;

impl Kernel {
    /// Handle for `domain`, routed through the domain's own queue.
    pub fn get_dom_handle(&self, domain: &Arc<Domain>) -> Arc<Handle<Domain>> {
        self.dom_handles
            .get_or_create(domain, || self.region.reserve(self.config.objects.handle_bytes))
    }

    /// Handle for `task`, routed through its domain's queue.
    pub fn get_task_handle(&self, task: &Arc<Task>) -> Arc<Handle<Task>> {
        self.task_handles
            .get_or_create(task, || self.region.reserve(self.config.objects.handle_bytes))
    }

    /// Handle for `port`, routed through its task's domain queue.
    pub fn get_port_handle(&self, port: &Arc<Port>) -> Arc<Handle<Port>> {
        self.port_handles
            .get_or_create(port, || self.region.reserve(self.config.objects.handle_bytes))
    }

    /// Number of cached handles across all three kinds.
    pub fn cached_handle_count(&self) -> usize {
        self.dom_handles.len() + self.task_handles.len() + self.port_handles.len()
    }
}
