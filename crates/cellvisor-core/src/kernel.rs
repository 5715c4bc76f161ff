//! The supervisory kernel.
//!
//! Owns the domain registry, the queue registry (through the dispatcher) and
//! the three handle caches. Domain lifecycle lives here; handle lookups,
//! the dispatch loop, diagnostics and teardown are in sibling modules.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use cellvisor_config::{ConfigLoader, ConfigValidator, KernelConfig};
use cellvisor_protocols::{CrateRef, PlatformService};

use crate::dispatch::Dispatcher;
use crate::domain::{Domain, Port, Task};
use crate::error::KernelResult;
use crate::fatal::fatal;
use crate::handle::{Handle, HandleCache};
use crate::message_queue::MessageQueue;
use crate::region::{Allocation, Region};

/// Process-wide coordinator for domains.
///
/// Dropping the kernel is its teardown: every domain must have been
/// destroyed and every queue drained by then, or the drop halts.
pub struct Kernel {
    pub(crate) config: KernelConfig,
    pub(crate) region: Arc<Region>,
    pub(crate) service: Box<dyn PlatformService>,
    pub(crate) domains: Mutex<Vec<Arc<Domain>>>,
    pub(crate) domains_empty: Condvar,
    /// Destroys that left the registry but have not finished tearing the
    /// domain down. Only changed with `domains` locked.
    pub(crate) teardowns: AtomicUsize,
    /// Registered domains plus `teardowns`, as seen by joiners.
    pub(crate) domain_count: watch::Sender<usize>,
    pub(crate) dispatcher: Arc<Dispatcher>,
    pub(crate) loop_thread: Mutex<Option<JoinHandle<()>>>,
    pub(crate) dom_handles: HandleCache<Domain>,
    pub(crate) task_handles: HandleCache<Task>,
    pub(crate) port_handles: HandleCache<Port>,
}

impl Kernel {
    /// Create a kernel. `service` is the root platform service every domain
    /// receives a clone of.
    ///
    /// The configuration is validated first; an invalid one is reported as
    /// [`KernelError::Config`](crate::KernelError::Config).
    pub fn new(config: KernelConfig, service: Box<dyn PlatformService>) -> KernelResult<Self> {
        let warnings = ConfigValidator::validate(&config).into_result()?;
        for warning in warnings {
            warn!(
                target: crate::KERNEL_TARGET,
                "config {}: {}",
                warning.path,
                warning.message
            );
        }
        Ok(Self::build(config, service))
    }

    fn build(config: KernelConfig, service: Box<dyn PlatformService>) -> Self {
        let region = Arc::new(Region::new(config.region.capacity_bytes));
        let dispatcher = Arc::new(Dispatcher::new(config.dispatch.idle_wait()));
        let (domain_count, _) = watch::channel(0);

        Self {
            config,
            region,
            service,
            domains: Mutex::new(Vec::new()),
            domains_empty: Condvar::new(),
            teardowns: AtomicUsize::new(0),
            domain_count,
            dispatcher,
            loop_thread: Mutex::new(None),
            dom_handles: HandleCache::new(),
            task_handles: HandleCache::new(),
            port_handles: HandleCache::new(),
        }
    }

    /// Create a kernel with default configuration.
    pub fn with_defaults(service: Box<dyn PlatformService>) -> Self {
        Self::build(KernelConfig::default(), service)
    }

    /// Create a kernel from a TOML configuration file.
    pub fn from_config_file(path: &Path, service: Box<dyn PlatformService>) -> KernelResult<Self> {
        Self::new(ConfigLoader::load(path)?, service)
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    // ========================================================================
    // Domain Lifecycle
    // ========================================================================

    /// Create a domain running `crate_ref` and return its handle.
    ///
    /// The new queue is associated with the handle before the domain is
    /// registered, so draining belongs to the domain from the moment it is
    /// visible. Failure to clone the platform service is fatal.
    pub fn create_domain(&self, crate_ref: CrateRef, name: &str) -> Arc<Handle<Domain>> {
        let sizes = &self.config.objects;
        let queue = Arc::new(MessageQueue::new(
            self.region.reserve(sizes.queue_bytes),
            self.dispatcher.waker(),
        ));

        let service = match self.service.clone_service() {
            Ok(service) => service,
            Err(e) => fatal!("cannot clone {} service for domain '{}': {}", self.service.name(), name, e),
        };

        let domain = Arc::new(Domain::new(
            self.region.reserve(sizes.domain_bytes),
            name,
            crate_ref,
            queue.clone(),
            service,
        ));

        let handle = self.get_dom_handle(&domain);
        queue.associate(handle.id());

        let count = {
            let mut domains = self.domains.lock();
            domains.push(domain.clone());
            self.publish_count(&domains);
            domains.len()
        };
        self.dispatcher.register(queue);

        info!(
            target: crate::KERNEL_TARGET,
            "created domain: {} '{}', crate: {}, domains {}",
            domain.id(),
            domain.name(),
            domain.crate_ref(),
            count
        );
        handle
    }

    /// Destroy a registered domain.
    ///
    /// The domain must already have stopped running; this does not signal
    /// its thread. Its queue stays registered and is drained by the kernel
    /// loop from here on. Destroying an unregistered domain is fatal.
    ///
    /// Joiners are released only once the queue has been handed back and
    /// the service clone dropped.
    pub fn destroy_domain(&self, domain: &Arc<Domain>) {
        let remaining = {
            let mut domains = self.domains.lock();
            let Some(index) = domains.iter().position(|d| Arc::ptr_eq(d, domain)) else {
                let count = domains.len();
                drop(domains);
                fatal!(
                    "destroy_domain: domain {} '{}' is not registered (domains {})",
                    domain.id(),
                    domain.name(),
                    count
                );
            };
            info!(
                target: crate::KERNEL_TARGET,
                "deleting domain: {} '{}', index: {}, domains {}",
                domain.id(),
                domain.name(),
                index,
                domains.len()
            );
            domains.remove(index);
            self.teardowns.fetch_add(1, Ordering::SeqCst);
            domains.len()
        };

        domain.message_queue().disassociate();

        match domain.take_service() {
            Some(service) => drop(service),
            None => fatal!("domain {} service was already destroyed", domain.id()),
        }

        {
            let domains = self.domains.lock();
            self.teardowns.fetch_sub(1, Ordering::SeqCst);
            self.publish_count(&domains);
        }

        debug!(
            target: crate::KERNEL_TARGET,
            "domain {} destroyed, {} remaining",
            domain.id(),
            remaining
        );
    }

    /// Create a task inside `domain`.
    pub fn create_task(&self, domain: &Arc<Domain>, name: &str) -> Arc<Task> {
        let task = Arc::new(Task::new(
            self.region.reserve(self.config.objects.task_bytes),
            name,
            domain.clone(),
        ));
        debug!(
            target: crate::KERNEL_TARGET,
            "created task {} '{}' in domain {}",
            task.id(),
            name,
            domain.id()
        );
        task
    }

    /// Create a port owned by `task`.
    pub fn create_port(&self, task: &Arc<Task>) -> Arc<Port> {
        Arc::new(Port::new(
            self.region.reserve(self.config.objects.port_bytes),
            task.clone(),
        ))
    }

    /// Number of live domains.
    pub fn domain_count(&self) -> usize {
        self.domains.lock().len()
    }

    /// Snapshot of the live domains, in creation order.
    pub fn domains(&self) -> Vec<Arc<Domain>> {
        self.domains.lock().clone()
    }

    /// Number of registered queues, associated or not.
    pub fn queue_count(&self) -> usize {
        self.dispatcher.queue_count()
    }

    // ========================================================================
    // Shutdown Coordination
    // ========================================================================

    /// Block until no domains are registered and every destroy has
    /// finished.
    ///
    /// Meant for shutdown; the domains' own threads are expected to drive
    /// their destruction.
    pub fn join_all_domains(&self) {
        let mut domains = self.domains.lock();
        while *self.domain_count.borrow() > 0 {
            self.domains_empty.wait(&mut domains);
        }
    }

    /// Async variant of [`Kernel::join_all_domains`].
    pub async fn join_all_domains_async(&self) {
        let mut count = self.domain_count.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = count.wait_for(|n| *n == 0).await;
    }

    /// Publish the live count to joiners. Called with `domains` locked.
    fn publish_count(&self, domains: &[Arc<Domain>]) {
        let live = domains.len() + self.teardowns.load(Ordering::SeqCst);
        self.domain_count.send_replace(live);
        if live == 0 {
            self.domains_empty.notify_all();
        }
    }

    // ========================================================================
    // Memory
    // ========================================================================

    /// Allocate from the kernel's region. Exhaustion is fatal.
    pub fn malloc(&self, size: usize) -> Allocation {
        self.region.malloc(size)
    }

    /// Return a block to the kernel's region.
    pub fn free(&self, allocation: Allocation) {
        self.region.free(allocation);
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
