//! Domains and the addressable units inside them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tracing::info;

use cellvisor_protocols::{CrateRef, PlatformService};

use crate::message_queue::MessageQueue;
use crate::region::{ObjectId, Reservation};

/// An isolated execution unit.
///
/// A domain owns one [`MessageQueue`] and one private platform service
/// clone. Its tasks run on the domain's own thread, outside the kernel; the
/// scheduler there reports task counts back through
/// [`Domain::set_task_counts`] for diagnostics.
pub struct Domain {
    reservation: Reservation,
    name: String,
    crate_ref: CrateRef,
    queue: Arc<MessageQueue>,
    service: Mutex<Option<Box<dyn PlatformService>>>,
    running_tasks: AtomicUsize,
    blocked_tasks: AtomicUsize,
}

impl Domain {
    pub(crate) fn new(
        reservation: Reservation,
        name: impl Into<String>,
        crate_ref: CrateRef,
        queue: Arc<MessageQueue>,
        service: Box<dyn PlatformService>,
    ) -> Self {
        Self {
            reservation,
            name: name.into(),
            crate_ref,
            queue,
            service: Mutex::new(Some(service)),
            running_tasks: AtomicUsize::new(0),
            blocked_tasks: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.reservation.id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn crate_ref(&self) -> &CrateRef {
        &self.crate_ref
    }

    pub fn message_queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Run `f` against the domain's platform service.
    ///
    /// Returns `None` once the domain has been destroyed.
    pub fn with_service<R>(&self, f: impl FnOnce(&dyn PlatformService) -> R) -> Option<R> {
        let service = self.service.lock();
        service.as_deref().map(|service| f(service))
    }

    /// Detach the service for destruction. Yields it at most once.
    pub(crate) fn take_service(&self) -> Option<Box<dyn PlatformService>> {
        self.service.lock().take()
    }

    /// Report how many tasks are runnable and how many are blocked.
    pub fn set_task_counts(&self, running: usize, blocked: usize) {
        self.running_tasks.store(running, Ordering::SeqCst);
        self.blocked_tasks.store(blocked, Ordering::SeqCst);
    }

    pub fn running_tasks(&self) -> usize {
        self.running_tasks.load(Ordering::SeqCst)
    }

    pub fn blocked_tasks(&self) -> usize {
        self.blocked_tasks.load(Ordering::SeqCst)
    }

    /// Log a one-line summary of the domain.
    pub fn log_state(&self) {
        info!(
            target: crate::KERNEL_TARGET,
            "domain {} '{}' crate={} queue={} {:?} pending={} running={} blocked={}",
            self.id(),
            self.name,
            self.crate_ref,
            self.queue.id(),
            self.queue.association(),
            self.queue.len(),
            self.running_tasks(),
            self.blocked_tasks()
        );
    }
}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("crate_ref", &self.crate_ref)
            .field("queue", &self.queue.id())
            .finish()
    }
}

/// A unit of work inside a domain.
pub struct Task {
    reservation: Reservation,
    name: String,
    domain: Arc<Domain>,
}

impl Task {
    pub(crate) fn new(reservation: Reservation, name: impl Into<String>, domain: Arc<Domain>) -> Self {
        Self {
            reservation,
            name: name.into(),
            domain,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.reservation.id()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn domain(&self) -> &Arc<Domain> {
        &self.domain
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id())
            .field("name", &self.name)
            .field("domain", &self.domain.id())
            .finish()
    }
}

/// A receive endpoint owned by a task.
pub struct Port {
    reservation: Reservation,
    task: Arc<Task>,
}

impl Port {
    pub(crate) fn new(reservation: Reservation, task: Arc<Task>) -> Self {
        Self { reservation, task }
    }

    pub fn id(&self) -> ObjectId {
        self.reservation.id()
    }

    pub fn task(&self) -> &Arc<Task> {
        &self.task
    }
}

impl fmt::Debug for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Port")
            .field("id", &self.id())
            .field("task", &self.task.id())
            .finish()
    }
}
