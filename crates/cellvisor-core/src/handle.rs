//! Cross-domain handles and their caches.
//!
//! A [`Handle`] pairs an object with the queue that routes messages to it.
//! The kernel keeps one [`HandleCache`] per kind, keyed by the object's
//! arena identity, so every lookup for the same object yields the same
//! handle.

use std::fmt;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tracing::debug;

use cellvisor_protocols::Message;

use crate::domain::{Domain, Port, Task};
use crate::message_queue::MessageQueue;
use crate::region::{ObjectId, Reservation};

/// Kinds of addressable object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandleKind {
    Domain,
    Task,
    Port,
}

impl fmt::Display for HandleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandleKind::Domain => write!(f, "domain"),
            HandleKind::Task => write!(f, "task"),
            HandleKind::Port => write!(f, "port"),
        }
    }
}

/// Objects that can be addressed through a handle.
pub trait Addressable: Send + Sync + 'static {
    const KIND: HandleKind;

    /// Stable identity used as the cache key.
    fn object_id(&self) -> ObjectId;

    /// Queue of the domain that owns this object.
    fn routing_queue(&self) -> &Arc<MessageQueue>;
}

impl Addressable for Domain {
    const KIND: HandleKind = HandleKind::Domain;

    fn object_id(&self) -> ObjectId {
        self.id()
    }

    fn routing_queue(&self) -> &Arc<MessageQueue> {
        self.message_queue()
    }
}

impl Addressable for Task {
    const KIND: HandleKind = HandleKind::Task;

    fn object_id(&self) -> ObjectId {
        self.id()
    }

    fn routing_queue(&self) -> &Arc<MessageQueue> {
        self.domain().message_queue()
    }
}

impl Addressable for Port {
    const KIND: HandleKind = HandleKind::Port;

    fn object_id(&self) -> ObjectId {
        self.id()
    }

    fn routing_queue(&self) -> &Arc<MessageQueue> {
        self.task().domain().message_queue()
    }
}

/// Immutable capability for an object plus its routing queue.
///
/// The object is held weakly: a cached handle outlives the object it names
/// without keeping it alive, and [`Handle::referent`] reports `None` once it
/// is gone.
pub struct Handle<T: Addressable> {
    reservation: Reservation,
    referent_id: ObjectId,
    referent: Weak<T>,
    queue: Arc<MessageQueue>,
}

impl<T: Addressable> Handle<T> {
    pub(crate) fn new(reservation: Reservation, referent: &Arc<T>) -> Self {
        Self {
            reservation,
            referent_id: referent.object_id(),
            referent: Arc::downgrade(referent),
            queue: Arc::clone(referent.routing_queue()),
        }
    }

    /// Identity of the handle itself.
    pub fn id(&self) -> ObjectId {
        self.reservation.id()
    }

    /// Identity of the object it names.
    pub fn referent_id(&self) -> ObjectId {
        self.referent_id
    }

    pub fn kind(&self) -> HandleKind {
        T::KIND
    }

    /// The named object, if it still exists.
    pub fn referent(&self) -> Option<Arc<T>> {
        self.referent.upgrade()
    }

    pub fn message_queue(&self) -> &Arc<MessageQueue> {
        &self.queue
    }

    /// Route a message to the object's domain.
    pub fn send(&self, message: Box<dyn Message>) {
        self.queue.enqueue(message);
    }
}

impl<T: Addressable> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("kind", &T::KIND)
            .field("id", &self.id())
            .field("referent", &self.referent_id)
            .field("queue", &self.queue.id())
            .finish()
    }
}

/// Identity-keyed cache of handles of one kind.
///
/// Entries are only ever added by a miss; nothing is evicted until the
/// owner drains the cache.
pub struct HandleCache<T: Addressable> {
    entries: DashMap<ObjectId, Arc<Handle<T>>>,
}

impl<T: Addressable> HandleCache<T> {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Cached handle for `id`, if any.
    pub fn get(&self, id: ObjectId) -> Option<Arc<Handle<T>>> {
        self.entries.get(&id).map(|entry| entry.value().clone())
    }

    /// Return the cached handle for `referent`, creating it on a miss.
    ///
    /// `reserve` is only called on a miss. Lookup and insert happen under
    /// the same shard lock, so racing callers all get the same handle.
    pub fn get_or_create(
        &self,
        referent: &Arc<T>,
        reserve: impl FnOnce() -> Reservation,
    ) -> Arc<Handle<T>> {
        let key = referent.object_id();
        if let Some(handle) = self.get(key) {
            return handle;
        }

        let handle = self
            .entries
            .entry(key)
            .or_insert_with(|| Arc::new(Handle::new(reserve(), referent)))
            .value()
            .clone();
        debug!(
            target: crate::KERNEL_TARGET,
            "{} handle {} for object {}",
            T::KIND,
            handle.id(),
            key
        );
        handle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove and return every handle.
    pub fn drain(&self) -> Vec<Arc<Handle<T>>> {
        let keys: Vec<ObjectId> = self.entries.iter().map(|entry| *entry.key()).collect();
        keys.into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|(_, handle)| handle))
            .collect()
    }
}

impl<T: Addressable> Default for HandleCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "handle_tests.rs"]
mod tests;
