//! Per-domain message queues and their association state.

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{error, trace};

use cellvisor_protocols::Message;

use crate::dispatch::LoopWaker;
use crate::fatal::fatal;
use crate::region::{ObjectId, Reservation};

/// Who is responsible for draining a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Association {
    /// Newly created; the owning domain is still being constructed.
    Pending,
    /// Bound to the domain handle with this id; the domain drains it.
    Associated(ObjectId),
    /// The owning domain was destroyed; the kernel loop drains it.
    Released,
}

impl Association {
    /// Whether the owning domain is draining the queue.
    pub fn is_associated(&self) -> bool {
        matches!(self, Association::Associated(_))
    }
}

/// Queue of pending messages for one domain.
///
/// Always registered with the kernel. Must be empty when deleted.
pub struct MessageQueue {
    reservation: Reservation,
    messages: Mutex<VecDeque<Box<dyn Message>>>,
    association: Mutex<Association>,
    waker: Arc<LoopWaker>,
}

impl MessageQueue {
    /// Create an unassociated queue.
    pub fn new(reservation: Reservation, waker: Arc<LoopWaker>) -> Self {
        Self {
            reservation,
            messages: Mutex::new(VecDeque::new()),
            association: Mutex::new(Association::Pending),
            waker,
        }
    }

    /// Arena identity of the queue.
    pub fn id(&self) -> ObjectId {
        self.reservation.id()
    }

    /// Current association state.
    pub fn association(&self) -> Association {
        *self.association.lock()
    }

    /// Whether the owning domain drains this queue.
    pub fn is_associated(&self) -> bool {
        self.association().is_associated()
    }

    /// Hand draining over to the domain whose handle is `handle`.
    ///
    /// Only valid on a freshly created queue.
    pub fn associate(&self, handle: ObjectId) {
        let mut association = self.association.lock();
        match *association {
            Association::Pending => *association = Association::Associated(handle),
            other => {
                drop(association);
                fatal!(
                    "queue {}: cannot associate with handle {} from {:?}",
                    self.id(),
                    handle,
                    other
                );
            }
        }
    }

    /// Hand draining back to the kernel loop.
    ///
    /// Only valid on an associated queue; happens once, when its domain is
    /// destroyed.
    pub fn disassociate(&self) {
        let mut association = self.association.lock();
        match *association {
            Association::Associated(_) => *association = Association::Released,
            other => {
                drop(association);
                fatal!("queue {}: cannot disassociate from {:?}", self.id(), other);
            }
        }
        drop(association);
        // Anything queued so far is now the loop's to deliver.
        if !self.is_empty() {
            self.waker.notify();
        }
    }

    /// Append a message.
    pub fn enqueue(&self, message: Box<dyn Message>) {
        trace!(
            target: crate::KERNEL_TARGET,
            "queue {}: enqueue {}",
            self.id(),
            message.describe()
        );
        self.messages.lock().push_back(message);
        if !self.is_associated() {
            self.waker.notify();
        }
    }

    /// Remove the oldest message.
    pub fn dequeue(&self) -> Option<Box<dyn Message>> {
        self.messages.lock().pop_front()
    }

    /// Number of pending messages.
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    /// Whether no messages are pending.
    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// Process and release every message pending at call time, oldest first.
    ///
    /// Messages enqueued while draining wait for the next call. A message
    /// whose processing panics is logged and released; the rest of the
    /// drain continues. Returns the number taken off the queue.
    pub fn drain_at_kernel_scope(&self) -> usize {
        let pending = self.len();
        let mut processed = 0;
        for _ in 0..pending {
            let Some(mut message) = self.dequeue() else {
                break;
            };
            trace!(
                target: crate::KERNEL_TARGET,
                "queue {}: kernel processing {}",
                self.id(),
                message.describe()
            );
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| message.kernel_process()));
            if let Err(payload) = outcome {
                error!(
                    target: crate::KERNEL_TARGET,
                    "queue {}: {} panicked at kernel scope: {}",
                    self.id(),
                    message.describe(),
                    panic_message(payload.as_ref())
                );
            }
            drop(message);
            processed += 1;
        }
        processed
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

impl fmt::Debug for MessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageQueue")
            .field("id", &self.id())
            .field("association", &self.association())
            .field("len", &self.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "message_queue_tests.rs"]
mod tests;
