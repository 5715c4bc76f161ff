//! Messages routed through domain queues.

/// A message pending on a domain's queue.
///
/// While a domain drains its own queue, the message is handled by the
/// domain's scheduler. When the queue is unassociated, the kernel's dispatch
/// loop calls [`Message::kernel_process`] exactly once and then drops the
/// box, which is the message's single release.
pub trait Message: Send {
    /// Process the message at kernel scope.
    fn kernel_process(&mut self);

    /// Short description used in trace output.
    fn describe(&self) -> String {
        std::any::type_name::<Self>().to_string()
    }
}
