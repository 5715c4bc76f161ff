//! # Cellvisor Core
//!
//! Supervisory kernel for a multi-domain actor runtime.
//!
//! ## Components
//!
//! - [`Kernel`] - Owns the domain and queue registries, the handle caches and
//!   the shared dispatch loop
//! - [`Domain`] - An isolated execution unit with its own [`MessageQueue`] and
//!   platform service clone
//! - [`Handle`] - Cached, identity-stable capability for addressing a domain,
//!   task or port through its routing queue
//! - [`Region`] - Arena that accounts for every kernel-owned object
//!
//! ## Queue ownership
//!
//! A queue is drained by its domain while associated. Before association and
//! after the domain is destroyed it is unassociated, and the kernel's loop
//! thread drains it so no message is dropped in either window.

pub(crate) mod fatal;

pub mod dispatch;
pub mod domain;
pub mod error;
pub mod handle;
pub mod kernel;
mod kernel_diagnostics;
mod kernel_handles;
mod kernel_loop;
mod kernel_teardown;
pub mod message_queue;
pub mod metrics;
pub mod region;
pub mod state;

pub use dispatch::LoopWaker;
pub use domain::{Domain, Port, Task};
pub use error::{KernelError, KernelResult};
pub use handle::{Addressable, Handle, HandleCache, HandleKind};
pub use kernel::Kernel;
pub use message_queue::{Association, MessageQueue};
pub use metrics::{LoopMetrics, LoopMetricsSnapshot};
pub use region::{Allocation, ObjectId, Region, Reservation};
pub use state::LoopState;

/// Tracing target for kernel-category events.
pub const KERNEL_TARGET: &str = "cellvisor::kernel";
