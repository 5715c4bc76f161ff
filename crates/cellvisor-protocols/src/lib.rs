//! # Cellvisor Protocols
//!
//! Interfaces the kernel consumes from its collaborators.
//! Contains only interface definitions and small value types.
//!
//! ## Core Traits
//!
//! - [`PlatformService`] - Per-domain platform service, cloned at domain creation
//! - [`Message`] - A pending message the kernel may process on a domain's behalf
//! - [`CrateRef`] - Opaque reference to a domain's loadable code

pub mod crate_ref;
pub mod error;
pub mod message;
pub mod service;

pub use crate_ref::CrateRef;
pub use error::ServiceError;
pub use message::Message;
pub use service::PlatformService;
