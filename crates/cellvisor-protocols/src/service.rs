//! Platform service abstraction.

use crate::error::ServiceError;

/// Platform services available to a domain (logging sinks, environment,
/// allocator hooks and the like).
///
/// The kernel holds one root instance and gives each domain its own clone,
/// so side effects stay inside the domain. The clone is dropped exactly once,
/// when its domain is destroyed.
pub trait PlatformService: Send + Sync {
    /// Produce an independent instance for a new domain.
    fn clone_service(&self) -> Result<Box<dyn PlatformService>, ServiceError>;

    /// Service name for diagnostics.
    fn name(&self) -> &str {
        "platform"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingService {
        clones: Arc<AtomicUsize>,
    }

    impl PlatformService for CountingService {
        fn clone_service(&self) -> Result<Box<dyn PlatformService>, ServiceError> {
            self.clones.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CountingService {
                clones: self.clones.clone(),
            }))
        }
    }

    #[test]
    fn test_clone_service_is_independent() {
        let clones = Arc::new(AtomicUsize::new(0));
        let root = CountingService {
            clones: clones.clone(),
        };
        let a = root.clone_service().unwrap();
        let b = root.clone_service().unwrap();
        assert_eq!(clones.load(Ordering::SeqCst), 2);
        assert_eq!(a.name(), "platform");
        assert_eq!(b.name(), "platform");
    }
}
