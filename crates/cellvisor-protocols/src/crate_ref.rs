//! Opaque loadable-code references.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Reference to the code a domain runs.
///
/// The kernel never inspects it; it is carried on the domain for diagnostics
/// and handed back to whoever loads the code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CrateRef(Arc<str>);

impl CrateRef {
    /// Create a new crate reference.
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    /// Name of the referenced crate.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CrateRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CrateRef {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for CrateRef {
    fn from(name: String) -> Self {
        Self(Arc::from(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_ref_name() {
        let c = CrateRef::new("hello.rc");
        assert_eq!(c.name(), "hello.rc");
        assert_eq!(c.to_string(), "hello.rc");
    }

    #[test]
    fn test_crate_ref_clone_is_equal() {
        let c = CrateRef::from("std");
        assert_eq!(c.clone(), c);
        assert_ne!(c, CrateRef::from(String::from("core")));
    }

    #[test]
    fn test_crate_ref_serializes_as_string() {
        let c = CrateRef::new("main");
        assert_eq!(serde_json::to_string(&c).unwrap(), "\"main\"");
        let back: CrateRef = serde_json::from_str("\"main\"").unwrap();
        assert_eq!(back, c);
    }
}
