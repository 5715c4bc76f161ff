//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::KernelConfig;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error, if any, into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &KernelConfig) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_dispatch(config, &mut result);
        Self::validate_region(config, &mut result);

        result
    }

    fn validate_dispatch(config: &KernelConfig, result: &mut ValidationResult) {
        if config.dispatch.idle_wait_ms == 0 {
            result.add_error(ValidationError::new(
                "loop.idle_wait_ms",
                "idle_wait_ms must be greater than 0",
            ));
        }

        if config.dispatch.idle_wait_ms > 1000 {
            result.add_warning(ValidationWarning::new(
                "loop.idle_wait_ms",
                "idle_wait_ms is above one second, kernel-side delivery may lag",
            ));
        }

        if config.dispatch.thread_name.trim().is_empty() {
            result.add_error(ValidationError::new(
                "loop.thread_name",
                "Thread name cannot be empty",
            ));
        }
    }

    fn validate_region(config: &KernelConfig, result: &mut ValidationResult) {
        let Some(capacity) = config.region.capacity_bytes else {
            return;
        };

        for (path, size) in config.objects.entries() {
            if size > capacity {
                result.add_error(ValidationError::new(
                    path,
                    format!("{} bytes exceeds region capacity {}", size, capacity),
                ));
            }
        }

        match config.objects.domain_footprint() {
            Some(footprint) if footprint <= capacity => {}
            Some(footprint) => result.add_error(ValidationError::new(
                "region.capacity_bytes",
                format!(
                    "capacity {} cannot hold a single domain ({} bytes)",
                    capacity, footprint
                ),
            )),
            None => result.add_error(ValidationError::new(
                "region.capacity_bytes",
                format!("capacity {} cannot hold a single domain (size overflows)", capacity),
            )),
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
