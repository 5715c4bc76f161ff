//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root kernel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KernelConfig {
    #[serde(default, rename = "loop")]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub region: RegionConfig,

    #[serde(default)]
    pub objects: ObjectSizes,

    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Dispatch loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// How long the loop parks after a scan with nothing to drain.
    #[serde(default = "default_idle_wait_ms")]
    pub idle_wait_ms: u64,

    /// Name given to the dedicated loop thread.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

fn default_idle_wait_ms() -> u64 {
    10
}

fn default_thread_name() -> String {
    "kernel-loop".to_string()
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            idle_wait_ms: default_idle_wait_ms(),
            thread_name: default_thread_name(),
        }
    }
}

impl DispatchConfig {
    /// Idle wait as a Duration.
    pub fn idle_wait(&self) -> Duration {
        Duration::from_millis(self.idle_wait_ms)
    }
}

/// Arena budget.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegionConfig {
    /// Total bytes the region may hand out. Unlimited when unset.
    #[serde(default)]
    pub capacity_bytes: Option<usize>,
}

/// Bytes charged to the region for each kernel-owned object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectSizes {
    #[serde(default = "default_domain_bytes")]
    pub domain_bytes: usize,

    #[serde(default = "default_queue_bytes")]
    pub queue_bytes: usize,

    #[serde(default = "default_handle_bytes")]
    pub handle_bytes: usize,

    #[serde(default = "default_task_bytes")]
    pub task_bytes: usize,

    #[serde(default = "default_port_bytes")]
    pub port_bytes: usize,
}

fn default_domain_bytes() -> usize {
    256
}

fn default_queue_bytes() -> usize {
    64
}

fn default_handle_bytes() -> usize {
    32
}

fn default_task_bytes() -> usize {
    128
}

fn default_port_bytes() -> usize {
    32
}

impl Default for ObjectSizes {
    fn default() -> Self {
        Self {
            domain_bytes: default_domain_bytes(),
            queue_bytes: default_queue_bytes(),
            handle_bytes: default_handle_bytes(),
            task_bytes: default_task_bytes(),
            port_bytes: default_port_bytes(),
        }
    }
}

impl ObjectSizes {
    /// Bytes needed to bring up one domain: its queue, the domain itself
    /// and its handle. `None` if the sum overflows.
    pub fn domain_footprint(&self) -> Option<usize> {
        self.domain_bytes
            .checked_add(self.queue_bytes)?
            .checked_add(self.handle_bytes)
    }

    /// Every configured size with its config path.
    pub fn entries(&self) -> [(&'static str, usize); 5] {
        [
            ("objects.domain_bytes", self.domain_bytes),
            ("objects.queue_bytes", self.queue_bytes),
            ("objects.handle_bytes", self.handle_bytes),
            ("objects.task_bytes", self.task_bytes),
            ("objects.port_bytes", self.port_bytes),
        ]
    }
}

/// Diagnostic switches.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagnosticsConfig {
    /// Enable the single-domain deadlock heuristic.
    #[serde(default)]
    pub deadlock_detection: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}
