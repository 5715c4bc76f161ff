//! `run` subcommand: drive a workload through create, send, destroy, join.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use anyhow::bail;
use tracing::{info, trace};

use cellvisor_config::KernelConfig;
use cellvisor_core::Kernel;
use cellvisor_protocols::{CrateRef, Message, PlatformService, ServiceError};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Platform service with nothing behind it but a name.
struct LocalService {
    name: String,
}

impl PlatformService for LocalService {
    fn clone_service(&self) -> Result<Box<dyn PlatformService>, ServiceError> {
        Ok(Box::new(LocalService {
            name: self.name.clone(),
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

struct Ping {
    seq: usize,
    delivered: Arc<AtomicUsize>,
}

impl Message for Ping {
    fn kernel_process(&mut self) {
        trace!(seq = self.seq, "ping processed at kernel scope");
        self.delivered.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) async fn run_workload(
    config: KernelConfig,
    domains: usize,
    messages: usize,
) -> anyhow::Result<()> {
    let kernel = Kernel::new(
        config,
        Box::new(LocalService {
            name: "local".to_string(),
        }),
    )?;
    kernel.start()?;

    let delivered = Arc::new(AtomicUsize::new(0));
    let mut created = Vec::with_capacity(domains);
    for i in 0..domains {
        let handle = kernel.create_domain(CrateRef::new("demo.rc"), &format!("demo-{i}"));
        for seq in 0..messages {
            handle.send(Box::new(Ping {
                seq,
                delivered: delivered.clone(),
            }));
        }
        created.push(handle);
    }
    info!(domains = kernel.domain_count(), "workload domains created");

    // Nothing drains an associated queue here, so every message is left
    // for the kernel once its domain is gone.
    for handle in &created {
        if let Some(domain) = handle.referent() {
            kernel.destroy_domain(&domain);
        }
    }
    kernel.join_all_domains_async().await;

    let expected = domains * messages;
    let deadline = Instant::now() + DELIVERY_TIMEOUT;
    while delivered.load(Ordering::SeqCst) < expected {
        if Instant::now() >= deadline {
            bail!(
                "only {} of {} messages delivered",
                delivered.load(Ordering::SeqCst),
                expected
            );
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    kernel.stop()?;
    let snapshot = kernel.metrics().snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    info!(delivered = expected, "workload complete");
    Ok(())
}
