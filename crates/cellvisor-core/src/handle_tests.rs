use super::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use cellvisor_protocols::{CrateRef, PlatformService, ServiceError};

use crate::dispatch::LoopWaker;
use crate::region::Region;

struct NullService;

impl PlatformService for NullService {
    fn clone_service(&self) -> Result<Box<dyn PlatformService>, ServiceError> {
        Ok(Box::new(NullService))
    }
}

struct Counted(Arc<AtomicUsize>);

impl Message for Counted {
    fn kernel_process(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn domain(region: &Arc<Region>, name: &str) -> Arc<Domain> {
    let queue = Arc::new(MessageQueue::new(
        region.reserve(64),
        Arc::new(LoopWaker::new()),
    ));
    Arc::new(Domain::new(
        region.reserve(256),
        name,
        CrateRef::new("test.rc"),
        queue,
        Box::new(NullService),
    ))
}

#[test]
fn test_get_or_create_is_idempotent() {
    let region = Arc::new(Region::unbounded());
    let cache: HandleCache<Domain> = HandleCache::new();
    let dom = domain(&region, "a");

    let first = cache.get_or_create(&dom, || region.reserve(32));
    let second = cache.get_or_create(&dom, || panic!("hit must not reserve"));

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(cache.len(), 1);
    assert_eq!(first.kind(), HandleKind::Domain);
    assert_eq!(first.referent_id(), dom.id());
}

#[test]
fn test_distinct_objects_never_collide() {
    let region = Arc::new(Region::unbounded());
    let cache: HandleCache<Domain> = HandleCache::new();
    let a = domain(&region, "a");
    let b = domain(&region, "b");

    let ha = cache.get_or_create(&a, || region.reserve(32));
    let hb = cache.get_or_create(&b, || region.reserve(32));

    assert!(!Arc::ptr_eq(&ha, &hb));
    assert_ne!(ha.id(), hb.id());
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_concurrent_lookups_share_one_handle() {
    let region = Arc::new(Region::unbounded());
    let cache = Arc::new(HandleCache::<Domain>::new());
    let dom = domain(&region, "shared");
    let reservations = Arc::new(AtomicUsize::new(0));

    let workers: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let dom = dom.clone();
            let region = region.clone();
            let reservations = reservations.clone();
            thread::spawn(move || {
                cache.get_or_create(&dom, || {
                    reservations.fetch_add(1, Ordering::SeqCst);
                    region.reserve(32)
                })
            })
        })
        .collect();

    let handles: Vec<_> = workers.into_iter().map(|w| w.join().unwrap()).collect();
    for handle in &handles {
        assert!(Arc::ptr_eq(handle, &handles[0]));
    }
    assert_eq!(reservations.load(Ordering::SeqCst), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_handle_routes_to_domain_queue() {
    let region = Arc::new(Region::unbounded());
    let cache: HandleCache<Domain> = HandleCache::new();
    let dom = domain(&region, "a");
    let handle = cache.get_or_create(&dom, || region.reserve(32));

    let hits = Arc::new(AtomicUsize::new(0));
    handle.send(Box::new(Counted(hits.clone())));
    assert_eq!(dom.message_queue().len(), 1);
    assert!(Arc::ptr_eq(handle.message_queue(), dom.message_queue()));

    dom.message_queue().drain_at_kernel_scope();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn test_task_and_port_route_through_owning_domain() {
    let region = Arc::new(Region::unbounded());
    let dom = domain(&region, "a");
    let task = Arc::new(Task::new(region.reserve(128), "t", dom.clone()));
    let port = Arc::new(Port::new(region.reserve(32), task.clone()));

    let tasks: HandleCache<Task> = HandleCache::new();
    let ports: HandleCache<Port> = HandleCache::new();
    let th = tasks.get_or_create(&task, || region.reserve(32));
    let ph = ports.get_or_create(&port, || region.reserve(32));

    assert_eq!(th.kind(), HandleKind::Task);
    assert_eq!(ph.kind(), HandleKind::Port);
    assert!(Arc::ptr_eq(th.message_queue(), dom.message_queue()));
    assert!(Arc::ptr_eq(ph.message_queue(), dom.message_queue()));
}

#[test]
fn test_handle_does_not_keep_referent_alive() {
    let region = Arc::new(Region::unbounded());
    let cache: HandleCache<Domain> = HandleCache::new();
    let dom = domain(&region, "short-lived");
    let handle = cache.get_or_create(&dom, || region.reserve(32));

    assert!(handle.referent().is_some());
    drop(dom);
    assert!(handle.referent().is_none());
    assert!(cache.get(handle.referent_id()).is_some());
}

#[test]
fn test_drain_releases_handles() {
    let region = Arc::new(Region::unbounded());
    let cache: HandleCache<Domain> = HandleCache::new();
    let a = domain(&region, "a");
    let b = domain(&region, "b");
    cache.get_or_create(&a, || region.reserve(32));
    cache.get_or_create(&b, || region.reserve(32));
    let before = region.live_objects();

    let drained = cache.drain();
    assert_eq!(drained.len(), 2);
    assert!(cache.is_empty());

    drop(drained);
    assert_eq!(region.live_objects(), before - 2);
}

#[test]
fn test_kind_display() {
    assert_eq!(HandleKind::Domain.to_string(), "domain");
    assert_eq!(HandleKind::Task.to_string(), "task");
    assert_eq!(HandleKind::Port.to_string(), "port");
}
