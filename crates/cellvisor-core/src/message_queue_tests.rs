use super::*;
use crate::region::Region;
use parking_lot::Mutex as PlMutex;

struct Recorded {
    tag: u32,
    log: Arc<PlMutex<Vec<u32>>>,
}

impl Message for Recorded {
    fn kernel_process(&mut self) {
        self.log.lock().push(self.tag);
    }
}

fn queue() -> (Arc<Region>, Arc<LoopWaker>, MessageQueue) {
    let region = Arc::new(Region::unbounded());
    let waker = Arc::new(LoopWaker::new());
    let queue = MessageQueue::new(region.reserve(64), waker.clone());
    (region, waker, queue)
}

fn recorded(tag: u32, log: &Arc<PlMutex<Vec<u32>>>) -> Box<dyn Message> {
    Box::new(Recorded {
        tag,
        log: log.clone(),
    })
}

#[test]
fn test_new_queue_is_pending() {
    let (_region, _waker, queue) = queue();
    assert_eq!(queue.association(), Association::Pending);
    assert!(!queue.is_associated());
    assert!(queue.is_empty());
}

#[test]
fn test_association_lifecycle() {
    let (region, _waker, queue) = queue();
    let handle = region.reserve(32);

    queue.associate(handle.id());
    assert_eq!(queue.association(), Association::Associated(handle.id()));
    assert!(queue.is_associated());

    queue.disassociate();
    assert_eq!(queue.association(), Association::Released);
    assert!(!queue.is_associated());
}

#[test]
#[should_panic(expected = "cannot associate")]
fn test_double_associate_is_fatal() {
    let (region, _waker, queue) = queue();
    let handle = region.reserve(32);
    queue.associate(handle.id());
    queue.associate(handle.id());
}

#[test]
#[should_panic(expected = "cannot associate")]
fn test_reassociate_after_release_is_fatal() {
    let (region, _waker, queue) = queue();
    let handle = region.reserve(32);
    queue.associate(handle.id());
    queue.disassociate();
    queue.associate(handle.id());
}

#[test]
#[should_panic(expected = "cannot disassociate")]
fn test_disassociate_pending_is_fatal() {
    let (_region, _waker, queue) = queue();
    queue.disassociate();
}

#[test]
fn test_fifo_order() {
    let (_region, _waker, queue) = queue();
    let log = Arc::new(PlMutex::new(Vec::new()));
    for tag in 1..=3 {
        queue.enqueue(recorded(tag, &log));
    }
    assert_eq!(queue.len(), 3);

    assert_eq!(queue.drain_at_kernel_scope(), 3);
    assert_eq!(*log.lock(), vec![1, 2, 3]);
    assert!(queue.is_empty());
}

#[test]
fn test_drain_is_bounded_by_pending_count() {
    struct Echo {
        queue: Arc<MessageQueue>,
        log: Arc<PlMutex<Vec<u32>>>,
    }

    impl Message for Echo {
        fn kernel_process(&mut self) {
            self.log.lock().push(0);
            self.queue.enqueue(Box::new(Recorded {
                tag: 9,
                log: self.log.clone(),
            }));
        }
    }

    let region = Arc::new(Region::unbounded());
    let queue = Arc::new(MessageQueue::new(
        region.reserve(64),
        Arc::new(LoopWaker::new()),
    ));
    let log = Arc::new(PlMutex::new(Vec::new()));
    queue.enqueue(Box::new(Echo {
        queue: queue.clone(),
        log: log.clone(),
    }));

    assert_eq!(queue.drain_at_kernel_scope(), 1);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.drain_at_kernel_scope(), 1);
    assert_eq!(*log.lock(), vec![0, 9]);
}

#[test]
fn test_enqueue_on_unassociated_wakes_loop() {
    let (_region, waker, queue) = queue();
    let log = Arc::new(PlMutex::new(Vec::new()));
    queue.enqueue(recorded(1, &log));
    assert!(waker.take_pending());
}

#[test]
fn test_enqueue_on_associated_does_not_wake_loop() {
    let (region, waker, queue) = queue();
    let handle = region.reserve(32);
    queue.associate(handle.id());

    let log = Arc::new(PlMutex::new(Vec::new()));
    queue.enqueue(recorded(1, &log));
    assert!(!waker.take_pending());

    queue.disassociate();
    assert!(waker.take_pending());
    queue.drain_at_kernel_scope();
}

#[test]
fn test_queue_releases_region_on_drop() {
    let (region, _waker, queue) = queue();
    assert_eq!(region.live_objects(), 1);
    drop(queue);
    assert_eq!(region.live_objects(), 0);
}

struct Exploding;

impl Message for Exploding {
    fn kernel_process(&mut self) {
        panic!("exploding message");
    }
}

#[test]
fn test_panicking_message_does_not_stop_drain() {
    let (_region, _waker, queue) = queue();
    let log = Arc::new(PlMutex::new(Vec::new()));
    queue.enqueue(recorded(1, &log));
    queue.enqueue(Box::new(Exploding));
    queue.enqueue(recorded(2, &log));

    assert_eq!(queue.drain_at_kernel_scope(), 3);
    assert_eq!(*log.lock(), vec![1, 2]);
    assert!(queue.is_empty());
}
