use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{Event, EventType};

/// Subscriber callback. Runs on its own task, never on the publisher's.
pub type Handler = Arc<dyn Fn(&Event) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`]; the only way to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Registration {
    id: SubscriptionId,
    handler: Handler,
}

/// Thread-safe registry of handlers keyed by event type.
///
/// `publish` snapshots the handler list under the read lock, drops the lock,
/// then hands each handler to its own task. A panicking handler is caught and
/// logged; it never reaches the publisher or its siblings.
pub struct EventBus {
    subscribers: RwLock<HashMap<EventType, Vec<Registration>>>,
    next_id: AtomicU64,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for `event_type`. Handlers are dispatched in
    /// registration order.
    pub fn subscribe<F>(&self, event_type: EventType, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        self.subscribe_handler(event_type, Arc::new(handler))
    }

    /// Same as [`subscribe`](Self::subscribe) for an already shared handler.
    pub fn subscribe_handler(&self, event_type: EventType, handler: Handler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        tracing::debug!(event_type = %event_type, subscription = id.0, "subscribed");

        self.subscribers
            .write()
            .entry(event_type)
            .or_default()
            .push(Registration { id, handler });
        id
    }

    /// Register one handler for several event types.
    pub fn subscribe_many<F>(&self, event_types: &[EventType], handler: F) -> Vec<SubscriptionId>
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        event_types
            .iter()
            .map(|t| self.subscribe_handler(t.clone(), Arc::clone(&handler)))
            .collect()
    }

    /// Fire-and-forget dispatch. Returns how many handlers were scheduled;
    /// zero subscribers is a silent no-op.
    pub fn publish(&self, event: Event) -> usize {
        let handlers = self.handlers_for(&event);
        let count = handlers.len();
        let event = Arc::new(event);
        for handler in handlers {
            spawn_isolated(handler, Arc::clone(&event));
        }
        count
    }

    /// Dispatch like [`publish`](Self::publish), then wait until every
    /// handler has run. For the last events before the runtime stops.
    pub async fn publish_and_wait(&self, event: Event) -> usize {
        let handlers = self.handlers_for(&event);
        let count = handlers.len();
        let event = Arc::new(event);
        let tasks: Vec<_> = handlers
            .into_iter()
            .map(|handler| {
                let job = isolated(handler, Arc::clone(&event));
                tokio::spawn(async move { job() })
            })
            .collect();
        for task in tasks {
            // Panics are caught inside the job.
            let _ = task.await;
        }
        count
    }

    fn handlers_for(&self, event: &Event) -> Vec<Handler> {
        let handlers: Vec<Handler> = {
            let subs = self.subscribers.read();
            match subs.get(&event.event_type) {
                Some(regs) => regs.iter().map(|r| Arc::clone(&r.handler)).collect(),
                None => Vec::new(),
            }
        };

        if handlers.is_empty() {
            tracing::trace!(event_type = %event.event_type, "no subscribers");
        } else {
            tracing::trace!(
                event_type = %event.event_type,
                subscribers = handlers.len(),
                "publishing event"
            );
        }
        handlers
    }

    /// Remove one registration. Returns `false` if it was already gone.
    pub fn unsubscribe(&self, event_type: &EventType, id: SubscriptionId) -> bool {
        let mut subs = self.subscribers.write();
        let Some(regs) = subs.get_mut(event_type) else {
            return false;
        };
        let before = regs.len();
        regs.retain(|r| r.id != id);
        let removed = regs.len() != before;
        if regs.is_empty() {
            subs.remove(event_type);
        }
        if removed {
            tracing::debug!(event_type = %event_type, subscription = id.0, "unsubscribed");
        }
        removed
    }

    /// Drop every handler for one event type.
    pub fn clear(&self, event_type: &EventType) {
        self.subscribers.write().remove(event_type);
        tracing::debug!(event_type = %event_type, "cleared subscribers");
    }

    /// Drop every handler for every event type.
    pub fn clear_all(&self) {
        self.subscribers.write().clear();
        tracing::debug!("cleared all subscribers");
    }

    pub fn subscriber_count(&self, event_type: &EventType) -> usize {
        self.subscribers
            .read()
            .get(event_type)
            .map_or(0, Vec::len)
    }
}

/// Run one handler on its own task behind a panic boundary.
///
/// Uses the ambient tokio runtime when there is one, otherwise a plain
/// thread, so publishing works from sync code too.
fn spawn_isolated(handler: Handler, event: Arc<Event>) {
    let job = isolated(handler, event);

    match tokio::runtime::Handle::try_current() {
        Ok(rt) => {
            rt.spawn(async move { job() });
        }
        Err(_) => {
            std::thread::spawn(job);
        }
    }
}

/// One handler call with its panic caught and logged.
fn isolated(handler: Handler, event: Arc<Event>) -> impl FnOnce() + Send + 'static {
    move || {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(event.as_ref())));
        if let Err(cause) = outcome {
            tracing::error!(
                event_type = %event.event_type,
                panic = panic_message(cause.as_ref()),
                "panic in event handler"
            );
        }
    }
}

fn panic_message(cause: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = cause.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = cause.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    const TEST_EVENT: EventType = EventType::from_static("test.event");

    async fn settle(counter: &AtomicUsize, expected: usize) {
        for _ in 0..200 {
            if counter.load(Ordering::SeqCst) >= expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn publish_five_times_counts_five() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        bus.subscribe(TEST_EVENT, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..5 {
            assert_eq!(bus.publish(Event::empty(TEST_EVENT)), 1);
        }

        settle(&counter, 5).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn publish_without_subscribers_is_noop() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(Event::empty(TEST_EVENT)), 0);
        assert_eq!(bus.subscriber_count(&TEST_EVENT), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn panicking_handler_is_isolated() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe(TEST_EVENT, |_| panic!("handler blew up"));
        let c = Arc::clone(&counter);
        bus.subscribe(TEST_EVENT, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish(Event::empty(TEST_EVENT)), 2);
        assert_eq!(bus.publish(Event::empty(TEST_EVENT)), 2);

        settle(&counter, 2).await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn publish_does_not_wait_for_slow_handlers() {
        let bus = EventBus::new();
        bus.subscribe(TEST_EVENT, |_| std::thread::sleep(Duration::from_millis(200)));

        let started = std::time::Instant::now();
        bus.publish(Event::empty(TEST_EVENT));
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn unsubscribe_by_handle() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&counter);
        let keep = bus.subscribe(TEST_EVENT, move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        let c = Arc::clone(&counter);
        let drop_me = bus.subscribe(TEST_EVENT, move |_| {
            c.fetch_add(100, Ordering::SeqCst);
        });

        assert!(bus.unsubscribe(&TEST_EVENT, drop_me));
        assert!(!bus.unsubscribe(&TEST_EVENT, drop_me));
        assert_ne!(keep, drop_me);
        assert_eq!(bus.subscriber_count(&TEST_EVENT), 1);

        bus.publish(Event::empty(TEST_EVENT));
        settle(&counter, 1).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn publish_and_wait_returns_after_handlers_ran() {
        let bus = EventBus::new();
        let counter = Arc::new(AtomicUsize::new(0));

        bus.subscribe(TEST_EVENT, |_| panic!("handler blew up"));
        let c = Arc::clone(&counter);
        bus.subscribe(TEST_EVENT, move |_| {
            std::thread::sleep(Duration::from_millis(20));
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(bus.publish_and_wait(Event::empty(TEST_EVENT)).await, 2);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(bus.publish_and_wait(Event::empty(EventType::from_static("test.none"))).await, 0);
    }

    #[test]
    fn clear_and_clear_all() {
        let other = EventType::from_static("test.other");
        let bus = EventBus::new();
        bus.subscribe(TEST_EVENT, |_| {});
        bus.subscribe(TEST_EVENT, |_| {});
        bus.subscribe(other.clone(), |_| {});

        bus.clear(&TEST_EVENT);
        assert_eq!(bus.subscriber_count(&TEST_EVENT), 0);
        assert_eq!(bus.subscriber_count(&other), 1);

        bus.clear_all();
        assert_eq!(bus.subscriber_count(&other), 0);
    }

    #[test]
    fn subscribe_many_shares_one_handler() {
        let a = EventType::from_static("test.a");
        let b = EventType::from_static("test.b");
        let bus = EventBus::new();

        let ids = bus.subscribe_many(&[a.clone(), b.clone()], |_| {});
        assert_eq!(ids.len(), 2);
        assert_eq!(bus.subscriber_count(&a), 1);
        assert_eq!(bus.subscriber_count(&b), 1);
    }

    #[test]
    fn publish_outside_runtime_uses_threads() {
        let bus = EventBus::new();
        let (tx, rx) = std::sync::mpsc::channel();
        let tx = parking_lot::Mutex::new(tx);
        bus.subscribe(TEST_EVENT, move |e| {
            let _ = tx.lock().send(e.payload::<u32>().copied());
        });

        bus.publish(Event::new(TEST_EVENT, 7_u32));
        let got = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(got, Some(7));
    }
}
