use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::rc::Rc;

/// Implemented by event enums published through an [`EventDispatcher`].
///
/// `Kind` is the subscription key: a fieldless mirror of the event's variants
/// so listeners can register for one variant without pattern matching on all
/// of them.
pub trait Event {
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
}

/// Returned by a handler to control whether lower-priority handlers still run
/// for the current publish.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Propagation {
    Continue,
    Stop,
}

/// Subscription priority. Handlers with higher values run first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    Value(i32),
    /// One more than the current maximum priority for the event kind.
    Higher,
    /// One less than the current minimum priority for the event kind.
    Lower,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Value(0)
    }
}

/// A subscribed callback. Handlers are compared by `Rc` identity, so the same
/// handle must be kept around to unsubscribe later.
pub type Handler<E> = Rc<RefCell<dyn FnMut(&E) -> Propagation>>;

/// Wraps a closure into a [`Handler`].
pub fn handler<E, F>(f: F) -> Handler<E>
where
    F: FnMut(&E) -> Propagation + 'static,
{
    Rc::new(RefCell::new(f))
}

struct Listener<E: Event> {
    handler: Handler<E>,
    priority: i32,
}

/// Priority-ordered publish/subscribe dispatcher.
///
/// Dispatch walks a snapshot of the handler list, so a handler may subscribe
/// or unsubscribe handlers (including itself) without affecting the publish
/// that is currently running. Everything is single-threaded; interior
/// mutability only exists so handlers can reach back into the dispatcher
/// they are being called from.
pub struct EventDispatcher<E: Event> {
    listeners: RefCell<HashMap<E::Kind, Vec<Listener<E>>>>,
}

impl<E: Event> EventDispatcher<E> {
    pub fn new() -> Self {
        EventDispatcher {
            listeners: RefCell::new(HashMap::new()),
        }
    }

    /// Registers `handler` for `kind`. Subscribing a handler that is already
    /// registered for this kind is a no-op.
    pub fn subscribe(&self, kind: E::Kind, handler: &Handler<E>, priority: Priority) {
        let mut listeners = self.listeners.borrow_mut();
        let entry = listeners.entry(kind).or_default();

        if entry.iter().any(|l| Rc::ptr_eq(&l.handler, handler)) {
            return;
        }

        let priority = match priority {
            Priority::Value(value) => value,
            Priority::Higher => entry.iter().map(|l| l.priority).max().map_or(0, |p| p + 1),
            Priority::Lower => entry.iter().map(|l| l.priority).min().map_or(0, |p| p - 1),
        };

        entry.push(Listener {
            handler: Rc::clone(handler),
            priority,
        });
        // Stable sort keeps insertion order between equal priorities.
        entry.sort_by(|a, b| b.priority.cmp(&a.priority));
    }

    /// Removes one registration of `handler` for `kind`, dropping the kind's
    /// handler list entirely if it becomes empty.
    pub fn unsubscribe(&self, kind: E::Kind, handler: &Handler<E>) {
        let mut listeners = self.listeners.borrow_mut();
        if let Some(entry) = listeners.get_mut(&kind) {
            if let Some(index) = entry.iter().position(|l| Rc::ptr_eq(&l.handler, handler)) {
                entry.remove(index);
                if entry.is_empty() {
                    listeners.remove(&kind);
                }
            }
        }
    }

    /// Invokes the handlers registered for the event's kind in priority
    /// order. A handler returning [`Propagation::Stop`] prevents all
    /// lower-priority handlers from running for this event.
    pub fn publish(&self, event: &E) {
        let snapshot: Vec<Handler<E>> = {
            let listeners = self.listeners.borrow();
            match listeners.get(&event.kind()) {
                Some(entry) => entry.iter().map(|l| Rc::clone(&l.handler)).collect(),
                None => return,
            }
        };

        for handler in snapshot {
            let outcome = (&mut *handler.borrow_mut())(event);
            if outcome == Propagation::Stop {
                break;
            }
        }
    }

    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.listeners
            .borrow()
            .get(&kind)
            .map_or(0, |entry| entry.len())
    }
}

impl<E: Event> Default for EventDispatcher<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug)]
    enum TestEvent {
        Ping(i32),
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    enum TestEventKind {
        Ping,
    }

    impl Event for TestEvent {
        type Kind = TestEventKind;

        fn kind(&self) -> TestEventKind {
            match self {
                TestEvent::Ping(_) => TestEventKind::Ping,
            }
        }
    }

    fn recording_handler(log: &Rc<RefCell<Vec<&'static str>>>, name: &'static str) -> Handler<TestEvent> {
        let log = Rc::clone(log);
        handler(move |_e: &TestEvent| {
            log.borrow_mut().push(name);
            Propagation::Continue
        })
    }

    #[test]
    fn test_handlers_run_in_priority_order() {
        let dispatcher = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let low = recording_handler(&log, "low");
        let high = recording_handler(&log, "high");
        let mid = recording_handler(&log, "mid");

        dispatcher.subscribe(TestEventKind::Ping, &low, Priority::Value(-10));
        dispatcher.subscribe(TestEventKind::Ping, &high, Priority::Value(10));
        dispatcher.subscribe(TestEventKind::Ping, &mid, Priority::Value(0));

        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_stop_propagation_skips_lower_priority_handlers() {
        let dispatcher = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let stopper = {
            let log = Rc::clone(&log);
            handler(move |_e: &TestEvent| {
                log.borrow_mut().push("stopper");
                Propagation::Stop
            })
        };
        let never = recording_handler(&log, "never");

        dispatcher.subscribe(TestEventKind::Ping, &stopper, Priority::Value(1));
        dispatcher.subscribe(TestEventKind::Ping, &never, Priority::Value(0));

        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["stopper"]);
    }

    #[test]
    fn test_resubscribing_same_handler_is_a_noop() {
        let dispatcher = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let h = recording_handler(&log, "once");

        dispatcher.subscribe(TestEventKind::Ping, &h, Priority::Value(0));
        dispatcher.subscribe(TestEventKind::Ping, &h, Priority::Value(5));

        assert_eq!(dispatcher.handler_count(TestEventKind::Ping), 1);
        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["once"]);
    }

    #[test]
    fn test_unsubscribe_removes_registration_and_empty_kind() {
        let dispatcher = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let h = recording_handler(&log, "gone");

        dispatcher.subscribe(TestEventKind::Ping, &h, Priority::Value(0));
        dispatcher.unsubscribe(TestEventKind::Ping, &h);

        assert_eq!(dispatcher.handler_count(TestEventKind::Ping), 0);
        dispatcher.publish(&TestEvent::Ping(1));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_higher_and_lower_sentinels_resolve_at_subscribe_time() {
        let dispatcher = EventDispatcher::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let base = recording_handler(&log, "base");
        let first = recording_handler(&log, "first");
        let last = recording_handler(&log, "last");

        dispatcher.subscribe(TestEventKind::Ping, &base, Priority::Value(0));
        dispatcher.subscribe(TestEventKind::Ping, &first, Priority::Higher);
        dispatcher.subscribe(TestEventKind::Ping, &last, Priority::Lower);

        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["first", "base", "last"]);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself_during_dispatch() {
        let dispatcher = Rc::new(EventDispatcher::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let slot: Rc<RefCell<Option<Handler<TestEvent>>>> = Rc::new(RefCell::new(None));
        let suicidal = {
            let dispatcher = Rc::clone(&dispatcher);
            let slot = Rc::clone(&slot);
            let log = Rc::clone(&log);
            handler(move |_e: &TestEvent| {
                log.borrow_mut().push("suicidal");
                if let Some(me) = slot.borrow().as_ref() {
                    dispatcher.unsubscribe(TestEventKind::Ping, me);
                }
                Propagation::Continue
            })
        };
        *slot.borrow_mut() = Some(Rc::clone(&suicidal));
        let after = recording_handler(&log, "after");

        dispatcher.subscribe(TestEventKind::Ping, &suicidal, Priority::Value(1));
        dispatcher.subscribe(TestEventKind::Ping, &after, Priority::Value(0));

        // The already-copied handler list still runs to completion.
        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["suicidal", "after"]);

        // The next publish no longer sees the removed handler.
        log.borrow_mut().clear();
        dispatcher.publish(&TestEvent::Ping(2));
        assert_eq!(*log.borrow(), vec!["after"]);
    }

    #[test]
    fn test_handler_subscribed_during_dispatch_runs_next_publish() {
        let dispatcher = Rc::new(EventDispatcher::new());
        let log = Rc::new(RefCell::new(Vec::new()));

        let late = recording_handler(&log, "late");
        let subscriber = {
            let dispatcher = Rc::clone(&dispatcher);
            let late = Rc::clone(&late);
            let log = Rc::clone(&log);
            handler(move |_e: &TestEvent| {
                log.borrow_mut().push("subscriber");
                dispatcher.subscribe(TestEventKind::Ping, &late, Priority::Value(0));
                Propagation::Continue
            })
        };

        dispatcher.subscribe(TestEventKind::Ping, &subscriber, Priority::Value(1));

        dispatcher.publish(&TestEvent::Ping(1));
        assert_eq!(*log.borrow(), vec!["subscriber"]);

        log.borrow_mut().clear();
        dispatcher.publish(&TestEvent::Ping(2));
        assert_eq!(*log.borrow(), vec!["subscriber", "late"]);
    }
}
