//! Typed publish/subscribe used for cross-component signaling.
//!
//! Delivery is synchronous: every matching handler has run before `publish` returns.

use std::fmt::Debug;
use std::hash::Hash;

/// Base trait for all domain events
pub trait DomainEvent: Debug + Clone {
    /// Discriminant used to filter subscriptions
    type Kind: Copy + Eq + Hash + Debug;

    fn kind(&self) -> Self::Kind;
    fn event_type(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<E: DomainEvent> {
    id: SubscriptionId,
    filter: Option<E::Kind>,
    handler: Box<dyn FnMut(&E)>,
}

/// Listener list keyed by event kind
pub struct EventBus<E: DomainEvent> {
    next_id: u64,
    subscriptions: Vec<Subscription<E>>,
}

impl<E: DomainEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self { next_id: 0, subscriptions: Vec::new() }
    }
}

impl<E: DomainEvent> EventBus<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event
    pub fn subscribe<F>(&mut self, kind: E::Kind, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        self.push(Some(kind), Box::new(handler))
    }

    /// Subscribe to every event
    pub fn subscribe_all<F>(&mut self, handler: F) -> SubscriptionId
    where
        F: FnMut(&E) + 'static,
    {
        self.push(None, Box::new(handler))
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.id != id);
        before != self.subscriptions.len()
    }

    pub fn publish(&mut self, event: &E) {
        let kind = event.kind();
        for subscription in self.subscriptions.iter_mut() {
            if subscription.filter.is_none_or(|filter| filter == kind) {
                (subscription.handler)(event);
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscriptions.len()
    }

    fn push(&mut self, filter: Option<E::Kind>, handler: Box<dyn FnMut(&E)>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.subscriptions.push(Subscription { id, filter, handler });
        id
    }
}

impl<E: DomainEvent> Debug for EventBus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("subscribers", &self.subscriptions.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, Clone, PartialEq)]
    enum Ping {
        Small(u8),
        Large(u64),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    enum PingKind {
        Small,
        Large,
    }

    impl DomainEvent for Ping {
        type Kind = PingKind;

        fn kind(&self) -> PingKind {
            match self {
                Ping::Small(_) => PingKind::Small,
                Ping::Large(_) => PingKind::Large,
            }
        }

        fn event_type(&self) -> &'static str {
            "Ping"
        }
    }

    #[test]
    fn handlers_receive_only_their_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut bus = EventBus::<Ping>::new();
        let sink = seen.clone();
        bus.subscribe(PingKind::Small, move |e| sink.borrow_mut().push(e.clone()));

        bus.publish(&Ping::Large(9));
        bus.publish(&Ping::Small(1));

        assert_eq!(*seen.borrow(), vec![Ping::Small(1)]);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let count = Rc::new(RefCell::new(0));
        let mut bus = EventBus::<Ping>::new();
        let counter = count.clone();
        let id = bus.subscribe_all(move |_| *counter.borrow_mut() += 1);
        bus.publish(&Ping::Small(1));
        assert!(bus.unsubscribe(id));
        bus.publish(&Ping::Small(2));
        assert_eq!(*count.borrow(), 1);
        assert!(!bus.unsubscribe(id));
    }
}
