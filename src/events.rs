//! Element events and observer lists.

use crate::invalidation::InvalidationReason;
use crate::rect::Rect;
use core::fmt;
use core::marker::PhantomData;
use parking_lot::Mutex;
use std::sync::Arc;

/// The element's measurement is stale and the host should schedule a new measure pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeasureInvalidated {
    /// The reason for the (first coalesced) invalidation.
    pub reason: InvalidationReason,
}

/// The outermost batch on an element was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchCommitted;

/// The element's bounds changed during layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeChanged {
    pub old: Rect,
    pub new: Rect,
}

/// A callback for events of type `T`.
pub struct EventHandler<T>(Arc<dyn Fn(&T) + Send + Sync>);

impl<T> Clone for EventHandler<T> {
    fn clone(&self) -> Self {
        EventHandler(Arc::clone(&self.0))
    }
}

impl<T> EventHandler<T> {
    pub fn new<F: 'static + Fn(&T) + Send + Sync>(handler: F) -> Self {
        EventHandler(Arc::new(handler))
    }

    fn call(&self, event: &T) {
        (self.0)(event)
    }
}

impl<T> fmt::Debug for EventHandler<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "EventHandler<{}>", core::any::type_name::<T>())
    }
}

/// Identifies a registered observer so it can be removed again.
#[derive(Debug)]
pub struct Subscription<T> {
    id: u64,
    _event: PhantomData<fn(&T)>,
}

/// An ordered list of observers for one event type.
///
/// Observers are invoked synchronously, in registration order, with the list unlocked so they
/// may subscribe, unsubscribe or trigger further events.
pub(crate) struct Observers<T> {
    inner: Mutex<ObserverList<T>>,
}

struct ObserverList<T> {
    next_id: u64,
    handlers: Vec<(u64, EventHandler<T>)>,
}

impl<T> Observers<T> {
    pub(crate) fn new() -> Observers<T> {
        Observers {
            inner: Mutex::new(ObserverList {
                next_id: 0,
                handlers: Vec::new(),
            }),
        }
    }

    pub(crate) fn subscribe(&self, handler: EventHandler<T>) -> Subscription<T> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.handlers.push((id, handler));
        Subscription {
            id,
            _event: PhantomData,
        }
    }

    /// Returns false if the subscription was not registered.
    pub(crate) fn unsubscribe(&self, subscription: Subscription<T>) -> bool {
        let mut inner = self.inner.lock();
        let len = inner.handlers.len();
        inner.handlers.retain(|(id, _)| *id != subscription.id);
        inner.handlers.len() != len
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().handlers.len()
    }

    pub(crate) fn emit(&self, event: &T) {
        let handlers: Vec<_> = self
            .inner
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler.call(event);
        }
    }
}

impl<T> fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Observers({})", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn emit_and_unsubscribe() {
        let observers = Observers::<BatchCommitted>::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let sub = observers.subscribe(EventHandler::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        observers.emit(&BatchCommitted);
        assert_eq!(count.load(Ordering::SeqCst), 1);

        assert!(observers.unsubscribe(sub));
        observers.emit(&BatchCommitted);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(observers.len(), 0);
    }

    #[test]
    fn observers_may_subscribe_while_emitting() {
        let observers = Arc::new(Observers::<BatchCommitted>::new());
        let o = Arc::clone(&observers);
        observers.subscribe(EventHandler::new(move |_| {
            o.subscribe(EventHandler::new(|_| {}));
        }));

        observers.emit(&BatchCommitted);
        assert_eq!(observers.len(), 2);
    }
}
