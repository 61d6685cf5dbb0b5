//! Synchronous publish/subscribe with a terminal-state guard.

use super::signal::Signal;
use crate::error::StreamError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Subscriber callback
///
/// Returning an error stops the current dispatch and hands the error back
/// to the publisher.
pub type Handler<P> = Arc<dyn Fn(&P) -> Result<(), StreamError> + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscription<P> {
    id: SubscriptionId,
    handler: Handler<P>,
    once: bool,
}

struct Registry<P> {
    next_id: u64,
    subscriptions: HashMap<Signal, Vec<Subscription<P>>>,
    terminal: Option<Signal>,
}

/// Named-signal event bus
///
/// Handlers for a signal run in registration order, synchronously, on the
/// publishing task. Once one of `end`, `abort` or `error` has been published
/// every later publish is dropped, so subscribers see at most one terminal
/// signal.
pub struct EventBus<P> {
    registry: Mutex<Registry<P>>,
}

impl<P> Default for EventBus<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> EventBus<P> {
    /// Create an empty bus
    pub fn new() -> Self {
        Self {
            registry: Mutex::new(Registry {
                next_id: 0,
                subscriptions: HashMap::new(),
                terminal: None,
            }),
        }
    }

    /// Register `handler` for every future publish of `signal`
    pub fn subscribe<F>(&self, signal: impl Into<Signal>, handler: F) -> SubscriptionId
    where
        F: Fn(&P) -> Result<(), StreamError> + Send + Sync + 'static,
    {
        self.register(signal.into(), Arc::new(handler), false)
    }

    /// Register `handler` for the next publish of `signal` only
    pub fn once<F>(&self, signal: impl Into<Signal>, handler: F) -> SubscriptionId
    where
        F: Fn(&P) -> Result<(), StreamError> + Send + Sync + 'static,
    {
        self.register(signal.into(), Arc::new(handler), true)
    }

    fn register(&self, signal: Signal, handler: Handler<P>, once: bool) -> SubscriptionId {
        let mut registry = self.registry.lock();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry
            .subscriptions
            .entry(signal)
            .or_default()
            .push(Subscription { id, handler, once });
        id
    }

    /// Remove a subscription; returns false if it was already gone
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.lock();
        for subscriptions in registry.subscriptions.values_mut() {
            if let Some(pos) = subscriptions.iter().position(|s| s.id == id) {
                subscriptions.remove(pos);
                return true;
            }
        }
        false
    }

    /// Deliver `payload` to every handler currently registered for `signal`
    ///
    /// Returns `Ok(false)` when the bus is already terminated and the payload
    /// was dropped. The first handler error aborts the dispatch.
    pub fn publish(&self, signal: impl Into<Signal>, payload: &P) -> Result<bool, StreamError> {
        let signal = signal.into();
        let handlers: Vec<Handler<P>> = {
            let mut registry = self.registry.lock();
            if registry.terminal.is_some() {
                return Ok(false);
            }
            if signal.is_terminal() {
                registry.terminal = Some(signal.clone());
            }
            match registry.subscriptions.get_mut(&signal) {
                Some(subscriptions) => {
                    let handlers = subscriptions.iter().map(|s| s.handler.clone()).collect();
                    subscriptions.retain(|s| !s.once);
                    handlers
                }
                None => Vec::new(),
            }
        };

        // Lock released: handlers may subscribe or unsubscribe freely.
        for handler in handlers {
            handler(payload)?;
        }
        Ok(true)
    }

    /// Terminal signal that ended the bus, if any
    pub fn terminal(&self) -> Option<Signal> {
        self.registry.lock().terminal.clone()
    }

    /// True once a terminal signal has been published
    pub fn is_terminated(&self) -> bool {
        self.registry.lock().terminal.is_some()
    }

    /// Number of handlers registered for `signal`
    pub fn subscriber_count(&self, signal: impl Into<Signal>) -> usize {
        self.registry
            .lock()
            .subscriptions
            .get(&signal.into())
            .map_or(0, Vec::len)
    }
}

impl<P> std::fmt::Debug for EventBus<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        let mut signals: Vec<&str> = registry.subscriptions.keys().map(Signal::as_str).collect();
        signals.sort_unstable();
        f.debug_struct("EventBus")
            .field("signals", &signals)
            .field("terminal", &registry.terminal)
            .finish()
    }
}
