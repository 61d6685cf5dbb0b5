//! Pull-based consumption layered over the event bus.

use super::stream::Core;
use super::types::StreamPayload;
use crate::bus::{Signal, SubscriptionId};
use crate::error::{Result, StreamError};
use crate::events::StreamEvent;
use futures_util::{ready, Stream};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::debug;

type Pull = Result<Option<StreamEvent>>;

enum Request {
    Ready(Pull),
    Wait(oneshot::Receiver<Pull>),
}

/// Events published but not yet pulled, and pulls not yet satisfied
#[derive(Default)]
struct Queues {
    buffer: VecDeque<StreamEvent>,
    waiters: VecDeque<oneshot::Sender<Pull>>,
    finished: Option<std::result::Result<(), StreamError>>,
}

impl Queues {
    fn push(&mut self, event: StreamEvent) {
        if let Some(event) = self.hand_off(event) {
            self.buffer.push_back(event);
        }
    }

    /// Put back an event a dropped pull was handed but never returned
    fn restore(&mut self, event: StreamEvent) {
        if let Some(event) = self.hand_off(event) {
            self.buffer.push_front(event);
        }
    }

    /// Give `event` to the oldest live waiter; returns it if there is none
    fn hand_off(&mut self, event: StreamEvent) -> Option<StreamEvent> {
        let mut pending = Ok(Some(event));
        while let Some(waiter) = self.waiters.pop_front() {
            match waiter.send(pending) {
                Ok(()) => return None,
                // puller went away; hand the event to the next one
                Err(returned) => pending = returned,
            }
        }
        pending.ok().flatten()
    }

    fn finish(&mut self, result: std::result::Result<(), StreamError>) {
        if self.finished.is_some() {
            return;
        }
        for waiter in self.waiters.drain(..) {
            let _ = waiter.send(result.clone().map(|()| None));
        }
        self.finished = Some(result);
    }

    fn request(&mut self) -> Request {
        if let Some(event) = self.buffer.pop_front() {
            return Request::Ready(Ok(Some(event)));
        }
        match &self.finished {
            Some(Ok(())) => Request::Ready(Ok(None)),
            Some(Err(err)) => Request::Ready(Err(err.clone())),
            None => {
                let (tx, rx) = oneshot::channel();
                self.waiters.push_back(tx);
                Request::Wait(rx)
            }
        }
    }
}

/// Sequential view of a stream's emitted raw events
///
/// Events published before a pull are buffered; pulls made before an event
/// arrives wait for it, oldest first. Buffered events are still delivered
/// after the stream ends. Dropping the iterator before the stream ends
/// cancels the stream.
pub struct EventIter {
    core: Arc<Core>,
    queues: Arc<Mutex<Queues>>,
    subscriptions: Vec<SubscriptionId>,
    pending: Option<oneshot::Receiver<Pull>>,
    fused: bool,
}

impl EventIter {
    pub(super) fn attach(core: Arc<Core>) -> Self {
        let queues = Arc::new(Mutex::new(Queues::default()));
        let mut subscriptions = Vec::with_capacity(4);

        let q = queues.clone();
        subscriptions.push(core.bus.subscribe(Signal::Event, move |payload: &StreamPayload| {
            if let StreamPayload::Event(event) = payload {
                q.lock().push(event.clone());
            }
            Ok(())
        }));

        let q = queues.clone();
        subscriptions.push(core.bus.subscribe(Signal::End, move |_: &StreamPayload| {
            q.lock().finish(Ok(()));
            Ok(())
        }));

        for signal in [Signal::Abort, Signal::Error] {
            let q = queues.clone();
            subscriptions.push(core.bus.subscribe(signal, move |payload: &StreamPayload| {
                let err = payload.as_error().cloned().unwrap_or(StreamError::Interrupted);
                q.lock().finish(Err(err));
                Ok(())
            }));
        }

        // attached after the terminal signal went out
        let settled = core.settled.lock().clone();
        if let Some(result) = settled {
            queues.lock().finish(result);
        }

        Self {
            core,
            queues,
            subscriptions,
            pending: None,
            fused: false,
        }
    }

    /// Pull the next event
    ///
    /// Returns `Ok(None)` once the stream ended and every buffered event was
    /// pulled, and the abort or error condition on every pull after a
    /// failure. Starts the drain loop if nobody has.
    ///
    /// Cancel-safe: dropping the future never loses an event.
    pub async fn recv(&self) -> Result<Option<StreamEvent>> {
        self.core.start();
        let request = self.queues.lock().request();
        match request {
            Request::Ready(pull) => pull,
            Request::Wait(rx) => {
                let mut waiter = Waiter {
                    rx: Some(rx),
                    queues: &self.queues,
                };
                waiter.wait().await
            }
        }
    }

    /// Stop iterating and cancel the stream
    pub fn stop(self) {
        self.core.cancel.cancel();
    }

    /// Events buffered and not yet pulled
    pub fn buffered_len(&self) -> usize {
        self.queues.lock().buffer.len()
    }
}

/// One outstanding [`EventIter::recv`]
///
/// If the pull is dropped after an event was handed to it, the event goes
/// back to the front of the queue instead of being lost.
struct Waiter<'a> {
    rx: Option<oneshot::Receiver<Pull>>,
    queues: &'a Mutex<Queues>,
}

impl Waiter<'_> {
    async fn wait(&mut self) -> Pull {
        let Some(rx) = self.rx.as_mut() else {
            return Err(StreamError::Interrupted);
        };
        let received = rx.await;
        self.rx = None;
        received.unwrap_or(Err(StreamError::Interrupted))
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let Some(mut rx) = self.rx.take() else {
            return;
        };
        let mut queues = self.queues.lock();
        rx.close();
        if let Ok(Ok(Some(event))) = rx.try_recv() {
            queues.restore(event);
        }
    }
}

impl Stream for EventIter {
    type Item = Result<StreamEvent>;

    /// Yields a failure once and then ends.
    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.fused {
            return Poll::Ready(None);
        }

        let pull = match this.pending.as_mut() {
            Some(rx) => {
                let received = ready!(Pin::new(rx).poll(cx));
                this.pending = None;
                received.unwrap_or(Err(StreamError::Interrupted))
            }
            None => {
                this.core.start();
                let request = this.queues.lock().request();
                match request {
                    Request::Ready(pull) => pull,
                    Request::Wait(mut rx) => match Pin::new(&mut rx).poll(cx) {
                        Poll::Ready(received) => received.unwrap_or(Err(StreamError::Interrupted)),
                        Poll::Pending => {
                            this.pending = Some(rx);
                            return Poll::Pending;
                        }
                    },
                }
            }
        };

        Poll::Ready(match pull {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                this.fused = true;
                None
            }
            Err(err) => {
                this.fused = true;
                Some(Err(err))
            }
        })
    }
}

impl Drop for EventIter {
    fn drop(&mut self) {
        let finished = self.queues.lock().finished.is_some();
        if !finished {
            debug!("event iterator dropped before the stream ended, cancelling");
            self.core.cancel.cancel();
        }
        for id in self.subscriptions.drain(..) {
            self.core.bus.unsubscribe(id);
        }
    }
}

impl std::fmt::Debug for EventIter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let queues = self.queues.lock();
        f.debug_struct("EventIter")
            .field("buffered", &queues.buffer.len())
            .field("waiting", &queues.waiters.len())
            .field("finished", &queues.finished.is_some())
            .finish()
    }
}
