//! Response stream: drain loop, state machine and final result.

use super::accumulator::{Applied, ResponseAccumulator};
use super::iter::EventIter;
use super::types::{Phase, StreamOptions, StreamPayload};
use crate::bus::{EventBus, Signal, SubscriptionId};
use crate::error::{Result, StreamError};
use crate::events::{ArgumentsDelta, StreamEvent, TextDelta};
use crate::transport::{CreateParams, ResumeParams, StreamRequest, Transport};
use crate::Response;
use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

type Outcome = std::result::Result<Arc<Response>, StreamError>;

/// Everything the drain loop needs and takes exactly once
struct Launch {
    transport: Arc<dyn Transport>,
    request: StreamRequest,
}

/// State shared by a stream, its clones and its iterators
pub(super) struct Core {
    pub(super) bus: EventBus<StreamPayload>,
    pub(super) cancel: CancellationToken,
    /// Terminal result, recorded just before the terminal signal is published
    pub(super) settled: Mutex<Option<std::result::Result<(), StreamError>>>,
    phase: Mutex<Phase>,
    /// Live snapshot; locked only while applying, never across a publish
    accumulator: Mutex<ResponseAccumulator>,
    launch: Mutex<Option<Launch>>,
    outcome: watch::Sender<Option<Outcome>>,
}

impl Core {
    /// Spawn the drain loop unless it already runs; returns true if spawned
    pub(super) fn start(self: &Arc<Self>) -> bool {
        let Some(launch) = self.launch.lock().take() else {
            return false;
        };
        let core = Arc::clone(self);
        tokio::spawn(async move { core.drive(launch).await });
        true
    }

    async fn drive(&self, launch: Launch) {
        let _guard = Finalizer { core: self };
        let outcome = self.drain(launch).await;
        self.finish(outcome);
    }

    async fn drain(&self, launch: Launch) -> Outcome {
        let Launch { transport, request } = launch;
        let starting_after = request.starting_after();

        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }

        let mut source = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(StreamError::Cancelled),
            opened = transport.open(&request, self.cancel.clone()) => {
                opened.map_err(StreamError::transport)?
            }
        };

        self.set_phase(Phase::Connected);
        debug!(resume = request.is_resume(), ?starting_after, "response stream connected");
        self.bus.publish(Signal::Connected, &StreamPayload::Connected)?;
        self.set_phase(Phase::Draining);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(StreamError::Cancelled),
                next = source.next() => next,
            };
            let Some(next) = next else {
                break;
            };
            let event = next.map_err(StreamError::transport)?;
            let applied = self.accumulator.lock().apply(&event)?;
            self.emit(event, applied, starting_after)?;
        }

        if self.cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        let response = self.accumulator.lock().snapshot().cloned();
        response.map(Arc::new).ok_or(StreamError::NoEvents)
    }

    /// Publish an applied event, unless it is at or below the resume threshold
    fn emit(&self, event: StreamEvent, applied: Applied, starting_after: Option<u64>) -> Result<()> {
        let sequence_number = event.sequence_number();
        let emitted = starting_after.map_or(true, |threshold| sequence_number > threshold);
        trace!(sequence_number, event_type = event.type_name(), emitted, "applied event");
        if !emitted {
            return Ok(());
        }

        let alias = Signal::named(event.type_name());
        let payload = StreamPayload::Event(event);
        self.bus.publish(Signal::Event, &payload)?;

        match applied {
            Applied::TextDelta(delta) => {
                self.bus
                    .publish(TextDelta::KIND, &StreamPayload::TextDelta(delta))?;
            }
            Applied::ArgumentsDelta(delta) => {
                self.bus
                    .publish(ArgumentsDelta::KIND, &StreamPayload::ArgumentsDelta(delta))?;
            }
            Applied::Skipped => {}
            Applied::Plain => {
                self.bus.publish(alias, &payload)?;
            }
        }
        Ok(())
    }

    fn finish(&self, outcome: Outcome) {
        let (phase, signal, payload) = match &outcome {
            Ok(response) => {
                debug!(response_id = %response.id, "response stream completed");
                (Phase::Completed, Signal::End, StreamPayload::End(response.clone()))
            }
            Err(err) if err.is_cancelled() => {
                debug!("response stream aborted");
                (Phase::Aborted, Signal::Abort, StreamPayload::Abort(err.clone()))
            }
            Err(err) => {
                warn!(error = %err, "response stream failed");
                (Phase::Failed, Signal::Error, StreamPayload::Error(err.clone()))
            }
        };

        self.set_phase(phase);
        *self.settled.lock() = Some(outcome.as_ref().map(|_| ()).map_err(Clone::clone));
        if let Err(err) = self.bus.publish(signal, &payload) {
            warn!(error = %err, "terminal signal handler failed");
        }
        self.outcome.send_replace(Some(outcome));
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock() = phase;
    }

    async fn wait_outcome(&self) -> Outcome {
        let mut outcome = self.outcome.subscribe();
        let settled = outcome
            .wait_for(Option::is_some)
            .await
            .map(|settled| settled.clone());
        match settled {
            Ok(Some(outcome)) => outcome,
            _ => Err(StreamError::Interrupted),
        }
    }
}

/// Settles the stream if the drain future is dropped or panics
///
/// A dropped future counts as cancellation; a panic records `Interrupted`.
/// Either way the transport is told to stop.
struct Finalizer<'a> {
    core: &'a Core,
}

impl Drop for Finalizer<'_> {
    fn drop(&mut self) {
        if self.core.outcome.borrow().is_some() {
            return;
        }
        self.core.cancel.cancel();
        let err = if std::thread::panicking() {
            StreamError::Interrupted
        } else {
            StreamError::Cancelled
        };
        self.core.finish(Err(err));
    }
}

/// One streamed response, consumable by callbacks, pull iteration and a
/// final-result accessor at the same time.
///
/// Nothing happens until the drain loop is started, either explicitly with
/// [`start`](Self::start) or [`run`](Self::run), or implicitly by awaiting
/// [`final_response`](Self::final_response) or pulling from an [`EventIter`].
/// Register callbacks before that to observe every event.
///
/// Clones share the same stream.
#[derive(Clone)]
pub struct ResponseStream {
    core: Arc<Core>,
}

impl ResponseStream {
    /// Stream a new generation
    pub fn create(
        transport: Arc<dyn Transport>,
        params: CreateParams,
        options: StreamOptions,
    ) -> Self {
        Self::new(transport, StreamRequest::Create(params), options)
    }

    /// Re-attach to an existing response
    ///
    /// Every replayed event is applied, only events after
    /// `params.starting_after` are published.
    pub fn resume(
        transport: Arc<dyn Transport>,
        params: ResumeParams,
        options: StreamOptions,
    ) -> Self {
        Self::new(transport, StreamRequest::Resume(params), options)
    }

    /// Stream an arbitrary request
    pub fn new(transport: Arc<dyn Transport>, request: StreamRequest, options: StreamOptions) -> Self {
        let cancel = match options.cancellation {
            Some(parent) => parent.child_token(),
            None => CancellationToken::new(),
        };
        let (outcome, _) = watch::channel(None);

        Self {
            core: Arc::new(Core {
                bus: EventBus::new(),
                cancel,
                settled: Mutex::new(None),
                phase: Mutex::new(Phase::Idle),
                accumulator: Mutex::new(ResponseAccumulator::new()),
                launch: Mutex::new(Some(Launch { transport, request })),
                outcome,
            }),
        }
    }

    // ------------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------------

    /// The underlying event bus
    pub fn bus(&self) -> &EventBus<StreamPayload> {
        &self.core.bus
    }

    /// Subscribe to any signal; an error from `handler` fails the stream
    pub fn on<F>(&self, signal: impl Into<Signal>, handler: F) -> SubscriptionId
    where
        F: Fn(&StreamPayload) -> Result<()> + Send + Sync + 'static,
    {
        self.core.bus.subscribe(signal, handler)
    }

    /// Remove a subscription
    pub fn off(&self, id: SubscriptionId) -> bool {
        self.core.bus.unsubscribe(id)
    }

    /// Called once the transport accepted the request
    pub fn on_connected<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on(Signal::Connected, move |_| {
            handler();
            Ok(())
        })
    }

    /// Called for every emitted raw event
    pub fn on_event<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.on(Signal::Event, move |payload| {
            if let StreamPayload::Event(event) = payload {
                handler(event);
            }
            Ok(())
        })
    }

    /// Called for emitted raw events of one wire type
    ///
    /// The two delta types are published as derived events instead; use
    /// [`on_text_delta`](Self::on_text_delta) and
    /// [`on_arguments_delta`](Self::on_arguments_delta) for those.
    pub fn on_event_type<F>(&self, type_name: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&StreamEvent) + Send + Sync + 'static,
    {
        self.on(Signal::named(type_name), move |payload| {
            if let StreamPayload::Event(event) = payload {
                handler(event);
            }
            Ok(())
        })
    }

    /// Called for every text delta, with the running text
    pub fn on_text_delta<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&TextDelta) + Send + Sync + 'static,
    {
        self.on(TextDelta::KIND, move |payload| {
            if let StreamPayload::TextDelta(delta) = payload {
                handler(delta);
            }
            Ok(())
        })
    }

    /// Called for every function call arguments delta, with the running arguments
    pub fn on_arguments_delta<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&ArgumentsDelta) + Send + Sync + 'static,
    {
        self.on(ArgumentsDelta::KIND, move |payload| {
            if let StreamPayload::ArgumentsDelta(delta) = payload {
                handler(delta);
            }
            Ok(())
        })
    }

    /// Called once with the final response
    pub fn on_end<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Response) + Send + Sync + 'static,
    {
        self.on(Signal::End, move |payload| {
            if let StreamPayload::End(response) = payload {
                handler(response);
            }
            Ok(())
        })
    }

    /// Called once if the stream is cancelled
    pub fn on_abort<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.on(Signal::Abort, move |payload| {
            if let Some(err) = payload.as_error() {
                handler(err);
            }
            Ok(())
        })
    }

    /// Called once if the stream fails
    pub fn on_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.on(Signal::Error, move |payload| {
            if let Some(err) = payload.as_error() {
                handler(err);
            }
            Ok(())
        })
    }

    /// Pull-based view of the emitted raw events
    pub fn events(&self) -> EventIter {
        EventIter::attach(self.core.clone())
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Spawn the drain loop on the current tokio runtime
    ///
    /// Returns false if the loop was already started.
    pub fn start(&self) -> bool {
        self.core.start()
    }

    /// Drive the drain loop on the current task and return the final response
    ///
    /// If the loop already runs elsewhere this only waits for it. Dropping
    /// the future before it completes aborts the stream.
    pub async fn run(&self) -> Result<Arc<Response>> {
        let launch = self.core.launch.lock().take();
        if let Some(launch) = launch {
            self.core.drive(launch).await;
        }
        self.core.wait_outcome().await
    }

    /// Wait for the stream to finish and return the final response
    ///
    /// Starts the drain loop if needed. Fails with the abort or error
    /// condition otherwise. Later calls return the same `Arc`.
    pub async fn final_response(&self) -> Result<Arc<Response>> {
        self.core.start();
        self.core.wait_outcome().await
    }

    /// Wait for any terminal outcome
    pub async fn done(&self) -> Result<()> {
        self.final_response().await.map(|_| ())
    }

    /// Fire the cancellation signal
    pub fn abort(&self) {
        self.core.cancel.cancel();
    }

    /// Token observed by the drain loop and the transport
    pub fn cancellation_token(&self) -> CancellationToken {
        self.core.cancel.clone()
    }

    /// Clone of the response snapshot as of the last applied event
    ///
    /// `None` until `response.created` has been applied. Inside a handler
    /// the snapshot already reflects the event being delivered. After a
    /// failure it keeps the state reached before the failing event.
    pub fn current_snapshot(&self) -> Option<Response> {
        self.core.accumulator.lock().snapshot().cloned()
    }

    /// Inspect the response snapshot without cloning it
    ///
    /// Do not call back into the stream from `f`.
    pub fn with_snapshot<R>(&self, f: impl FnOnce(Option<&Response>) -> R) -> R {
        f(self.core.accumulator.lock().snapshot())
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> Phase {
        *self.core.phase.lock()
    }

    /// True once `end` fired
    pub fn ended(&self) -> bool {
        self.phase() == Phase::Completed
    }

    /// True once `abort` fired
    pub fn aborted(&self) -> bool {
        self.phase() == Phase::Aborted
    }

    /// True once `error` fired
    pub fn errored(&self) -> bool {
        self.phase() == Phase::Failed
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("phase", &self.phase())
            .field("bus", &self.core.bus)
            .finish()
    }
}
