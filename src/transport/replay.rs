//! In-memory scripted transport
//!
//! Serves pre-recorded event sequences without any I/O. Useful for tests,
//! demos and for replaying a persisted event log through the accumulator.

use super::{EventSource, StreamRequest, Transport};
use crate::error::BoxError;
use crate::events::StreamEvent;
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tokio_util::sync::CancellationToken;

/// One step of a replay script
#[derive(Debug, Clone)]
pub enum ReplayStep {
    /// Yield an event
    Event(StreamEvent),
    /// Fail the sequence with a transport error
    Fail(String),
    /// Produce nothing until the request is cancelled, then end
    Hang,
}

impl From<StreamEvent> for ReplayStep {
    fn from(event: StreamEvent) -> Self {
        Self::Event(event)
    }
}

/// Scripted [`Transport`]
///
/// Create requests consume the queued scripts in order; resume requests
/// replay the full history registered for the response id.
#[derive(Debug, Default)]
pub struct ReplayTransport {
    created: Mutex<VecDeque<Vec<ReplayStep>>>,
    histories: Mutex<HashMap<String, Vec<ReplayStep>>>,
    refusal: Mutex<Option<String>>,
    requests: Mutex<Vec<StreamRequest>>,
}

impl ReplayTransport {
    /// Create a transport with no scripts
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a script for the next create request
    pub fn with_created<I, S>(self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ReplayStep>,
    {
        self.created
            .lock()
            .push_back(steps.into_iter().map(Into::into).collect());
        self
    }

    /// Register the full event history of a response for resume requests
    pub fn with_history<I, S>(self, response_id: impl Into<String>, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ReplayStep>,
    {
        self.histories.lock().insert(
            response_id.into(),
            steps.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Reject every request with `message`
    pub fn refusing(self, message: impl Into<String>) -> Self {
        *self.refusal.lock() = Some(message.into());
        self
    }

    /// Requests received so far, in order
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ReplayTransport {
    async fn open(
        &self,
        request: &StreamRequest,
        cancel: CancellationToken,
    ) -> Result<EventSource, BoxError> {
        self.requests.lock().push(request.clone());

        let refusal = self.refusal.lock().clone();
        if let Some(message) = refusal {
            return Err(message.into());
        }

        let steps = match request {
            StreamRequest::Create(_) => self
                .created
                .lock()
                .pop_front()
                .ok_or_else(|| BoxError::from("no scripted response for create request"))?,
            StreamRequest::Resume(params) => self
                .histories
                .lock()
                .get(&params.response_id)
                .cloned()
                .ok_or_else(|| {
                    BoxError::from(format!("unknown response '{}'", params.response_id))
                })?,
        };

        Ok(replay(steps, cancel))
    }
}

fn replay(steps: Vec<ReplayStep>, cancel: CancellationToken) -> EventSource {
    stream::unfold((steps.into_iter(), cancel), |(mut steps, cancel)| async move {
        if cancel.is_cancelled() {
            return None;
        }
        match steps.next()? {
            ReplayStep::Event(event) => Some((Ok(event), (steps, cancel))),
            ReplayStep::Fail(message) => Some((Err(BoxError::from(message)), (steps, cancel))),
            ReplayStep::Hang => {
                cancel.cancelled().await;
                None
            }
        }
    })
    .boxed()
}
