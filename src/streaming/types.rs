//! Type definitions for response streams.

use crate::error::StreamError;
use crate::events::{ArgumentsDelta, StreamEvent, TextDelta};
use crate::Response;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Options shared by create and resume streams
#[derive(Debug, Clone, Default)]
pub struct StreamOptions {
    /// External cancellation signal; cancelling it aborts the stream
    pub cancellation: Option<CancellationToken>,
}

impl StreamOptions {
    /// Link the stream to an external cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }
}

/// Lifecycle phase of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Created, drain loop not started
    #[default]
    Idle,
    /// Transport accepted the request
    Connected,
    /// Receiving events
    Draining,
    /// Sequence exhausted; final response available
    Completed,
    /// Cancelled
    Aborted,
    /// Transport or protocol failure
    Failed,
}

impl Phase {
    /// True for `Completed`, `Aborted` and `Failed`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Failed)
    }
}

/// Payload delivered to stream subscribers
#[derive(Debug, Clone)]
pub enum StreamPayload {
    /// `connected`
    Connected,
    /// `event` and per-type aliases
    Event(StreamEvent),
    /// `response.output_text.delta`, with the running text
    TextDelta(TextDelta),
    /// `response.function_call_arguments.delta`, with the running arguments
    ArgumentsDelta(ArgumentsDelta),
    /// `end`, with the final response
    End(Arc<Response>),
    /// `abort`
    Abort(StreamError),
    /// `error`
    Error(StreamError),
}

impl StreamPayload {
    /// Raw event, if this payload carries one
    pub fn as_event(&self) -> Option<&StreamEvent> {
        match self {
            Self::Event(event) => Some(event),
            _ => None,
        }
    }

    /// Failure, if this payload is `abort` or `error`
    pub fn as_error(&self) -> Option<&StreamError> {
        match self {
            Self::Abort(err) | Self::Error(err) => Some(err),
            _ => None,
        }
    }
}
