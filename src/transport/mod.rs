//! Transport collaborator
//!
//! The accumulator does not speak HTTP. It asks a [`Transport`] to open a
//! request and receives a lazy sequence of decoded [`StreamEvent`]s back.
//! Framing, reconnection and retries all stay on the transport's side.
//!
//! Two requests exist:
//! - [`StreamRequest::Create`]: start a new generation; the sequence starts at
//!   `response.created`
//! - [`StreamRequest::Resume`]: re-attach to an existing response; the
//!   transport replays the *entire* history and the stream applies every event
//!   but only emits those after `starting_after`

use crate::error::BoxError;
use crate::events::StreamEvent;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

mod replay;

pub use replay::{ReplayStep, ReplayTransport};

/// Lazy sequence of events produced by a transport
pub type EventSource = BoxStream<'static, Result<StreamEvent, BoxError>>;

/// Generation parameters, opaque to the accumulator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CreateParams(pub Value);

impl CreateParams {
    /// Wrap request parameters
    pub fn new(params: Value) -> Self {
        Self(params)
    }

    /// Borrow the wrapped parameters
    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

/// Identity of an existing response to re-attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeParams {
    /// Response to stream
    pub response_id: String,
    /// Events at or below this sequence number are applied but not emitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_after: Option<u64>,
}

impl ResumeParams {
    /// Resume from the beginning of a response
    pub fn new(response_id: impl Into<String>) -> Self {
        Self {
            response_id: response_id.into(),
            starting_after: None,
        }
    }

    /// Only emit events whose sequence number is greater than `sequence_number`
    pub fn starting_after(mut self, sequence_number: u64) -> Self {
        self.starting_after = Some(sequence_number);
        self
    }
}

/// What the transport is asked to open
#[derive(Debug, Clone, PartialEq)]
pub enum StreamRequest {
    /// New streaming generation
    Create(CreateParams),
    /// Full replay of an existing response
    Resume(ResumeParams),
}

impl StreamRequest {
    /// Emission threshold; `None` in create mode
    pub fn starting_after(&self) -> Option<u64> {
        match self {
            Self::Create(_) => None,
            Self::Resume(params) => params.starting_after,
        }
    }

    /// True for resume requests
    pub fn is_resume(&self) -> bool {
        matches!(self, Self::Resume(_))
    }
}

/// Source of server-pushed events
///
/// Implementations must stop producing events once `cancel` fires.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `request` and return its event sequence
    async fn open(
        &self,
        request: &StreamRequest,
        cancel: CancellationToken,
    ) -> Result<EventSource, BoxError>;
}
