//! Error taxonomy for response streams.

use std::sync::Arc;
use thiserror::Error;

/// Boxed error produced by a transport collaborator
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, StreamError>;

/// Everything that can end a stream without a final response
///
/// The type is `Clone` so a single failure can be handed to every pending
/// consumer (callbacks, the final-response accessor, and pull iterators).
#[derive(Debug, Clone, Error)]
pub enum StreamError {
    /// The first event applied was not `response.created`
    #[error("when snapshot hasn't been set yet, expected 'response.created' event, got '{event_type}'")]
    UnexpectedFirstEvent {
        /// Wire type of the offending event
        event_type: String,
    },

    /// An event referenced an output item that does not exist
    #[error("missing output at index {output_index}")]
    MissingOutput {
        /// Referenced output index
        output_index: usize,
    },

    /// An event referenced a content part that does not exist
    #[error("missing content at index {content_index} of output {output_index}")]
    MissingContent {
        /// Output item holding the content list
        output_index: usize,
        /// Referenced content index
        content_index: usize,
    },

    /// A text delta targeted a content part that is not `output_text`
    #[error("expected content to be 'output_text', got '{found}'")]
    UnexpectedContentKind {
        /// Type of the part that was found
        found: String,
    },

    /// An event carried a known type but its payload did not decode
    #[error("malformed '{event_type}' event (sequence number {sequence_number})")]
    MalformedEvent {
        /// Wire type of the event
        event_type: String,
        /// Sequence number of the event
        sequence_number: u64,
    },

    /// An added output item carried a modeled type but did not decode as it
    #[error("malformed '{item_type}' item (sequence number {sequence_number})")]
    MalformedItem {
        /// Wire type of the item
        item_type: String,
        /// Sequence number of the event carrying it
        sequence_number: u64,
    },

    /// The event sequence ended before any snapshot was bound
    #[error("request ended without sending any events")]
    NoEvents,

    /// The stream was cancelled by the caller or the transport
    #[error("request was aborted")]
    Cancelled,

    /// The transport failed to open or to produce the next event
    #[error("transport error: {0}")]
    Transport(#[source] Arc<dyn std::error::Error + Send + Sync>),

    /// A subscriber rejected a published payload
    #[error("handler failed: {0}")]
    Handler(String),

    /// The drain task stopped before recording an outcome
    #[error("stream task stopped before producing a result")]
    Interrupted,
}

impl StreamError {
    /// Wrap a transport failure
    pub fn transport(err: BoxError) -> Self {
        Self::Transport(Arc::from(err))
    }

    /// Build a handler failure from any message
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// True when the stream ended by cancellation rather than failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for errors caused by an internally inconsistent event sequence
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedFirstEvent { .. }
                | Self::MissingOutput { .. }
                | Self::MissingContent { .. }
                | Self::UnexpectedContentKind { .. }
                | Self::MalformedEvent { .. }
                | Self::MalformedItem { .. }
                | Self::NoEvents
        )
    }
}
