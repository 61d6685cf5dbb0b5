//! Derived delta events carrying the accumulated buffer

use super::traits::EventKind;
use serde::{Deserialize, Serialize};

/// An `output_text` delta plus the full text accumulated so far
///
/// Published under the `response.output_text.delta` signal so subscribers
/// can render the running text without concatenating deltas themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextDelta {
    /// Sequence number of the raw event
    pub sequence_number: u64,
    /// Item the text belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Position of the message in the output list
    pub output_index: usize,
    /// Position of the part in the message content
    pub content_index: usize,
    /// Text appended by this event
    pub delta: String,
    /// Entire text of the part after applying `delta`
    pub snapshot: String,
}

impl TextDelta {
    /// Signal kind this event is published under
    pub const KIND: EventKind = EventKind::OutputTextDelta;
}

/// A `function_call_arguments` delta plus the full arguments so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentsDelta {
    /// Sequence number of the raw event
    pub sequence_number: u64,
    /// Item the arguments belong to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    /// Position of the function call in the output list
    pub output_index: usize,
    /// Text appended by this event
    pub delta: String,
    /// Entire arguments buffer after applying `delta`
    pub snapshot: String,
}

impl ArgumentsDelta {
    /// Signal kind this event is published under
    pub const KIND: EventKind = EventKind::FunctionCallArgumentsDelta;
}
