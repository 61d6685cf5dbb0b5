//! Sequenced stream event envelope

use super::traits::EventKind;
use crate::{ContentPart, OutputItem, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One server-pushed event
///
/// Every event carries a producer-assigned `sequence_number`, strictly
/// increasing across one logical stream. Types this crate does not model
/// decode to [`StreamEvent::Other`] and pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StreamEvent {
    /// Response created; binds the snapshot
    #[serde(rename = "response.created")]
    Created {
        /// Sequence number for ordering
        sequence_number: u64,
        /// The freshly created response
        response: Response,
    },

    /// Response started processing
    #[serde(rename = "response.in_progress")]
    InProgress {
        /// Sequence number for ordering
        sequence_number: u64,
        /// The response object
        response: Response,
    },

    /// Response finished; replaces the snapshot
    #[serde(rename = "response.completed")]
    Completed {
        /// Sequence number for ordering
        sequence_number: u64,
        /// The final response
        response: Response,
    },

    /// Response failed server-side
    #[serde(rename = "response.failed")]
    Failed {
        /// Sequence number for ordering
        sequence_number: u64,
        /// The failed response with error details
        response: Response,
    },

    /// Response ended incomplete
    #[serde(rename = "response.incomplete")]
    Incomplete {
        /// Sequence number for ordering
        sequence_number: u64,
        /// The incomplete response
        response: Response,
    },

    /// New output item appended
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Position of the item in the output list
        output_index: usize,
        /// The new item
        item: OutputItem,
    },

    /// Output item finalized
    #[serde(rename = "response.output_item.done")]
    OutputItemDone {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Position of the item in the output list
        output_index: usize,
        /// The finished item
        item: OutputItem,
    },

    /// Content part appended to a message
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the part belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the message in the output list
        output_index: usize,
        /// Position of the part in the message content
        content_index: usize,
        /// The new part
        part: ContentPart,
    },

    /// Content part finalized
    #[serde(rename = "response.content_part.done")]
    ContentPartDone {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the part belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the message in the output list
        output_index: usize,
        /// Position of the part in the message content
        content_index: usize,
        /// The finished part
        part: ContentPart,
    },

    /// Text appended to an output text part
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the text belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the message in the output list
        output_index: usize,
        /// Position of the part in the message content
        content_index: usize,
        /// Text to append
        delta: String,
    },

    /// Output text part finalized
    #[serde(rename = "response.output_text.done")]
    OutputTextDone {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the text belongs to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the message in the output list
        output_index: usize,
        /// Position of the part in the message content
        content_index: usize,
        /// Full text
        text: String,
    },

    /// Text appended to a function call's arguments
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the arguments belong to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the function call in the output list
        output_index: usize,
        /// Text to append
        delta: String,
    },

    /// Function call arguments finalized
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        /// Sequence number for ordering
        sequence_number: u64,
        /// Item the arguments belong to
        #[serde(default, skip_serializing_if = "Option::is_none")]
        item_id: Option<String>,
        /// Position of the function call in the output list
        output_index: usize,
        /// Full arguments
        arguments: String,
    },

    /// Any other event type
    #[serde(untagged)]
    Other(RawEvent),
}

/// An event of a type this crate does not model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Wire type name
    #[serde(rename = "type")]
    pub event_type: String,
    /// Sequence number for ordering
    pub sequence_number: u64,
    /// Remaining fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RawEvent {
    /// Create a raw event with no extra fields
    pub fn new(event_type: impl Into<String>, sequence_number: u64) -> Self {
        Self {
            event_type: event_type.into(),
            sequence_number,
            fields: Map::new(),
        }
    }

    /// Attach an extra field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

impl StreamEvent {
    /// Create a `response.created` event
    pub fn created(sequence_number: u64, response: Response) -> Self {
        Self::Created {
            sequence_number,
            response,
        }
    }

    /// Create a `response.completed` event
    pub fn completed(sequence_number: u64, response: Response) -> Self {
        Self::Completed {
            sequence_number,
            response,
        }
    }

    /// Create a `response.output_item.added` event
    pub fn output_item_added(sequence_number: u64, output_index: usize, item: OutputItem) -> Self {
        Self::OutputItemAdded {
            sequence_number,
            output_index,
            item,
        }
    }

    /// Create a `response.content_part.added` event
    pub fn content_part_added(
        sequence_number: u64,
        output_index: usize,
        content_index: usize,
        part: ContentPart,
    ) -> Self {
        Self::ContentPartAdded {
            sequence_number,
            item_id: None,
            output_index,
            content_index,
            part,
        }
    }

    /// Create a `response.output_text.delta` event
    pub fn output_text_delta(
        sequence_number: u64,
        output_index: usize,
        content_index: usize,
        delta: impl Into<String>,
    ) -> Self {
        Self::OutputTextDelta {
            sequence_number,
            item_id: None,
            output_index,
            content_index,
            delta: delta.into(),
        }
    }

    /// Create a `response.function_call_arguments.delta` event
    pub fn function_call_arguments_delta(
        sequence_number: u64,
        output_index: usize,
        delta: impl Into<String>,
    ) -> Self {
        Self::FunctionCallArgumentsDelta {
            sequence_number,
            item_id: None,
            output_index,
            delta: delta.into(),
        }
    }

    /// Producer-assigned sequence number
    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::Created { sequence_number, .. }
            | Self::InProgress { sequence_number, .. }
            | Self::Completed { sequence_number, .. }
            | Self::Failed { sequence_number, .. }
            | Self::Incomplete { sequence_number, .. }
            | Self::OutputItemAdded { sequence_number, .. }
            | Self::OutputItemDone { sequence_number, .. }
            | Self::ContentPartAdded { sequence_number, .. }
            | Self::ContentPartDone { sequence_number, .. }
            | Self::OutputTextDelta { sequence_number, .. }
            | Self::OutputTextDone { sequence_number, .. }
            | Self::FunctionCallArgumentsDelta { sequence_number, .. }
            | Self::FunctionCallArgumentsDone { sequence_number, .. } => *sequence_number,
            Self::Other(raw) => raw.sequence_number,
        }
    }

    /// Known kind, or `None` for [`StreamEvent::Other`]
    pub fn kind(&self) -> Option<EventKind> {
        let kind = match self {
            Self::Created { .. } => EventKind::Created,
            Self::InProgress { .. } => EventKind::InProgress,
            Self::Completed { .. } => EventKind::Completed,
            Self::Failed { .. } => EventKind::Failed,
            Self::Incomplete { .. } => EventKind::Incomplete,
            Self::OutputItemAdded { .. } => EventKind::OutputItemAdded,
            Self::OutputItemDone { .. } => EventKind::OutputItemDone,
            Self::ContentPartAdded { .. } => EventKind::ContentPartAdded,
            Self::ContentPartDone { .. } => EventKind::ContentPartDone,
            Self::OutputTextDelta { .. } => EventKind::OutputTextDelta,
            Self::OutputTextDone { .. } => EventKind::OutputTextDone,
            Self::FunctionCallArgumentsDelta { .. } => EventKind::FunctionCallArgumentsDelta,
            Self::FunctionCallArgumentsDone { .. } => EventKind::FunctionCallArgumentsDone,
            Self::Other(_) => return None,
        };
        Some(kind)
    }

    /// Wire type name, including unmodeled types
    pub fn type_name(&self) -> &str {
        match self {
            Self::Other(raw) => &raw.event_type,
            known => known.kind().map(|kind| kind.as_str()).unwrap_or_default(),
        }
    }

    /// Full response object carried by lifecycle events
    pub fn response(&self) -> Option<&Response> {
        match self {
            Self::Created { response, .. }
            | Self::InProgress { response, .. }
            | Self::Completed { response, .. }
            | Self::Failed { response, .. }
            | Self::Incomplete { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Serialize to a single JSON line
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a single JSON line
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}
