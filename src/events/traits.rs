//! Event kind discriminator

use serde::{Deserialize, Serialize};

/// Wire discriminant of the event types this crate understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A response was created; always the first event
    #[serde(rename = "response.created")]
    Created,
    /// The response started processing
    #[serde(rename = "response.in_progress")]
    InProgress,
    /// The response finished; carries the final object
    #[serde(rename = "response.completed")]
    Completed,
    /// The response failed server-side
    #[serde(rename = "response.failed")]
    Failed,
    /// The response stopped early (token limit, content filter)
    #[serde(rename = "response.incomplete")]
    Incomplete,
    /// A new output item was appended
    #[serde(rename = "response.output_item.added")]
    OutputItemAdded,
    /// An output item is final
    #[serde(rename = "response.output_item.done")]
    OutputItemDone,
    /// A content part was appended to a message
    #[serde(rename = "response.content_part.added")]
    ContentPartAdded,
    /// A content part is final
    #[serde(rename = "response.content_part.done")]
    ContentPartDone,
    /// Text was appended to an output text part
    #[serde(rename = "response.output_text.delta")]
    OutputTextDelta,
    /// An output text part is final
    #[serde(rename = "response.output_text.done")]
    OutputTextDone,
    /// Text was appended to a function call's arguments
    #[serde(rename = "response.function_call_arguments.delta")]
    FunctionCallArgumentsDelta,
    /// A function call's arguments are final
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone,
}

impl EventKind {
    /// Every known kind
    pub const ALL: [EventKind; 13] = [
        Self::Created,
        Self::InProgress,
        Self::Completed,
        Self::Failed,
        Self::Incomplete,
        Self::OutputItemAdded,
        Self::OutputItemDone,
        Self::ContentPartAdded,
        Self::ContentPartDone,
        Self::OutputTextDelta,
        Self::OutputTextDone,
        Self::FunctionCallArgumentsDelta,
        Self::FunctionCallArgumentsDone,
    ];

    /// Convert to the wire type name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "response.created",
            Self::InProgress => "response.in_progress",
            Self::Completed => "response.completed",
            Self::Failed => "response.failed",
            Self::Incomplete => "response.incomplete",
            Self::OutputItemAdded => "response.output_item.added",
            Self::OutputItemDone => "response.output_item.done",
            Self::ContentPartAdded => "response.content_part.added",
            Self::ContentPartDone => "response.content_part.done",
            Self::OutputTextDelta => "response.output_text.delta",
            Self::OutputTextDone => "response.output_text.done",
            Self::FunctionCallArgumentsDelta => "response.function_call_arguments.delta",
            Self::FunctionCallArgumentsDone => "response.function_call_arguments.done",
        }
    }

    /// Look up a kind by its wire type name
    pub fn from_type_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// True for the two kinds that grow a text buffer
    pub fn is_delta(&self) -> bool {
        matches!(self, Self::OutputTextDelta | Self::FunctionCallArgumentsDelta)
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
