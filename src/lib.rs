//! Streaming Response Accumulator
//!
//! This crate rebuilds a structured model "response" from the ordered, sequenced
//! delta events a server pushes while the response is being generated. At every
//! point it holds a self-consistent snapshot of the response, and it republishes
//! raw and derived events to any number of consumers.
//!
//! ## Consumption styles
//!
//! A [`ResponseStream`] is consumed in three ways, all fed by the same drain loop:
//!
//! 1. **Callbacks** registered on its [`EventBus`] (`on_event`, `on_text_delta`, ...)
//! 2. **Pull iteration** through [`EventIter`], which also implements `futures_util::Stream`
//! 3. **Final result** through [`ResponseStream::final_response`]
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use response_accumulator::{CreateParams, ResponseStream, StreamOptions};
//!
//! let stream = ResponseStream::create(transport, CreateParams::new(params), StreamOptions::default());
//! stream.on_text_delta(|delta| print!("{}", delta.delta));
//!
//! let response = stream.final_response().await?;
//! println!("\n{}", response.output_text());
//! ```
//!
//! ## Resuming
//!
//! [`ResponseStream::resume`] re-attaches to an existing response. The transport
//! replays the whole event history so the snapshot is rebuilt from scratch, but
//! only events after `starting_after` reach consumers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// Modules
// ============================================================================

pub mod bus;
pub mod error;
pub mod events;
pub mod streaming;
pub mod transport;

pub use bus::{EventBus, Signal, SubscriptionId};
pub use error::{BoxError, Result, StreamError};
pub use events::{ArgumentsDelta, EventKind, RawEvent, StreamEvent, TextDelta};
pub use streaming::{
    EventIter, Phase, ResponseAccumulator, ResponseStream, StreamOptions, StreamPayload,
};
pub use transport::{
    CreateParams, EventSource, ReplayStep, ReplayTransport, ResumeParams, StreamRequest,
    Transport,
};

// ============================================================================
// Response
// ============================================================================

/// The response object under construction
///
/// Bound by the first `response.created` event, mutated in place by add and
/// delta events, and replaced wholesale by `response.completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Opaque response identity
    pub id: String,
    /// Model that produced the response
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Lifecycle status reported by the server (e.g. "in_progress", "completed")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Ordered output items, in arrival order
    #[serde(default)]
    pub output: Vec<OutputItem>,
    /// Fields this crate does not model, kept verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    /// Create an empty response with the given identity
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: None,
            status: None,
            output: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Set the model name
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Set the status
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    /// Append an output item
    pub fn with_output(mut self, item: OutputItem) -> Self {
        self.output.push(item);
        self
    }

    /// Concatenated text of every `output_text` part of every message item
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(OutputItem::as_message)
            .flat_map(|message| message.content.iter())
            .filter_map(ContentPart::as_text)
            .collect()
    }

    /// Iterate over the function call items, in output order
    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCallItem> {
        self.output.iter().filter_map(OutputItem::as_function_call)
    }
}

// ============================================================================
// Output Items
// ============================================================================

/// One element of the response's top-level output list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    /// Assistant message made of content parts
    Message(MessageItem),
    /// Function call with a growing arguments buffer
    FunctionCall(FunctionCallItem),
    /// Any other item kind, passed through untouched
    #[serde(untagged)]
    Other(RawItem),
}

impl OutputItem {
    /// Create an empty assistant message item
    pub fn message(id: impl Into<String>) -> Self {
        Self::Message(MessageItem {
            id: Some(id.into()),
            role: default_role(),
            status: None,
            content: Vec::new(),
        })
    }

    /// Create a function call item with empty arguments
    pub fn function_call(call_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::FunctionCall(FunctionCallItem {
            id: None,
            call_id: call_id.into(),
            name: name.into(),
            arguments: String::new(),
            status: None,
        })
    }

    /// Wire type name of this item
    pub fn kind(&self) -> &str {
        match self {
            Self::Message(_) => "message",
            Self::FunctionCall(_) => "function_call",
            Self::Other(raw) => &raw.item_type,
        }
    }

    /// True for a modeled item kind that failed to decode as its variant
    ///
    /// A `message` with an untyped content part, for example, lands in
    /// [`OutputItem::Other`] and would otherwise swallow later deltas.
    pub fn is_malformed(&self) -> bool {
        match self {
            Self::Other(raw) => matches!(raw.item_type.as_str(), "message" | "function_call"),
            _ => false,
        }
    }

    /// Get the message if this is a message item
    pub fn as_message(&self) -> Option<&MessageItem> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Get the function call if this is a function call item
    pub fn as_function_call(&self) -> Option<&FunctionCallItem> {
        match self {
            Self::FunctionCall(call) => Some(call),
            _ => None,
        }
    }
}

fn default_role() -> String {
    "assistant".to_string()
}

/// A message output item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageItem {
    /// Item identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Author role
    #[serde(default = "default_role")]
    pub role: String,
    /// Item status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Ordered content parts
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

/// A function call output item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCallItem {
    /// Item identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Identifier used to answer the call
    #[serde(default)]
    pub call_id: String,
    /// Function name
    #[serde(default)]
    pub name: String,
    /// Raw JSON arguments, grown by deltas
    #[serde(default)]
    pub arguments: String,
    /// Item status
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl FunctionCallItem {
    /// Decode the accumulated arguments buffer
    pub fn parse_arguments<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_str(&self.arguments)
    }
}

/// An output item of a kind this crate does not model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    /// Wire type name
    #[serde(rename = "type")]
    pub item_type: String,
    /// Remaining fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

// ============================================================================
// Content Parts
// ============================================================================

/// One element of a message's content list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Growing output text
    OutputText(OutputText),
    /// Any other part kind (refusals, audio, ...)
    #[serde(untagged)]
    Other(RawPart),
}

impl ContentPart {
    /// Create an output text part
    pub fn output_text(text: impl Into<String>) -> Self {
        Self::OutputText(OutputText {
            text: text.into(),
            annotations: Vec::new(),
        })
    }

    /// Wire type name of this part
    pub fn kind(&self) -> &str {
        match self {
            Self::OutputText(_) => "output_text",
            Self::Other(raw) => &raw.part_type,
        }
    }

    /// Get the text if this is an output text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::OutputText(part) => Some(&part.text),
            _ => None,
        }
    }
}

/// Output text content part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputText {
    /// Text accumulated so far
    #[serde(default)]
    pub text: String,
    /// Annotations attached by the server
    #[serde(default)]
    pub annotations: Vec<Value>,
}

/// A content part of a kind this crate does not model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPart {
    /// Wire type name
    #[serde(rename = "type")]
    pub part_type: String,
    /// Remaining fields
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================
