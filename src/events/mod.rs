//! Stream event types
//!
//! This module provides the sequenced events a server pushes while a response
//! is generated, plus the derived events the accumulator publishes.
//!
//! ## Event Types
//!
//! - [`StreamEvent`]: tagged union keyed by the wire `type`
//! - [`RawEvent`]: an event of a type this crate does not model
//! - [`EventKind`]: discriminant of the modeled types
//! - [`TextDelta`] / [`ArgumentsDelta`]: delta events with the running buffer attached
//!
//! ## Usage
//!
//! ```rust
//! use response_accumulator::events::StreamEvent;
//!
//! let line = r#"{"type":"response.output_text.delta","sequence_number":4,"output_index":0,"content_index":0,"delta":"Hel"}"#;
//! let event = StreamEvent::from_json_line(line).unwrap();
//!
//! assert_eq!(event.sequence_number(), 4);
//! assert_eq!(event.type_name(), "response.output_text.delta");
//! ```

mod delta;
mod envelope;
mod traits;

pub use delta::{ArgumentsDelta, TextDelta};
pub use envelope::{RawEvent, StreamEvent};
pub use traits::EventKind;
