//! Response snapshot accumulator.

use crate::error::{BoxError, Result, StreamError};
use crate::events::{ArgumentsDelta, EventKind, StreamEvent, TextDelta};
use crate::{ContentPart, OutputItem, Response};

/// Outcome of applying one event, beyond the snapshot mutation itself
#[derive(Debug, Clone, PartialEq)]
pub enum Applied {
    /// Event handled without a derived counterpart
    Plain,
    /// Delta addressed an item of another kind and was ignored
    Skipped,
    /// Text delta applied; carries the running text
    TextDelta(TextDelta),
    /// Arguments delta applied; carries the running arguments
    ArgumentsDelta(ArgumentsDelta),
}

/// Rebuilds a [`Response`] from its event sequence.
///
/// The first event must be `response.created`, which binds the snapshot.
/// Add and delta events then mutate it in place; buffers only ever grow by
/// append. `response.completed` replaces the snapshot wholesale.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    snapshot: Option<Response>,
}

impl ResponseAccumulator {
    /// Create an unbound accumulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, if bound
    pub fn snapshot(&self) -> Option<&Response> {
        self.snapshot.as_ref()
    }

    /// True once `response.created` has been applied
    pub fn is_bound(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Discard any snapshot
    pub fn reset(&mut self) {
        self.snapshot = None;
    }

    /// Apply a single event to the snapshot
    pub fn apply(&mut self, event: &StreamEvent) -> Result<Applied> {
        let Some(snapshot) = self.snapshot.as_mut() else {
            return self.bind(event);
        };

        match event {
            StreamEvent::OutputItemAdded {
                sequence_number,
                item,
                ..
            } => {
                if item.is_malformed() {
                    return Err(StreamError::MalformedItem {
                        item_type: item.kind().to_string(),
                        sequence_number: *sequence_number,
                    });
                }
                snapshot.output.push(item.clone());
                Ok(Applied::Plain)
            }
            StreamEvent::ContentPartAdded {
                output_index, part, ..
            } => {
                if let OutputItem::Message(message) = output_at(snapshot, *output_index)? {
                    message.content.push(part.clone());
                }
                Ok(Applied::Plain)
            }
            StreamEvent::OutputTextDelta {
                sequence_number,
                item_id,
                output_index,
                content_index,
                delta,
            } => {
                let OutputItem::Message(message) = output_at(snapshot, *output_index)? else {
                    return Ok(Applied::Skipped);
                };
                let part = message.content.get_mut(*content_index).ok_or(
                    StreamError::MissingContent {
                        output_index: *output_index,
                        content_index: *content_index,
                    },
                )?;
                match part {
                    ContentPart::OutputText(text) => {
                        text.text.push_str(delta);
                        Ok(Applied::TextDelta(TextDelta {
                            sequence_number: *sequence_number,
                            item_id: item_id.clone(),
                            output_index: *output_index,
                            content_index: *content_index,
                            delta: delta.clone(),
                            snapshot: text.text.clone(),
                        }))
                    }
                    other => Err(StreamError::UnexpectedContentKind {
                        found: other.kind().to_string(),
                    }),
                }
            }
            StreamEvent::FunctionCallArgumentsDelta {
                sequence_number,
                item_id,
                output_index,
                delta,
            } => {
                let OutputItem::FunctionCall(call) = output_at(snapshot, *output_index)? else {
                    return Ok(Applied::Skipped);
                };
                call.arguments.push_str(delta);
                Ok(Applied::ArgumentsDelta(ArgumentsDelta {
                    sequence_number: *sequence_number,
                    item_id: item_id.clone(),
                    output_index: *output_index,
                    delta: delta.clone(),
                    snapshot: call.arguments.clone(),
                }))
            }
            StreamEvent::Completed { response, .. } => {
                *snapshot = response.clone();
                Ok(Applied::Plain)
            }
            StreamEvent::Other(raw) if EventKind::from_type_name(&raw.event_type).is_some() => {
                Err(StreamError::MalformedEvent {
                    event_type: raw.event_type.clone(),
                    sequence_number: raw.sequence_number,
                })
            }
            _ => Ok(Applied::Plain),
        }
    }

    fn bind(&mut self, event: &StreamEvent) -> Result<Applied> {
        match event {
            StreamEvent::Created { response, .. } => {
                self.snapshot = Some(response.clone());
                Ok(Applied::Plain)
            }
            other => Err(StreamError::UnexpectedFirstEvent {
                event_type: other.type_name().to_string(),
            }),
        }
    }

    /// Consume the accumulator and return the snapshot
    pub fn finish(self) -> Result<Response> {
        self.snapshot.ok_or(StreamError::NoEvents)
    }

    /// Accumulate an entire stream into a response
    ///
    /// This is a convenience method for callers that only want the final
    /// object and no event fan-out.
    pub async fn accumulate_stream<S, E>(mut stream: S) -> Result<Response>
    where
        S: futures_util::Stream<Item = std::result::Result<StreamEvent, E>> + Unpin,
        E: Into<BoxError>,
    {
        use futures_util::StreamExt;

        let mut accumulator = Self::new();

        while let Some(event) = stream.next().await {
            let event = event.map_err(|err| StreamError::transport(err.into()))?;
            accumulator.apply(&event)?;
        }

        accumulator.finish()
    }
}

fn output_at(snapshot: &mut Response, output_index: usize) -> Result<&mut OutputItem> {
    snapshot
        .output
        .get_mut(output_index)
        .ok_or(StreamError::MissingOutput { output_index })
}
