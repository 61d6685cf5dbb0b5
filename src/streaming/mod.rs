//! Streaming response accumulation.
//!
//! This module drives one run of a transport's event sequence, keeps the
//! response snapshot up to date, and republishes raw and derived events:
//!
//! - [`ResponseAccumulator`]: the apply logic, usable on its own
//! - [`ResponseStream`]: drain loop, lifecycle signals and final result
//! - [`EventIter`]: pull-based consumption over the same event flow
//!
//! Lifecycle: `Idle -> Connected -> Draining -> {Completed | Aborted | Failed}`.
//! Exactly one of `end`, `abort` or `error` is published per stream.

mod accumulator;
mod iter;
mod stream;
mod types;

pub use accumulator::{Applied, ResponseAccumulator};
pub use iter::EventIter;
pub use stream::ResponseStream;
pub use types::{Phase, StreamOptions, StreamPayload};
