//! Event bus
//!
//! A minimal publish/subscribe primitive with fixed lifecycle signals
//! (`connected`, `event`, `end`, `abort`, `error`) and arbitrary named
//! signals. Dispatch is synchronous and ordered; after a terminal signal the
//! bus drops every further publish.

mod event_bus;
mod signal;

pub use event_bus::{EventBus, Handler, SubscriptionId};
pub use signal::Signal;

#[cfg(test)]
mod tests;
