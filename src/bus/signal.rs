//! Bus signal names

use crate::events::EventKind;

/// Name a payload is published under
///
/// Five lifecycle signals are fixed; every other name is a type-specific
/// signal such as `response.output_text.delta`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Signal {
    /// The transport accepted the request and started producing events
    Connected,
    /// Every raw event, once
    Event,
    /// The event sequence finished and a final response exists
    End,
    /// The stream was cancelled
    Abort,
    /// The stream failed
    Error,
    /// A type-specific signal
    Named(String),
}

impl Signal {
    /// Type-specific signal for an arbitrary name
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Convert to string representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Connected => "connected",
            Self::Event => "event",
            Self::End => "end",
            Self::Abort => "abort",
            Self::Error => "error",
            Self::Named(name) => name,
        }
    }

    /// True for `end`, `abort` and `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Abort | Self::Error)
    }
}

impl From<&str> for Signal {
    fn from(name: &str) -> Self {
        match name {
            "connected" => Self::Connected,
            "event" => Self::Event,
            "end" => Self::End,
            "abort" => Self::Abort,
            "error" => Self::Error,
            other => Self::Named(other.to_string()),
        }
    }
}

impl From<EventKind> for Signal {
    fn from(kind: EventKind) -> Self {
        Self::Named(kind.as_str().to_string())
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
