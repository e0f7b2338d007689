//! Errors raised by typed access into a [`crate::Value`].
//!
//! The numeric codes mirror the envelope/value error range of the wire
//! protocol's fault taxonomy (codes 3-6); the dispatcher in `aimpctl-rpc`
//! is the only place that turns these into wire-level fault payloads.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueErrorKind {
    Type,
    IndexRange,
    ObjectAccess,
    Range,
}

impl ValueErrorKind {
    /// The wire-level fault code for this error kind.
    pub fn code(&self) -> i32 {
        match self {
            ValueErrorKind::Type => 3,
            ValueErrorKind::IndexRange => 4,
            ValueErrorKind::ObjectAccess => 5,
            ValueErrorKind::Range => 6,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (code {})", kind.code())]
pub struct ValueError {
    kind: ValueErrorKind,
    message: String,
}

impl ValueError {
    pub fn new(kind: ValueErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ValueErrorKind {
        self.kind
    }

    pub fn code(&self) -> i32 {
        self.kind.code()
    }
}

impl fmt::Display for ValueErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueErrorKind::Type => "TYPE_ERROR",
            ValueErrorKind::IndexRange => "INDEX_RANGE_ERROR",
            ValueErrorKind::ObjectAccess => "OBJECT_ACCESS_ERROR",
            ValueErrorKind::Range => "VALUE_RANGE_ERROR",
        };
        f.write_str(name)
    }
}
