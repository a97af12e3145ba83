//! Errors raised by binding operations.

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, BindError>;

/// Which flavour of content binding an operation was trying to establish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentBindMode {
    Unidirectional,
    Bidirectional,
}

impl fmt::Display for ContentBindMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unidirectional => f.write_str("unidirectional"),
            Self::Bidirectional => f.write_str("bidirectional"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindError {
    #[error("{name}: a bound value cannot be set")]
    BoundPropertyWrite { name: String },

    #[error("{name}: cannot add a {mode} content binding while a conflicting content binding exists")]
    ContentBindConflict { mode: ContentBindMode, name: String },

    #[error("cannot bind to null: {what}")]
    NullArgument { what: String },

    #[error("{name}: cannot bind to itself")]
    SelfBinding { name: String },

    #[error("{name}: {reason}")]
    IllegalState { name: String, reason: String },
}

impl BindError {
    #[must_use]
    pub fn bound_write(name: impl Into<String>) -> Self {
        Self::BoundPropertyWrite { name: name.into() }
    }

    #[must_use]
    pub fn conflict(mode: ContentBindMode, name: impl Into<String>) -> Self {
        Self::ContentBindConflict {
            mode,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn null(what: impl Into<String>) -> Self {
        Self::NullArgument { what: what.into() }
    }

    #[must_use]
    pub fn self_binding(name: impl Into<String>) -> Self {
        Self::SelfBinding { name: name.into() }
    }

    #[must_use]
    pub fn illegal_state(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalState {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
