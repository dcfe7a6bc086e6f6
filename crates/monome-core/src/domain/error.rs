//! Error type shared by validation, pages, and controllers.

use thiserror::Error;

/// Errors raised by the interaction model and by LED surface writes.
///
/// Every validation failure is raised before any write is issued, so a
/// failed operation never leaves a partially drawn frame behind.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ControlError {
    /// An argument is outside its allowed domain (level, cell, length, tag).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A page, ring, or cell index is outside the configured bounds.
    #[error("{kind} index {index} out of range (0..{len})")]
    IndexOutOfRange {
        kind: &'static str,
        index: usize,
        len: usize,
    },

    /// A subscriber or entry that was asked to be removed is not registered.
    #[error("not found: {0}")]
    NotFound(String),

    /// The underlying channel failed to deliver a write.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ControlError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        ControlError::InvalidArgument(msg.into())
    }
}
