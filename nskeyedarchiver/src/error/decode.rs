/*!
 Errors that can happen when resolving the `$objects` table into [`Value`](crate::archiver::models::Value)s.
*/

use std::fmt::{Display, Formatter, Result};

/// Errors that can happen when rebuilding an object graph from a validated envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A back-reference points outside of `$objects`, or `$class` does not point at a class descriptor
    BrokenReference(u64),
    /// A class-specific field has the wrong shape, as `(class name, field)`
    MalformedPayload(String, String),
    /// The graph nests deeper than the configured limit
    GraphTooDeep(usize),
}

impl DecodeError {
    pub(crate) fn malformed(class_name: &str, field: &str) -> Self {
        Self::MalformedPayload(class_name.to_string(), field.to_string())
    }
}

impl Display for DecodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            DecodeError::BrokenReference(idx) => {
                write!(fmt, "Back-reference {idx} does not point at a usable object!")
            }
            DecodeError::MalformedPayload(class_name, field) => {
                write!(fmt, "Field '{field}' of {class_name} has an unexpected shape")
            }
            DecodeError::GraphTooDeep(limit) => {
                write!(fmt, "Object graph is nested deeper than {limit} levels")
            }
        }
    }
}

impl std::error::Error for DecodeError {}
