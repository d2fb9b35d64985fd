/*!
 Errors that can happen when flattening [`Value`](crate::archiver::models::Value)s into an `$objects` table.
*/

use std::fmt::{Display, Formatter, Result};

/// Errors that can happen when flattening an object graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The graph nests deeper than the configured limit
    GraphTooDeep(usize),
}

impl Display for EncodeError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            EncodeError::GraphTooDeep(limit) => {
                write!(fmt, "Object graph is nested deeper than {limit} levels")
            }
        }
    }
}

impl std::error::Error for EncodeError {}
