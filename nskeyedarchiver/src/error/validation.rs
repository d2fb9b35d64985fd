/*!
 Errors that can happen when checking the top-level keys of a keyed archive.
*/

use std::fmt::{Display, Formatter, Result};

/// Errors that can happen when validating an `NSKeyedArchiver` envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The decoded property list root is not a dictionary
    NotADictionary,
    /// One of `$archiver`, `$top`, `$objects`, or `$version` is absent
    MissingKey(&'static str),
    /// A required key is present but holds the wrong kind of data
    WrongType(&'static str, &'static str),
    /// `$archiver` is not `NSKeyedArchiver`
    WrongArchiverName(String),
    /// `$version` is not `100000`
    WrongVersion(String),
}

impl Display for ValidationError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            ValidationError::NotADictionary => {
                write!(fmt, "Invalid keyed archive: root is not a dictionary")
            }
            ValidationError::MissingKey(key) => {
                write!(fmt, "Invalid keyed archive: missing key '{key}'")
            }
            ValidationError::WrongType(key, expected) => {
                write!(fmt, "Invalid keyed archive: '{key}' is not {expected}")
            }
            ValidationError::WrongArchiverName(found) => write!(
                fmt,
                "Invalid value: {found} for key '$archiver', expected: 'NSKeyedArchiver'"
            ),
            ValidationError::WrongVersion(found) => write!(
                fmt,
                "Invalid value: {found} for key '$version', expected: '100000'"
            ),
        }
    }
}

impl std::error::Error for ValidationError {}
