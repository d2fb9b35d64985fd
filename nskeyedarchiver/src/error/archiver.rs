/*!
 The umbrella error returned by the public archive and unarchive functions.
*/

use std::fmt::{Display, Formatter, Result};

use crate::error::{decode::DecodeError, encode::EncodeError, validation::ValidationError};

/// Errors that can happen when reading or writing a keyed archive
#[derive(Debug)]
pub enum ArchiverError {
    /// The input bytes are not a readable binary or XML property list
    PlistSyntax(plist::Error),
    /// The property list layer failed to serialize the flattened envelope
    Serialize(plist::Error),
    /// The property list is not an `NSKeyedArchiver` envelope
    Validation(ValidationError),
    /// The envelope is valid but its object graph cannot be rebuilt
    Decode(DecodeError),
    /// The object graph cannot be flattened
    Encode(EncodeError),
}

impl Display for ArchiverError {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> Result {
        match self {
            ArchiverError::PlistSyntax(why) => write!(fmt, "Failed to parse plist: {why}"),
            ArchiverError::Serialize(why) => write!(fmt, "Failed to write plist: {why}"),
            ArchiverError::Validation(why) => write!(fmt, "{why}"),
            ArchiverError::Decode(why) => write!(fmt, "{why}"),
            ArchiverError::Encode(why) => write!(fmt, "{why}"),
        }
    }
}

impl std::error::Error for ArchiverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ArchiverError::PlistSyntax(why) | ArchiverError::Serialize(why) => Some(why),
            ArchiverError::Validation(why) => Some(why),
            ArchiverError::Decode(why) => Some(why),
            ArchiverError::Encode(why) => Some(why),
        }
    }
}

impl From<ValidationError> for ArchiverError {
    fn from(why: ValidationError) -> Self {
        Self::Validation(why)
    }
}

impl From<DecodeError> for ArchiverError {
    fn from(why: DecodeError) -> Self {
        Self::Decode(why)
    }
}

impl From<EncodeError> for ArchiverError {
    fn from(why: EncodeError) -> Self {
        Self::Encode(why)
    }
}
