/*!
 Contains the settings that control how archives are read and written.
*/

use std::fmt::Display;

/// How many nested keyed entries (collections, objects, dates, URLs) are resolved or
/// flattened before giving up. Scalars stored directly in the table are not counted.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// The property list serialization used when writing an archive
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// `bplist00` data, as written by Foundation by default
    #[default]
    Binary,
    /// XML text, with back-references spelled as `CF$UID` dictionaries
    Xml,
}

impl OutputFormat {
    /// Given user's input, return a variant if the input matches one
    pub fn from_name(format: &str) -> Option<Self> {
        match format.to_lowercase().as_str() {
            "binary" | "bin" => Some(Self::Binary),
            "xml" => Some(Self::Xml),
            _ => None,
        }
    }
}

impl Display for OutputFormat {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Binary => write!(fmt, "binary"),
            OutputFormat::Xml => write!(fmt, "xml"),
        }
    }
}

/// Settings shared by unarchiving and archiving
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct ArchiverOptions {
    /// How many nested objects may be entered before failing with `GraphTooDeep`
    pub max_depth: usize,
    /// The serialization used by [`archive_many`](crate::archiver::codec::archive_many)
    pub format: OutputFormat,
}

impl ArchiverOptions {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }
}

impl Default for ArchiverOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            format: OutputFormat::default(),
        }
    }
}
