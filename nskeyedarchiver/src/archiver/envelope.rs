/*!
 Validation and construction of the four-key `NSKeyedArchiver` envelope.

 ```text
 {
   "$archiver": "NSKeyedArchiver",
   "$top":      { <name>: <back-reference>, ... },
   "$objects":  [ "$null", <entry>, ... ],
   "$version":  100000
 }
 ```
*/

use plist::{Dictionary, Value as PlistValue};

use crate::error::validation::ValidationError;

pub const ARCHIVER_KEY: &str = "$archiver";
pub const TOP_KEY: &str = "$top";
pub const OBJECTS_KEY: &str = "$objects";
pub const VERSION_KEY: &str = "$version";

/// The only accepted value of `$archiver`
pub const NS_KEYED_ARCHIVER: &str = "NSKeyedArchiver";
/// The only accepted value of `$version`
pub const ARCHIVER_VERSION: u64 = 100_000;
/// The conventional content of `$objects[0]`
pub const NULL_MARKER: &str = "$null";

/// A property list that passed [`validate`], borrowing the parts resolution needs
#[derive(Debug, Clone, Copy)]
pub struct ValidatedEnvelope<'a> {
    top: &'a Dictionary,
    objects: &'a [PlistValue],
}

impl<'a> ValidatedEnvelope<'a> {
    /// The named roots, in document order
    pub fn top(&self) -> &'a Dictionary {
        self.top
    }

    /// The flat object table
    pub fn objects(&self) -> &'a [PlistValue] {
        self.objects
    }
}

/// Check that a property list is an `NSKeyedArchiver` envelope
///
/// Keys are checked in the order `$archiver`, `$top`, `$objects`, `$version`, stopping at the first problem.
pub fn validate(tree: &PlistValue) -> Result<ValidatedEnvelope<'_>, ValidationError> {
    let root = tree.as_dictionary().ok_or(ValidationError::NotADictionary)?;

    match root.get(ARCHIVER_KEY) {
        None => return Err(ValidationError::MissingKey(ARCHIVER_KEY)),
        Some(PlistValue::String(name)) if name == NS_KEYED_ARCHIVER => {}
        Some(PlistValue::String(name)) => {
            return Err(ValidationError::WrongArchiverName(name.clone()))
        }
        Some(other) => return Err(ValidationError::WrongArchiverName(format!("{other:?}"))),
    }

    let top = root
        .get(TOP_KEY)
        .ok_or(ValidationError::MissingKey(TOP_KEY))?
        .as_dictionary()
        .ok_or(ValidationError::WrongType(TOP_KEY, "a dictionary"))?;

    let objects = root
        .get(OBJECTS_KEY)
        .ok_or(ValidationError::MissingKey(OBJECTS_KEY))?
        .as_array()
        .ok_or(ValidationError::WrongType(OBJECTS_KEY, "an array"))?;

    match root.get(VERSION_KEY) {
        None => return Err(ValidationError::MissingKey(VERSION_KEY)),
        Some(version) => match version.as_unsigned_integer() {
            Some(ARCHIVER_VERSION) => {}
            Some(found) => return Err(ValidationError::WrongVersion(found.to_string())),
            None => return Err(ValidationError::WrongVersion(format!("{version:?}"))),
        },
    }

    Ok(ValidatedEnvelope { top, objects })
}

/// Assemble an envelope around a finished object table
pub(crate) fn build(top: Dictionary, objects: Vec<PlistValue>) -> PlistValue {
    let mut root = Dictionary::new();
    root.insert(
        ARCHIVER_KEY.to_string(),
        PlistValue::String(NS_KEYED_ARCHIVER.to_string()),
    );
    root.insert(TOP_KEY.to_string(), PlistValue::Dictionary(top));
    root.insert(OBJECTS_KEY.to_string(), PlistValue::Array(objects));
    root.insert(
        VERSION_KEY.to_string(),
        PlistValue::Integer(ARCHIVER_VERSION.into()),
    );
    PlistValue::Dictionary(root)
}
