/*!
 The public entry points: bytes in, [`Value`]s out, and back again.
*/

use std::slice;

use crate::{
    archiver::{envelope::validate, flattener::flatten_with, models::Value, resolver::resolve},
    error::archiver::ArchiverError,
    util::{
        options::{ArchiverOptions, OutputFormat},
        plist::{parse_plist, write_binary, write_xml},
    },
};

/// Decode a binary or XML keyed archive into its root values, in `$top` order
///
/// # Example
///
/// ```
/// use nskeyedarchiver::{archive_binary, unarchive, Value};
///
/// let bytes = archive_binary(&Value::array(vec![Value::Int(42)])).unwrap();
/// let roots = unarchive(&bytes).unwrap();
/// assert_eq!(roots, vec![Value::array(vec![Value::Int(42)])]);
/// ```
pub fn unarchive(bytes: &[u8]) -> Result<Vec<Value>, ArchiverError> {
    unarchive_with(bytes, &ArchiverOptions::default())
}

/// Decode a keyed archive with custom limits
pub fn unarchive_with(bytes: &[u8], options: &ArchiverOptions) -> Result<Vec<Value>, ArchiverError> {
    let tree = parse_plist(bytes)?;
    let envelope = validate(&tree)?;
    tracing::debug!(
        objects = envelope.objects().len(),
        roots = envelope.top().len(),
        "Validated keyed archive"
    );
    Ok(resolve(&envelope, options)?)
}

/// Encode a single root value as a binary keyed archive
pub fn archive_binary(value: &Value) -> Result<Vec<u8>, ArchiverError> {
    archive_many(slice::from_ref(value), &ArchiverOptions::default())
}

/// Encode a single root value as an XML keyed archive
pub fn archive_xml(value: &Value) -> Result<String, ArchiverError> {
    let tree = flatten_with(slice::from_ref(value), &ArchiverOptions::default())?;
    write_xml(&tree)
}

/// Encode any number of root values, named `$0`, `$1`, ..., in the format set by `options`
pub fn archive_many(values: &[Value], options: &ArchiverOptions) -> Result<Vec<u8>, ArchiverError> {
    let tree = flatten_with(values, options)?;
    match options.format {
        OutputFormat::Binary => write_binary(&tree),
        OutputFormat::Xml => write_xml(&tree).map(String::into_bytes),
    }
}
