/*!
 Helpers for reading and writing the property lists that carry keyed archives.
*/

use std::io::Cursor;

use plist::{Dictionary, Uid, Value};

use crate::error::archiver::ArchiverError;

/// The key XML property lists use to spell a [`Uid`] as a dictionary
pub const UID_KEY: &str = "CF$UID";

/// Decode a binary or XML property list; the framing is detected from the data
pub fn parse_plist(bytes: &[u8]) -> Result<Value, ArchiverError> {
    Value::from_reader(Cursor::new(bytes)).map_err(ArchiverError::PlistSyntax)
}

/// Serialize a property list in the binary `bplist00` format
pub fn write_binary(value: &Value) -> Result<Vec<u8>, ArchiverError> {
    let mut out = vec![];
    value
        .to_writer_binary(&mut out)
        .map_err(ArchiverError::Serialize)?;
    Ok(out)
}

/// Serialize a property list as XML, spelling back-references as `CF$UID` dictionaries
pub fn write_xml(value: &Value) -> Result<String, ArchiverError> {
    let mut out = vec![];
    uids_to_dictionaries(value)
        .to_writer_xml(&mut out)
        .map_err(ArchiverError::Serialize)?;
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Read a back-reference, either a native [`Uid`] or a `{"CF$UID": n}` dictionary
pub fn as_uid(value: &Value) -> Option<u64> {
    match value {
        Value::Uid(uid) => Some(uid.get()),
        Value::Dictionary(dict) if dict.len() == 1 => dict.get(UID_KEY)?.as_unsigned_integer(),
        _ => None,
    }
}

/// Build a back-reference to a slot in `$objects`
pub fn uid(idx: u64) -> Value {
    Value::Uid(Uid::new(idx))
}

/// Copy a property list, replacing every [`Uid`] with its XML dictionary spelling
pub fn uids_to_dictionaries(value: &Value) -> Value {
    match value {
        Value::Uid(uid) => {
            let mut dict = Dictionary::new();
            dict.insert(UID_KEY.to_string(), Value::Integer(uid.get().into()));
            Value::Dictionary(dict)
        }
        Value::Array(items) => Value::Array(items.iter().map(uids_to_dictionaries).collect()),
        Value::Dictionary(dict) => {
            let mut out = Dictionary::new();
            for (key, item) in dict.iter() {
                out.insert(key.clone(), uids_to_dictionaries(item));
            }
            Value::Dictionary(out)
        }
        other => other.clone(),
    }
}
