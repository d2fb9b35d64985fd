/*!
 Rebuilds a single `$objects` entry into a [`Value`], dispatching on its recorded class.

 Entries come in three shapes:

 - A bare scalar, such as an `NSNumber` or an immutable `NSString`, stored directly in the table
 - A dictionary with a `$class` back-reference and class-specific fields
 - A dictionary without `$class`, treated as a keyed bag of fields
*/

use std::collections::BTreeMap;

use plist::{Dictionary, Value as PlistValue};

use crate::{
    archiver::{
        classes::{
            ClassDescriptor, KnownClass, CLASS_KEY, NS_BASE, NS_BYTES, NS_DATA, NS_KEYS,
            NS_OBJECTS, NS_RELATIVE, NS_STRING, NS_TIME,
        },
        models::{Object, Shared, Value},
        resolver::Resolver,
    },
    error::decode::DecodeError,
    util::{dates::system_time_to_reference, plist::as_uid},
};

/// Class name used in errors about values that are not owned by any class
const NS_NUMBER: &str = "NSNumber";

/// Rebuild a raw table entry; `slot` is the entry's position in `$objects`, if it has one
pub(crate) fn reconstruct(
    entry: &PlistValue,
    slot: Option<usize>,
    resolver: &mut Resolver<'_>,
) -> Result<Value, DecodeError> {
    if let Some(value) = primitive(entry, NS_NUMBER, "$objects")? {
        return Ok(value);
    }
    match entry {
        PlistValue::Dictionary(dict) => match dict.get(CLASS_KEY) {
            Some(class) => {
                let class_idx = as_uid(class).ok_or_else(|| DecodeError::malformed("", CLASS_KEY))?;
                let descriptor = resolver.descriptor(class_idx)?;
                reconstruct_class(dict, descriptor, slot, resolver)
            }
            None => {
                let bag = ClassDescriptor::new(String::new(), vec![]);
                reconstruct_object(dict, bag, slot, resolver)
            }
        },
        PlistValue::Uid(uid) => resolver.resolve_index(uid.get()),
        PlistValue::Array(_) => resolver.resolve_field(entry, "", "$objects"),
        _ => Err(DecodeError::malformed("", "$objects")),
    }
}

/// Map a scalar property list value to its [`Value`], or [`None`] if it is not a scalar
pub(crate) fn primitive(
    entry: &PlistValue,
    class_name: &str,
    key: &str,
) -> Result<Option<Value>, DecodeError> {
    Ok(Some(match entry {
        PlistValue::Boolean(flag) => Value::Bool(*flag),
        PlistValue::Integer(number) => Value::Int(
            number
                .as_signed()
                .ok_or_else(|| DecodeError::malformed(class_name, key))?,
        ),
        PlistValue::Real(number) => Value::Double(*number),
        PlistValue::String(text) => Value::String(text.clone()),
        PlistValue::Data(bytes) => Value::Bytes(bytes.clone()),
        PlistValue::Date(date) => Value::Date(system_time_to_reference((*date).into())),
        _ => return Ok(None),
    }))
}

fn reconstruct_class(
    dict: &Dictionary,
    descriptor: ClassDescriptor,
    slot: Option<usize>,
    resolver: &mut Resolver<'_>,
) -> Result<Value, DecodeError> {
    let Some(class) = KnownClass::from_name(&descriptor.name) else {
        tracing::debug!(class = %descriptor.name, "Decoding unknown class as a generic object");
        return reconstruct_object(dict, descriptor, slot, resolver);
    };
    tracing::trace!(class = %descriptor.name, "Reconstructing known class");

    // Nothing stored besides `$class`
    if dict.len() == 1 {
        return Ok(Value::Null);
    }

    let name = descriptor.name.as_str();
    match class {
        KnownClass::Array | KnownClass::Set => {
            let handle = Shared::new(vec![]);
            let value = match class {
                KnownClass::Set => Value::Set(handle.clone()),
                _ => Value::Array(handle.clone()),
            };
            resolver.register(slot, &value);
            let items = resolver.resolve_references(dict.get(NS_OBJECTS), name, NS_OBJECTS)?;
            *handle.borrow_mut() = items;
            Ok(value)
        }
        KnownClass::Dictionary => {
            let handle = Shared::new(vec![]);
            let value = Value::Dictionary(handle.clone());
            resolver.register(slot, &value);
            let keys = resolver.resolve_references(dict.get(NS_KEYS), name, NS_KEYS)?;
            let values = resolver.resolve_references(dict.get(NS_OBJECTS), name, NS_OBJECTS)?;
            if keys.len() != values.len() {
                return Err(DecodeError::malformed(name, NS_KEYS));
            }
            *handle.borrow_mut() = keys.into_iter().zip(values).collect();
            Ok(value)
        }
        KnownClass::String => read_string(dict, name).map(Value::String),
        KnownClass::Data => match dict.get(NS_DATA) {
            Some(PlistValue::Data(bytes)) => Ok(Value::Bytes(bytes.clone())),
            Some(field) => match resolver.resolve_field(field, name, NS_DATA)? {
                Value::Bytes(bytes) => Ok(Value::Bytes(bytes)),
                _ => Err(DecodeError::malformed(name, NS_DATA)),
            },
            None => Err(DecodeError::malformed(name, NS_DATA)),
        },
        KnownClass::Date => match dict.get(NS_TIME) {
            Some(PlistValue::Real(offset)) => Ok(Value::Date(*offset)),
            Some(PlistValue::Integer(offset)) => offset
                .as_signed()
                .map(|offset| Value::Date(offset as f64))
                .ok_or_else(|| DecodeError::malformed(name, NS_TIME)),
            _ => Err(DecodeError::malformed(name, NS_TIME)),
        },
        KnownClass::Url => {
            let relative = match dict.get(NS_RELATIVE) {
                Some(field) => resolver.resolve_field(field, name, NS_RELATIVE)?,
                None => return Err(DecodeError::malformed(name, NS_RELATIVE)),
            };
            let Value::String(relative) = relative else {
                return Err(DecodeError::malformed(name, NS_RELATIVE));
            };
            let base = match dict.get(NS_BASE) {
                Some(field) => resolver.resolve_field(field, name, NS_BASE)?,
                None => Value::Null,
            };
            match base {
                Value::Null => Ok(Value::Url(relative)),
                Value::Url(base) | Value::String(base) => Ok(Value::Url(join_url(&base, &relative))),
                _ => Err(DecodeError::malformed(name, NS_BASE)),
            }
        }
        KnownClass::Null => Ok(Value::Null),
    }
}

/// Build a generic [`Value::Object`] holding every field except `$class`
fn reconstruct_object(
    dict: &Dictionary,
    descriptor: ClassDescriptor,
    slot: Option<usize>,
    resolver: &mut Resolver<'_>,
) -> Result<Value, DecodeError> {
    let class_name = descriptor.name.clone();
    let handle = Shared::new(Object::new(descriptor.name, descriptor.classes));
    let value = Value::Object(handle.clone());
    resolver.register(slot, &value);

    let mut fields = BTreeMap::new();
    for (key, field) in dict.iter() {
        if key == CLASS_KEY {
            continue;
        }
        fields.insert(key.clone(), resolver.resolve_field(field, &class_name, key)?);
    }
    handle.borrow_mut().fields = fields;
    Ok(value)
}

/// Read the text of an `NSString` or `NSMutableString`
fn read_string(dict: &Dictionary, class_name: &str) -> Result<String, DecodeError> {
    match (dict.get(NS_STRING), dict.get(NS_BYTES)) {
        (Some(PlistValue::String(text)), _) => Ok(text.clone()),
        (None, Some(PlistValue::Data(bytes))) => String::from_utf8(bytes.clone())
            .map_err(|_| DecodeError::malformed(class_name, NS_BYTES)),
        _ => Err(DecodeError::malformed(class_name, NS_STRING)),
    }
}

/// Resolve `relative` against `base`
///
/// A relative part that carries its own scheme replaces the base, one starting with `/` replaces
/// the base's path, and anything else replaces the last path segment of the base.
pub(crate) fn join_url(base: &str, relative: &str) -> String {
    if relative.is_empty() {
        return base.to_string();
    }
    if has_scheme(relative) {
        return relative.to_string();
    }

    let authority_end = base
        .find("://")
        .map(|start| {
            let after = start + 3;
            base[after..].find('/').map_or(base.len(), |end| after + end)
        })
        .unwrap_or(0);

    if relative.starts_with('/') {
        return format!("{}{relative}", &base[..authority_end]);
    }

    match base[authority_end..].rfind('/') {
        Some(last) => format!("{}{relative}", &base[..authority_end + last + 1]),
        None => format!("{base}/{relative}"),
    }
}

fn has_scheme(url: &str) -> bool {
    match url.find(':') {
        Some(end) if end > 0 => {
            let scheme = &url[..end];
            scheme.starts_with(|ch: char| ch.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
        }
        _ => false,
    }
}
