/*!
 Flattens [`Value`] graphs into the `$objects` table of a new envelope.

 Composite values are deduplicated by identity: every clone of the same [`Shared`](crate::archiver::models::Shared)
 handle is written once and referenced from everywhere it appears, while two separately built but
 equal values each get their own slot.
*/

use std::collections::HashMap;

use plist::{Dictionary, Value as PlistValue};

use crate::{
    archiver::{
        classes::{
            ClassDescriptor, KnownClass, CLASS_KEY, NS_BASE, NS_KEYS, NS_OBJECTS, NS_RELATIVE,
            NS_TIME,
        },
        envelope::{self, NULL_MARKER},
        models::{Object, Value},
    },
    error::encode::EncodeError,
    util::{options::ArchiverOptions, plist::uid},
};

/// Flatten `values` into an envelope, naming the roots `$0`, `$1`, ... in order
pub fn flatten(values: &[Value]) -> Result<PlistValue, EncodeError> {
    flatten_with(values, &ArchiverOptions::default())
}

/// Flatten `values` into an envelope with custom limits
pub fn flatten_with(values: &[Value], options: &ArchiverOptions) -> Result<PlistValue, EncodeError> {
    let mut flattener = Flattener::new(options.max_depth);
    let mut top = Dictionary::new();
    for (position, value) in values.iter().enumerate() {
        let idx = flattener.flatten_one(value)?;
        top.insert(format!("${position}"), uid(idx));
    }
    tracing::debug!(
        objects = flattener.objects.len(),
        roots = values.len(),
        "Flattened keyed archive"
    );
    Ok(envelope::build(top, flattener.objects))
}

/// Contains the object table under construction
#[derive(Debug)]
pub struct Flattener {
    /// The `$objects` table, starting with the null marker
    objects: Vec<PlistValue>,
    /// Slots already assigned to composite values, keyed by identity
    identities: HashMap<usize, u64>,
    /// Slots already assigned to class descriptors
    descriptors: HashMap<ClassDescriptor, u64>,
    /// How many nested composites are currently being flattened
    depth: usize,
    max_depth: usize,
}

impl Flattener {
    pub fn new(max_depth: usize) -> Self {
        Self {
            objects: vec![PlistValue::String(NULL_MARKER.to_string())],
            identities: HashMap::new(),
            descriptors: HashMap::new(),
            depth: 0,
            max_depth,
        }
    }

    /// Write `value` into the table if needed and return its slot
    pub fn flatten_one(&mut self, value: &Value) -> Result<u64, EncodeError> {
        match value {
            Value::Null => Ok(0),
            Value::Bool(flag) => Ok(self.push(PlistValue::Boolean(*flag))),
            Value::Int(number) => Ok(self.push(PlistValue::Integer((*number).into()))),
            Value::Double(number) => Ok(self.push(PlistValue::Real(*number))),
            Value::String(text) => Ok(self.push(PlistValue::String(text.clone()))),
            Value::Bytes(bytes) => Ok(self.push(PlistValue::Data(bytes.clone()))),
            Value::Date(offset) => {
                let mut dict = Dictionary::new();
                dict.insert(NS_TIME.to_string(), PlistValue::Real(*offset));
                self.check_depth()?;
                Ok(self.push_with_class(dict, KnownClass::Date.descriptor()))
            }
            Value::Url(text) => {
                self.check_depth()?;
                let relative = self.push(PlistValue::String(text.clone()));
                let mut dict = Dictionary::new();
                dict.insert(NS_BASE.to_string(), uid(0));
                dict.insert(NS_RELATIVE.to_string(), uid(relative));
                Ok(self.push_with_class(dict, KnownClass::Url.descriptor()))
            }
            Value::Array(items) => self.composite(items.id(), |this| {
                let refs = this.flatten_references(&items.borrow())?;
                let mut dict = Dictionary::new();
                dict.insert(NS_OBJECTS.to_string(), PlistValue::Array(refs));
                Ok(this.with_class(dict, KnownClass::Array.descriptor()))
            }),
            Value::Set(items) => self.composite(items.id(), |this| {
                let refs = this.flatten_references(&items.borrow())?;
                let mut dict = Dictionary::new();
                dict.insert(NS_OBJECTS.to_string(), PlistValue::Array(refs));
                Ok(this.with_class(dict, KnownClass::Set.descriptor()))
            }),
            Value::Dictionary(pairs) => self.composite(pairs.id(), |this| {
                let pairs = pairs.borrow();
                let mut keys = Vec::with_capacity(pairs.len());
                let mut values = Vec::with_capacity(pairs.len());
                for (key, value) in pairs.iter() {
                    keys.push(uid(this.flatten_one(key)?));
                    values.push(uid(this.flatten_one(value)?));
                }
                let mut dict = Dictionary::new();
                dict.insert(NS_KEYS.to_string(), PlistValue::Array(keys));
                dict.insert(NS_OBJECTS.to_string(), PlistValue::Array(values));
                Ok(this.with_class(dict, KnownClass::Dictionary.descriptor()))
            }),
            Value::Object(object) => {
                self.composite(object.id(), |this| this.flatten_object(&object.borrow()))
            }
        }
    }

    /// Fields keep numbers and booleans inline and refer to everything else
    fn flatten_object(&mut self, object: &Object) -> Result<PlistValue, EncodeError> {
        let mut dict = Dictionary::new();
        for (key, field) in &object.fields {
            let entry = match field {
                Value::Bool(flag) => PlistValue::Boolean(*flag),
                Value::Int(number) => PlistValue::Integer((*number).into()),
                Value::Double(number) => PlistValue::Real(*number),
                other => uid(self.flatten_one(other)?),
            };
            dict.insert(key.clone(), entry);
        }

        // A keyed bag was stored without a class
        if object.class_name.is_empty() && object.classes.is_empty() {
            return Ok(PlistValue::Dictionary(dict));
        }
        let descriptor = ClassDescriptor::new(object.class_name.clone(), object.classes.clone());
        Ok(self.with_class(dict, descriptor))
    }

    fn flatten_references(&mut self, items: &[Value]) -> Result<Vec<PlistValue>, EncodeError> {
        items
            .iter()
            .map(|item| self.flatten_one(item).map(uid))
            .collect()
    }

    /// Reserve a slot for a composite before flattening its children, so cycles refer back to it
    fn composite(
        &mut self,
        id: usize,
        build: impl FnOnce(&mut Self) -> Result<PlistValue, EncodeError>,
    ) -> Result<u64, EncodeError> {
        if let Some(idx) = self.identities.get(&id) {
            return Ok(*idx);
        }
        self.check_depth()?;

        let idx = self.push(PlistValue::Boolean(false));
        self.identities.insert(id, idx);
        self.depth += 1;
        let entry = build(self);
        self.depth -= 1;
        self.objects[idx as usize] = entry?;
        Ok(idx)
    }

    /// Keyed entries count toward the depth limit, raw scalars do not
    fn check_depth(&self) -> Result<(), EncodeError> {
        if self.depth >= self.max_depth {
            return Err(EncodeError::GraphTooDeep(self.max_depth));
        }
        Ok(())
    }

    /// Attach a `$class` back-reference to a payload
    fn with_class(&mut self, mut dict: Dictionary, descriptor: ClassDescriptor) -> PlistValue {
        let class = self.descriptor(descriptor);
        dict.insert(CLASS_KEY.to_string(), uid(class));
        PlistValue::Dictionary(dict)
    }

    fn push_with_class(&mut self, dict: Dictionary, descriptor: ClassDescriptor) -> u64 {
        let entry = self.with_class(dict, descriptor);
        self.push(entry)
    }

    /// Get the slot of a class descriptor, writing it the first time it is needed
    fn descriptor(&mut self, descriptor: ClassDescriptor) -> u64 {
        if let Some(idx) = self.descriptors.get(&descriptor) {
            return *idx;
        }
        let idx = self.push(descriptor.to_entry());
        self.descriptors.insert(descriptor, idx);
        idx
    }

    fn push(&mut self, entry: PlistValue) -> u64 {
        self.objects.push(entry);
        (self.objects.len() - 1) as u64
    }
}
