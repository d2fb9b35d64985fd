/*!
 Data structures produced by unarchiving and consumed by archiving.

 Scalars are owned by the [`Value`] that holds them. Collections and generic objects live behind a
 [`Shared`] handle, so cloning one of those [`Value`]s yields another reference to the same object.
 This is how aliasing and cycles from the `$objects` table survive decoding.
*/

use std::{
    cell::{Ref, RefCell, RefMut},
    collections::{BTreeMap, HashMap, HashSet},
    fmt::{Debug, Formatter, Result as FmtResult},
    rc::Rc,
};

use chrono::{DateTime, Utc};
use json::JsonValue;

use crate::util::{dates, json::to_json};

thread_local! {
    /// Identities of the [`Shared`] handles currently being formatted on this thread
    static FORMATTING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// A reference-counted, interior-mutable handle to a composite value
///
/// Cloning a [`Shared`] clones the handle, not the data: both clones have the same identity.
/// Graphs that contain a cycle keep themselves alive once built.
pub struct Shared<T>(Rc<RefCell<T>>);

impl<T> Shared<T> {
    pub fn new(inner: T) -> Self {
        Self(Rc::new(RefCell::new(inner)))
    }

    /// Immutably borrow the wrapped data
    pub fn borrow(&self) -> Ref<'_, T> {
        self.0.borrow()
    }

    /// Mutably borrow the wrapped data
    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.0.borrow_mut()
    }

    /// Determine if two handles refer to the same object
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A number that uniquely identifies the object while it is alive
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: Debug> Debug for Shared<T> {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let id = self.id();
        if !FORMATTING.with(|active| active.borrow_mut().insert(id)) {
            return write!(fmt, "<cycle>");
        }
        let result = match self.0.try_borrow() {
            Ok(inner) => Debug::fmt(&*inner, fmt),
            Err(_) => write!(fmt, "<borrowed>"),
        };
        FORMATTING.with(|active| active.borrow_mut().remove(&id));
        result
    }
}

/// An instance of a class the reconstructor does not have a dedicated representation for
#[derive(Debug, Clone, Default)]
pub struct Object {
    /// The name of the class, empty for a keyed dictionary that was stored without `$class`
    ///
    /// Names the decoder maps to other variants (`NSArray`, `NSString`, `NSDate`, ...) are
    /// reserved: an [`Object`] using one is archived with that class and cannot be read back.
    pub class_name: String,
    /// The class hierarchy as recorded in `$classes`, starting at the class itself
    ///
    /// A keyed bag is only written without `$class` when this is empty too.
    pub classes: Vec<String>,
    /// Every keyed field other than `$class`
    pub fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(class_name: impl Into<String>, classes: Vec<String>) -> Self {
        Self {
            class_name: class_name.into(),
            classes,
            fields: BTreeMap::new(),
        }
    }

    /// Add a field, replacing any previous value stored under the same key
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }
}

/// The semantic values that can be stored in a keyed archive
#[derive(Debug, Clone)]
pub enum Value {
    /// `$null` or an instance of `NSNull`
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
    /// Seconds since `2001-01-01T00:00:00Z`, the reference date used by Foundation
    Date(f64),
    Url(String),
    Array(Shared<Vec<Value>>),
    /// Elements in insertion order; equality ignores the order
    Set(Shared<Vec<Value>>),
    /// Key-value pairs in insertion order
    Dictionary(Shared<Vec<(Value, Value)>>),
    /// Any class that does not map to one of the other variants
    ///
    /// The class names of the other variants are reserved, see [`Object::class_name`].
    Object(Shared<Object>),
}

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Shared::new(items))
    }

    pub fn set(items: Vec<Value>) -> Self {
        Self::Set(Shared::new(items))
    }

    pub fn dictionary(pairs: Vec<(Value, Value)>) -> Self {
        Self::Dictionary(Shared::new(pairs))
    }

    pub fn object(object: Object) -> Self {
        Self::Object(Shared::new(object))
    }

    /// Build a [`Value::Date`] from an absolute timestamp
    pub fn date_from(timestamp: &DateTime<Utc>) -> Self {
        Self::Date(dates::datetime_to_reference(timestamp))
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }

    /// Get the text of a [`Value::String`] or [`Value::Url`]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) | Value::Url(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Borrow the elements of a [`Value::Array`] or [`Value::Set`]
    pub fn as_array(&self) -> Option<Ref<'_, Vec<Value>>> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.borrow()),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<Ref<'_, Vec<(Value, Value)>>> {
        match self {
            Value::Dictionary(pairs) => Some(pairs.borrow()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<Ref<'_, Object>> {
        match self {
            Value::Object(object) => Some(object.borrow()),
            _ => None,
        }
    }

    /// The class name of a [`Value::Object`]
    pub fn class_name(&self) -> Option<String> {
        self.as_object().map(|object| object.class_name.clone())
    }

    /// Convert a [`Value::Date`] into an absolute timestamp
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(offset) => dates::reference_to_datetime(*offset),
            _ => None,
        }
    }

    /// The identity of a composite value, [`None`] for scalars
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::Array(items) | Value::Set(items) => Some(items.id()),
            Value::Dictionary(pairs) => Some(pairs.id()),
            Value::Object(object) => Some(object.id()),
            _ => None,
        }
    }

    /// Determine if both values are the same composite object
    pub fn same_identity(&self, other: &Value) -> bool {
        matches!((self.identity(), other.identity()), (Some(left), Some(right)) if left == right)
    }

    /// Render the value as JSON, encoding bytes as base64
    pub fn to_json(&self) -> JsonValue {
        to_json(self)
    }
}

impl PartialEq for Value {
    /// Graph equality: contents must match and the composite objects on each side must
    /// correspond one-to-one, so aliasing and cycles are part of what is compared.
    fn eq(&self, other: &Self) -> bool {
        GraphEq::default().values(self, other)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Pairs of composite identities matched so far while comparing two graphs
#[derive(Debug, Default, Clone)]
struct GraphEq {
    forward: HashMap<usize, usize>,
    backward: HashMap<usize, usize>,
}

impl GraphEq {
    fn values(&mut self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(l), Value::Bool(r)) => l == r,
            (Value::Int(l), Value::Int(r)) => l == r,
            (Value::Double(l), Value::Double(r)) | (Value::Date(l), Value::Date(r)) => l == r,
            (Value::String(l), Value::String(r)) | (Value::Url(l), Value::Url(r)) => l == r,
            (Value::Bytes(l), Value::Bytes(r)) => l == r,
            (Value::Array(l), Value::Array(r)) => match self.pair(l.id(), r.id()) {
                Some(known) => known,
                None => self.sequences(&l.borrow(), &r.borrow()),
            },
            (Value::Set(l), Value::Set(r)) => match self.pair(l.id(), r.id()) {
                Some(known) => known,
                None => self.unordered(&l.borrow(), &r.borrow()),
            },
            (Value::Dictionary(l), Value::Dictionary(r)) => match self.pair(l.id(), r.id()) {
                Some(known) => known,
                None => self.pairs(&l.borrow(), &r.borrow()),
            },
            (Value::Object(l), Value::Object(r)) => match self.pair(l.id(), r.id()) {
                Some(known) => known,
                None => self.objects(&l.borrow(), &r.borrow()),
            },
            _ => false,
        }
    }

    /// Returns the outcome for a pair that was already matched, otherwise records the pair
    fn pair(&mut self, left: usize, right: usize) -> Option<bool> {
        match (self.forward.get(&left), self.backward.get(&right)) {
            (Some(matched), _) => Some(*matched == right),
            (None, Some(_)) => Some(false),
            (None, None) => {
                self.forward.insert(left, right);
                self.backward.insert(right, left);
                None
            }
        }
    }

    fn sequences(&mut self, left: &[Value], right: &[Value]) -> bool {
        left.len() == right.len() && left.iter().zip(right).all(|(l, r)| self.values(l, r))
    }

    fn unordered(&mut self, left: &[Value], right: &[Value]) -> bool {
        if left.len() != right.len() {
            return false;
        }
        let mut used = vec![false; right.len()];
        'outer: for item in left {
            for (idx, candidate) in right.iter().enumerate() {
                if used[idx] {
                    continue;
                }
                let mut attempt = self.clone();
                if attempt.values(item, candidate) {
                    *self = attempt;
                    used[idx] = true;
                    continue 'outer;
                }
            }
            return false;
        }
        true
    }

    fn pairs(&mut self, left: &[(Value, Value)], right: &[(Value, Value)]) -> bool {
        left.len() == right.len()
            && left
                .iter()
                .zip(right)
                .all(|((lk, lv), (rk, rv))| self.values(lk, rk) && self.values(lv, rv))
    }

    fn objects(&mut self, left: &Object, right: &Object) -> bool {
        left.class_name == right.class_name
            && left.classes == right.classes
            && left.fields.len() == right.fields.len()
            && left
                .fields
                .iter()
                .zip(&right.fields)
                .all(|((lk, lv), (rk, rv))| lk == rk && self.values(lv, rv))
    }
}
