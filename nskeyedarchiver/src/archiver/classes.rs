/*!
 The table of Foundation classes that decode into a dedicated [`Value`](crate::archiver::models::Value) variant.

 Dispatch uses only the leaf class name from `$classname`; the ancestor chain in `$classes`
 is carried on [`Object`](crate::archiver::models::Object) values but never consulted here.
*/

use plist::Value as PlistValue;

/// Key holding the back-reference to an entry's class descriptor
pub const CLASS_KEY: &str = "$class";
/// Key holding the leaf class name in a class descriptor
pub const CLASSNAME_KEY: &str = "$classname";
/// Key holding the class hierarchy in a class descriptor
pub const CLASSES_KEY: &str = "$classes";

/// Elements of collections, or values of dictionaries
pub const NS_OBJECTS: &str = "NS.objects";
/// Keys of dictionaries, parallel to [`NS_OBJECTS`]
pub const NS_KEYS: &str = "NS.keys";
/// Text of a string
pub const NS_STRING: &str = "NS.string";
/// UTF-8 text of a string
pub const NS_BYTES: &str = "NS.bytes";
/// Contents of a data blob
pub const NS_DATA: &str = "NS.data";
/// Seconds since the reference date
pub const NS_TIME: &str = "NS.time";
/// Back-reference to the base of a relative URL
pub const NS_BASE: &str = "NS.base";
/// Back-reference to the text of a URL
pub const NS_RELATIVE: &str = "NS.relative";

/// The root of every Foundation class hierarchy
const NS_OBJECT: &str = "NSObject";

/// Classes with a dedicated reconstruction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownClass {
    Array,
    Set,
    Dictionary,
    String,
    Data,
    Date,
    Url,
    Null,
}

impl KnownClass {
    /// Look up a leaf class name; the match is exact and case-sensitive
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "NSArray" | "NSMutableArray" => Some(Self::Array),
            "NSSet" | "NSMutableSet" => Some(Self::Set),
            "NSDictionary" | "NSMutableDictionary" => Some(Self::Dictionary),
            "NSString" | "NSMutableString" => Some(Self::String),
            "NSData" | "NSMutableData" => Some(Self::Data),
            "NSDate" => Some(Self::Date),
            "NSURL" => Some(Self::Url),
            "NSNull" => Some(Self::Null),
            _ => None,
        }
    }

    /// The class name written when flattening this kind of value
    pub fn name(&self) -> &'static str {
        match self {
            KnownClass::Array => "NSArray",
            KnownClass::Set => "NSSet",
            KnownClass::Dictionary => "NSDictionary",
            KnownClass::String => "NSString",
            KnownClass::Data => "NSData",
            KnownClass::Date => "NSDate",
            KnownClass::Url => "NSURL",
            KnownClass::Null => "NSNull",
        }
    }

    /// The descriptor written when flattening this kind of value
    pub fn descriptor(&self) -> ClassDescriptor {
        ClassDescriptor {
            name: self.name().to_string(),
            classes: vec![self.name().to_string(), NS_OBJECT.to_string()],
        }
    }
}

/// A `$objects` entry naming a class and its hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClassDescriptor {
    /// The leaf class name
    pub name: String,
    /// The hierarchy, starting with the leaf class
    pub classes: Vec<String>,
}

impl ClassDescriptor {
    pub fn new(name: String, classes: Vec<String>) -> Self {
        Self { name, classes }
    }

    /// Read a descriptor from a raw table entry, if it is shaped like one
    pub fn from_entry(entry: &PlistValue) -> Option<Self> {
        let dict = entry.as_dictionary()?;
        let name = dict.get(CLASSNAME_KEY)?.as_string()?.to_string();
        let classes = match dict.get(CLASSES_KEY) {
            Some(classes) => classes
                .as_array()?
                .iter()
                .map(|class| class.as_string().map(str::to_string))
                .collect::<Option<Vec<_>>>()?,
            None => vec![],
        };
        Some(Self { name, classes })
    }

    /// Build the raw table entry for this descriptor
    pub fn to_entry(&self) -> PlistValue {
        let mut dict = plist::Dictionary::new();
        dict.insert(
            CLASSNAME_KEY.to_string(),
            PlistValue::String(self.name.clone()),
        );
        dict.insert(
            CLASSES_KEY.to_string(),
            PlistValue::Array(
                self.classes
                    .iter()
                    .map(|class| PlistValue::String(class.clone()))
                    .collect(),
            ),
        );
        PlistValue::Dictionary(dict)
    }
}
