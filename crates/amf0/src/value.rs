//! AMF0 value types.

/// Represents any AMF0 object.
///
/// AMF0 objects are ordered key/value maps. Insertion order is significant
/// on the wire, so this is backed by a `Vec` instead of a hash map and all
/// operations preserve the order keys were first seen in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Amf0Object(Vec<(String, Amf0Value)>);

impl Amf0Object {
    /// Create a new empty object.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Create a new empty object with the given capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self(Vec::with_capacity(capacity))
    }

    /// The number of entries in the object.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the object has no entries.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get the value for a key.
    pub fn get(&self, key: &str) -> Option<&Amf0Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Append an entry without looking for an existing key.
    ///
    /// This is what the decoder uses so that duplicate keys on the wire
    /// survive a decode/encode round trip.
    pub fn push(&mut self, key: String, value: Amf0Value) {
        self.0.push((key, value));
    }

    /// Set the value for a key.
    ///
    /// An existing key keeps its position, a new key is appended at the end.
    pub fn set(&mut self, key: &str, value: impl Into<Amf0Value>) {
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => self.0.push((key.to_string(), value)),
        }
    }

    /// Iterate over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Amf0Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl From<Vec<(String, Amf0Value)>> for Amf0Object {
    fn from(entries: Vec<(String, Amf0Value)>) -> Self {
        Self(entries)
    }
}

impl FromIterator<(String, Amf0Value)> for Amf0Object {
    fn from_iter<T: IntoIterator<Item = (String, Amf0Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Amf0Object {
    type IntoIter = std::vec::IntoIter<Self::Item>;
    type Item = (String, Amf0Value);

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Represents any AMF0 value.
#[derive(Debug, Clone, PartialEq)]
pub enum Amf0Value {
    /// AMF0 Number.
    Number(f64),
    /// AMF0 Boolean.
    Boolean(bool),
    /// AMF0 String.
    ///
    /// Encodes as a normal string or a long string depending on the length.
    String(String),
    /// AMF0 Object.
    Object(Amf0Object),
    /// AMF0 ECMA array.
    ///
    /// An associative array. Decodes like an object, the wire count is not
    /// trusted.
    EcmaArray(Amf0Object),
    /// AMF0 strict array.
    StrictArray(Vec<Amf0Value>),
    /// AMF0 typed object.
    TypedObject {
        /// The class name of the object.
        class_name: String,
        /// The entries of the object.
        object: Amf0Object,
    },
    /// AMF0 Date.
    Date {
        /// Milliseconds since the unix epoch.
        value: f64,
        /// Timezone offset, reserved and usually zero.
        timezone: i16,
    },
    /// AMF0 Null.
    Null,
    /// AMF0 Undefined.
    Undefined,
}

impl Amf0Value {
    /// Borrow the value as an object if it is one.
    ///
    /// ECMA arrays and typed objects are key/value maps as well and are
    /// treated as objects here.
    pub fn as_object(&self) -> Option<&Amf0Object> {
        match self {
            Amf0Value::Object(object) | Amf0Value::EcmaArray(object) => Some(object),
            Amf0Value::TypedObject { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Mutably borrow the value as an object if it is one.
    pub fn as_object_mut(&mut self) -> Option<&mut Amf0Object> {
        match self {
            Amf0Value::Object(object) | Amf0Value::EcmaArray(object) => Some(object),
            Amf0Value::TypedObject { object, .. } => Some(object),
            _ => None,
        }
    }

    /// Borrow the value as a string slice if it is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Amf0Value::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<f64> for Amf0Value {
    fn from(value: f64) -> Self {
        Amf0Value::Number(value)
    }
}

impl From<bool> for Amf0Value {
    fn from(value: bool) -> Self {
        Amf0Value::Boolean(value)
    }
}

impl From<&str> for Amf0Value {
    fn from(value: &str) -> Self {
        Amf0Value::String(value.to_string())
    }
}

impl From<String> for Amf0Value {
    fn from(value: String) -> Self {
        Amf0Value::String(value)
    }
}

impl From<Amf0Object> for Amf0Value {
    fn from(value: Amf0Object) -> Self {
        Amf0Value::Object(value)
    }
}

impl From<Vec<Amf0Value>> for Amf0Value {
    fn from(value: Vec<Amf0Value>) -> Self {
        Amf0Value::StrictArray(value)
    }
}
