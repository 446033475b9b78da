use super::{ClassDefinition, Element, Reference};
use std::rc::Rc;

/// A single or compound value
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absent value; Null, Undefined and Unsupported all decode to this
    Null,

    /// Represents the boolean type (amf0) and the true/false types (amf3)
    Bool(bool),

    /// Represent the integer type (u29) (amf3)
    Integer(i32),

    /// Represent the number type (amf0) and the double type (amf3)
    Number(f64),

    /// Represent both the string (amf0/3) and long string type (amf0)
    String(String),

    /// An ordered sequence: strict array (amf0) or dense array (amf3)
    Array(Vec<Rc<Value>>),

    /// An insertion-ordered string-keyed mapping: ECMA array / hash (amf0),
    /// the combined result of decoding a mixed array (amf3)
    Map(Vec<Element>),

    /// An anonymous or typed object; class definitions carry the wire name
    /// and the sealed member order
    Object(Vec<Element>, Option<ClassDefinition>),

    /// An instant in time as milliseconds since the epoch, UTC
    Date(f64),

    /// Represent the bytearray type (amf3)
    ByteArray(Vec<u8>),

    /// Represent the XML type, (content, is_string)
    ///
    /// `is_string` is true for the amf3 XML type (0x0B) and for amf0 XML,
    /// false for the legacy XML document type (0x07)
    XML(String, bool),

    /// Represent the dictionary type (amf3)
    /// Format is ((key, value), has_weak_keys)
    Dictionary(Vec<(Rc<Value>, Rc<Value>)>, bool),

    /// A back-reference to an enclosing value in the same stream (a cycle)
    Reference(Reference),

    /// An externalizable object decoded by a registered external decoder
    /// (custom_elements, regular elements, class def)
    Custom(Vec<Element>, Vec<Element>, Option<ClassDefinition>),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl FromIterator<Value> for Vec<Rc<Value>> {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        iter.into_iter().map(Rc::new).collect()
    }
}
