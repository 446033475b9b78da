use super::Value;
use std::rc::Rc;

/// A named property paired with its value
///
/// Elements keep their decode/insertion order, which is what makes map
/// and dynamic-object encoding deterministic.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct Element {
    /// The property name as it appears on the host value
    pub name: String,

    /// The property value, shared with any other holders of the node
    pub value: Rc<Value>,
}

impl Element {
    /// Create an element from an owned value
    #[inline]
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: Rc::new(value.into()),
        }
    }

    /// Create an element that shares an already-built node
    ///
    /// Decoders use this so back-references to the value keep pointing at
    /// the same allocation.
    #[inline]
    pub fn shared(name: impl Into<String>, value: Rc<Value>) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}
