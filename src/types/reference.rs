/// The wire shape of a back-referenced value
///
/// AMF3 back-references repeat the type marker of the value they point at,
/// so a decoded cycle must remember which marker to re-emit. AMF0 has a
/// single reference marker and ignores the kind.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum ReferenceKind {
    /// An object (AMF0 object, typed object, hash; AMF3 object)
    Object,
    /// An array
    Array,
    /// A dictionary
    Dictionary,
    /// A date
    Date,
    /// A byte array
    ByteArray,
    /// An XML value
    Xml,
    /// A legacy XML document
    XmlDoc,
}

/// A back-reference into the per-stream object cache
///
/// Produced only when a value refers to one of its own ancestors, that is
/// when the referenced cache slot is still being decoded. References to
/// completed values share the cached node directly instead.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Reference {
    /// The object cache index of the target
    pub index: u32,

    /// The wire shape of the target
    pub kind: ReferenceKind,
}

impl Reference {
    /// Create a reference to the object cache slot `index`
    pub fn new(index: u32, kind: ReferenceKind) -> Self {
        Self { index, kind }
    }
}
