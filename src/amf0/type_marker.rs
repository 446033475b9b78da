use derive_try_from_primitive::TryFromPrimitive;

/// Type markers used in AMF0
///
/// The reserved MovieClip (0x04) and RecordSet (0x0E) markers carry no
/// payload specification and are rejected as unknown.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(TryFromPrimitive, Eq, PartialEq, Debug, Copy, Clone)]
#[repr(u8)]
pub(crate) enum TypeMarker {
    /// IEEE-754 double
    Number = 0x00,
    /// Boolean, one payload byte
    Boolean = 0x01,
    /// String with a u16 length prefix
    String = 0x02,
    /// Anonymous object
    Object = 0x03,
    /// Null
    Null = 0x05,
    /// Undefined
    Undefined = 0x06,
    /// Back-reference into the object cache
    Reference = 0x07,
    /// ECMA array (hash)
    MixedArrayStart = 0x08,
    /// Terminates object mode
    ObjectEnd = 0x09,
    /// Strict array
    Array = 0x0A,
    /// Date plus an ignored timezone
    Date = 0x0B,
    /// String with a u32 length prefix
    LongString = 0x0C,
    /// Unsupported, decodes to the absent value
    Unsupported = 0x0D,
    /// XML document
    Xml = 0x0F,
    /// Typed object
    TypedObject = 0x10,
    /// Switch to AMF3 for the remainder of this value
    AMF3 = 0x11,
}
