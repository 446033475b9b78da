use crate::amf3::write::Amf3Encoder;
use crate::errors::EncodeError;
use std::io::Write;

/// An AMF3 U29 value header: either an inline payload size or a
/// back-reference into a cache
#[derive(Copy, Clone, Debug, Eq, Ord, PartialOrd, PartialEq)]
pub(crate) enum Length {
    Size(u32),
    Reference(usize),
}

impl Length {
    pub(crate) fn is_size(&self) -> bool {
        matches!(self, Length::Size(_))
    }

    pub(crate) fn write<W: Write>(
        &self,
        writer: &mut W,
        amf3: &Amf3Encoder,
    ) -> Result<(), EncodeError> {
        match self {
            // With the low bit set
            Length::Size(x) => amf3.write_int(writer, ((x << 1) | 0b1) as i32),
            Length::Reference(x) => amf3.write_int(writer, (*x as i32) << 1),
        }
    }
}
