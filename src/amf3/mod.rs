//! Support for AMF3

/// Support for custom encoders / decoders for externalizable types
pub mod custom_encoder;
/// Abstraction over the AMF3 length and reference header
pub(crate) mod length;
/// Reading of AMF3 data
pub mod read;
/// AMF3 type markers
mod type_marker;
/// Writing of AMF3 data
pub mod write;

pub use read::Amf3Decoder;
pub use write::Amf3Encoder;

/// The wire class name of the Flex collection that transparently wraps an
/// array; the codec unwraps it on decode
pub(crate) const ARRAY_COLLECTION_CLASS: &str = "flex.messaging.io.ArrayCollection";

/// Smallest value representable with the AMF3 integer marker
pub const MIN_INTEGER: i32 = -0x1000_0000;

/// Largest value representable with the AMF3 integer marker
pub const MAX_INTEGER: i32 = 0x0FFF_FFFF;
