use crate::amf3::read::Amf3Decoder;
use crate::amf3::write::Amf3Encoder;
use crate::nom_utils::AMFResult;
use crate::types::{ClassDefinition, Element};
use std::rc::Rc;

/// A trait to define encoding for custom types for use with externalizable objects
///
/// Access to the encoder is given so implementations can use the stream's
/// caches through its public write operations.
pub trait CustomEncoder {
    /// Produce the externalized body for the given elements and class definition
    fn encode(
        &self,
        elements: &[Element],
        class_def: &Option<ClassDefinition>,
        encoder: &Amf3Encoder,
    ) -> Vec<u8>;
}

/// Type used for specifying a custom decoder for an AMF3 externalizable type
///
/// The function reads the externalized body from the codec's current
/// position and returns the decoded elements plus the remaining input.
pub type ExternalDecoderFn =
    Rc<dyn for<'a> Fn(&'a [u8], &mut Amf3Decoder) -> AMFResult<'a, Vec<Element>>>;
