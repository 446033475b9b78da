//! Support for encoding AMF0
use crate::amf0::type_marker::TypeMarker;
use crate::buffer::{BoundedWriter, DEFAULT_MAX_STREAM_LENGTH};
use crate::element_cache::{CacheKey, ObjectCache};
use crate::errors::EncodeError;
use crate::mapper::{to_camel_case, ClassMapper, ClassMapping, HASH_CLASS, OPT_TRANSLATE_CASE};
use crate::nom_utils::write_string;
use crate::types::{Element, Value};
use byteorder::{BigEndian, WriteBytesExt};
use std::io::Write;
use std::ops::Deref;
use std::rc::Rc;

/// Strings longer than this must use the long string marker
const SHORT_STRING_MAX: usize = 65535;

/// Handles encoding AMF0
pub struct Amf0Encoder {
    /// The table used to cache repeated objects, keyed by identity
    object_reference_table: ObjectCache,

    /// Resolves class names and properties for outbound values
    mapper: Rc<dyn ClassMapper>,

    /// Cap on the size of one encoded stream
    max_stream_length: usize,
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new(Rc::new(ClassMapping::default()))
    }
}

impl Amf0Encoder {
    /// Create an encoder that resolves class names through `mapper`
    pub fn new(mapper: Rc<dyn ClassMapper>) -> Self {
        Self {
            object_reference_table: ObjectCache::default(),
            mapper,
            max_stream_length: DEFAULT_MAX_STREAM_LENGTH,
        }
    }

    /// Change the cap on the size of an encoded stream
    pub fn with_max_stream_length(mut self, max_stream_length: usize) -> Self {
        self.max_stream_length = max_stream_length;
        self
    }

    /// Clear the reference table, making the encoder ready for a new stream
    pub fn reset(&self) {
        self.object_reference_table.clear();
    }

    /// Encode a single top-level value, clearing the reference table first
    ///
    /// Output larger than the configured maximum fails with
    /// [`EncodeError::StreamTooLarge`] and the partial buffer is discarded.
    pub fn encode(&self, value: &Rc<Value>) -> Result<Vec<u8>, EncodeError> {
        self.reset();
        let mut writer = BoundedWriter::new(Vec::new(), self.max_stream_length);
        self.write_value_element(&mut writer, value)?;
        Ok(writer.into_inner())
    }

    fn write_type_marker<W: Write>(&self, writer: &mut W, marker: TypeMarker) -> Result<(), EncodeError> {
        writer.write_u8(marker as u8)?;
        Ok(())
    }

    fn write_reference_element<W: Write>(&self, writer: &mut W, index: u32) -> Result<(), EncodeError> {
        let index =
            u16::try_from(index).map_err(|_| EncodeError::IntegerOutOfRange(index as i64))?;
        self.write_type_marker(writer, TypeMarker::Reference)?;
        writer.write_u16::<BigEndian>(index)?;
        Ok(())
    }

    fn write_number_element<W: Write>(&self, writer: &mut W, n: f64) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Number)?;
        writer.write_f64::<BigEndian>(n)?;
        Ok(())
    }

    fn write_bool_element<W: Write>(&self, writer: &mut W, b: bool) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Boolean)?;
        writer.write_u8(u8::from(b))?;
        Ok(())
    }

    fn write_long_string_content<W: Write>(
        &self,
        writer: &mut W,
        s: &str,
    ) -> Result<(), EncodeError> {
        let len =
            u32::try_from(s.len()).map_err(|_| EncodeError::IntegerOutOfRange(s.len() as i64))?;
        writer.write_u32::<BigEndian>(len)?;
        writer.write_all(s.as_bytes())?;
        Ok(())
    }

    fn write_string_element<W: Write>(&self, writer: &mut W, s: &str) -> Result<(), EncodeError> {
        if s.len() > SHORT_STRING_MAX {
            self.write_type_marker(writer, TypeMarker::LongString)?;
            self.write_long_string_content(writer, s)
        } else {
            self.write_type_marker(writer, TypeMarker::String)?;
            write_string(writer, s)
        }
    }

    fn write_date_element<W: Write>(&self, writer: &mut W, time: f64) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Date)?;
        writer.write_f64::<BigEndian>(time)?;
        // Timezone, always zero
        writer.write_u16::<BigEndian>(0)?;
        Ok(())
    }

    fn write_xml_element<W: Write>(&self, writer: &mut W, content: &str) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Xml)?;
        self.write_long_string_content(writer, content)
    }

    fn write_strict_array_element<W: Write>(
        &self,
        writer: &mut W,
        children: &[Rc<Value>],
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Array)?;
        writer.write_u32::<BigEndian>(children.len() as u32)?;
        for child in children {
            self.write_value_element(writer, child)?;
        }
        Ok(())
    }

    /// Write properties as u16-length keys followed by marked values,
    /// terminated with an empty key and the object-end marker
    fn write_object_elements<W: Write>(
        &self,
        writer: &mut W,
        elements: &[Element],
        translate_case: bool,
    ) -> Result<(), EncodeError> {
        for element in elements {
            if translate_case {
                write_string(writer, &to_camel_case(&element.name))?;
            } else {
                write_string(writer, &element.name)?;
            }
            self.write_value_element(writer, &element.value)?;
        }
        writer.write_u16::<BigEndian>(0)?;
        self.write_type_marker(writer, TypeMarker::ObjectEnd)
    }

    /// Objects, maps and externalizable values: typed object when the
    /// mapper yields a class name, hash for plain mappings, plain object
    /// otherwise
    fn write_object_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
    ) -> Result<(), EncodeError> {
        let props = self.mapper.props_for_serialization(value.deref());

        match self.mapper.get_class_name(value.deref()) {
            Some(name) => {
                self.write_type_marker(writer, TypeMarker::TypedObject)?;
                write_string(writer, &name)?;
                let translate_case = self.mapper.get_option(&name, OPT_TRANSLATE_CASE);
                self.write_object_elements(writer, &props, translate_case)
            }
            None => {
                if matches!(value.deref(), Value::Map(_)) {
                    self.write_type_marker(writer, TypeMarker::MixedArrayStart)?;
                    writer.write_u32::<BigEndian>(props.len() as u32)?;
                    let translate_case = self.mapper.get_option(HASH_CLASS, OPT_TRANSLATE_CASE);
                    self.write_object_elements(writer, &props, translate_case)
                } else {
                    self.write_type_marker(writer, TypeMarker::Object)?;
                    self.write_object_elements(writer, &props, false)
                }
            }
        }
    }

    /// Write a single value with its type marker
    pub fn write_value_element<W: Write>(
        &self,
        writer: &mut W,
        s: &Rc<Value>,
    ) -> Result<(), EncodeError> {
        match s.deref() {
            Value::Null => self.write_type_marker(writer, TypeMarker::Null),
            Value::Bool(b) => self.write_bool_element(writer, *b),
            // AMF0 has no integer wire type
            Value::Integer(i) => self.write_number_element(writer, *i as f64),
            Value::Number(n) => self.write_number_element(writer, *n),
            Value::String(text) => self.write_string_element(writer, text),
            Value::Array(children) => {
                if let Some(index) = self
                    .object_reference_table
                    .to_reference_or_store(CacheKey::from_rc(s))
                {
                    return self.write_reference_element(writer, index);
                }
                self.write_strict_array_element(writer, children)
            }
            Value::Map(_) | Value::Object(_, _) | Value::Custom(_, _, _) => {
                if let Some(index) = self
                    .object_reference_table
                    .to_reference_or_store(CacheKey::from_rc(s))
                {
                    return self.write_reference_element(writer, index);
                }
                self.write_object_element(writer, s)
            }
            Value::Date(time) => self.write_date_element(writer, *time),
            Value::XML(content, _string) => self.write_xml_element(writer, content),
            Value::Reference(reference) => self.write_reference_element(writer, reference.index),
            Value::ByteArray(_) => Err(EncodeError::UnsupportedValue("byte array in AMF0")),
            Value::Dictionary(_, _) => Err(EncodeError::UnsupportedValue("dictionary in AMF0")),
        }
    }
}
