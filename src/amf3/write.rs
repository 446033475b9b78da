//! Handles encoding AMF3
use crate::amf3::custom_encoder::CustomEncoder;
use crate::amf3::length::Length;
use crate::amf3::type_marker::TypeMarker;
use crate::amf3::{MAX_INTEGER, MIN_INTEGER};
use crate::buffer::{BoundedWriter, DEFAULT_MAX_STREAM_LENGTH};
use crate::element_cache::{CacheKey, ElementCache, ObjectCache};
use crate::errors::EncodeError;
use crate::mapper::{to_camel_case, ClassMapper, ClassMapping, HASH_CLASS, OPT_TRANSLATE_CASE};
use crate::types::{ClassDefinition, Element, Reference, ReferenceKind, Value};
use byteorder::{BigEndian, WriteBytesExt};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::ops::Deref;
use std::rc::Rc;

/// Handles encoding AMF3
pub struct Amf3Encoder {
    /// The table used to cache repeated byte strings
    string_reference_table: ElementCache<Vec<u8>>,

    /// The table used to cache repeated trait definitions, keyed by class name
    trait_reference_table: RefCell<Vec<String>>,

    /// The table used to cache repeated objects, keyed by identity
    object_reference_table: ObjectCache,

    /// Encoders used for handling externalized types
    pub external_encoders: HashMap<String, Box<dyn CustomEncoder>>,

    /// Resolves class names and properties for outbound values
    mapper: Rc<dyn ClassMapper>,

    /// Cap on the size of one encoded stream
    max_stream_length: usize,
}

impl Default for Amf3Encoder {
    fn default() -> Self {
        Self::new(Rc::new(ClassMapping::default()))
    }
}

impl Amf3Encoder {
    /// Create an encoder that resolves class names through `mapper`
    pub fn new(mapper: Rc<dyn ClassMapper>) -> Self {
        Self {
            string_reference_table: ElementCache::default(),
            trait_reference_table: RefCell::new(Vec::new()),
            object_reference_table: ObjectCache::default(),
            external_encoders: HashMap::new(),
            mapper,
            max_stream_length: DEFAULT_MAX_STREAM_LENGTH,
        }
    }

    /// Change the cap on the size of an encoded stream
    pub fn with_max_stream_length(mut self, max_stream_length: usize) -> Self {
        self.max_stream_length = max_stream_length;
        self
    }

    /// Clear the reference tables, making the encoder ready for a new stream
    pub fn reset(&self) {
        self.string_reference_table.clear();
        self.trait_reference_table.borrow_mut().clear();
        self.object_reference_table.clear();
    }

    /// Encode a single top-level value, clearing the reference tables first
    ///
    /// Output larger than the configured maximum fails with
    /// [`EncodeError::StreamTooLarge`] and the partial buffer is discarded.
    pub fn encode(&self, value: &Rc<Value>) -> Result<Vec<u8>, EncodeError> {
        self.reset();
        let mut writer = BoundedWriter::new(Vec::new(), self.max_stream_length);
        self.write_value_element(&mut writer, value)?;
        Ok(writer.into_inner())
    }

    /// Write a U29, with 29-bit signed values shifted into unsigned form
    #[allow(clippy::unusual_byte_groupings)]
    pub(crate) fn write_int<W: Write>(&self, writer: &mut W, i: i32) -> Result<(), EncodeError> {
        if !(MIN_INTEGER..=0x1FFF_FFFF).contains(&i) {
            return Err(EncodeError::IntegerOutOfRange(i as i64));
        }
        let n = (if i < 0 {
            i + 0b001_0000000_0000000_0000000_00000000
        } else {
            i
        }) as u32;

        if n > 0x1fffff {
            writer.write_u8(((n >> 22) & 0x7f) as u8 | 0x80)?;
            writer.write_u8(((n >> 15) & 0x7f) as u8 | 0x80)?;
            writer.write_u8(((n >> 8) & 0x7f) as u8 | 0x80)?;
            writer.write_u8((n & 0xff) as u8)?;
        } else if n > 0x3fff {
            writer.write_u8(((n >> 14) & 0x7f) as u8 | 0x80)?;
            writer.write_u8(((n >> 7) & 0x7f) as u8 | 0x80)?;
            writer.write_u8((n & 0x7f) as u8)?;
        } else if n > 0x7f {
            writer.write_u8(((n >> 7) & 0x7f) as u8 | 0x80)?;
            writer.write_u8((n & 0x7f) as u8)?;
        } else {
            writer.write_u8((n & 0x7f) as u8)?;
        }

        Ok(())
    }

    fn write_type_marker<W: Write>(&self, writer: &mut W, s: TypeMarker) -> Result<(), EncodeError> {
        writer.write_u8(s as u8)?;
        Ok(())
    }

    /// Write a string-reference-scheme byte string; the empty string is
    /// emitted inline and never cached
    fn write_byte_string<W: Write>(&self, writer: &mut W, s: &[u8]) -> Result<(), EncodeError> {
        if s.is_empty() {
            return Length::Size(0).write(writer, self);
        }

        let len = self
            .string_reference_table
            .to_length_store(s.to_vec(), s.len() as u32);

        len.write(writer, self)?;
        if len.is_size() {
            writer.write_all(s)?;
        }

        Ok(())
    }

    fn write_string<W: Write>(&self, writer: &mut W, s: &str) -> Result<(), EncodeError> {
        self.write_byte_string(writer, s.as_bytes())
    }

    fn write_number_element<W: Write>(&self, writer: &mut W, i: f64) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Number)?;
        writer.write_f64::<BigEndian>(i)?;
        Ok(())
    }

    fn write_boolean_element<W: Write>(&self, writer: &mut W, b: bool) -> Result<(), EncodeError> {
        if b {
            self.write_type_marker(writer, TypeMarker::True)
        } else {
            self.write_type_marker(writer, TypeMarker::False)
        }
    }

    fn write_string_element<W: Write>(&self, writer: &mut W, s: &str) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::String)?;
        self.write_byte_string(writer, s.as_bytes())?;
        Ok(())
    }

    fn write_null_element<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Null)
    }

    fn write_integer_element<W: Write>(&self, writer: &mut W, i: i32) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Integer)?;
        self.write_int(writer, i)?;
        Ok(())
    }

    fn write_date_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        time: f64,
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Date)?;
        match self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            Some(index) => Length::Reference(index as usize).write(writer, self),
            None => {
                Length::Size(0).write(writer, self)?;
                writer.write_f64::<BigEndian>(time)?;
                Ok(())
            }
        }
    }

    fn write_byte_array_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        bytes: &[u8],
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::ByteArray)?;
        match self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            Some(index) => Length::Reference(index as usize).write(writer, self),
            None => {
                Length::Size(bytes.len() as u32).write(writer, self)?;
                writer.write_all(bytes)?;
                Ok(())
            }
        }
    }

    fn write_xml_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        content: &str,
        string: bool,
    ) -> Result<(), EncodeError> {
        if string {
            self.write_type_marker(writer, TypeMarker::Xml)?;
        } else {
            self.write_type_marker(writer, TypeMarker::XmlDoc)?;
        }
        match self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            Some(index) => Length::Reference(index as usize).write(writer, self),
            None => {
                Length::Size(content.len() as u32).write(writer, self)?;
                writer.write_all(content.as_bytes())?;
                Ok(())
            }
        }
    }

    fn write_array_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        children: &[Rc<Value>],
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Array)?;
        match self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            Some(index) => Length::Reference(index as usize).write(writer, self),
            None => {
                Length::Size(children.len() as u32).write(writer, self)?;
                // No associative part
                self.write_byte_string(writer, &[])?;
                for child in children {
                    self.write_value_element(writer, child)?;
                }
                Ok(())
            }
        }
    }

    fn write_dictionary_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        items: &[(Rc<Value>, Rc<Value>)],
        weak_keys: bool,
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Dictionary)?;
        match self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            Some(index) => Length::Reference(index as usize).write(writer, self),
            None => {
                Length::Size(items.len() as u32).write(writer, self)?;
                self.write_int(writer, i32::from(weak_keys))?;
                for (key, val) in items {
                    self.write_value_element(writer, key)?;
                    self.write_value_element(writer, val)?;
                }
                Ok(())
            }
        }
    }

    /// Write a back-reference produced by decoding a cycle
    fn write_reference_element<W: Write>(
        &self,
        writer: &mut W,
        reference: &Reference,
    ) -> Result<(), EncodeError> {
        let marker = match reference.kind {
            ReferenceKind::Object => TypeMarker::Object,
            ReferenceKind::Array => TypeMarker::Array,
            ReferenceKind::Dictionary => TypeMarker::Dictionary,
            ReferenceKind::Date => TypeMarker::Date,
            ReferenceKind::ByteArray => TypeMarker::ByteArray,
            ReferenceKind::Xml => TypeMarker::Xml,
            ReferenceKind::XmlDoc => TypeMarker::XmlDoc,
        };
        self.write_type_marker(writer, marker)?;
        Length::Reference(reference.index as usize).write(writer, self)
    }

    /// Write the object marker and body for objects, maps and externalizable values
    fn write_object_element<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        class_def: Option<&ClassDefinition>,
        custom_props: Option<&[Element]>,
    ) -> Result<(), EncodeError> {
        self.write_type_marker(writer, TypeMarker::Object)?;

        if let Some(index) = self
            .object_reference_table
            .to_reference_or_store(CacheKey::from_rc(value))
        {
            return Length::Reference(index as usize).write(writer, self);
        }

        match self.mapper.get_class_name(value.deref()) {
            Some(name) => self.write_typed_object(writer, value, class_def, custom_props, &name),
            None => self.write_dynamic_object(writer, value),
        }
    }

    /// An anonymous object: dynamic traits with no name and no sealed members
    fn write_dynamic_object<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
    ) -> Result<(), EncodeError> {
        // members 0, dynamic, traits inline, value inline
        self.write_int(writer, 0x0b)?;
        self.write_byte_string(writer, &[])?;

        let translate_case = self.mapper.get_option(HASH_CLASS, OPT_TRANSLATE_CASE);
        let props = self.mapper.props_for_serialization(value.deref());
        for element in &props {
            let key = if translate_case {
                to_camel_case(&element.name)
            } else {
                element.name.clone()
            };
            self.write_byte_string(writer, key.as_bytes())?;
            self.write_value_element(writer, &element.value)?;
        }
        self.write_byte_string(writer, &[])
    }

    fn write_typed_object<W: Write>(
        &self,
        writer: &mut W,
        value: &Rc<Value>,
        class_def: Option<&ClassDefinition>,
        custom_props: Option<&[Element]>,
        name: &str,
    ) -> Result<(), EncodeError> {
        let def = class_def
            .cloned()
            .unwrap_or_else(|| ClassDefinition::dynamic(name.to_string()));
        let is_external = def.externalizable;
        let is_dynamic = def.dynamic;

        // Traits are cached by class name: one full descriptor per stream,
        // references afterwards
        let trait_index = self
            .trait_reference_table
            .borrow()
            .iter()
            .position(|cached| cached.as_str() == name);
        match trait_index {
            Some(index) => {
                self.write_int(writer, ((index as i32) << 2) | 0x01)?;
            }
            None => {
                self.trait_reference_table.borrow_mut().push(name.to_string());

                let header = ((def.static_properties.len() as u32) << 4)
                    | if is_dynamic { 0x08 } else { 0x00 }
                    | if is_external { 0x04 } else { 0x00 }
                    | 0x03;
                self.write_int(writer, header as i32)?;
                self.write_byte_string(writer, name.as_bytes())?;
                for prop in &def.static_properties {
                    self.write_string(writer, prop)?;
                }
            }
        }

        if is_external {
            let encoder = self.external_encoders.get(name).ok_or(
                EncodeError::UnsupportedValue("externalizable class with no registered encoder"),
            )?;
            writer.write_all(&encoder.encode(
                custom_props.unwrap_or(&[]),
                &Some(def.clone()),
                self,
            ))?;
            return Ok(());
        }

        let translate_case = self.mapper.get_option(name, OPT_TRANSLATE_CASE);
        let props = self.mapper.props_for_serialization(value.deref());

        // Sealed member values in declared order; a missing member encodes
        // as the absent value
        let sealed_keys: Vec<String> = def
            .static_properties
            .iter()
            .map(|member| {
                if translate_case {
                    crate::mapper::to_snake_case(member)
                } else {
                    member.clone()
                }
            })
            .collect();
        for key in &sealed_keys {
            let member_value = props
                .iter()
                .find(|e| &e.name == key)
                .map(|e| Rc::clone(&e.value))
                .unwrap_or_else(|| Rc::new(Value::Null));
            self.write_value_element(writer, &member_value)?;
        }

        if is_dynamic {
            for element in props.iter().filter(|e| !sealed_keys.contains(&e.name)) {
                let key = if translate_case {
                    to_camel_case(&element.name)
                } else {
                    element.name.clone()
                };
                self.write_byte_string(writer, key.as_bytes())?;
                self.write_value_element(writer, &element.value)?;
            }
            self.write_byte_string(writer, &[])?;
        }

        Ok(())
    }

    /// Write a single value with its type marker
    pub fn write_value_element<W: Write>(
        &self,
        writer: &mut W,
        s: &Rc<Value>,
    ) -> Result<(), EncodeError> {
        match s.deref() {
            Value::Null => self.write_null_element(writer),
            Value::Bool(b) => self.write_boolean_element(writer, *b),
            Value::Integer(i) => {
                if (MIN_INTEGER..=MAX_INTEGER).contains(i) {
                    self.write_integer_element(writer, *i)
                } else {
                    // Outside the signed 29-bit range; fall back to a double
                    self.write_number_element(writer, *i as f64)
                }
            }
            Value::Number(n) => self.write_number_element(writer, *n),
            Value::String(text) => self.write_string_element(writer, text),
            Value::Array(children) => self.write_array_element(writer, s, children),
            Value::Map(_) => self.write_object_element(writer, s, None, None),
            Value::Object(_, class_def) => {
                self.write_object_element(writer, s, class_def.as_ref(), None)
            }
            Value::Date(time) => self.write_date_element(writer, s, *time),
            Value::ByteArray(bytes) => self.write_byte_array_element(writer, s, bytes),
            Value::XML(content, string) => self.write_xml_element(writer, s, content, *string),
            Value::Dictionary(items, weak_keys) => {
                self.write_dictionary_element(writer, s, items, *weak_keys)
            }
            Value::Reference(reference) => self.write_reference_element(writer, reference),
            Value::Custom(custom, _, class_def) => {
                self.write_object_element(writer, s, class_def.as_ref(), Some(custom))
            }
        }
    }
}

#[cfg(test)]
mod write_number_tests {
    use crate::amf3::write::Amf3Encoder;

    #[test]
    fn test_write_1byte_number() {
        let e = Amf3Encoder::default();
        let mut v = vec![];
        e.write_int(&mut v, 0b00101011).unwrap();
        assert_eq!(v, &[0b00101011]);
    }

    #[test]
    fn test_write_4byte_number() {
        let e = Amf3Encoder::default();
        let mut v = vec![];
        e.write_int(&mut v, 2097280).unwrap();
        assert_eq!(v, &[0b10000000, 0b11000000, 0b10000000, 0b10000000]);
    }

    #[test]
    fn write_neg_number() {
        let e = Amf3Encoder::default();
        let mut v = vec![];
        e.write_int(&mut v, -268435455).unwrap();
        assert_eq!(v, &[192, 128, 128, 1]);
    }

    #[test]
    fn write_out_of_range_number() {
        let e = Amf3Encoder::default();
        let mut v = vec![];
        assert!(e.write_int(&mut v, -268435457).is_err());
        assert!(e.write_int(&mut v, 0x2000_0000).is_err());
    }

    #[test]
    fn test_write_boundary_sizes() {
        let e = Amf3Encoder::default();
        for (value, expected) in [
            (0, vec![0x00]),
            (127, vec![0x7f]),
            (128, vec![0x81, 0x00]),
            (16383, vec![0xff, 0x7f]),
            (16384, vec![0x81, 0x80, 0x00]),
            (2097151, vec![0xff, 0xff, 0x7f]),
            (2097152, vec![0x80, 0xc0, 0x80, 0x00]),
            (268435455, vec![0xbf, 0xff, 0xff, 0xff]),
        ] {
            let mut v = vec![];
            e.write_int(&mut v, value).unwrap();
            assert_eq!(v, expected, "encoding of {value}");
        }
    }
}
