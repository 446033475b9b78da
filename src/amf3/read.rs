//! Handles decoding AMF3
use crate::amf3::custom_encoder::ExternalDecoderFn;
use crate::amf3::length::Length;
use crate::amf3::type_marker::TypeMarker;
use crate::amf3::ARRAY_COLLECTION_CLASS;
use crate::errors::{AmfVersion, CacheTable, Error};
use crate::mapper::{to_snake_case, ClassMapper, ClassMapping, HASH_CLASS, OPT_TRANSLATE_CASE};
use crate::nom_utils::{take_bytes, AMFResult};
use crate::types::{ClassDefinition, Element, Reference, ReferenceKind, Value};
use nom::number::complete::{be_f64, be_u8};
use nom::Err;
use std::collections::HashMap;
use std::convert::TryFrom;
use std::rc::Rc;

const REFERENCE_FLAG: u32 = 0x01;

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int_signed(i: &[u8]) -> AMFResult<'_, i32> {
    read_int_signed(i)
}

/// Read a U29 and sign-extend bit 28, for the integer marker
#[allow(clippy::unusual_byte_groupings)]
fn read_int_signed(i: &[u8]) -> AMFResult<'_, i32> {
    let (i, value) = read_int(i)?;
    let mut value = value as i32;

    // Negate if negative
    if value & 0b000_1000000_0000000_0000000_00000000 != 0 {
        value -= 0b001_0000000_0000000_0000000_00000000;
    }

    Ok((i, value))
}

#[cfg(fuzzing)]
/// For fuzzing
pub fn fuzz_read_int(i: &[u8]) -> AMFResult<'_, u32> {
    read_int(i)
}

/// Read a U29: the first three bytes carry 7 payload bits each with the
/// high bit flagging a continuation, a fourth byte carries all 8 bits
fn read_int(i: &[u8]) -> AMFResult<'_, u32> {
    // Read the first byte of the number
    let (mut i, num) = be_u8(i)?;
    let mut value = (num & 0b0111_1111) as u32;
    // Check if we have another byte
    if num & 0b1000_0000 == 0 {
        return Ok((i, value));
    }

    for _ in 0..2 {
        let (j, num) = be_u8(i)?;
        i = j;
        value = (value << 7) | ((num & 0b0111_1111) as u32);
        // Check if we have another byte
        if num & 0b1000_0000 == 0 {
            return Ok((i, value));
        }
    }
    let (i, num) = be_u8(i)?;
    value = (value << 8) | (num as u32);

    Ok((i, value))
}

fn read_length(i: &[u8]) -> AMFResult<'_, Length> {
    let (i, val) = read_int(i)?;
    Ok((
        i,
        match val & REFERENCE_FLAG == 0 {
            true => Length::Reference(val as usize >> 1),
            false => Length::Size(val >> 1),
        },
    ))
}

/// Handles decoding AMF3
pub struct Amf3Decoder {
    /// The table used to cache repeated byte strings
    pub string_reference_table: Vec<Vec<u8>>,

    /// The table used to cache repeated trait definitions
    pub trait_reference_table: Vec<ClassDefinition>,

    /// The table used to cache repeated objects
    pub object_reference_table: Vec<Rc<Value>>,

    /// Decoders used for handling externalized types
    pub external_decoders: HashMap<String, ExternalDecoderFn>,

    /// Resolves wire class names to host values
    mapper: Rc<dyn ClassMapper>,
}

impl Default for Amf3Decoder {
    fn default() -> Self {
        Self::new(Rc::new(ClassMapping::default()))
    }
}

impl Amf3Decoder {
    /// Create a decoder that resolves typed objects through `mapper`
    pub fn new(mapper: Rc<dyn ClassMapper>) -> Self {
        Self {
            string_reference_table: Vec::new(),
            trait_reference_table: Vec::new(),
            object_reference_table: Vec::new(),
            external_decoders: HashMap::new(),
            mapper,
        }
    }

    /// Clear the reference tables, making the decoder ready for a new stream
    pub fn reset(&mut self) {
        self.string_reference_table.clear();
        self.trait_reference_table.clear();
        self.object_reference_table.clear();
    }

    /// Decode a single top-level value, clearing the reference tables first
    pub fn decode<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        self.reset();
        self.parse_single_element(i)
    }

    /// Clone the cached value at `index`, or fail with an out-of-range error
    fn object_reference<'a>(&self, index: usize) -> Result<Rc<Value>, Err<Error<'a>>> {
        self.object_reference_table
            .get(index)
            .map(Rc::clone)
            .ok_or(Err::Error(Error::InvalidReference {
                table: CacheTable::Object,
                index,
                size: self.object_reference_table.len(),
            }))
    }

    /// Reserve the next object cache slot before descending into children,
    /// so back-references to it decode as an explicit cycle marker
    fn reserve_slot(&mut self, kind: ReferenceKind) -> usize {
        let index = self.object_reference_table.len();
        self.object_reference_table
            .push(Rc::new(Value::Reference(Reference::new(index as u32, kind))));
        index
    }

    /// Replace a reserved slot with the finished value
    fn fill_slot(&mut self, index: usize, value: Value) -> Rc<Value> {
        let value = Rc::new(value);
        self.object_reference_table[index] = Rc::clone(&value);
        value
    }

    #[cfg(fuzzing)]
    /// For fuzzing
    pub fn fuzz_parse_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, String> {
        self.parse_string(i)
    }

    /// Read a string-reference-scheme byte string, caching non-empty payloads
    fn parse_byte_stream<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Vec<u8>> {
        let (i, len) = read_length(i)?;

        match len {
            Length::Size(len) => {
                if len == 0 {
                    Ok((i, vec![]))
                } else {
                    let (i, bytes) = take_bytes(i, len as usize)?;
                    self.string_reference_table.push(bytes.to_vec());
                    Ok((i, bytes.to_vec()))
                }
            }
            Length::Reference(index) => {
                let bytes = self
                    .string_reference_table
                    .get(index)
                    .cloned()
                    .ok_or(Err::Error(Error::InvalidReference {
                        table: CacheTable::String,
                        index,
                        size: self.string_reference_table.len(),
                    }))?;

                Ok((i, bytes))
            }
        }
    }

    fn parse_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, String> {
        let (i, bytes) = self.parse_byte_stream(i)?;
        let bytes_str = String::from_utf8(bytes).map_err(|_| Err::Error(Error::EncodingError))?;
        Ok((i, bytes_str))
    }

    fn parse_element_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, s) = self.parse_string(i)?;
        Ok((i, Rc::new(Value::String(s))))
    }

    /// Parse a trait descriptor, resolving trait back-references by position
    fn parse_class_def<'a>(&mut self, header: u32, i: &'a [u8]) -> AMFResult<'a, ClassDefinition> {
        if header & REFERENCE_FLAG == 0 {
            let index = (header >> 1) as usize;

            let class_def = self
                .trait_reference_table
                .get(index)
                .cloned()
                .ok_or(Err::Error(Error::InvalidReference {
                    table: CacheTable::Trait,
                    index,
                    size: self.trait_reference_table.len(),
                }))?;

            return Ok((i, class_def));
        }
        let header = header >> 1;

        let (i, name) = self.parse_string(i)?;

        let encoding = (header & 0x03) as u8;
        let sealed_count = (header >> 2) as usize;

        // Sealed member names share the string cache with value strings
        let mut static_props = Vec::with_capacity(sealed_count.min(i.len()));
        let mut i = i;
        for _ in 0..sealed_count {
            let (j, prop) = self.parse_string(i)?;
            static_props.push(prop);
            i = j;
        }

        let class_def = ClassDefinition {
            name,
            static_properties: static_props,
            dynamic: encoding & 0b10 == 0b10,
            externalizable: encoding & 0b01 == 0b01,
        };

        self.trait_reference_table.push(class_def.clone());
        Ok((i, class_def))
    }

    /// Read one value per sealed member, in declared order
    fn parse_object_static<'a>(
        &mut self,
        i: &'a [u8],
        class_def: &ClassDefinition,
        translate_case: bool,
    ) -> AMFResult<'a, Vec<Element>> {
        let mut elements = Vec::new();
        let mut i = i;

        for name in class_def.static_properties.iter() {
            let (j, e) = self.parse_single_element(i)?;

            let name = if translate_case {
                to_snake_case(name)
            } else {
                name.clone()
            };

            elements.push(Element::shared(name, e));

            i = j;
        }

        Ok((i, elements))
    }

    /// Read dynamic key/value pairs until the empty-string terminator
    fn parse_object_dynamic<'a>(
        &mut self,
        i: &'a [u8],
        translate_case: bool,
    ) -> AMFResult<'a, Vec<Element>> {
        let mut elements = Vec::new();

        let (mut i, mut key) = self.parse_byte_stream(i)?;
        while !key.is_empty() {
            let key_str = String::from_utf8(key).map_err(|_| Err::Error(Error::EncodingError))?;
            let name = if translate_case {
                to_snake_case(&key_str)
            } else {
                key_str
            };

            let (j, value) = self.parse_single_element(i)?;
            elements.push(Element::shared(name, value));

            let (j, next_key) = self.parse_byte_stream(j)?;
            i = j;
            key = next_key;
        }

        Ok((i, elements))
    }

    pub(crate) fn parse_element_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, header) = read_int(i)?;

        if header & REFERENCE_FLAG == 0 {
            let index = (header >> 1) as usize;
            return Ok((i, self.object_reference(index)?));
        }

        let (i, class_def) = self.parse_class_def(header >> 1, i)?;

        // An ArrayCollection is transparent: the wrapped value is returned
        // directly, but it occupies a second object cache slot so later
        // back-references stay aligned
        if class_def.name == ARRAY_COLLECTION_CLASS {
            let (i, inner) = self.parse_single_element(i)?;
            self.object_reference_table.push(Rc::clone(&inner));
            return Ok((i, inner));
        }

        let instance = self
            .mapper
            .get_instance(&class_def.name)
            .map_err(|m| Err::Error(Error::Mapper(m)))?;
        let index = self.reserve_slot(ReferenceKind::Object);

        if class_def.externalizable {
            let decoder = self
                .external_decoders
                .get(&class_def.name)
                .cloned()
                .ok_or_else(|| Err::Error(Error::UnsupportedExternal(class_def.name.clone())))?;
            let (i, elements) = decoder(i, self)?;
            let obj = self.fill_slot(
                index,
                Value::Custom(elements, Vec::new(), Some(class_def.clone())),
            );
            return Ok((i, obj));
        }

        let option_class = if class_def.name.is_empty() {
            HASH_CLASS
        } else {
            class_def.name.as_str()
        };
        let translate_case = self.mapper.get_option(option_class, OPT_TRANSLATE_CASE);

        let (i, sealed) = self.parse_object_static(i, &class_def, translate_case)?;

        let (i, dynamic) = if class_def.dynamic {
            let (i, d) = self.parse_object_dynamic(i, translate_case)?;
            (i, Some(d))
        } else {
            (i, None)
        };

        let populated = self
            .mapper
            .populate(instance, sealed, dynamic)
            .map_err(|m| Err::Error(Error::Mapper(m)))?;

        // Carry the parsed trait on object results so re-encoding emits the
        // same sealed member layout
        let populated = match populated {
            Value::Object(elements, _) => Value::Object(elements, Some(class_def)),
            other => other,
        };

        Ok((i, self.fill_slot(index, populated)))
    }

    fn parse_element_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, len) = read_length(i)?;

        let length = match len {
            Length::Reference(index) => return Ok((i, self.object_reference(index)?)),
            Length::Size(length) => length as usize,
        };

        // There must be at least `length` bytes left, which bounds
        // pre-allocation for truncated hostile inputs
        if i.len() < length {
            return Err(Err::Error(Error::TruncatedStream));
        }

        let index = self.reserve_slot(ReferenceKind::Array);

        let (i, first_key) = self.parse_byte_stream(i)?;

        if first_key.is_empty() {
            // Dense only
            let mut elements = Vec::with_capacity(length);
            let mut i = i;
            for _ in 0..length {
                let (j, e) = self.parse_single_element(i)?;
                elements.push(e);
                i = j;
            }

            return Ok((i, self.fill_slot(index, Value::Array(elements))));
        }

        // Mixed: associative entries followed by the dense part, combined
        // into one mapping with stringified indices for the dense entries
        let mut elements = Vec::with_capacity(length);
        let mut key = first_key;
        let mut i = i;
        while !key.is_empty() {
            let name = String::from_utf8(key).map_err(|_| Err::Error(Error::EncodingError))?;
            let (j, value) = self.parse_single_element(i)?;
            elements.push(Element::shared(name, value));
            let (j, next_key) = self.parse_byte_stream(j)?;
            i = j;
            key = next_key;
        }

        for dense_index in 0..length {
            let (j, value) = self.parse_single_element(i)?;
            elements.push(Element::shared(dense_index.to_string(), value));
            i = j;
        }

        Ok((i, self.fill_slot(index, Value::Map(elements))))
    }

    fn parse_element_dict<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, len) = read_length(i)?;

        let length = match len {
            Length::Reference(index) => return Ok((i, self.object_reference(index)?)),
            Length::Size(length) => length as usize,
        };

        // Each pair needs at least two bytes of input
        if i.len() / 2 < length {
            return Err(Err::Error(Error::TruncatedStream));
        }

        let index = self.reserve_slot(ReferenceKind::Dictionary);

        let (i, weak_keys) = read_int(i)?;

        let mut pairs = Vec::with_capacity(length);
        let mut i = i;
        for _ in 0..length {
            let (j, key) = self.parse_single_element(i)?;
            let (j, value) = self.parse_single_element(j)?;
            pairs.push((key, value));
            i = j;
        }

        Ok((
            i,
            self.fill_slot(index, Value::Dictionary(pairs, weak_keys == 1)),
        ))
    }

    fn parse_element_date<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, len) = read_length(i)?;

        if let Length::Reference(index) = len {
            return Ok((i, self.object_reference(index)?));
        }

        let (i, millis) = be_f64(i)?;

        let date = Rc::new(Value::Date(millis));
        self.object_reference_table.push(Rc::clone(&date));
        Ok((i, date))
    }

    fn parse_element_byte_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, len) = read_length(i)?;

        let length = match len {
            Length::Reference(index) => return Ok((i, self.object_reference(index)?)),
            Length::Size(length) => length as usize,
        };

        let (i, bytes) = take_bytes(i, length)?;

        let value = Rc::new(Value::ByteArray(bytes.to_vec()));
        self.object_reference_table.push(Rc::clone(&value));
        Ok((i, value))
    }

    /// XML shares the string wire shape but caches in the object table
    fn parse_element_xml<'a>(&mut self, i: &'a [u8], string: bool) -> AMFResult<'a, Rc<Value>> {
        let (i, len) = read_length(i)?;

        let length = match len {
            Length::Reference(index) => return Ok((i, self.object_reference(index)?)),
            Length::Size(length) => length as usize,
        };

        let (i, bytes) = take_bytes(i, length)?;
        let content =
            std::str::from_utf8(bytes).map_err(|_| Err::Error(Error::EncodingError))?;

        let value = Rc::new(Value::XML(content.to_string(), string));
        if length > 0 {
            self.object_reference_table.push(Rc::clone(&value));
        }
        Ok((i, value))
    }

    fn read_type_marker<'a>(&self, i: &'a [u8]) -> AMFResult<'a, TypeMarker> {
        let (i, marker) = be_u8(i)?;
        TypeMarker::try_from(marker)
            .map(|m| (i, m))
            .map_err(|_| {
                Err::Error(Error::InvalidMarker {
                    marker,
                    version: AmfVersion::Amf3,
                })
            })
    }

    /// Parse a single AMF3 element from the input
    pub fn parse_single_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, marker) = self.read_type_marker(i)?;

        match marker {
            TypeMarker::Undefined | TypeMarker::Null => Ok((i, Rc::new(Value::Null))),
            TypeMarker::False => Ok((i, Rc::new(Value::Bool(false)))),
            TypeMarker::True => Ok((i, Rc::new(Value::Bool(true)))),
            TypeMarker::Integer => {
                let (i, v) = read_int_signed(i)?;
                Ok((i, Rc::new(Value::Integer(v))))
            }
            TypeMarker::Number => {
                let (i, v) = be_f64(i)?;
                Ok((i, Rc::new(Value::Number(v))))
            }
            TypeMarker::String => self.parse_element_string(i),
            TypeMarker::XmlDoc => self.parse_element_xml(i, false),
            TypeMarker::Date => self.parse_element_date(i),
            TypeMarker::Array => self.parse_element_array(i),
            TypeMarker::Object => self.parse_element_object(i),
            TypeMarker::Xml => self.parse_element_xml(i, true),
            TypeMarker::ByteArray => self.parse_element_byte_array(i),
            TypeMarker::Dictionary => self.parse_element_dict(i),
        }
    }
}

#[cfg(test)]
mod read_number_tests {
    use crate::amf3::read::{read_int, read_int_signed};

    #[test]
    fn test_read_1byte_number() {
        assert_eq!(0b00101011, read_int_signed(&[0b00101011]).unwrap().1)
    }

    #[test]
    fn test_read_4byte_number() {
        let i = &[0b10000000, 0b11000000, 0b10000000, 0b10000000];
        assert_eq!(2097280, read_int_signed(i).unwrap().1);
    }

    #[test]
    fn read_neg_number() {
        assert_eq!(-268435455, read_int_signed(&[192, 128, 128, 1]).unwrap().1);
    }

    #[test]
    fn read_min_number() {
        assert_eq!(-268435456, read_int_signed(&[192, 128, 128, 0]).unwrap().1);
    }

    #[test]
    fn test_read_1byte_number_unsigned() {
        assert_eq!(0b00101011, read_int(&[0b00101011]).unwrap().1)
    }

    #[test]
    fn test_read_boundary_sizes() {
        assert_eq!(127, read_int(&[0x7f]).unwrap().1);
        assert_eq!(128, read_int(&[0x81, 0x00]).unwrap().1);
        assert_eq!(16383, read_int(&[0xff, 0x7f]).unwrap().1);
        assert_eq!(16384, read_int(&[0x81, 0x80, 0x00]).unwrap().1);
        assert_eq!(2097151, read_int(&[0xff, 0xff, 0x7f]).unwrap().1);
        assert_eq!(2097152, read_int(&[0x80, 0xc0, 0x80, 0x00]).unwrap().1);
        assert_eq!(268435455, read_int(&[0xbf, 0xff, 0xff, 0xff]).unwrap().1);
    }
}
