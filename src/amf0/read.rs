//! Support for decoding AMF0 data
use crate::amf0::type_marker::TypeMarker;
use crate::amf3::Amf3Decoder;
use crate::errors::{AmfVersion, CacheTable, Error};
use crate::mapper::{to_snake_case, ClassMapper, ClassMapping, HASH_CLASS, OPT_TRANSLATE_CASE};
use crate::nom_utils::{take_str, AMFResult};
use crate::types::{Element, Reference, ReferenceKind, Value};
use nom::number::complete::{be_f64, be_u16, be_u32, be_u8};
use nom::Err;
use std::convert::TryFrom;
use std::rc::Rc;

/// Read a u16-length-prefixed utf-8 string
pub(crate) fn parse_string(i: &[u8]) -> AMFResult<'_, &str> {
    let (i, length) = be_u16(i)?;
    take_str(i, length as usize)
}

fn read_type_marker(i: &[u8]) -> AMFResult<'_, TypeMarker> {
    let (i, marker) = be_u8(i)?;
    TypeMarker::try_from(marker).map(|m| (i, m)).map_err(|_| {
        Err::Error(Error::InvalidMarker {
            marker,
            version: AmfVersion::Amf0,
        })
    })
}

/// Handles decoding AMF0
pub struct Amf0Decoder {
    /// The table used to cache repeated objects
    pub object_reference_table: Vec<Rc<Value>>,

    /// Handles the remainder of a value after an AMF3 switch marker
    pub amf3_decoder: Amf3Decoder,

    /// Resolves wire class names to host values
    mapper: Rc<dyn ClassMapper>,
}

impl Default for Amf0Decoder {
    fn default() -> Self {
        Self::new(Rc::new(ClassMapping::default()))
    }
}

impl Amf0Decoder {
    /// Create a decoder that resolves typed objects through `mapper`
    pub fn new(mapper: Rc<dyn ClassMapper>) -> Self {
        Self {
            object_reference_table: Vec::new(),
            amf3_decoder: Amf3Decoder::new(Rc::clone(&mapper)),
            mapper,
        }
    }

    /// Clear the reference table, making the decoder ready for a new stream
    pub fn reset(&mut self) {
        self.object_reference_table.clear();
        self.amf3_decoder.reset();
    }

    /// Decode a single top-level value, clearing the reference tables first
    pub fn decode<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        self.reset();
        self.parse_single_element(i)
    }

    /// Parse a single AMF0 element from the input
    pub fn parse_single_element<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, marker) = read_type_marker(i)?;
        self.parse_value(marker, i)
    }

    fn reserve_slot(&mut self, kind: ReferenceKind) -> usize {
        let index = self.object_reference_table.len();
        self.object_reference_table
            .push(Rc::new(Value::Reference(Reference::new(index as u32, kind))));
        index
    }

    fn fill_slot(&mut self, index: usize, value: Value) -> Rc<Value> {
        let value = Rc::new(value);
        self.object_reference_table[index] = Rc::clone(&value);
        value
    }

    /// Object mode: u16-length keys, each followed by a marked value, until
    /// an empty key followed by the object-end marker
    fn parse_object_elements<'a>(
        &mut self,
        i: &'a [u8],
        translate_case: bool,
    ) -> AMFResult<'a, Vec<Element>> {
        let mut elements = Vec::new();
        let mut i = i;

        loop {
            let (j, key) = parse_string(i)?;
            let (j, marker) = read_type_marker(j)?;

            if key.is_empty() && marker == TypeMarker::ObjectEnd {
                i = j;
                break;
            }

            let name = if translate_case {
                to_snake_case(key)
            } else {
                key.to_string()
            };

            let (j, value) = self.parse_value(marker, j)?;
            elements.push(Element::shared(name, value));
            i = j;
        }

        Ok((i, elements))
    }

    fn parse_element_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let index = self.reserve_slot(ReferenceKind::Object);
        let (i, elements) = self.parse_object_elements(i, false)?;
        Ok((i, self.fill_slot(index, Value::Object(elements, None))))
    }

    fn parse_element_typed_object<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, name) = parse_string(i)?;

        let instance = self
            .mapper
            .get_instance(name)
            .map_err(|m| Err::Error(Error::Mapper(m)))?;
        let translate_case = self.mapper.get_option(name, OPT_TRANSLATE_CASE);

        let index = self.reserve_slot(ReferenceKind::Object);
        let (i, elements) = self.parse_object_elements(i, translate_case)?;

        let populated = self
            .mapper
            .populate(instance, elements, None)
            .map_err(|m| Err::Error(Error::Mapper(m)))?;

        Ok((i, self.fill_slot(index, populated)))
    }

    fn parse_element_hash<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        // The associative count is not used for sizing
        let (i, _size) = be_u32(i)?;

        let translate_case = self.mapper.get_option(HASH_CLASS, OPT_TRANSLATE_CASE);

        let index = self.reserve_slot(ReferenceKind::Object);
        let (i, elements) = self.parse_object_elements(i, translate_case)?;
        Ok((i, self.fill_slot(index, Value::Map(elements))))
    }

    fn parse_element_array<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, length) = be_u32(i)?;
        let length = length as usize;

        // There must be at least `length` bytes left, which bounds
        // pre-allocation for truncated hostile inputs
        if i.len() < length {
            return Err(Err::Error(Error::TruncatedStream));
        }

        let index = self.reserve_slot(ReferenceKind::Array);

        let mut elements = Vec::with_capacity(length);
        let mut i = i;
        for _ in 0..length {
            let (j, e) = self.parse_single_element(i)?;
            elements.push(e);
            i = j;
        }

        Ok((i, self.fill_slot(index, Value::Array(elements))))
    }

    fn parse_element_reference<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, index) = be_u16(i)?;
        let index = index as usize;

        let value = self
            .object_reference_table
            .get(index)
            .map(Rc::clone)
            .ok_or(Err::Error(Error::InvalidReference {
                table: CacheTable::Object,
                index,
                size: self.object_reference_table.len(),
            }))?;

        Ok((i, value))
    }

    fn parse_element_date<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        let (i, millis) = be_f64(i)?;
        // Timezone, always ignored
        let (i, _time_zone) = be_u16(i)?;

        Ok((i, Rc::new(Value::Date(millis))))
    }

    fn parse_element_long_string<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, &'a str> {
        let (i, length) = be_u32(i)?;
        take_str(i, length as usize)
    }

    /// Hand the rest of this value to the AMF3 decoder on the same stream;
    /// each switch marker gets fresh AMF3 reference tables
    fn parse_element_amf3<'a>(&mut self, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        self.amf3_decoder.reset();
        self.amf3_decoder.parse_single_element(i)
    }

    fn parse_value<'a>(&mut self, marker: TypeMarker, i: &'a [u8]) -> AMFResult<'a, Rc<Value>> {
        match marker {
            TypeMarker::Number => {
                let (i, n) = be_f64(i)?;
                if n.is_nan() {
                    Ok((i, Rc::new(Value::Null)))
                } else {
                    Ok((i, Rc::new(Value::Number(n))))
                }
            }
            TypeMarker::Boolean => {
                let (i, b) = be_u8(i)?;
                Ok((i, Rc::new(Value::Bool(b != 0))))
            }
            TypeMarker::String => {
                let (i, s) = parse_string(i)?;
                Ok((i, Rc::new(Value::String(s.to_string()))))
            }
            TypeMarker::Object => self.parse_element_object(i),
            TypeMarker::Null | TypeMarker::Undefined | TypeMarker::Unsupported => {
                Ok((i, Rc::new(Value::Null)))
            }
            TypeMarker::Reference => self.parse_element_reference(i),
            TypeMarker::MixedArrayStart => self.parse_element_hash(i),
            TypeMarker::Array => self.parse_element_array(i),
            TypeMarker::Date => self.parse_element_date(i),
            TypeMarker::LongString => {
                let (i, s) = self.parse_element_long_string(i)?;
                Ok((i, Rc::new(Value::String(s.to_string()))))
            }
            TypeMarker::Xml => {
                let (i, s) = self.parse_element_long_string(i)?;
                Ok((i, Rc::new(Value::XML(s.to_string(), true))))
            }
            TypeMarker::TypedObject => self.parse_element_typed_object(i),
            TypeMarker::AMF3 => self.parse_element_amf3(i),
            // Only valid inside object mode
            TypeMarker::ObjectEnd => Err(Err::Error(Error::InvalidMarker {
                marker: marker as u8,
                version: AmfVersion::Amf0,
            })),
        }
    }
}
