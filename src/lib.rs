//! # amf-codec
//!
//! A bidirectional codec for Action Message Format versions 0 and 3, the
//! binary object-serialization formats used by Flash Player and Flex for
//! wire interchange with application servers.
//!
//! Decoding turns a byte slice into a tree of [`types::Value`] nodes,
//! sharing node identity for wire back-references; encoding walks a value
//! tree back into bytes, emitting reference headers for revisited nodes.
//! Each codec instance owns the per-stream reference caches (objects,
//! strings, class traits) and resets them on every top-level call.
//!
//! Typed objects are resolved through an injected [`mapper::ClassMapper`];
//! [`mapper::ClassMapping`] is the provided registry-backed default.
//!
//! ```
//! use amf_codec::amf3::{Amf3Decoder, Amf3Encoder};
//! use amf_codec::types::Value;
//! use std::rc::Rc;
//!
//! let encoder = Amf3Encoder::default();
//! let bytes = encoder.encode(&Rc::new(Value::Integer(127))).unwrap();
//! assert_eq!(bytes, vec![0x04, 0x7f]);
//!
//! let mut decoder = Amf3Decoder::default();
//! let (_, value) = decoder.decode(&bytes).unwrap();
//! assert_eq!(*value, Value::Integer(127));
//! ```
//!
//! An AMF0 stream can hand a value off to AMF3 mid-stream through the
//! switch marker (`0x11`); [`amf0::Amf0Decoder`] owns the AMF3 decoder it
//! delegates to.

/// Support for AMF0
pub mod amf0;
/// Support for AMF3
pub mod amf3;
/// Bounded output buffering
pub mod buffer;
/// Cache pool types used by the encoders
pub mod element_cache;
/// Error types
pub mod errors;
/// The class mapper collaborator
pub mod mapper;
mod nom_utils;
/// The value model
pub mod types;

pub use nom_utils::AMFResult;
