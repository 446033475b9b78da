//! Error types surfaced by the codec
use nom::error::{ErrorKind, FromExternalError, ParseError};
use thiserror::Error;

/// The AMF dialect that was being decoded when an error was raised
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AmfVersion {
    /// AMF0
    Amf0,
    /// AMF3
    Amf3,
}

impl core::fmt::Display for AmfVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            AmfVersion::Amf0 => f.write_str("AMF0"),
            AmfVersion::Amf3 => f.write_str("AMF3"),
        }
    }
}

/// The reference table an out-of-range index pointed into
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CacheTable {
    /// The object reference table
    Object,
    /// The string reference table
    String,
    /// The trait reference table
    Trait,
}

impl core::fmt::Display for CacheTable {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            CacheTable::Object => f.write_str("object"),
            CacheTable::String => f.write_str("string"),
            CacheTable::Trait => f.write_str("trait"),
        }
    }
}

/// Enum for representing decoding errors
#[derive(Error, Debug, Clone, Eq, PartialEq)]
pub enum Error<'a> {
    /// A read required more bytes than the source holds
    #[error("Read past end of input")]
    TruncatedStream,

    /// An unknown type marker was encountered
    #[error("Unknown type marker {marker:#04x} ({version})")]
    InvalidMarker {
        /// The unrecognised marker byte
        marker: u8,
        /// The AMF version being decoded when it was read
        version: AmfVersion,
    },

    /// A back-reference index was not strictly less than the cache length
    #[error("{table} reference {index} out of range (cache size {size})")]
    InvalidReference {
        /// The table the index addressed
        table: CacheTable,
        /// The index read from the wire
        index: usize,
        /// The length of the table at the time of the read
        size: usize,
    },

    /// Bytes that must be UTF-8 were not
    #[error("Invalid UTF-8 in string payload")]
    EncodingError,

    /// An externalizable class with no registered decoder
    #[error("No external decoder registered for class {0:?}")]
    UnsupportedExternal(String),

    /// The class mapper failed; the message is propagated unchanged
    #[error("Class mapper error: {0}")]
    Mapper(String),

    /// A nom internal error
    #[error("Nom internal error")]
    Nom(&'a [u8], ErrorKind),
}

impl<'a> ParseError<&'a [u8]> for Error<'a> {
    fn from_error_kind(input: &'a [u8], kind: ErrorKind) -> Self {
        // The complete-input combinators signal a short read as Eof
        if kind == ErrorKind::Eof {
            Error::TruncatedStream
        } else {
            Error::Nom(input, kind)
        }
    }

    fn append(_: &[u8], _: ErrorKind, other: Self) -> Self {
        other
    }
}

impl<'a, E> FromExternalError<&'a [u8], E> for Error<'a> {
    fn from_external_error(input: &'a [u8], kind: ErrorKind, _e: E) -> Self {
        Error::Nom(input, kind)
    }
}

/// Enum for representing encoding errors
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The underlying writer failed
    #[error("I/O error: {0}")]
    Io(std::io::Error),

    /// The output grew beyond the configured maximum stream length
    #[error("Encoded stream exceeds the configured maximum of {0} bytes")]
    StreamTooLarge(usize),

    /// A scalar did not fit the wire field it must be written into
    #[error("Integer {0} out of range for its wire field")]
    IntegerOutOfRange(i64),

    /// The value has no representation in the target AMF version
    #[error("Value has no AMF encoding: {0}")]
    UnsupportedValue(&'static str),
}

impl From<std::io::Error> for EncodeError {
    fn from(e: std::io::Error) -> Self {
        // WriteZero is only produced by the bounded output writer
        if e.kind() == std::io::ErrorKind::WriteZero {
            EncodeError::StreamTooLarge(
                e.get_ref()
                    .and_then(|inner| inner.downcast_ref::<crate::buffer::LimitExceeded>())
                    .map(|l| l.limit)
                    .unwrap_or(0),
            )
        } else {
            EncodeError::Io(e)
        }
    }
}
