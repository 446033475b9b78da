use crate::errors::{EncodeError, Error};
use byteorder::{BigEndian, WriteBytesExt};
use nom::{Err, IResult};
use std::io::Write;

/// Result type for decoding
pub type AMFResult<'a, T> = IResult<&'a [u8], T, Error<'a>>;

/// Take `len` bytes, failing with `TruncatedStream` on shortfall
pub(crate) fn take_bytes(i: &[u8], len: usize) -> AMFResult<'_, &[u8]> {
    if i.len() < len {
        return Err(Err::Error(Error::TruncatedStream));
    }
    let (bytes, rest) = i.split_at(len);
    Ok((rest, bytes))
}

/// Take a utf-8 string of `len` bytes
pub(crate) fn take_str(i: &[u8], len: usize) -> AMFResult<'_, &str> {
    let (i, bytes) = take_bytes(i, len)?;
    let s = std::str::from_utf8(bytes).map_err(|_| Err::Error(Error::EncodingError))?;
    Ok((i, s))
}

/// Write a string with a u16 length prefix
pub(crate) fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<(), EncodeError> {
    let len = u16::try_from(s.len()).map_err(|_| EncodeError::IntegerOutOfRange(s.len() as i64))?;
    writer.write_u16::<BigEndian>(len).map_err(EncodeError::from)?;
    writer.write_all(s.as_bytes()).map_err(EncodeError::from)?;
    Ok(())
}

#[cfg(test)]
mod nom_utils_tests {
    use super::{take_bytes, take_str, write_string};
    use crate::errors::Error;
    use nom::Err;

    #[test]
    fn test_take_bytes_shortfall() {
        assert_eq!(
            take_bytes(&[1, 2], 3),
            Err(Err::Error(Error::TruncatedStream))
        );
    }

    #[test]
    fn test_take_str_invalid_utf8() {
        assert_eq!(
            take_str(&[0xff, 0xfe], 2),
            Err(Err::Error(Error::EncodingError))
        );
    }

    #[test]
    fn test_write_string_prefixes_length() {
        let mut out = vec![];
        write_string(&mut out, "hi").unwrap();
        assert_eq!(out, vec![0x00, 0x02, b'h', b'i']);
    }
}
