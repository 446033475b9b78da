//! Bounded output buffer used by the encoders
use std::io::{Error as IoError, ErrorKind, Result, Write};

/// Default cap on the size of an encoded stream
pub const DEFAULT_MAX_STREAM_LENGTH: usize = 16 * 1024 * 1024;

/// Inner error carried when the output cap is hit
#[derive(Debug)]
pub(crate) struct LimitExceeded {
    pub(crate) limit: usize,
}

impl core::fmt::Display for LimitExceeded {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "output exceeds {} bytes", self.limit)
    }
}

impl std::error::Error for LimitExceeded {}

/// A `Write` adapter that refuses to grow beyond a byte limit
///
/// Failure is reported as `ErrorKind::WriteZero` so the top-level encode
/// entry points can surface it as `EncodeError::StreamTooLarge`.
pub struct BoundedWriter<W: Write> {
    inner: W,
    written: usize,
    limit: usize,
}

impl<W: Write> BoundedWriter<W> {
    /// Wrap `inner`, refusing writes once `limit` total bytes are reached
    pub fn new(inner: W, limit: usize) -> Self {
        Self {
            inner,
            written: 0,
            limit,
        }
    }

    /// Unwrap the inner writer
    pub fn into_inner(self) -> W {
        self.inner
    }

    /// Bytes written so far
    pub fn written(&self) -> usize {
        self.written
    }
}

impl<W: Write> Write for BoundedWriter<W> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.written + buf.len() > self.limit {
            return Err(IoError::new(
                ErrorKind::WriteZero,
                LimitExceeded { limit: self.limit },
            ));
        }
        let n = self.inner.write(buf)?;
        self.written += n;
        Ok(n)
    }

    fn flush(&mut self) -> Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod bounded_writer_tests {
    use super::BoundedWriter;
    use std::io::Write;

    #[test]
    fn test_write_under_limit() {
        let mut w = BoundedWriter::new(Vec::new(), 4);
        w.write_all(&[1, 2, 3, 4]).unwrap();
        assert_eq!(w.into_inner(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_write_over_limit() {
        let mut w = BoundedWriter::new(Vec::new(), 4);
        w.write_all(&[1, 2, 3]).unwrap();
        assert!(w.write_all(&[4, 5]).is_err());
    }
}
