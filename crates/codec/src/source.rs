use std::io::{self, Read};

/// Abstraction over the opaque byte input handed to a reader.
///
/// A `read` blocks until at least one byte is available or end-of-input is
/// reached. The returned flag reports end-of-input, and may accompany a
/// non-zero byte count: a source is allowed to deliver its final bytes and
/// signal EOF in the same call, exactly like a POSIX read. Decoders must
/// surface every such byte before reporting end-of-stream.
pub trait ByteSource: Send {
    /// Reads into `buf`, returning the byte count and whether end-of-input
    /// was reached on this same call.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<(usize, bool)>;

    /// Releases the underlying input. Idempotent.
    fn close(&mut self) -> io::Result<()>;
}

/// A source over owned bytes. Reports end-of-input on the same read that
/// drains the final bytes, which exercises the data-with-EOF contract.
pub struct BufferSource {
    data: Vec<u8>,
    pos: usize,
}

impl BufferSource {
    pub fn new(data: impl Into<Vec<u8>>) -> BufferSource {
        BufferSource {
            data: data.into(),
            pos: 0,
        }
    }
}

impl ByteSource for BufferSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<(usize, bool)> {
        let remain = &self.data[self.pos..];
        let n = remain.len().min(buf.len());
        buf[..n].copy_from_slice(&remain[..n]);
        self.pos += n;
        Ok((n, self.pos == self.data.len()))
    }

    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A source over any `io::Read`, such as a file or stdin. End-of-input
/// surfaces as a separate zero-byte read, per the `Read` contract.
pub struct StreamSource<R> {
    inner: Option<R>,
}

impl<R: Read + Send> StreamSource<R> {
    pub fn new(inner: R) -> StreamSource<R> {
        StreamSource { inner: Some(inner) }
    }
}

impl<R: Read + Send> ByteSource for StreamSource<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<(usize, bool)> {
        match self.inner.as_mut() {
            Some(r) => {
                let n = r.read(buf)?;
                Ok((n, n == 0))
            }
            None => Ok((0, true)),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        if self.inner.take().is_some() {
            tracing::debug!("closed stream source");
        }
        Ok(())
    }
}

/// Internal bridge from a ByteSource to `io::Read`, used by decoders built
/// on `csv`, `flate2`, and `tar`. A data-with-EOF read is folded into an
/// ordinary read now and a zero-byte read later, so no byte is lost.
pub(crate) trait CloseRead: Read + Send {
    fn close(&mut self) -> io::Result<()>;
}

pub(crate) struct SourceReader {
    source: Box<dyn ByteSource>,
    at_eof: bool,
}

impl SourceReader {
    pub(crate) fn new(source: Box<dyn ByteSource>) -> SourceReader {
        SourceReader {
            source,
            at_eof: false,
        }
    }
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.at_eof || buf.is_empty() {
            return Ok(0);
        }
        let (n, eof) = self.source.read(buf)?;
        if eof {
            self.at_eof = true;
        }
        Ok(n)
    }
}

impl CloseRead for SourceReader {
    fn close(&mut self) -> io::Result<()> {
        self.source.close()
    }
}
