//! Framing on a literal separator. `lines` is the newline instance; `delim`
//! accepts an arbitrary (possibly multi-byte) separator.

use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use tokio_util::sync::CancellationToken;

const READ_CHUNK: usize = 8 * 1024;

/// `keep_empty` retains zero-length fragments, which the multipart
/// combinator consumes as group terminators. Plain readers drop them:
/// blank lines are framing, not payload.
pub(crate) fn new_lines_decoder(
    input: Box<dyn CloseRead>,
    max_scan: usize,
    keep_empty: bool,
) -> Box<dyn Decoder> {
    let decoder = DelimDecoder::new(input, b"\n".to_vec(), max_scan);
    Box::new(if keep_empty {
        decoder
    } else {
        decoder.drop_empty_fragments()
    })
}

pub(crate) fn new_delim_decoder(
    input: Box<dyn CloseRead>,
    delim: Vec<u8>,
    max_scan: usize,
    keep_empty: bool,
) -> Box<dyn Decoder> {
    let decoder = DelimDecoder::new(input, delim, max_scan);
    Box::new(if keep_empty {
        decoder
    } else {
        decoder.drop_empty_fragments()
    })
}

/// Splits the input at every occurrence of a literal separator. Fragments are
/// emitted without the separator, including a trailing fragment that lacks
/// one. Zero-length fragments are emitted too unless
/// [`DelimDecoder::drop_empty_fragments`] is set.
pub(crate) struct DelimDecoder {
    input: Option<Box<dyn CloseRead>>,
    delim: Vec<u8>,
    buf: Vec<u8>,
    max_scan: usize,
    skip_empty: bool,
    /// The underlying input is exhausted.
    at_eof: bool,
    /// The trailing fragment has been emitted.
    done: bool,
}

impl DelimDecoder {
    pub(crate) fn new(input: Box<dyn CloseRead>, delim: Vec<u8>, max_scan: usize) -> DelimDecoder {
        assert!(!delim.is_empty(), "separator must be non-empty");
        DelimDecoder {
            input: Some(input),
            delim,
            buf: Vec::new(),
            max_scan,
            skip_empty: false,
            at_eof: false,
            done: false,
        }
    }

    /// Drops zero-length fragments instead of emitting them. This is only a
    /// framing concern of the separator-split family: other decoders (tar,
    /// chunker) emit zero-length payloads as real messages.
    pub(crate) fn drop_empty_fragments(mut self) -> DelimDecoder {
        self.skip_empty = true;
        self
    }

    fn take_fragment(&mut self, end: usize) -> Message {
        let mut fragment: Vec<u8> = self.buf.drain(..end + self.delim.len()).collect();
        fragment.truncate(end);
        Message::single(Part::new(fragment))
    }
}

impl Decoder for DelimDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        loop {
            if cancel.is_cancelled() {
                return Err(CodecError::Cancelled);
            }
            if let Some(at) = memchr::memmem::find(&self.buf, &self.delim) {
                let fragment = self.take_fragment(at);
                if self.skip_empty && fragment.is_content_empty() {
                    continue;
                }
                return Ok(Some(fragment));
            }
            if self.at_eof {
                if self.done || self.buf.is_empty() {
                    self.done = true;
                    return Ok(None);
                }
                self.done = true;
                let fragment = std::mem::take(&mut self.buf);
                return Ok(Some(Message::single(Part::new(fragment))));
            }
            if self.buf.len() > self.max_scan {
                return Err(CodecError::MalformedInput(format!(
                    "no separator found within {} bytes",
                    self.max_scan
                )));
            }

            let input = match self.input.as_mut() {
                Some(input) => input,
                None => {
                    self.at_eof = true;
                    continue;
                }
            };
            let mut chunk = [0u8; READ_CHUNK];
            let n = input.read(&mut chunk)?;
            if n == 0 {
                self.at_eof = true;
            } else {
                self.buf.extend_from_slice(&chunk[..n]);
            }
        }
    }

    fn close(&mut self) -> Result<(), CodecError> {
        if let Some(mut input) = self.input.take() {
            input.close()?;
        }
        Ok(())
    }
}
