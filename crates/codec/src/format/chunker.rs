use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use tokio_util::sync::CancellationToken;

pub(crate) fn new_chunker_decoder(input: Box<dyn CloseRead>, size: usize) -> Box<dyn Decoder> {
    Box::new(ChunkerDecoder {
        input: Some(input),
        size,
        at_eof: false,
    })
}

/// Yields consecutive fixed-size chunks; the final chunk may be shorter.
struct ChunkerDecoder {
    input: Option<Box<dyn CloseRead>>,
    size: usize,
    at_eof: bool,
}

impl Decoder for ChunkerDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        // Cancellation is checked only here, at the call boundary: bailing
        // out mid-fill would lose bytes already consumed from the source.
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        if self.at_eof {
            return Ok(None);
        }
        let input = match self.input.as_mut() {
            Some(input) => input,
            None => return Ok(None),
        };

        let mut chunk = vec![0u8; self.size];
        let mut filled = 0;
        while filled < self.size {
            let n = input.read(&mut chunk[filled..])?;
            if n == 0 {
                self.at_eof = true;
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        chunk.truncate(filled);
        Ok(Some(Message::single(Part::new(chunk))))
    }

    fn close(&mut self) -> Result<(), CodecError> {
        if let Some(mut input) = self.input.take() {
            input.close()?;
        }
        Ok(())
    }
}
