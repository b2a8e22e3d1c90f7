use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use tokio_util::sync::CancellationToken;

pub(crate) fn new_all_bytes_decoder(input: Box<dyn CloseRead>) -> Box<dyn Decoder> {
    Box::new(AllBytesDecoder {
        input: Some(input),
        done: false,
    })
}

/// Reads the entire input into one single-part message. Empty input yields
/// no messages at all.
struct AllBytesDecoder {
    input: Option<Box<dyn CloseRead>>,
    done: bool,
}

impl Decoder for AllBytesDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        if self.done {
            return Ok(None);
        }
        self.done = true;

        let input = match self.input.as_mut() {
            Some(input) => input,
            None => return Ok(None),
        };
        let mut data = Vec::new();
        input.read_to_end(&mut data)?;
        if data.is_empty() {
            return Ok(None);
        }
        Ok(Some(Message::single(Part::new(data))))
    }

    fn close(&mut self) -> Result<(), CodecError> {
        if let Some(mut input) = self.input.take() {
            input.close()?;
        }
        Ok(())
    }
}
