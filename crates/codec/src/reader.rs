use crate::ack::AckTracker;
use crate::format::Decoder;
use crate::{Ack, CodecError, Message};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A stateful stream decoder produced by [`crate::ReaderCtor::new_reader`].
///
/// `next` yields messages in stream order, each paired with a one-shot
/// [`Ack`]; acknowledgements may then resolve in any order and from any
/// thread. After `next` first returns `Ok(None)` it always does. Dropping
/// the reader without closing it runs the close protocol.
pub struct Reader {
    decoder: Box<dyn Decoder>,
    tracker: Arc<AckTracker>,
    at_end: bool,
    closed: bool,
}

impl Reader {
    pub(crate) fn new(decoder: Box<dyn Decoder>, tracker: Arc<AckTracker>) -> Reader {
        Reader {
            decoder,
            tracker,
            at_end: false,
            closed: false,
        }
    }

    /// Decodes the next message. Returns `Ok(None)` at end-of-input, after
    /// which the terminal callback fires as soon as every acknowledgement
    /// has resolved. A decode error does not poison the reader, but the
    /// stream should be considered over: call [`Reader::close`].
    pub fn next(
        &mut self,
        cancel: &CancellationToken,
    ) -> Result<Option<(Message, Ack)>, CodecError> {
        if self.closed || self.at_end {
            return Ok(None);
        }
        match self.decoder.next(cancel)? {
            Some(message) => {
                let ack = self.tracker.register();
                Ok(Some((message, ack)))
            }
            None => {
                self.at_end = true;
                self.tracker.mark_end();
                Ok(None)
            }
        }
    }

    /// Closes the reader, releasing the source. Closing before end-of-input
    /// completes the stream with [`CodecError::ServiceShuttingDown`];
    /// closing afterwards leaves completion to the outstanding
    /// acknowledgements. Idempotent.
    pub fn close(&mut self) -> Result<(), CodecError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = self.decoder.close();
        self.tracker.shutdown();
        result
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        if !self.closed {
            if let Err(err) = self.close() {
                tracing::warn!(error = %err, "failed to close dropped reader");
            }
        }
    }
}
