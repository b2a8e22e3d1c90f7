//! Decoders for the individual stream formats. Implementations live in the
//! various sub-modules; the registry wires them to a layered input.

pub(crate) mod all_bytes;
pub(crate) mod character_separated;
pub(crate) mod chunker;
pub(crate) mod gzip;
pub(crate) mod lines;
pub(crate) mod multipart;
pub(crate) mod regex;
pub(crate) mod tar;

use crate::{CodecError, Message};
use tokio_util::sync::CancellationToken;

/// Decoder is an object-safe trait for decoding a particular format into a
/// lazy sequence of messages.
///
/// `next` returns `Ok(None)` at end-of-input; the distinguished end-of-stream
/// condition is the return type, not an error. Decoders honor cancellation at
/// read boundaries: a cancelled call fails without consuming buffered data,
/// and a later call picks up where the last successful read left off.
pub(crate) trait Decoder: Send {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError>;

    /// Releases the decoder's input, closing the underlying source through
    /// any decompression layers. Idempotent.
    fn close(&mut self) -> Result<(), CodecError>;
}
