//! Streaming decoder for POSIX tar archives.
//!
//! The archive is walked block by block: headers are interpreted with
//! `tar::Header`, regular-file bodies become messages, and everything else
//! is skipped. Framing the blocks here (rather than through the crate's
//! `Entries` iterator, which borrows its archive) keeps decoding lazy
//! across `next` calls.

use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use tokio_util::sync::CancellationToken;

const BLOCK: usize = 512;

pub(crate) fn new_tar_decoder(input: Box<dyn CloseRead>) -> Box<dyn Decoder> {
    Box::new(TarDecoder {
        input: Some(input),
        finished: false,
    })
}

struct TarDecoder {
    input: Option<Box<dyn CloseRead>>,
    finished: bool,
}

impl Decoder for TarDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        loop {
            if cancel.is_cancelled() {
                return Err(CodecError::Cancelled);
            }
            if self.finished {
                return Ok(None);
            }
            let input = match self.input.as_mut() {
                Some(input) => input,
                None => return Ok(None),
            };

            let mut block = [0u8; BLOCK];
            match read_block(input, &mut block)? {
                BlockRead::Eof => {
                    // Archives may end without the zero-block terminator.
                    self.finished = true;
                    return Ok(None);
                }
                BlockRead::Full => {}
            }
            if block.iter().all(|b| *b == 0) {
                self.finished = true;
                return Ok(None);
            }

            let header = tar::Header::from_byte_slice(&block);
            let size = header.entry_size().map_err(|err| {
                CodecError::MalformedInput(format!("invalid tar header: {}", err))
            })? as usize;
            let padding = (BLOCK - size % BLOCK) % BLOCK;

            if !header.entry_type().is_file() {
                discard(input, size + padding)?;
                continue;
            }

            let mut body = vec![0u8; size];
            read_body(input, &mut body)?;
            discard(input, padding)?;

            let mut part = Part::new(body).with_metadata("tar_size", size.to_string());
            if let Ok(path) = header.path() {
                part = part.with_metadata("tar_name", path.to_string_lossy());
            }
            if let Ok(mode) = header.mode() {
                part = part.with_metadata("tar_mode", format!("{:o}", mode));
            }
            return Ok(Some(Message::single(part)));
        }
    }

    fn close(&mut self) -> Result<(), CodecError> {
        if let Some(mut input) = self.input.take() {
            input.close()?;
        }
        Ok(())
    }
}

enum BlockRead {
    Full,
    Eof,
}

/// Reads exactly one 512-byte block, or reports clean EOF at a block
/// boundary. A partial block is malformed.
fn read_block(input: &mut Box<dyn CloseRead>, block: &mut [u8; BLOCK]) -> Result<BlockRead, CodecError> {
    let mut filled = 0;
    while filled < BLOCK {
        let n = input.read(&mut block[filled..])?;
        if n == 0 {
            if filled == 0 {
                return Ok(BlockRead::Eof);
            }
            return Err(CodecError::MalformedInput(
                "truncated tar header block".to_string(),
            ));
        }
        filled += n;
    }
    Ok(BlockRead::Full)
}

fn read_body(input: &mut Box<dyn CloseRead>, body: &mut [u8]) -> Result<(), CodecError> {
    let mut filled = 0;
    while filled < body.len() {
        let n = input.read(&mut body[filled..])?;
        if n == 0 {
            return Err(CodecError::MalformedInput(
                "truncated tar entry body".to_string(),
            ));
        }
        filled += n;
    }
    Ok(())
}

fn discard(input: &mut Box<dyn CloseRead>, mut remaining: usize) -> Result<(), CodecError> {
    let mut scratch = [0u8; BLOCK];
    while remaining > 0 {
        let want = remaining.min(BLOCK);
        let n = input.read(&mut scratch[..want])?;
        if n == 0 {
            return Err(CodecError::MalformedInput(
                "truncated tar entry padding".to_string(),
            ));
        }
        remaining -= n;
    }
    Ok(())
}
