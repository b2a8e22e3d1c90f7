use super::Decoder;
use crate::{CodecError, Message, Part};
use tokio_util::sync::CancellationToken;

pub(crate) fn new_multipart_decoder(inner: Box<dyn Decoder>) -> Box<dyn Decoder> {
    Box::new(MultipartDecoder {
        inner,
        group: Vec::new(),
        at_eof: false,
    })
}

/// Groups consecutive messages from the inner decoder into one multi-part
/// message. An empty inner message (a blank line, under `lines`) terminates
/// the group; a final group without a terminator is still emitted at
/// end-of-input.
struct MultipartDecoder {
    inner: Box<dyn Decoder>,
    group: Vec<Part>,
    at_eof: bool,
}

impl Decoder for MultipartDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        loop {
            if self.at_eof {
                return Ok(None);
            }
            match self.inner.next(cancel)? {
                Some(message) if message.is_content_empty() => {
                    if !self.group.is_empty() {
                        return Ok(Some(Message::from_parts(std::mem::take(&mut self.group))));
                    }
                }
                Some(message) => self.group.extend(message.into_parts()),
                None => {
                    self.at_eof = true;
                    if !self.group.is_empty() {
                        return Ok(Some(Message::from_parts(std::mem::take(&mut self.group))));
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), CodecError> {
        self.inner.close()
    }
}

#[cfg(test)]
mod test {
    use super::super::lines::new_lines_decoder;
    use super::super::testutil::{collect_payloads, test_input};
    use super::*;

    fn groups(content: &str) -> Vec<Vec<Vec<u8>>> {
        let lines = new_lines_decoder(test_input(content), 1024, true);
        let mut decoder = new_multipart_decoder(lines);
        collect_payloads(decoder.as_mut())
    }

    #[test]
    fn blank_lines_separate_groups() {
        assert_eq!(
            vec![
                vec![b"foo".to_vec(), b"bar".to_vec(), b"baz".to_vec()],
                vec![b"buz".to_vec(), b"qux".to_vec(), b"quz".to_vec()],
            ],
            groups("foo\nbar\nbaz\n\nbuz\nqux\nquz\n"),
        );
    }

    #[test]
    fn final_group_without_terminator_is_emitted() {
        assert_eq!(
            vec![vec![b"a".to_vec()], vec![b"b".to_vec(), b"c".to_vec()]],
            groups("a\n\nb\nc"),
        );
    }

    #[test]
    fn consecutive_blank_lines_do_not_emit_empty_groups() {
        assert_eq!(
            vec![vec![b"a".to_vec()], vec![b"b".to_vec()]],
            groups("a\n\n\n\nb\n"),
        );
    }

    #[test]
    fn empty_input_yields_no_messages() {
        assert!(groups("").is_empty());
    }
}
