//! Segments the input at lines matching a pattern: a matching line starts a
//! new message and carries every following line until the next match. Lines
//! ahead of the first match form the leading segment.

use super::lines::DelimDecoder;
use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use regex::bytes::Regex;
use tokio_util::sync::CancellationToken;

pub(crate) fn new_regex_decoder(
    input: Box<dyn CloseRead>,
    pattern: Regex,
    max_scan: usize,
) -> Box<dyn Decoder> {
    Box::new(RegexDecoder {
        lines: DelimDecoder::new(input, b"\n".to_vec(), max_scan),
        pattern,
        segment: Vec::new(),
        started: false,
        at_eof: false,
    })
}

struct RegexDecoder {
    lines: DelimDecoder,
    pattern: Regex,
    segment: Vec<u8>,
    started: bool,
    at_eof: bool,
}

impl Decoder for RegexDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        loop {
            if self.at_eof {
                return Ok(None);
            }
            match self.lines.next(cancel)? {
                Some(message) => {
                    let line = message.into_parts().remove(0).into_data();
                    if self.started && self.pattern.is_match(&line) {
                        let segment = std::mem::replace(&mut self.segment, line);
                        // A leading run of blank lines produces an empty
                        // segment; there is nothing to emit for it.
                        if segment.is_empty() {
                            continue;
                        }
                        return Ok(Some(Message::single(Part::new(segment))));
                    }
                    if self.started {
                        self.segment.push(b'\n');
                    }
                    self.segment.extend_from_slice(&line);
                    self.started = true;
                }
                None => {
                    self.at_eof = true;
                    if self.started && !self.segment.is_empty() {
                        let segment = std::mem::take(&mut self.segment);
                        return Ok(Some(Message::single(Part::new(segment))));
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), CodecError> {
        self.lines.close()
    }
}

#[cfg(test)]
mod test {
    use super::super::testutil::{collect_payloads, test_input};
    use super::*;

    fn segments(content: &str, pattern: &str) -> Vec<String> {
        let pattern = Regex::new(pattern).unwrap();
        let mut decoder = new_regex_decoder(test_input(content), pattern, 1024);
        collect_payloads(decoder.as_mut())
            .into_iter()
            .map(|parts| String::from_utf8(parts.into_iter().next().unwrap()).unwrap())
            .collect()
    }

    #[test]
    fn matching_lines_start_new_segments() {
        let log = "10:00:00 start\ndetail one\n10:00:05 next\ndetail two\ndetail three\n";
        assert_eq!(
            vec![
                "10:00:00 start\ndetail one",
                "10:00:05 next\ndetail two\ndetail three",
            ],
            segments(log, r"^\d\d:\d\d:\d\d"),
        );
    }

    #[test]
    fn lines_before_the_first_match_form_a_leading_segment() {
        assert_eq!(
            vec!["preamble", "MARK one\ntail"],
            segments("preamble\nMARK one\ntail", "^MARK"),
        );
    }

    #[test]
    fn unmatched_input_is_one_segment() {
        assert_eq!(vec!["a\nb\nc"], segments("a\nb\nc", "^NEVER"));
    }

    #[test]
    fn empty_input_yields_no_messages() {
        assert!(segments("", "^x").is_empty());
    }
}
