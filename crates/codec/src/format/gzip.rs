//! Gzip decompression layer. `gzip/<inner>` interposes this between the
//! source and the inner decoder; a bare `gzip` atom decompresses the whole
//! stream into a single message.

use crate::source::CloseRead;
use flate2::read::GzDecoder;
use std::io::{self, Read};

pub(crate) fn decompress(input: Box<dyn CloseRead>) -> Box<dyn CloseRead> {
    Box::new(GzipLayer {
        decoder: GzDecoder::new(input),
    })
}

struct GzipLayer {
    decoder: GzDecoder<Box<dyn CloseRead>>,
}

impl Read for GzipLayer {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl CloseRead for GzipLayer {
    fn close(&mut self) -> io::Result<()> {
        self.decoder.get_mut().close()
    }
}

#[cfg(test)]
mod test {
    use super::super::testutil::test_input;
    use super::*;
    use flate2::write::GzEncoder;
    use std::io::Write;

    fn gzip(content: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn layer_decompresses_and_closes_through() {
        let mut layer = decompress(test_input(gzip(b"hello, world")));
        let mut out = Vec::new();
        layer.read_to_end(&mut out).unwrap();
        assert_eq!(b"hello, world", out.as_slice());
        layer.close().unwrap();
    }

    #[test]
    fn garbage_input_errors_on_read() {
        let mut layer = decompress(test_input("this is not gzip"));
        let mut out = Vec::new();
        assert!(layer.read_to_end(&mut out).is_err());
    }
}
