//! Common helpers for end-to-end tests of the codec framework.

// Functions in this file are shared across test binaries, which don't all
// use every helper.
#![allow(dead_code)]

use codec::{get_reader, Ack, BufferSource, CodecError, Message, Reader, ReaderConfig};
use flate2::write::GzEncoder;
use std::io::Write;
use std::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Terminal outcomes are delivered over a channel so tests can assert both
/// the value and the fire-exactly-once contract.
pub type TerminalRx = mpsc::Receiver<Option<CodecError>>;

pub fn new_reader(
    spec: &str,
    path: &str,
    content: impl Into<Vec<u8>>,
) -> (Reader, TerminalRx) {
    new_reader_with_config(spec, path, content, ReaderConfig::default())
}

pub fn new_reader_with_config(
    spec: &str,
    path: &str,
    content: impl Into<Vec<u8>>,
    config: ReaderConfig,
) -> (Reader, TerminalRx) {
    let (tx, rx) = mpsc::channel();
    let ctor = get_reader(spec, config).expect("failed to resolve codec spec");
    let reader = ctor
        .new_reader(
            path,
            Box::new(BufferSource::new(content)),
            Box::new(move |outcome| tx.send(outcome).expect("terminal receiver dropped")),
        )
        .expect("failed to construct reader");
    (reader, rx)
}

/// Reads messages until end-of-stream, returning each with its
/// unacknowledged Ack.
pub fn drain(reader: &mut Reader) -> Vec<(Message, Ack)> {
    let cancel = CancellationToken::new();
    let mut out = Vec::new();
    while let Some(yielded) = reader.next(&cancel).expect("next failed") {
        out.push(yielded);
    }
    // End-of-stream must be sticky.
    assert!(reader.next(&cancel).expect("next failed").is_none());
    out
}

/// Reads and positively acknowledges every message, returning payloads as
/// one `Vec<Vec<u8>>` per message.
pub fn decode_all(spec: &str, path: &str, content: impl Into<Vec<u8>>) -> Vec<Vec<Vec<u8>>> {
    let (mut reader, rx) = new_reader(spec, path, content);
    let mut out = Vec::new();
    let cancel = CancellationToken::new();
    while let Some((message, ack)) = reader.next(&cancel).expect("next failed") {
        out.push(payloads(&message));
        ack.ok().expect("ack failed");
    }
    reader.close().expect("close failed");
    expect_success(&rx);
    out
}

pub fn payloads(message: &Message) -> Vec<Vec<u8>> {
    message.parts().iter().map(|p| p.data().to_vec()).collect()
}

/// Flattens single-part messages into one string per message.
pub fn text_payloads(decoded: &[Vec<Vec<u8>>]) -> Vec<String> {
    decoded
        .iter()
        .map(|parts| {
            assert_eq!(1, parts.len(), "expected a single-part message");
            String::from_utf8(parts[0].clone()).expect("payload was not utf-8")
        })
        .collect()
}

pub fn expect_success(rx: &TerminalRx) {
    match rx.try_recv() {
        Ok(None) => {}
        Ok(Some(err)) => panic!("terminal fired with error: {}", err),
        Err(_) => panic!("terminal callback did not fire"),
    }
    assert!(rx.try_recv().is_err(), "terminal callback fired twice");
}

pub fn expect_shutdown(rx: &TerminalRx) {
    match rx.try_recv() {
        Ok(Some(CodecError::ServiceShuttingDown)) => {}
        Ok(other) => panic!("unexpected terminal outcome: {:?}", other),
        Err(_) => panic!("terminal callback did not fire"),
    }
    assert!(rx.try_recv().is_err(), "terminal callback fired twice");
}

pub fn expect_not_fired(rx: &TerminalRx) {
    assert!(rx.try_recv().is_err(), "terminal callback fired early");
}

pub fn gzip(content: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(content).expect("gzip write failed");
    encoder.finish().expect("gzip finish failed")
}

/// Builds a ustar archive of regular files from (name, content) pairs.
pub fn tar_archive(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, content) in entries {
        let mut header = tar::Header::new_ustar();
        header.set_path(name).expect("set_path failed");
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append(&header, content.as_bytes())
            .expect("append failed");
    }
    builder.into_inner().expect("finish failed")
}
