use std::collections::BTreeMap;

/// An opaque byte payload with an associated metadata bag.
///
/// Payloads are owned. Decoders copy out of their internal buffers at the
/// emission boundary, so a Part is never aliased by subsequent reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    data: Vec<u8>,
    metadata: BTreeMap<String, String>,
}

impl Part {
    pub fn new(data: impl Into<Vec<u8>>) -> Part {
        Part {
            data: data.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Part {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

/// An ordered, non-empty sequence of Parts emitted by a decoder.
///
/// Single-part codecs always yield length-1 messages. The multipart
/// combinator yields messages of one or more parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    parts: Vec<Part>,
}

impl Message {
    pub fn single(part: Part) -> Message {
        Message { parts: vec![part] }
    }

    pub fn from_parts(parts: Vec<Part>) -> Message {
        assert!(!parts.is_empty(), "a Message must have at least one Part");
        Message { parts }
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    /// True if every part carries a zero-length payload.
    pub(crate) fn is_content_empty(&self) -> bool {
        self.parts.iter().all(|p| p.data.is_empty())
    }
}
