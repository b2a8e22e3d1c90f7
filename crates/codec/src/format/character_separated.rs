//! Decoder for character-separated formats like csv.

use super::Decoder;
use crate::source::CloseRead;
use crate::{CodecError, Message, Part};
use csv::StringRecord;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

pub(crate) fn new_csv_decoder(input: Box<dyn CloseRead>, delimiter: u8) -> Box<dyn Decoder> {
    Box::new(CsvDecoder::new(input, delimiter))
}

/// Decodes csv records into single-part messages. The first record is the
/// header; each subsequent record becomes a JSON object payload mapping
/// header names, in header order, to that row's values. Values are emitted
/// as JSON strings with no type inference.
struct CsvDecoder {
    reader: Option<csv::Reader<Box<dyn CloseRead>>>,
    headers: Option<Vec<String>>,
    // Reused across records; payload bytes are copied out at emission.
    row: StringRecord,
}

impl CsvDecoder {
    fn new(input: Box<dyn CloseRead>, delimiter: u8) -> CsvDecoder {
        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .from_reader(input);
        CsvDecoder {
            reader: Some(reader),
            headers: None,
            row: StringRecord::new(),
        }
    }
}

impl Decoder for CsvDecoder {
    fn next(&mut self, cancel: &CancellationToken) -> Result<Option<Message>, CodecError> {
        if cancel.is_cancelled() {
            return Err(CodecError::Cancelled);
        }
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(None),
        };

        // The header row is read on the first call, not at construction:
        // the constructor must not touch the source.
        if self.headers.is_none() {
            let parsed: Vec<String> = reader.headers()?.into_iter().map(str::to_string).collect();
            tracing::debug!(columns = parsed.len(), "parsed csv header row");
            self.headers = Some(parsed);
        }
        if !reader.read_record(&mut self.row)? {
            return Ok(None);
        }
        let headers = self.headers.as_deref().unwrap_or_default();
        let mut record = serde_json::Map::with_capacity(headers.len());
        for (name, value) in headers.iter().zip(self.row.iter()) {
            record.insert(name.clone(), Value::String(value.to_string()));
        }
        let payload = serde_json::to_vec(&Value::Object(record))?;
        Ok(Some(Message::single(Part::new(payload))))
    }

    fn close(&mut self) -> Result<(), CodecError> {
        if let Some(reader) = self.reader.take() {
            reader.into_inner().close()?;
        }
        Ok(())
    }
}
