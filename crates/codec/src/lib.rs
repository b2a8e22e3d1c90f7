mod ack;
mod config;
mod format;
mod message;
mod reader;
mod registry;
mod source;

pub use ack::{Ack, TerminalCallback};
pub use config::ReaderConfig;
pub use message::{Message, Part};
pub use reader::Reader;
pub use registry::{get_reader, ReaderCtor};
pub use source::{BufferSource, ByteSource, StreamSource};

/// Error type shared by codec construction, decoding, and acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("unknown codec: '{0}'")]
    UnknownCodec(String),

    #[error("invalid codec argument: {0}")]
    InvalidArgument(String),

    #[error("malformed input: {0}")]
    MalformedInput(String),

    #[error("failed to read stream: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse character-separated content: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to encode record: {0}")]
    Json(#[from] serde_json::Error),

    /// The reader was closed before its input was exhausted. Outstanding
    /// acknowledgements observe this error, as does the terminal callback.
    #[error("service shutting down")]
    ServiceShuttingDown,

    #[error("read cancelled")]
    Cancelled,

    /// A consumer-supplied rejection, passed through verbatim.
    #[error("message rejected: {0}")]
    Rejected(Box<dyn std::error::Error + Send + Sync>),
}
