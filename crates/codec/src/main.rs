use anyhow::Context;
use clap::Parser;
use codec::{get_reader, ByteSource, CodecError, ReaderConfig, StreamSource, TerminalCallback};
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Applies a codec spec to a byte stream and writes the decoded parts to
/// stdout, one per line.
#[derive(Debug, Parser)]
#[command(name = "stream-codec")]
struct Args {
    /// The codec spec to apply, e.g. "lines", "csv:|", "gzip/tar", "auto".
    #[arg(long, default_value = "auto")]
    codec: String,

    /// Cap on the separator scan buffer, in bytes.
    #[arg(long)]
    max_scan_size: Option<usize>,

    /// The log verbosity, in env-filter syntax. Logs are written to stderr.
    #[arg(long, default_value = "warn")]
    log_level: String,

    /// The format for logs.
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    /// Input file. Reads stdin when omitted.
    path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum LogFormat {
    /// Plain text, one event per line.
    Text,
    /// Logs are written in jsonl format, which keeps the structure of
    /// fields for programmatic consumers.
    Json,
}

fn main() {
    let args = Args::parse();

    let builder = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(args.log_level.clone());
    match args.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }

    if let Err(err) = run(args) {
        tracing::error!(error = ?err, "decoding failed");
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let mut config = ReaderConfig::default();
    if let Some(max_scan_size) = args.max_scan_size {
        config.max_scan_size = max_scan_size;
    }
    let ctor = get_reader(&args.codec, config).context("resolving codec spec")?;

    let (path, source): (String, Box<dyn ByteSource>) = match &args.path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            (path.display().to_string(), Box::new(StreamSource::new(file)))
        }
        None => ("-".to_string(), Box::new(StreamSource::new(io::stdin()))),
    };

    // The terminal outcome is latched by the acknowledgement tracker and
    // surfaces after the decode loop completes.
    let outcome: Arc<Mutex<Option<CodecError>>> = Arc::new(Mutex::new(None));
    let latch = outcome.clone();
    let terminal: TerminalCallback = Box::new(move |err| {
        *latch.lock().unwrap() = err;
    });

    let mut reader = ctor
        .new_reader(&path, source, terminal)
        .context("constructing reader")?;
    let cancel = CancellationToken::new();

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let mut message_count = 0u64;
    while let Some((message, ack)) = reader.next(&cancel)? {
        for part in message.parts() {
            out.write_all(part.data())?;
            out.write_all(b"\n")?;
        }
        message_count += 1;
        // Output is flushed at exit; acknowledge as soon as it's written.
        let _ = ack.ok();
    }
    out.flush()?;
    reader.close()?;
    tracing::info!(message_count, path = %path, "finished decoding stream");

    let taken = outcome.lock().unwrap().take();
    match taken {
        None => Ok(()),
        Some(err) => Err(err.into()),
    }
}
