//! Codec spec parsing and reader construction.
//!
//! A spec is `atom ('/' atom)*`, where an atom is `name (':' arg)?` and the
//! first `:` splits the name from its verbatim argument. Composition is
//! outer-to-inner left-to-right: `gzip/csv` is gzip wrapping csv. The
//! historical spellings `csv-gzip` and `tar-gzip` are aliases for the
//! composite forms, and a trailing `multipart` atom groups the output of
//! the chain before it.

use crate::ack::{AckTracker, TerminalCallback};
use crate::format::{self, Decoder};
use crate::source::{CloseRead, SourceReader};
use crate::{ByteSource, CodecError, Reader, ReaderConfig};
use regex::bytes::Regex;

/// Parses and validates a codec spec, returning a reusable constructor.
/// Parsing is pure: no reads happen until the first `next` on a reader.
pub fn get_reader(spec: &str, config: ReaderConfig) -> Result<ReaderCtor, CodecError> {
    let plan = parse_spec(spec)?;
    Ok(ReaderCtor { config, plan })
}

/// A validated codec spec, bound to its reader configuration. One ctor
/// serves any number of input streams.
pub struct ReaderCtor {
    config: ReaderConfig,
    plan: Plan,
}

impl ReaderCtor {
    /// Builds a reader over `source`. The `path` is a hint used by the
    /// `auto` codec; other codecs ignore it. The terminal callback fires
    /// exactly once, after end-of-input and the final acknowledgement, or
    /// when the reader is closed early.
    pub fn new_reader(
        &self,
        path: &str,
        source: Box<dyn ByteSource>,
        terminal: TerminalCallback,
    ) -> Result<Reader, CodecError> {
        let chain = match &self.plan {
            Plan::Auto { multipart } => {
                let chain = resolve_auto(path, *multipart);
                tracing::debug!(
                    path,
                    gzip_layers = chain.gzip_layers,
                    codec = ?chain.terminal,
                    "resolved auto codec from path suffixes"
                );
                chain
            }
            Plan::Chain(chain) => chain.clone(),
        };

        let mut input: Box<dyn CloseRead> = Box::new(SourceReader::new(source));
        for _ in 0..chain.gzip_layers {
            input = format::gzip::decompress(input);
        }

        let max_scan = self.config.max_scan_size;
        // A multipart wrapper needs the empty fragments the plain readers
        // drop: they are its group terminators.
        let keep_empty = chain.multipart;
        let mut decoder: Box<dyn Decoder> = match chain.terminal {
            Atom::Lines => format::lines::new_lines_decoder(input, max_scan, keep_empty),
            Atom::Delim(delim) => {
                format::lines::new_delim_decoder(input, delim, max_scan, keep_empty)
            }
            Atom::Csv { delimiter } => format::character_separated::new_csv_decoder(input, delimiter),
            Atom::AllBytes => format::all_bytes::new_all_bytes_decoder(input),
            Atom::Chunker(size) => format::chunker::new_chunker_decoder(input, size),
            Atom::Tar => format::tar::new_tar_decoder(input),
            Atom::Regex(pattern) => format::regex::new_regex_decoder(input, pattern, max_scan),
        };
        if chain.multipart {
            decoder = format::multipart::new_multipart_decoder(decoder);
        }

        Ok(Reader::new(decoder, AckTracker::new(terminal)))
    }
}

#[derive(Debug, Clone)]
enum Plan {
    /// Resolved from the path at construction time.
    Auto { multipart: bool },
    Chain(Chain),
}

#[derive(Debug, Clone)]
struct Chain {
    gzip_layers: usize,
    terminal: Atom,
    multipart: bool,
}

#[derive(Debug, Clone)]
enum Atom {
    Lines,
    Csv { delimiter: u8 },
    AllBytes,
    Delim(Vec<u8>),
    Chunker(usize),
    Tar,
    Regex(Regex),
}

fn parse_spec(spec: &str) -> Result<Plan, CodecError> {
    let mut atoms: Vec<&str> = spec.split('/').collect();

    let multipart = atoms.len() > 1 && atoms.last() == Some(&"multipart");
    if multipart {
        atoms.pop();
    }

    // Every atom but the last must be a wrapping codec, which is to say gzip.
    let mut gzip_layers = 0;
    let last = atoms.pop().unwrap_or_default();
    for wrapper in atoms {
        match wrapper {
            "gzip" => gzip_layers += 1,
            "lines" | "csv" | "all-bytes" | "tar" | "auto" | "multipart" => {
                return Err(CodecError::InvalidArgument(format!(
                    "codec '{}' cannot wrap another codec",
                    wrapper
                )))
            }
            other => return Err(CodecError::UnknownCodec(other.to_string())),
        }
    }

    let (name, arg) = match last.split_once(':') {
        Some((name, arg)) => (name, Some(arg)),
        None => (last, None),
    };
    let terminal = match (name, arg) {
        ("lines", None) => Atom::Lines,
        ("csv", None) => Atom::Csv { delimiter: b',' },
        ("csv", Some(d)) => match d.as_bytes() {
            [delimiter] => Atom::Csv {
                delimiter: *delimiter,
            },
            _ => {
                return Err(CodecError::InvalidArgument(format!(
                    "csv delimiter must be a single byte, got '{}'",
                    d
                )))
            }
        },
        ("all-bytes", None) => Atom::AllBytes,
        ("delim", Some(sep)) if !sep.is_empty() => Atom::Delim(sep.as_bytes().to_vec()),
        ("delim", _) => {
            return Err(CodecError::InvalidArgument(
                "delim requires a non-empty separator".to_string(),
            ))
        }
        ("chunker", Some(n)) => match n.parse::<usize>() {
            Ok(size) if size > 0 => Atom::Chunker(size),
            _ => {
                return Err(CodecError::InvalidArgument(format!(
                    "chunker requires a positive chunk size, got '{}'",
                    n
                )))
            }
        },
        ("chunker", None) => {
            return Err(CodecError::InvalidArgument(
                "chunker requires a chunk size".to_string(),
            ))
        }
        ("tar", None) => Atom::Tar,
        ("regex", Some(pattern)) => match Regex::new(pattern) {
            Ok(pattern) => Atom::Regex(pattern),
            Err(err) => {
                return Err(CodecError::InvalidArgument(format!(
                    "invalid regex pattern: {}",
                    err
                )))
            }
        },
        ("regex", None) => {
            return Err(CodecError::InvalidArgument(
                "regex requires a pattern".to_string(),
            ))
        }
        // A bare gzip atom decompresses the whole stream into one message.
        ("gzip", None) => {
            gzip_layers += 1;
            Atom::AllBytes
        }
        ("auto", None) => {
            if gzip_layers > 0 {
                return Err(CodecError::InvalidArgument(
                    "auto cannot be wrapped; it composes its own layers".to_string(),
                ));
            }
            return Ok(Plan::Auto { multipart });
        }
        // Historical alias spellings of the gzip composites.
        ("csv-gzip", None) => {
            gzip_layers += 1;
            Atom::Csv { delimiter: b',' }
        }
        ("tar-gzip", None) => {
            gzip_layers += 1;
            Atom::Tar
        }
        ("multipart", None) => {
            return Err(CodecError::InvalidArgument(
                "multipart must follow another codec".to_string(),
            ))
        }
        (name, Some(_)) if is_known_name(name) => {
            return Err(CodecError::InvalidArgument(format!(
                "codec '{}' takes no argument",
                name
            )))
        }
        (name, _) => return Err(CodecError::UnknownCodec(name.to_string())),
    };

    Ok(Plan::Chain(Chain {
        gzip_layers,
        terminal,
        multipart,
    }))
}

fn is_known_name(name: &str) -> bool {
    matches!(
        name,
        "lines" | "all-bytes" | "tar" | "gzip" | "auto" | "csv-gzip" | "tar-gzip" | "multipart"
    )
}

/// Strips recognized suffixes from the path, right to left, to build the
/// codec chain: compression suffixes stack gzip layers, and the first
/// container suffix picks the terminal codec. Unrecognized suffixes fall
/// through to `lines`.
fn resolve_auto(path: &str, multipart: bool) -> Chain {
    let mut name = path;
    let mut gzip_layers = 0;
    let terminal = loop {
        if let Some(rest) = name
            .strip_suffix(".gz")
            .or_else(|| name.strip_suffix(".gzip"))
        {
            gzip_layers += 1;
            name = rest;
            continue;
        }
        if name.ends_with(".tgz") {
            gzip_layers += 1;
            break Atom::Tar;
        }
        if name.ends_with(".tar") {
            break Atom::Tar;
        }
        if name.ends_with(".csv") {
            break Atom::Csv { delimiter: b',' };
        }
        break Atom::Lines;
    };

    Chain {
        gzip_layers,
        terminal,
        multipart,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(spec: &str) -> Result<Plan, CodecError> {
        parse_spec(spec)
    }

    fn chain(spec: &str) -> Chain {
        match parse(spec).expect("expected a valid spec") {
            Plan::Chain(chain) => chain,
            Plan::Auto { .. } => panic!("expected a concrete chain"),
        }
    }

    #[test]
    fn plain_atoms_parse() {
        assert!(matches!(chain("lines").terminal, Atom::Lines));
        assert!(matches!(chain("all-bytes").terminal, Atom::AllBytes));
        assert!(matches!(chain("tar").terminal, Atom::Tar));
        assert!(matches!(
            chain("csv").terminal,
            Atom::Csv { delimiter: b',' }
        ));
        assert!(matches!(
            chain("csv:|").terminal,
            Atom::Csv { delimiter: b'|' }
        ));
        assert!(matches!(chain("chunker:16").terminal, Atom::Chunker(16)));
    }

    #[test]
    fn delim_takes_the_argument_verbatim() {
        // Everything after the first ':' belongs to the separator.
        match chain("delim:a:b").terminal {
            Atom::Delim(sep) => assert_eq!(b"a:b".to_vec(), sep),
            other => panic!("unexpected atom: {:?}", other),
        }
    }

    #[test]
    fn gzip_composition_and_aliases_agree() {
        for spec in ["gzip/csv", "csv-gzip"] {
            let chain = chain(spec);
            assert_eq!(1, chain.gzip_layers);
            assert!(matches!(chain.terminal, Atom::Csv { delimiter: b',' }));
        }
        for spec in ["gzip/tar", "tar-gzip"] {
            let chain = chain(spec);
            assert_eq!(1, chain.gzip_layers);
            assert!(matches!(chain.terminal, Atom::Tar));
        }
        assert_eq!(2, chain("gzip/gzip/lines").gzip_layers);
    }

    #[test]
    fn bare_gzip_is_all_bytes_over_gzip() {
        let chain = chain("gzip");
        assert_eq!(1, chain.gzip_layers);
        assert!(matches!(chain.terminal, Atom::AllBytes));
    }

    #[test]
    fn trailing_multipart_wraps_the_chain() {
        let chain = chain("lines/multipart");
        assert!(chain.multipart);
        assert!(matches!(chain.terminal, Atom::Lines));

        assert!(matches!(
            parse("multipart"),
            Err(CodecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        assert!(matches!(parse("bogus"), Err(CodecError::UnknownCodec(_))));
        assert!(matches!(
            parse("bogus/lines"),
            Err(CodecError::UnknownCodec(_))
        ));
        assert!(matches!(
            parse("lines/csv"),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("chunker:abc"),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("chunker:0"),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("csv:||"),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("lines:arg"),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse("regex:["),
            Err(CodecError::InvalidArgument(_))
        ));
    }

    #[test]
    fn auto_resolves_recognized_suffixes() {
        let cases: &[(&str, usize, &str)] = &[
            ("foo.csv", 0, "csv"),
            ("foo.tar", 0, "tar"),
            ("foo.tar.gz", 1, "tar"),
            ("foo.tar.gzip", 1, "tar"),
            ("foo.tgz", 1, "tar"),
            ("foo.csv.gz", 1, "csv"),
            ("foo.gz", 1, "lines"),
            ("foo.txt", 0, "lines"),
            ("foo", 0, "lines"),
            // Unknown compression suffixes fall through to lines.
            ("foo.bz2", 0, "lines"),
        ];
        for (path, layers, codec) in cases {
            let chain = resolve_auto(path, false);
            assert_eq!(*layers, chain.gzip_layers, "path {}", path);
            let name = match chain.terminal {
                Atom::Lines => "lines",
                Atom::Csv { .. } => "csv",
                Atom::Tar => "tar",
                other => panic!("unexpected atom for {}: {:?}", path, other),
            };
            assert_eq!(*codec, name, "path {}", path);
        }
    }
}
