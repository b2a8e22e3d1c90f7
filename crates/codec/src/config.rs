use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Configuration applied to every reader produced from a codec spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReaderConfig {
    /// Maximum number of bytes buffered while scanning for a separator.
    /// The `lines`, `delim`, and `regex` codecs fail with a malformed-input
    /// error if a separator is not found within this many bytes.
    #[serde(default = "default_max_scan_size")]
    pub max_scan_size: usize,
}

impl Default for ReaderConfig {
    fn default() -> ReaderConfig {
        ReaderConfig {
            max_scan_size: default_max_scan_size(),
        }
    }
}

fn default_max_scan_size() -> usize {
    // Matches the default scan token limit of the line-oriented readers
    // this framework replaces.
    64 * 1024
}
