use serde::{Deserialize, Serialize};

use crate::text::TextEncoding;

/// Export options. Import reads everything it needs from the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Encoding used for every string payload in the document.
    pub encoding: TextEncoding,

    /// Write registry-designated types as parallel columns instead of one
    /// group per instance.
    pub columnar: bool,

    /// Write the sorted `cards_to_read` array.
    pub write_cards_to_read: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            encoding: TextEncoding::Utf8,
            columnar: true,
            write_cards_to_read: true,
        }
    }
}
