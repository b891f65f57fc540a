use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The instruction stream or a text field does not line up with the buffer.
    #[error("framing error at offset 0x{offset:X}: {reason}")]
    Framing { offset: usize, reason: String },

    #[error("overflow: {what} needs {needed}, limit is {limit}")]
    Overflow {
        what: String,
        needed: usize,
        limit: usize,
    },

    #[error("unknown glyph {glyph:?} ({unit}): {reason}")]
    UnknownGlyph {
        glyph: String,
        unit: String,
        reason: String,
    },

    #[error("protocol violation: {0}")]
    Protocol(String),

    #[error("consistency error: {what}: expected {expected}, got {actual}")]
    Consistency {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("invalid opcode schema: {0}")]
    Schema(String),

    #[error("invalid character table: {0}")]
    Table(String),

    #[error("invalid archive: {0}")]
    Container(String),

    #[error("invalid build configuration: {0}")]
    Config(String),

    #[error("{}: {source}", path.display())]
    InFile {
        path: PathBuf,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Encoding(#[from] mozu_nls::NlsError),
}

impl Error {
    pub fn framing(offset: usize, reason: impl Into<String>) -> Self {
        Error::Framing {
            offset,
            reason: reason.into(),
        }
    }

    /// Attach the file being processed to a diagnostic.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            e @ Error::InFile { .. } => e,
            e => Error::InFile {
                path: path.into(),
                source: Box::new(e),
            },
        }
    }

    /// The innermost error, skipping file context.
    pub fn root(&self) -> &Error {
        match self {
            Error::InFile { source, .. } => source.root(),
            e => e,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Render a 2-byte unit as spaced hex, e.g. `81 40`.
pub(crate) fn hex_unit(unit: [u8; 2]) -> String {
    format!("{:02X} {:02X}", unit[0], unit[1])
}
