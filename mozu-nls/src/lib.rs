//! Legacy code page handling.
//!
//! The engine stores every glyph as one 2-byte unit of a legacy code page
//! (Shift-JIS/CP932 for the retail game). This crate turns Rust strings into
//! such units and back, and refuses anything the code page cannot express.

use encoding_rs::{Encoding as RsEncoding, GBK, SHIFT_JIS};
use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    ShiftJis,
    Gbk,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GBK,
        }
    }
}

impl FromStr for Encoding {
    type Err = NlsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sjis" | "shift_jis" | "cp932" => Ok(Encoding::ShiftJis),
            "gbk" | "cp936" => Ok(Encoding::Gbk),
            _ => Err(NlsError::UnknownEncoding(s.to_string())),
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::ShiftJis => f.write_str("sjis"),
            Encoding::Gbk => f.write_str("gbk"),
        }
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum NlsError {
    #[error("unknown NLS: {0}")]
    UnknownEncoding(String),

    #[error("character {ch:?} (U+{code:04X}) is not representable in {encoding}")]
    Unmappable {
        ch: char,
        code: u32,
        encoding: Encoding,
    },

    #[error("{text:?} encodes to {len} bytes in {encoding}, which does not split into 2-byte units")]
    OddLength {
        text: String,
        len: usize,
        encoding: Encoding,
    },
}

/// A codec bound to one legacy encoding.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }

    /// Encode a string, failing on the first character the code page lacks.
    pub fn encode_strict<'a>(&self, s: &'a str) -> Result<Cow<'a, [u8]>, NlsError> {
        let (bytes, _, had_errors) = self.enc.as_encoding_rs().encode(s);
        if had_errors {
            let ch = s
                .chars()
                .find(|&c| !self.can_encode(c))
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Err(NlsError::Unmappable {
                ch,
                code: ch as u32,
                encoding: self.enc,
            });
        }
        Ok(bytes)
    }

    /// Encode a single glyph.
    pub fn encode_char(&self, c: char) -> Result<Vec<u8>, NlsError> {
        let mut buf = [0u8; 4];
        Ok(self.encode_strict(c.encode_utf8(&mut buf))?.into_owned())
    }

    pub fn can_encode(&self, c: char) -> bool {
        let mut buf = [0u8; 4];
        let (_, _, had_errors) = self.enc.as_encoding_rs().encode(c.encode_utf8(&mut buf));
        !had_errors
    }

    /// True when `c` is a well-formed double-byte character of the code page.
    pub fn is_double_byte(&self, c: char) -> bool {
        matches!(self.encode_char(c), Ok(bytes) if bytes.len() == 2)
    }

    /// Re-segment a string into the 2-byte units the engine stores.
    ///
    /// Single-byte characters pair up with their neighbour, so `"C1"` becomes
    /// the one unit `43 31`.
    pub fn units(&self, s: &str) -> Result<Vec<[u8; 2]>, NlsError> {
        let bytes = self.encode_strict(s)?;
        if bytes.len() % 2 != 0 {
            return Err(NlsError::OddLength {
                text: s.to_string(),
                len: bytes.len(),
                encoding: self.enc,
            });
        }

        Ok(bytes.chunks_exact(2).map(|pair| [pair[0], pair[1]]).collect())
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (cow, _) = self
            .enc
            .as_encoding_rs()
            .decode_without_bom_handling(bytes);
        cow
    }
}
