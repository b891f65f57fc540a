use std::fmt;

use mozu_nls::{NlsError, TextDecoder};
use serde::{Deserialize, Serialize};

use super::charset::{
    is_control, CharTable, Unit, END_UNIT, HARD_BREAK_UNIT, PAD_UNIT, SOFT_BREAK_UNIT,
};
use crate::error::{hex_unit, Error, Result};

/// The control glyph closing a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terminator {
    #[serde(rename = "/E")]
    End,
    /// Soft line break. The next text instruction continues this one.
    #[serde(rename = "/C")]
    SoftBreak,
    #[serde(rename = "/W")]
    HardBreak,
}

impl Terminator {
    pub fn unit(self) -> Unit {
        match self {
            Terminator::End => END_UNIT,
            Terminator::SoftBreak => SOFT_BREAK_UNIT,
            Terminator::HardBreak => HARD_BREAK_UNIT,
        }
    }

    pub fn from_unit(unit: Unit) -> Option<Self> {
        match unit {
            END_UNIT => Some(Terminator::End),
            SOFT_BREAK_UNIT => Some(Terminator::SoftBreak),
            HARD_BREAK_UNIT => Some(Terminator::HardBreak),
            _ => None,
        }
    }

    #[inline]
    pub fn is_merge(self) -> bool {
        self == Terminator::SoftBreak
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.unit()))
    }
}

/// A decoded text argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextField {
    pub text: String,
    pub end: Terminator,
}

impl TextField {
    pub fn new(text: impl Into<String>, end: Terminator) -> Self {
        Self {
            text: text.into(),
            end,
        }
    }
}

/// Text encoding through a character table.
#[derive(Debug, Clone, Copy)]
pub struct TextCodec<'t> {
    table: &'t CharTable,
}

impl<'t> TextCodec<'t> {
    pub fn new(table: &'t CharTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t CharTable {
        self.table
    }

    /// Decode one text field starting at `*off`, leaving `*off` past its terminator.
    pub fn decode(&self, bytes: &[u8], off: &mut usize) -> Result<TextField> {
        let start = *off;
        let mut raw = Vec::new();

        loop {
            let Some(&code) = bytes.get(*off) else {
                return Err(Error::framing(
                    start,
                    format!(
                        "text field runs off the end of the buffer ({} bytes) without a terminator",
                        bytes.len()
                    ),
                ));
            };

            if self.table.is_escape(code) {
                let Some(&low) = bytes.get(*off + 1) else {
                    return Err(Error::framing(*off, "escape byte at end of buffer"));
                };
                let unit = self.table.extended_unit(code, low).ok_or_else(|| {
                    Error::framing(
                        *off,
                        format!(
                            "escaped code {:02X} {:02X} is outside the extended region ({} glyphs, {} addressable)",
                            code,
                            low,
                            self.table.extended_len(),
                            self.table.extended_capacity()
                        ),
                    )
                })?;
                raw.extend_from_slice(&unit);
                *off += 2;
                continue;
            }

            let unit = self.table.direct_unit(code);
            *off += 1;
            if let Some(end) = Terminator::from_unit(unit) {
                let text = self.table.nls().decode(&raw).into_owned();
                return Ok(TextField { text, end });
            }
            if unit == PAD_UNIT {
                return Err(Error::framing(
                    *off - 1,
                    format!("byte {:02X} selects an unused table slot", code),
                ));
            }
            raw.extend_from_slice(&unit);
        }
    }

    /// Encode text without a terminator.
    pub fn encode(&self, text: &str) -> Result<Vec<u8>> {
        let units = self.table.nls().units(text).map_err(|e| match e {
            NlsError::Unmappable { ch, code, encoding } => Error::UnknownGlyph {
                glyph: ch.to_string(),
                unit: format!("U+{:04X}", code),
                reason: format!("not representable in {}", encoding),
            },
            e => Error::Encoding(e),
        })?;

        let mut out = Vec::with_capacity(units.len());
        for unit in units {
            if is_control(unit) {
                return Err(Error::UnknownGlyph {
                    glyph: self.table.glyph(unit),
                    unit: hex_unit(unit),
                    reason: format!("reserved control unit inside {:?}", text),
                });
            }
            if let Some(code) = self.table.direct_code(unit) {
                out.push(code);
            } else if let Some((high, low)) = self.table.extended_code(unit) {
                out.push(high);
                out.push(low);
            } else {
                return Err(Error::UnknownGlyph {
                    glyph: self.table.glyph(unit),
                    unit: hex_unit(unit),
                    reason: format!("missing from the character table while encoding {:?}", text),
                });
            }
        }
        Ok(out)
    }

    pub fn terminator_byte(&self, end: Terminator) -> Result<u8> {
        self.table
            .direct_code(end.unit())
            .ok_or_else(|| Error::Table(format!("no direct slot for the {} terminator", end)))
    }

    /// Encode a whole field, terminator included.
    pub fn encode_field(&self, field: &TextField) -> Result<Vec<u8>> {
        let mut out = self.encode(&field.text)?;
        out.push(self.terminator_byte(field.end)?);
        Ok(out)
    }
}
