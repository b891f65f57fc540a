//! The engine's character table.
//!
//! The table is a flat blob of 2-byte code units. The first 256 units form the
//! direct region: a text byte `b` stands for `direct[b]`. The last 26 direct
//! slots are a fixed tail of control and ASCII-pair units, ending with the
//! extended escape `/R`. A text byte that maps to `/R` starts a 2-byte code
//! addressing the extended region, which follows the direct region in the blob.

use std::collections::{HashMap, HashSet};

use itertools::Itertools;
use mozu_nls::{Decoder, TextDecoder};

use crate::error::{Error, Result};

pub type Unit = [u8; 2];

pub const DIRECT_SLOTS: usize = 256;
pub const DIRECT_REGION_BYTES: usize = DIRECT_SLOTS * 2;

/// Ideographic space, the indentation glyph.
pub const FULLWIDTH_SPACE: char = '\u{3000}';

pub const END_UNIT: Unit = *b"/E";
pub const SOFT_BREAK_UNIT: Unit = *b"/C";
pub const HARD_BREAK_UNIT: Unit = *b"/W";
pub const ESCAPE_UNIT: Unit = *b"/R";

/// Marks an unused direct slot.
pub const PAD_UNIT: Unit = [0, 0];

/// ASCII-pair tail entries following the full-width space.
const TAIL_ASCII: [&[u8; 2]; 16] = [
    b"N0", b"N1", b"/S", b"/W", b"/C", b"/E", b"C0", b"C1", b"C2", b"C3", b"C4", b"C5", b"C6",
    b"C7", b"C8", b"C9",
];
pub const ESCAPE_SLOTS: usize = 9;
pub const TAIL_LEN: usize = 1 + TAIL_ASCII.len() + ESCAPE_SLOTS;

/// Direct slots available to frequency-ranked glyphs.
pub const FREE_DIRECT_SLOTS: usize = DIRECT_SLOTS - TAIL_LEN;

/// Each escape slot selects one 256-entry page of the extended region.
pub const EXTENDED_CAPACITY: usize = ESCAPE_SLOTS * 256;

/// The fixed tail in slot order, for the given code page.
pub fn tail_units(nls: &Decoder) -> Result<Vec<Unit>> {
    let space = nls.units(&FULLWIDTH_SPACE.to_string())?;
    let space = match space.as_slice() {
        [unit] => *unit,
        _ => {
            return Err(Error::Table(format!(
                "full-width space is not a single unit in {}",
                nls.encoding()
            )))
        }
    };

    let mut tail = Vec::with_capacity(TAIL_LEN);
    tail.push(space);
    tail.extend(TAIL_ASCII.iter().map(|u| **u));
    tail.extend(std::iter::repeat(ESCAPE_UNIT).take(ESCAPE_SLOTS));
    Ok(tail)
}

/// Units that never appear inside decoded text.
#[inline]
pub fn is_control(unit: Unit) -> bool {
    matches!(unit, END_UNIT | SOFT_BREAK_UNIT | HARD_BREAK_UNIT | ESCAPE_UNIT)
}

#[derive(Debug, Clone)]
pub struct CharTable {
    direct: Vec<Unit>,
    extended: Vec<Unit>,
    direct_codes: HashMap<Unit, u8>,
    extended_codes: HashMap<Unit, u16>,
    escape_slots: usize,
    nls: Decoder,
}

impl CharTable {
    pub fn new(direct: Vec<Unit>, extended: Vec<Unit>, nls: Decoder) -> Result<Self> {
        if direct.len() != DIRECT_SLOTS {
            return Err(Error::Table(format!(
                "direct region has {} slots, expected {}",
                direct.len(),
                DIRECT_SLOTS
            )));
        }

        // escape slots run down from 0xFF
        let escape_slots = direct
            .iter()
            .rev()
            .take_while(|u| **u == ESCAPE_UNIT)
            .count();
        if escape_slots == 0 && !extended.is_empty() {
            return Err(Error::Table(
                "extended region present but slot 0xFF is not the /R escape".into(),
            ));
        }
        let capacity = escape_slots * 256;
        if extended.len() > capacity {
            log::warn!(
                "extended region has {} glyphs but {} escape slots address only {}, the rest are unreachable",
                extended.len(),
                escape_slots,
                capacity
            );
        }

        for required in [END_UNIT, SOFT_BREAK_UNIT, HARD_BREAK_UNIT] {
            if !direct.contains(&required) {
                return Err(Error::Table(format!(
                    "direct region lacks the {} terminator",
                    String::from_utf8_lossy(&required)
                )));
            }
        }

        let mut direct_codes = HashMap::new();
        for (code, unit) in direct.iter().enumerate() {
            if *unit == PAD_UNIT {
                continue;
            }
            // first slot wins for repeated units such as /R
            direct_codes.entry(*unit).or_insert(code as u8);
        }

        let mut extended_codes = HashMap::new();
        for (idx, unit) in extended.iter().enumerate() {
            if *unit == PAD_UNIT {
                continue;
            }
            // a glyph with a direct slot is always encoded through it
            if idx >= capacity || direct_codes.contains_key(unit) {
                continue;
            }
            extended_codes.entry(*unit).or_insert(idx as u16);
        }

        Ok(Self {
            direct,
            extended,
            direct_codes,
            extended_codes,
            escape_slots,
            nls,
        })
    }

    /// Parse a table blob: 512 bytes of direct region, then the extended region.
    pub fn from_bytes(blob: &[u8], nls: Decoder) -> Result<Self> {
        if blob.len() < DIRECT_REGION_BYTES {
            return Err(Error::Table(format!(
                "blob is {} bytes, shorter than the {}-byte direct region",
                blob.len(),
                DIRECT_REGION_BYTES
            )));
        }
        if (blob.len() - DIRECT_REGION_BYTES) % 2 != 0 {
            return Err(Error::Table(format!(
                "extended region has odd length {}",
                blob.len() - DIRECT_REGION_BYTES
            )));
        }

        let mut units = blob.chunks_exact(2).map(|c| [c[0], c[1]]);
        let direct: Vec<Unit> = units.by_ref().take(DIRECT_SLOTS).collect();
        let extended: Vec<Unit> = units.collect();
        Self::new(direct, extended, nls)
    }

    pub fn load(path: impl AsRef<std::path::Path>, nls: Decoder) -> Result<Self> {
        let path = path.as_ref();
        let blob = std::fs::read(path).map_err(|e| Error::from(e).in_file(path))?;
        Self::from_bytes(&blob, nls).map_err(|e| e.in_file(path))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.direct
            .iter()
            .chain(self.extended.iter())
            .flat_map(|u| u.iter().copied())
            .collect()
    }

    #[inline]
    pub fn direct_unit(&self, code: u8) -> Unit {
        self.direct[code as usize]
    }

    #[inline]
    pub fn is_escape(&self, code: u8) -> bool {
        self.direct[code as usize] == ESCAPE_UNIT
    }

    /// Resolve an escaped pair to its extended-region unit.
    pub fn extended_unit(&self, high: u8, low: u8) -> Option<Unit> {
        let idx = (0xFF - high as usize) * 256 + low as usize;
        self.extended
            .get(idx)
            .copied()
            .filter(|u| *u != PAD_UNIT)
    }

    #[inline]
    pub fn direct_code(&self, unit: Unit) -> Option<u8> {
        self.direct_codes.get(&unit).copied()
    }

    /// The escaped `(high, low)` pair for an extended-region unit.
    pub fn extended_code(&self, unit: Unit) -> Option<(u8, u8)> {
        let idx = *self.extended_codes.get(&unit)? as usize;
        Some((0xFF - (idx / 256) as u8, (idx % 256) as u8))
    }

    pub fn extended_len(&self) -> usize {
        self.extended.len()
    }

    pub fn extended_capacity(&self) -> usize {
        self.escape_slots * 256
    }

    pub fn nls(&self) -> &Decoder {
        &self.nls
    }

    /// The text a unit stands for under the table's code page.
    pub fn glyph(&self, unit: Unit) -> String {
        self.nls.decode(&unit).into_owned()
    }
}

/// A freshly generated table and its serialized form.
#[derive(Debug, Clone)]
pub struct GeneratedTable {
    pub table: CharTable,
    pub blob: Vec<u8>,
    pub direct_used: usize,
    pub extended_used: usize,
}

impl GeneratedTable {
    #[inline]
    pub fn size(&self) -> usize {
        self.blob.len()
    }

    pub fn glyph_count(&self) -> usize {
        self.direct_used + self.extended_used
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    count: usize,
    first_seen: usize,
}

/// Frequency-ranked table generation from the text that will be embedded.
#[derive(Debug)]
pub struct CharTableBuilder {
    nls: Decoder,
    skip: HashSet<char>,
    tally: HashMap<char, Tally>,
    seen: usize,
}

impl CharTableBuilder {
    pub fn new(nls: Decoder) -> Self {
        Self {
            nls,
            skip: HashSet::from([FULLWIDTH_SPACE]),
            tally: HashMap::new(),
            seen: 0,
        }
    }

    /// Count every glyph of `text`.
    ///
    /// ASCII and the fixed tail are always present and are not counted. Any
    /// other character must be a double-byte unit of the code page.
    pub fn feed(&mut self, text: &str) -> Result<()> {
        for ch in text.chars() {
            if ch.is_ascii() || self.skip.contains(&ch) {
                continue;
            }
            if !self.nls.is_double_byte(ch) {
                return Err(Error::UnknownGlyph {
                    glyph: ch.to_string(),
                    unit: format!("U+{:04X}", ch as u32),
                    reason: format!(
                        "not a double-byte character of {}; the translation uses an unsupported glyph",
                        self.nls.encoding()
                    ),
                });
            }

            let seen = self.seen;
            self.tally
                .entry(ch)
                .or_insert(Tally {
                    count: 0,
                    first_seen: seen,
                })
                .count += 1;
            self.seen += 1;
        }
        Ok(())
    }

    pub fn distinct(&self) -> usize {
        self.tally.len()
    }

    pub fn build(self) -> Result<GeneratedTable> {
        let ranked: Vec<char> = self
            .tally
            .iter()
            .sorted_by(|(_, a), (_, b)| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.first_seen.cmp(&b.first_seen))
            })
            .map(|(ch, _)| *ch)
            .collect();

        let extended_used = ranked.len().saturating_sub(FREE_DIRECT_SLOTS);
        if extended_used > EXTENDED_CAPACITY {
            return Err(Error::Overflow {
                what: format!(
                    "extended region ({} distinct glyphs, reduce the inventory)",
                    ranked.len()
                ),
                needed: extended_used,
                limit: EXTENDED_CAPACITY,
            });
        }

        let mut units = Vec::with_capacity(ranked.len());
        for ch in &ranked {
            let bytes = self.nls.encode_char(*ch)?;
            units.push([bytes[0], bytes[1]]);
        }

        let direct_used = ranked.len() - extended_used;
        let mut direct: Vec<Unit> = units[..direct_used].to_vec();
        direct.resize(FREE_DIRECT_SLOTS, PAD_UNIT);
        direct.extend(tail_units(&self.nls)?);
        let extended = units[direct_used..].to_vec();

        let table = CharTable::new(direct, extended, self.nls)?;
        let blob = table.to_bytes();

        log::info!(
            "character table: {}/{} direct, {}/{} extended, {} glyphs, {} bytes",
            direct_used,
            FREE_DIRECT_SLOTS,
            extended_used,
            EXTENDED_CAPACITY,
            ranked.len(),
            blob.len()
        );

        Ok(GeneratedTable {
            table,
            blob,
            direct_used,
            extended_used,
        })
    }
}
