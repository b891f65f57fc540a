//! Opcode table of the retail scenario scripts.

use super::schema::{ArgShape, OpKey, OpcodeTable, Roles, ScriptSchema};
use crate::error::Result;

pub const TEXT_OP: &str = "44";
pub const SELECT_OP: &str = "47";
pub const NAME_OP: &str = "4A";

/// A fixed routine that appears verbatim in the scripts; kept as one opaque key.
const ROUTINE_BLOCK: &str = "19 01 05 F8 07 20 11 01 17 18 00 00 32 27 00 01 33 06 34 27 49 00 3B 01 26 04 04 18 0B 00 3B 00 26 04 04 34 27 49 01 3B 01 26 04 04 18 17 00 3B 00 26 04 04 34 27 49 02 3B 01 26 04 04 18 23 00 3B 00 26 04 04 34 27 49 03 3B 01 26 04 04 18 2F 00 3B 00 26 04 04 34 27 49 04 3B 01 26 04 04 18 3B 00 3B 00 26 04 04 34 27 49 05 3B 01 26 04 04 18 47 00 3B 00 26 04 04 34 27 49 06 3B 01 26 04 04 18 53 00 3B 00 26 04 04 34 27 49 07 3B 01 26 04 04 18 5F 00 3B 00 26 04 04 34 27 49 08 3B 01 26 04 04 18 6B 00 3B 00 26 04 04 34 27 49 09 3B 01 26 04 04 18 77 00 3B 00 26 04 04 34 27 49 0A 3B 01 26 04 04 18 83 00 3B 00 26 04 04 34 27 49 0B 3B 01 26 04 04 18 8F 00 3B 00 26 04 04 34 27 49 0C 3B 01 26 04 04 18 9B 00 3B 00 26 04 04 34 27 49 0D 3B 01 26 04 04 18 AC 00 19 00 16 2C 01 3B 00 26 03 05 1C 00";

const OPCODES: &[(&str, &str)] = &[
    ("00", ""),
    ("05", "u16"),
    ("07", "u8*4"),
    ("08", "u8*4"),
    ("0B", "u8*2"),
    ("0F", "u8*4"),
    ("16", "u16"),
    (ROUTINE_BLOCK, ""),
    // jump to another script, by file index
    ("1A", "u16"),
    ("1C", ""),
    ("1E 1D", "u8"),
    ("20", "u8 u8"),
    ("22", ""),
    ("23", "u8*2"),
    ("24", "u8*3"),
    ("25 00 01 00", ""),
    ("27", "u16"),
    ("28", "u8*3"),
    ("2A", "u8"),
    // text colour
    ("2B", "u8*3"),
    ("2C", ""),
    ("2D 00 00 C8 00 02", ""),
    ("2E", "u8*4"),
    ("2F", "u8*2"),
    ("30", "u8*2"),
    ("31", "u8*2"),
    ("32", ""),
    ("33", "u8"),
    ("34", ""),
    ("3B", "u8*4"),
    ("3F", "u8"),
    ("40", "u8"),
    ("42", ""),
    ("43", ""),
    (TEXT_OP, "text"),
    (SELECT_OP, "u8"),
    ("48 03 FC 01 01 F4 01 01 FC 01 01 00 00 01", ""),
    ("49", "u8 u16"),
    (NAME_OP, "text"),
    ("4B", "u8"),
    ("4E", "u8"),
];

pub(crate) fn builtin_schema() -> Result<ScriptSchema> {
    let mut table = OpcodeTable::default();
    for (key, shapes) in OPCODES {
        let shapes = shapes
            .split_whitespace()
            .map(str::parse::<ArgShape>)
            .collect::<Result<Vec<_>>>()?;
        table.insert(key.parse()?, shapes)?;
    }

    let roles = Roles {
        text: TEXT_OP.parse::<OpKey>()?,
        name: NAME_OP.parse::<OpKey>()?,
        select: SELECT_OP.parse::<OpKey>()?,
    };
    ScriptSchema::new(table, roles)
}
