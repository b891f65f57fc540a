//! Opcode schema: which byte keys exist and what arguments follow them.
//!
//! The schema is data. [`super::disasm`] and [`super::asm`] walk it
//! generically, and the translation engine only needs the three role keys.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Shape of one instruction argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ArgShape {
    /// Little-endian integer of 1, 2 or 4 bytes.
    Int { width: u8, signed: bool },
    Repeat { shape: Box<ArgShape>, count: usize },
    Raw { len: usize },
    /// A character-table encoded string closed by a terminator glyph.
    Text,
}

impl ArgShape {
    pub const U8: ArgShape = ArgShape::Int {
        width: 1,
        signed: false,
    };
    pub const U16: ArgShape = ArgShape::Int {
        width: 2,
        signed: false,
    };

    pub fn repeat(self, count: usize) -> Self {
        ArgShape::Repeat {
            shape: Box::new(self),
            count,
        }
    }
}

impl FromStr for ArgShape {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((inner, count)) = s.rsplit_once('*') {
            let count = count
                .trim()
                .parse()
                .map_err(|_| Error::Schema(format!("bad repeat count in {:?}", s)))?;
            return Ok(inner.parse::<ArgShape>()?.repeat(count));
        }
        if let Some(len) = s.strip_prefix("raw:") {
            let len = len
                .trim()
                .parse()
                .map_err(|_| Error::Schema(format!("bad raw length in {:?}", s)))?;
            return Ok(ArgShape::Raw { len });
        }

        let (width, signed) = match s {
            "text" => return Ok(ArgShape::Text),
            "u8" => (1, false),
            "u16" => (2, false),
            "u32" => (4, false),
            "i8" => (1, true),
            "i16" => (2, true),
            "i32" => (4, true),
            _ => return Err(Error::Schema(format!("unknown argument shape {:?}", s))),
        };
        Ok(ArgShape::Int { width, signed })
    }
}

impl TryFrom<String> for ArgShape {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<ArgShape> for String {
    fn from(shape: ArgShape) -> Self {
        shape.to_string()
    }
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgShape::Int { width, signed } => {
                write!(f, "{}{}", if *signed { 'i' } else { 'u' }, *width as u32 * 8)
            }
            ArgShape::Repeat { shape, count } => write!(f, "{}*{}", shape, count),
            ArgShape::Raw { len } => write!(f, "raw:{}", len),
            ArgShape::Text => f.write_str("text"),
        }
    }
}

/// An opcode key as it appears in the stream, one or more bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OpKey(pub Vec<u8>);

impl TryFrom<String> for OpKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<OpKey> for String {
    fn from(key: OpKey) -> Self {
        key.to_string()
    }
}

impl OpKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl FromStr for OpKey {
    type Err = Error;

    /// Spaced or unspaced hex, e.g. `"1E 1D"` or `"1E1D"`.
    fn from_str(s: &str) -> Result<Self> {
        let digits: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if digits.is_empty() || digits.len() % 2 != 0 {
            return Err(Error::Schema(format!("bad opcode key {:?}", s)));
        }
        (0..digits.len())
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&digits[i..i + 2], 16)
                    .map_err(|_| Error::Schema(format!("bad opcode key {:?}", s)))
            })
            .collect::<Result<Vec<u8>>>()
            .map(OpKey)
    }
}

impl fmt::Display for OpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&spaced_hex(&self.0))
    }
}

/// Upper-case hex with single spaces, the form used for keys and raw slices.
pub fn spaced_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Opcode keys to argument shapes, matched longest-first.
#[derive(Debug, Clone, Default)]
pub struct OpcodeTable {
    ops: HashMap<Vec<u8>, Vec<ArgShape>>,
    max_key_len: usize,
}

impl OpcodeTable {
    pub fn insert(&mut self, key: OpKey, shapes: Vec<ArgShape>) -> Result<()> {
        if key.0.is_empty() {
            return Err(Error::Schema("empty opcode key".into()));
        }
        self.max_key_len = self.max_key_len.max(key.0.len());
        if self.ops.insert(key.0.clone(), shapes).is_some() {
            return Err(Error::Schema(format!("duplicate opcode key {}", key)));
        }
        Ok(())
    }

    /// The longest known key that prefixes `bytes`.
    pub fn match_key<'a>(&'a self, bytes: &[u8]) -> Option<(&'a [u8], &'a [ArgShape])> {
        let max = self.max_key_len.min(bytes.len());
        (1..=max).rev().find_map(|len| {
            self.ops
                .get_key_value(&bytes[..len])
                .map(|(k, v)| (k.as_slice(), v.as_slice()))
        })
    }

    pub fn get(&self, key: &[u8]) -> Option<&[ArgShape]> {
        self.ops.get(key).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Opcodes the translation engine gives meaning to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roles {
    /// Dialogue and choice text.
    pub text: OpKey,
    /// Sets the current speaker.
    pub name: OpKey,
    /// Announces how many of the following text instructions are choices.
    pub select: OpKey,
}

#[derive(Debug, Clone)]
pub struct ScriptSchema {
    pub opcodes: OpcodeTable,
    pub roles: Roles,
}

#[derive(Deserialize)]
struct RolesFile {
    text: String,
    name: String,
    select: String,
}

#[derive(Deserialize)]
struct SchemaFile {
    roles: RolesFile,
    opcodes: BTreeMap<String, Vec<ArgShape>>,
}

impl ScriptSchema {
    pub fn new(opcodes: OpcodeTable, roles: Roles) -> Result<Self> {
        let schema = Self { opcodes, roles };
        schema.validate()?;
        Ok(schema)
    }

    /// The opcode table of the retail scripts.
    pub fn builtin() -> Result<Self> {
        super::opcodes::builtin_schema()
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(s).map_err(|e| Error::Schema(e.to_string()))?;

        let mut opcodes = OpcodeTable::default();
        for (key, shapes) in file.opcodes {
            opcodes.insert(key.parse()?, shapes)?;
        }
        let roles = Roles {
            text: file.roles.text.parse()?,
            name: file.roles.name.parse()?,
            select: file.roles.select.parse()?,
        };
        Self::new(opcodes, roles)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| Error::from(e).in_file(path))?;
        Self::from_toml(&s).map_err(|e| e.in_file(path))
    }

    /// The schema file at `path`, or the built-in table without one.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Self::builtin(),
        }
    }

    fn validate(&self) -> Result<()> {
        for (role, key) in [
            ("text", &self.roles.text),
            ("name", &self.roles.name),
        ] {
            match self.opcodes.get(key.as_bytes()) {
                Some([ArgShape::Text, ..]) => {}
                Some(_) => {
                    return Err(Error::Schema(format!(
                        "{} opcode {} must take a text argument first",
                        role, key
                    )))
                }
                None => {
                    return Err(Error::Schema(format!("{} opcode {} is not defined", role, key)))
                }
            }
        }
        match self.opcodes.get(self.roles.select.as_bytes()) {
            Some([ArgShape::Int { .. }, ..]) => Ok(()),
            Some(_) => Err(Error::Schema(format!(
                "select opcode {} must take an integer count first",
                self.roles.select
            ))),
            None => Err(Error::Schema(format!(
                "select opcode {} is not defined",
                self.roles.select
            ))),
        }
    }
}
