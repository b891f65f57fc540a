//! Scenario script instruction streams.

pub mod asm;
pub mod disasm;
pub mod opcodes;
pub mod schema;

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::text::{TextCodec, TextField};
use crate::util::collect_files;
pub use asm::assemble;
pub use disasm::disassemble;
pub use schema::{ArgShape, OpKey, OpcodeTable, Roles, ScriptSchema};

/// One argument value. Serialized without tags: integers as numbers, text as
/// `{"text", "end"}`, raw slices as spaced hex, repeated fields as arrays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Arg {
    Int(i64),
    Text(TextField),
    Raw(String),
    List(Vec<Arg>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub op: OpKey,
    #[serde(default)]
    pub args: Vec<Arg>,
}

impl Instruction {
    #[inline]
    pub fn is(&self, key: &OpKey) -> bool {
        self.op == *key
    }

    /// The first text argument, if any.
    pub fn text(&self) -> Option<&TextField> {
        self.args.iter().find_map(|a| match a {
            Arg::Text(t) => Some(t),
            _ => None,
        })
    }

    pub fn text_mut(&mut self) -> Option<&mut TextField> {
        self.args.iter_mut().find_map(|a| match a {
            Arg::Text(t) => Some(t),
            _ => None,
        })
    }

    /// The first integer argument, if any.
    pub fn int(&self) -> Option<i64> {
        self.args.iter().find_map(|a| match a {
            Arg::Int(v) => Some(*v),
            _ => None,
        })
    }
}

/// A disassembled script file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    /// Byte length of the original file; assembly pads up to it.
    pub size: usize,
    pub opcodes: Vec<Instruction>,
}

impl Script {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::from(e).in_file(path))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::from(e).in_file(path))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path).map_err(|e| Error::from(e).in_file(path))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}

/// Disassemble every file under `input` into `<relative path>.json` under `output`.
pub fn disassemble_dir(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    schema: &ScriptSchema,
    codec: &TextCodec,
) -> Result<usize> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let files = collect_files(input, None)?;
    for rel in &files {
        let path = input.join(rel);
        let bytes = fs::read(&path).map_err(|e| Error::from(e).in_file(&path))?;
        let script = disassemble(&bytes, schema, codec).map_err(|e| e.in_file(&path))?;

        let mut out_name = rel.as_os_str().to_owned();
        out_name.push(".json");
        script.save(output.join(out_name))?;
        log::info!("{}: {} instructions", rel.display(), script.opcodes.len());
    }
    Ok(files.len())
}

/// Assemble every `*.json` listing under `input`, dropping the extension.
pub fn assemble_dir(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    schema: &ScriptSchema,
    codec: &TextCodec,
) -> Result<usize> {
    let (input, output) = (input.as_ref(), output.as_ref());
    let files = collect_files(input, Some("json"))?;
    for rel in &files {
        let path = input.join(rel);
        let script = Script::load(&path)?;
        let bytes = assemble(&script, schema, codec).map_err(|e| e.in_file(&path))?;

        let out_path = output.join(rel.with_extension(""));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&out_path, &bytes).map_err(|e| Error::from(e).in_file(&out_path))?;
        log::info!("{} ({} bytes)", out_path.display(), bytes.len());
    }
    Ok(files.len())
}
