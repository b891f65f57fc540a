use byteorder::{ByteOrder, LittleEndian};

use super::schema::{spaced_hex, ArgShape, OpKey, ScriptSchema};
use super::{Arg, Instruction, Script};
use crate::error::{Error, Result};
use crate::format::text::TextCodec;

fn take<'a>(bytes: &'a [u8], off: &mut usize, len: usize, what: &str) -> Result<&'a [u8]> {
    let end = *off + len;
    if end > bytes.len() {
        return Err(Error::framing(
            *off,
            format!(
                "unexpected EOF reading {} ({} bytes wanted, {} left)",
                what,
                len,
                bytes.len() - *off
            ),
        ));
    }
    let slice = &bytes[*off..end];
    *off = end;
    Ok(slice)
}

fn read_arg(bytes: &[u8], off: &mut usize, shape: &ArgShape, codec: &TextCodec) -> Result<Arg> {
    let arg = match shape {
        ArgShape::Int { width, signed } => {
            let b = take(bytes, off, *width as usize, "integer argument")?;
            let v = match (*width, *signed) {
                (1, false) => b[0] as i64,
                (1, true) => b[0] as i8 as i64,
                (2, false) => LittleEndian::read_u16(b) as i64,
                (2, true) => LittleEndian::read_i16(b) as i64,
                (4, false) => LittleEndian::read_u32(b) as i64,
                (4, true) => LittleEndian::read_i32(b) as i64,
                _ => return Err(Error::Schema(format!("unsupported integer width {}", width))),
            };
            Arg::Int(v)
        }
        ArgShape::Repeat { shape, count } => Arg::List(
            (0..*count)
                .map(|_| read_arg(bytes, off, shape, codec))
                .collect::<Result<Vec<_>>>()?,
        ),
        ArgShape::Raw { len } => Arg::Raw(spaced_hex(take(bytes, off, *len, "raw argument")?)),
        ArgShape::Text => Arg::Text(codec.decode(bytes, off)?),
    };
    Ok(arg)
}

/// Decode a whole script buffer into instructions.
///
/// The walk must end exactly at the end of the buffer; an unknown opcode or an
/// argument running past the end is a framing error.
pub fn disassemble(bytes: &[u8], schema: &ScriptSchema, codec: &TextCodec) -> Result<Script> {
    let mut off = 0;
    let mut opcodes = vec![];

    while off < bytes.len() {
        let start = off;
        let (key, shapes) = schema.opcodes.match_key(&bytes[off..]).ok_or_else(|| {
            Error::framing(start, format!("unknown opcode {:02X}", bytes[start]))
        })?;
        off += key.len();

        let args = shapes
            .iter()
            .map(|shape| read_arg(bytes, &mut off, shape, codec))
            .collect::<Result<Vec<_>>>()?;

        let inst = Instruction {
            op: OpKey(key.to_vec()),
            args,
        };
        log::debug!("0x{:06X}: {} {:?}", start, inst.op, inst.args);
        opcodes.push(inst);
    }

    Ok(Script {
        size: bytes.len(),
        opcodes,
    })
}
