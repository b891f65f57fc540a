use super::schema::{ArgShape, OpKey, ScriptSchema};
use super::{Arg, Instruction, Script};
use crate::error::{Error, Result};
use crate::format::text::TextCodec;

fn put_int(out: &mut Vec<u8>, v: i64, width: u8, signed: bool) -> Result<()> {
    let (min, max) = match (width, signed) {
        (1, false) => (0, u8::MAX as i64),
        (1, true) => (i8::MIN as i64, i8::MAX as i64),
        (2, false) => (0, u16::MAX as i64),
        (2, true) => (i16::MIN as i64, i16::MAX as i64),
        (4, false) => (0, u32::MAX as i64),
        (4, true) => (i32::MIN as i64, i32::MAX as i64),
        _ => return Err(Error::Schema(format!("unsupported integer width {}", width))),
    };
    if v < min || v > max {
        return Err(Error::Overflow {
            what: format!(
                "{}{} argument {}",
                if signed { 'i' } else { 'u' },
                width as u32 * 8,
                v
            ),
            needed: v.unsigned_abs() as usize,
            limit: max as usize,
        });
    }
    // two's complement truncation keeps both signed and unsigned values
    out.extend_from_slice(&v.to_le_bytes()[..width as usize]);
    Ok(())
}

fn parse_raw(hex: &str, len: usize) -> Result<Vec<u8>> {
    let bytes = hex.parse::<OpKey>().map(|k| k.0).or_else(|e| {
        if hex.trim().is_empty() {
            Ok(vec![])
        } else {
            Err(e)
        }
    })?;
    if bytes.len() != len {
        return Err(Error::Schema(format!(
            "raw argument {:?} has {} bytes, expected {}",
            hex,
            bytes.len(),
            len
        )));
    }
    Ok(bytes)
}

fn put_arg(out: &mut Vec<u8>, arg: &Arg, shape: &ArgShape, codec: &TextCodec) -> Result<()> {
    match (shape, arg) {
        (ArgShape::Int { width, signed }, Arg::Int(v)) => put_int(out, *v, *width, *signed),
        (ArgShape::Repeat { shape, count }, Arg::List(items)) => {
            if items.len() != *count {
                return Err(Error::Schema(format!(
                    "repeated argument has {} items, expected {}",
                    items.len(),
                    count
                )));
            }
            items
                .iter()
                .try_for_each(|item| put_arg(out, item, shape, codec))
        }
        (ArgShape::Raw { len }, Arg::Raw(hex)) => {
            out.extend_from_slice(&parse_raw(hex, *len)?);
            Ok(())
        }
        (ArgShape::Text, Arg::Text(field)) => {
            out.extend_from_slice(&codec.encode_field(field)?);
            Ok(())
        }
        (shape, arg) => Err(Error::Schema(format!(
            "argument {:?} does not match shape {}",
            arg, shape
        ))),
    }
}

/// Serialize one instruction, opcode key first.
pub fn assemble_instruction(
    out: &mut Vec<u8>,
    inst: &Instruction,
    schema: &ScriptSchema,
    codec: &TextCodec,
) -> Result<()> {
    let shapes = schema
        .opcodes
        .get(inst.op.as_bytes())
        .ok_or_else(|| Error::Schema(format!("unknown opcode {}", inst.op)))?;
    if shapes.len() != inst.args.len() {
        return Err(Error::Schema(format!(
            "opcode {} takes {} arguments, got {}",
            inst.op,
            shapes.len(),
            inst.args.len()
        )));
    }

    out.extend_from_slice(inst.op.as_bytes());
    for (arg, shape) in inst.args.iter().zip(shapes) {
        put_arg(out, arg, shape, codec)?;
    }
    Ok(())
}

/// Serialize a script and zero-pad it to its recorded size.
///
/// Scripts cannot grow: the output never exceeds `script.size`.
pub fn assemble(script: &Script, schema: &ScriptSchema, codec: &TextCodec) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(script.size);
    for (i, inst) in script.opcodes.iter().enumerate() {
        let at = out.len();
        assemble_instruction(&mut out, inst, schema, codec).map_err(|e| match e {
            Error::Schema(reason) => Error::Schema(format!("instruction {} (0x{:X}): {}", i, at, reason)),
            e => e,
        })?;
    }

    if out.len() > script.size {
        return Err(Error::Overflow {
            what: "assembled script".into(),
            needed: out.len(),
            limit: script.size,
        });
    }
    out.resize(script.size, 0);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::charset::{CharTable, CharTableBuilder};
    use crate::format::text::{TextField, Terminator};
    use crate::script::disassemble;
    use mozu_nls::{Decoder, Encoding};
    use pretty_assertions::assert_eq;

    fn table() -> CharTable {
        let mut builder = CharTableBuilder::new(Decoder::new(Encoding::ShiftJis));
        builder.feed("あいう").unwrap();
        builder.build().unwrap().table
    }

    #[test]
    fn reassembles_byte_identical() {
        let t = table();
        let codec = TextCodec::new(&t);
        let schema = ScriptSchema::builtin().unwrap();
        let bytes = [
            0x4A, 0, 236, 0x47, 2, 0x44, 1, 236, 0x44, 2, 236, 0x07, 9, 8, 7, 6, 0x00, 0x00,
        ];
        let script = disassemble(&bytes, &schema, &codec).unwrap();
        assert_eq!(assemble(&script, &schema, &codec).unwrap(), bytes.to_vec());
    }

    #[test]
    fn shorter_output_is_zero_padded() {
        let t = table();
        let codec = TextCodec::new(&t);
        let schema = ScriptSchema::builtin().unwrap();
        let bytes = [0x44, 0, 1, 2, 236, 0x1C];
        let mut script = disassemble(&bytes, &schema, &codec).unwrap();
        script.opcodes[0].text_mut().unwrap().text = "う".into();

        let out = assemble(&script, &schema, &codec).unwrap();
        assert_eq!(out, vec![0x44, 2, 236, 0x1C, 0, 0]);

        // padding disassembles as no-ops
        let again = disassemble(&out, &schema, &codec).unwrap();
        assert_eq!(again.opcodes.len(), 4);
    }

    #[test]
    fn longer_output_overflows() {
        let t = table();
        let codec = TextCodec::new(&t);
        let schema = ScriptSchema::builtin().unwrap();
        let script = Script {
            size: 3,
            opcodes: vec![Instruction {
                op: "44".parse().unwrap(),
                args: vec![Arg::Text(TextField::new("あいう", Terminator::End))],
            }],
        };
        let err = assemble(&script, &schema, &codec).unwrap_err();
        assert!(matches!(
            err,
            Error::Overflow {
                needed: 5,
                limit: 3,
                ..
            }
        ));
    }

    #[test]
    fn integer_range_is_checked() {
        let mut out = vec![];
        put_int(&mut out, -2, 2, true).unwrap();
        put_int(&mut out, 0xFFFF, 2, false).unwrap();
        assert_eq!(out, vec![0xFE, 0xFF, 0xFF, 0xFF]);
        assert!(put_int(&mut out, 256, 1, false).is_err());
        assert!(put_int(&mut out, -1, 4, false).is_err());
    }

    #[test]
    fn mismatched_arguments_are_rejected() {
        let t = table();
        let codec = TextCodec::new(&t);
        let schema = ScriptSchema::builtin().unwrap();
        let script = Script {
            size: 16,
            opcodes: vec![Instruction {
                op: "07".parse().unwrap(),
                args: vec![Arg::List(vec![Arg::Int(1), Arg::Int(2)])],
            }],
        };
        assert!(matches!(
            assemble(&script, &schema, &codec),
            Err(Error::Schema(_))
        ));
    }

    #[test]
    fn listing_json_shape() {
        let inst = Instruction {
            op: "1E 1D".parse().unwrap(),
            args: vec![
                Arg::Int(3),
                Arg::Text(TextField::new("あ", Terminator::HardBreak)),
                Arg::Raw("00 FF".into()),
                Arg::List(vec![Arg::Int(1)]),
            ],
        };
        let json = serde_json::to_string(&inst).unwrap();
        assert_eq!(
            json,
            r#"{"op":"1E 1D","args":[3,{"text":"あ","end":"/W"},"00 FF",[1]]}"#
        );
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inst);
    }
}
