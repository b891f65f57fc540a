use std::collections::{HashMap, HashSet};

use super::names::NameTable;
use super::plan::{plan_script, ScriptPlan};
use super::unit::TranslationUnit;
use super::SourceScript;
use crate::error::{Error, Result};
use crate::format::charset::FULLWIDTH_SPACE;
use crate::script::Roles;

/// Leading name units, keyed by raw name.
fn take_names(units: &[TranslationUnit]) -> Result<(HashMap<&str, &str>, usize)> {
    let mut map = HashMap::new();
    let mut consumed = 0;
    for (pos, unit) in units.iter().enumerate().take_while(|(_, u)| u.is_name) {
        let raw = unit.raw_name.as_deref().ok_or_else(|| {
            Error::Protocol(format!("name unit {} has no raw_name", pos))
        })?;
        map.insert(raw, unit.message.as_str());
        consumed += 1;
    }
    Ok((map, consumed))
}

fn translated_message(unit: &TranslationUnit) -> String {
    if unit.need_whitespace && !unit.message.starts_with(FULLWIDTH_SPACE) {
        format!("{}{}", FULLWIDTH_SPACE, unit.message)
    } else {
        unit.message.clone()
    }
}

/// Splice translated units back into the scripts they were extracted from.
///
/// `units` must be the extraction output with messages replaced: the same
/// count in the same order. Soft-break instructions are removed from the
/// output, and each line's closing instruction receives the whole translation.
pub fn merge(
    scripts: &[SourceScript],
    units: &[TranslationUnit],
    roles: &Roles,
) -> Result<Vec<SourceScript>> {
    let (names, name_count) = take_names(units)?;

    let mut table = NameTable::new();
    let plans = scripts
        .iter()
        .map(|s| plan_script(&s.script, roles, &mut table).map_err(|e| e.in_file(&s.label)))
        .collect::<Result<Vec<ScriptPlan>>>()?;

    let line_count: usize = plans.iter().map(|p| p.lines.len()).sum();
    if name_count + line_count != units.len() {
        return Err(Error::Consistency {
            what: format!(
                "translated units ({} names + {} lines expected)",
                name_count, line_count
            ),
            expected: name_count + line_count,
            actual: units.len(),
        });
    }

    let mut cursor = units[name_count..].iter();
    let mut position = 0usize;
    let mut out = Vec::with_capacity(scripts.len());

    for (source, plan) in scripts.iter().zip(&plans) {
        let mut script = source.script.clone();

        for line in &plan.lines {
            let unit = cursor.next().ok_or_else(|| Error::Consistency {
                what: "translated lines".into(),
                expected: line_count,
                actual: position,
            })?;

            if unit.is_name {
                return Err(Error::Protocol(format!(
                    "unit {} is a name unit but fills line {} of {}",
                    name_count + position,
                    position,
                    source.label
                )));
            }
            if let Some(index) = unit.index {
                if index != position {
                    return Err(Error::Consistency {
                        what: format!("index of the unit filling a line in {}", source.label),
                        expected: position,
                        actual: index,
                    });
                }
            }
            if let Some(path) = &unit.path {
                if *path != source.label {
                    return Err(Error::Protocol(format!(
                        "unit {} was extracted from {} but fills a line in {}",
                        name_count + position,
                        path,
                        source.label
                    )));
                }
            }

            let field = script.opcodes[line.inst]
                .text_mut()
                .ok_or_else(|| Error::Protocol(format!("instruction {} lost its text", line.inst)))
                .map_err(|e| e.in_file(&source.label))?;
            field.text = translated_message(unit);
            position += 1;
        }

        for (inst, raw) in &plan.name_sets {
            let translated = names.get(raw.as_str()).ok_or_else(|| {
                Error::Protocol(format!("no translation for speaker name {:?}", raw))
                    .in_file(&source.label)
            })?;
            if let Some(field) = script.opcodes[*inst].text_mut() {
                field.text = translated.to_string();
            }
        }

        let drop: HashSet<usize> = plan.continuations.iter().copied().collect();
        script.opcodes = script
            .opcodes
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !drop.contains(i))
            .map(|(_, inst)| inst)
            .collect();

        log::info!(
            "merged {} ({} lines, {} reflowed fragments removed)",
            source.label,
            plan.lines.len(),
            drop.len()
        );
        out.push(SourceScript {
            label: source.label.clone(),
            script,
        });
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::text::{TextField, Terminator};
    use crate::script::{Arg, Instruction, Script, ScriptSchema};
    use crate::translate::extract;
    use pretty_assertions::assert_eq;

    fn inst(op: &str, s: &str, end: Terminator) -> Instruction {
        Instruction {
            op: op.parse().unwrap(),
            args: vec![Arg::Text(TextField::new(s, end))],
        }
    }

    fn corpus() -> Vec<SourceScript> {
        vec![SourceScript {
            label: "ev.json".into(),
            script: Script {
                size: 64,
                opcodes: vec![
                    inst("4A", "甲", Terminator::End),
                    inst("44", "　前半", Terminator::SoftBreak),
                    inst("44", "後半", Terminator::End),
                    Instruction {
                        op: "1C".parse().unwrap(),
                        args: vec![],
                    },
                    inst("44", "終わり", Terminator::HardBreak),
                ],
            },
        }]
    }

    fn translate(units: &mut [TranslationUnit]) {
        for u in units.iter_mut() {
            u.message = match u.message.as_str() {
                "甲" => "Kou".into(),
                "　前半後半" => "Both halves".into(),
                "終わり" => "The end".into(),
                other => other.to_string(),
            };
        }
    }

    #[test]
    fn merge_rewrites_lines_names_and_drops_continuations() {
        let roles = ScriptSchema::builtin().unwrap().roles;
        let scripts = corpus();
        let mut units = extract(&scripts, &roles).unwrap();
        assert_eq!(units.len(), 3);
        translate(&mut units);

        let merged = merge(&scripts, &units, &roles).unwrap();
        let ops = &merged[0].script.opcodes;
        assert_eq!(ops.len(), 4);
        assert_eq!(ops[0].text().unwrap().text, "Kou");
        // leading indent restored
        assert_eq!(
            ops[1].text().unwrap(),
            &TextField::new("　Both halves", Terminator::End)
        );
        assert_eq!(ops[2].op.to_string(), "1C");
        assert_eq!(
            ops[3].text().unwrap(),
            &TextField::new("The end", Terminator::HardBreak)
        );
        assert_eq!(merged[0].script.size, 64);
    }

    #[test]
    fn count_mismatch_is_reported_with_both_counts() {
        let roles = ScriptSchema::builtin().unwrap().roles;
        let scripts = corpus();
        let mut units = extract(&scripts, &roles).unwrap();

        let mut more = units.clone();
        more.push(TranslationUnit {
            message: "余り".into(),
            ..Default::default()
        });
        let err = merge(&scripts, &more, &roles).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency {
                expected: 3,
                actual: 4,
                ..
            }
        ));

        units.pop();
        let err = merge(&scripts, &units, &roles).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency {
                expected: 3,
                actual: 2,
                ..
            }
        ));
    }

    #[test]
    fn missing_name_is_a_protocol_error() {
        let roles = ScriptSchema::builtin().unwrap().roles;
        let scripts = corpus();
        let units: Vec<TranslationUnit> = extract(&scripts, &roles)
            .unwrap()
            .into_iter()
            .map(|mut u| {
                if u.is_name {
                    u.raw_name = Some("乙".into());
                }
                u
            })
            .collect();
        let err = merge(&scripts, &units, &roles).unwrap_err();
        assert!(matches!(err.root(), Error::Protocol(_)));
    }

    #[test]
    fn misordered_units_are_caught() {
        let roles = ScriptSchema::builtin().unwrap().roles;
        let scripts = corpus();
        let mut units = extract(&scripts, &roles).unwrap();
        units.swap(1, 2);
        let err = merge(&scripts, &units, &roles).unwrap_err();
        assert!(matches!(
            err,
            Error::Consistency {
                expected: 0,
                actual: 1,
                ..
            }
        ));
    }
}
