//! The traversal both extraction and merge are built on.
//!
//! Planning a script decides, once, which instruction each line unit belongs
//! to. Extraction reads the plans; merge writes through them. Neither walks the
//! instruction list with its own rules.

use super::names::NameTable;
use crate::error::{Error, Result};
use crate::format::charset::FULLWIDTH_SPACE;
use crate::format::text::TextField;
use crate::script::{Instruction, Roles, Script};

/// One translatable line of a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinePlan {
    /// The text instruction that closes the line and receives the translation.
    pub inst: usize,
    /// Soft-break instructions reflowed into this line, in order.
    pub fragments: Vec<usize>,
    pub message: String,
    pub speaker: Option<String>,
    pub is_select: bool,
    pub need_whitespace: bool,
}

impl LinePlan {
    #[inline]
    pub fn merged(&self) -> bool {
        !self.fragments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptPlan {
    pub lines: Vec<LinePlan>,
    /// Every soft-break text instruction. Merged output drops them.
    pub continuations: Vec<usize>,
    /// Name-set instructions and the raw name each carries.
    pub name_sets: Vec<(usize, String)>,
}

/// Plan one script, registering speaker names in `names`.
pub fn plan_script(script: &Script, roles: &Roles, names: &mut NameTable) -> Result<ScriptPlan> {
    let mut plan = ScriptPlan::default();
    let mut speaker: Option<String> = None;
    let mut pending_choices = 0usize;
    let mut pending_fragments: Vec<(usize, String)> = vec![];

    for (i, inst) in script.opcodes.iter().enumerate() {
        if inst.is(&roles.select) {
            if pending_choices > 0 {
                return Err(Error::Protocol(format!(
                    "instruction {}: selection count re-armed while {} choices are still pending",
                    i, pending_choices
                )));
            }
            let count = inst.int().ok_or_else(|| {
                Error::Protocol(format!("instruction {}: selection opcode without a count", i))
            })?;
            pending_choices = usize::try_from(count).map_err(|_| {
                Error::Protocol(format!("instruction {}: negative selection count {}", i, count))
            })?;
        } else if inst.is(&roles.name) {
            let raw = required_text(inst, i)?.text.clone();
            names.register(&raw);
            plan.name_sets.push((i, raw.clone()));
            speaker = Some(raw).filter(|s| !s.is_empty());
        } else if inst.is(&roles.text) {
            let field = required_text(inst, i)?;

            if field.end.is_merge() {
                if pending_choices > 0 {
                    return Err(Error::Protocol(format!(
                        "instruction {}: soft-break text while {} choices are pending",
                        i, pending_choices
                    )));
                }
                plan.continuations.push(i);
                pending_fragments.push((i, field.text.clone()));
                continue;
            }

            let mut message: String = pending_fragments.iter().map(|(_, t)| t.as_str()).collect();
            message.push_str(&field.text);
            // empty fragments are dropped on merge but do not make a line reflowed
            let fragments: Vec<usize> = pending_fragments
                .drain(..)
                .filter(|(_, t)| !t.is_empty())
                .map(|(idx, _)| idx)
                .collect();
            if !fragments.is_empty() && pending_choices > 0 {
                return Err(Error::Protocol(format!(
                    "instruction {}: reflowed line closes inside a selection of {} pending choices",
                    i, pending_choices
                )));
            }

            let is_select = pending_choices > 0;
            if is_select {
                pending_choices -= 1;
            }

            plan.lines.push(LinePlan {
                inst: i,
                fragments,
                need_whitespace: message.starts_with(FULLWIDTH_SPACE),
                message,
                speaker: speaker.clone(),
                is_select,
            });
        }
    }

    if !pending_fragments.is_empty() {
        let dropped: Vec<&str> = pending_fragments.iter().map(|(_, t)| t.as_str()).collect();
        log::warn!(
            "{} soft-break fragment(s) at the end of the script never close a line, dropped: {:?}",
            dropped.len(),
            dropped
        );
    }

    Ok(plan)
}

fn required_text(inst: &Instruction, i: usize) -> Result<&TextField> {
    inst.text().ok_or_else(|| {
        Error::Protocol(format!(
            "instruction {}: opcode {} carries no text argument",
            i, inst.op
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::text::Terminator;
    use crate::script::{Arg, ScriptSchema};
    use pretty_assertions::assert_eq;

    fn text(s: &str, end: Terminator) -> Instruction {
        Instruction {
            op: "44".parse().unwrap(),
            args: vec![Arg::Text(TextField::new(s, end))],
        }
    }

    fn name(s: &str) -> Instruction {
        Instruction {
            op: "4A".parse().unwrap(),
            args: vec![Arg::Text(TextField::new(s, Terminator::End))],
        }
    }

    fn select(n: i64) -> Instruction {
        Instruction {
            op: "47".parse().unwrap(),
            args: vec![Arg::Int(n)],
        }
    }

    fn plan(opcodes: Vec<Instruction>) -> Result<(ScriptPlan, NameTable)> {
        let schema = ScriptSchema::builtin().unwrap();
        let mut names = NameTable::new();
        let script = Script { size: 0, opcodes };
        let plan = plan_script(&script, &schema.roles, &mut names)?;
        Ok((plan, names))
    }

    #[test]
    fn soft_breaks_fold_into_the_next_line() {
        let (plan, _) = plan(vec![
            text("一行目", Terminator::SoftBreak),
            text("二行目", Terminator::End),
            text("単独", Terminator::HardBreak),
        ])
        .unwrap();

        assert_eq!(plan.continuations, vec![0]);
        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].message, "一行目二行目");
        assert_eq!(plan.lines[0].inst, 1);
        assert_eq!(plan.lines[0].fragments, vec![0]);
        assert!(plan.lines[0].merged());
        assert!(!plan.lines[1].merged());
    }

    #[test]
    fn speaker_and_choices_apply_to_following_lines() {
        let (plan, names) = plan(vec![
            name("甲"),
            text("　やあ", Terminator::End),
            select(2),
            text("はい", Terminator::End),
            text("いいえ", Terminator::End),
            name(""),
            text("地の文", Terminator::End),
        ])
        .unwrap();

        let speakers: Vec<_> = plan.lines.iter().map(|l| l.speaker.as_deref()).collect();
        assert_eq!(
            speakers,
            vec![Some("甲"), Some("甲"), Some("甲"), None]
        );
        let selects: Vec<_> = plan.lines.iter().map(|l| l.is_select).collect();
        assert_eq!(selects, vec![false, true, true, false]);
        assert!(plan.lines[0].need_whitespace);
        assert_eq!(names.iter().collect::<Vec<_>>(), vec!["甲", ""]);
        assert_eq!(plan.name_sets, vec![(0, "甲".to_string()), (5, String::new())]);
    }

    #[test]
    fn rearming_selection_is_a_protocol_violation() {
        let err = plan(vec![select(2), text("a", Terminator::End), select(1)]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn soft_break_inside_choices_is_a_protocol_violation() {
        let err = plan(vec![select(1), text("a", Terminator::SoftBreak)]).unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn selection_armed_between_fragment_and_line_is_rejected() {
        let err = plan(vec![
            text("前", Terminator::SoftBreak),
            select(1),
            text("後", Terminator::End),
        ])
        .unwrap_err();
        assert!(matches!(err, Error::Protocol(_)));
    }

    #[test]
    fn empty_fragment_does_not_mark_a_line_merged() {
        let (plan, _) = plan(vec![
            text("", Terminator::SoftBreak),
            select(1),
            text("はい", Terminator::End),
        ])
        .unwrap();
        assert_eq!(plan.continuations, vec![0]);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].message, "はい");
        assert!(!plan.lines[0].merged());
        assert!(plan.lines[0].is_select);
    }

    #[test]
    fn dangling_fragment_is_dropped() {
        let (plan, _) = plan(vec![
            text("a", Terminator::End),
            text("b", Terminator::SoftBreak),
        ])
        .unwrap();
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.continuations, vec![1]);
    }
}
