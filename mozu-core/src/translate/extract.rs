use super::names::NameTable;
use super::plan::plan_script;
use super::unit::TranslationUnit;
use super::SourceScript;
use crate::error::Result;
use crate::script::Roles;

/// Pull translation units out of a corpus.
///
/// Output order is the merge contract: one name unit per distinct speaker in
/// first-seen order, then each script's lines in script order.
pub fn extract(scripts: &[SourceScript], roles: &Roles) -> Result<Vec<TranslationUnit>> {
    let mut names = NameTable::new();
    let mut lines = vec![];

    for source in scripts {
        let plan = plan_script(&source.script, roles, &mut names)
            .map_err(|e| e.in_file(&source.label))?;

        for line in plan.lines {
            let index = lines.len();
            lines.push(TranslationUnit {
                merged: line.merged(),
                message: line.message,
                name: line.speaker,
                is_select: line.is_select,
                need_whitespace: line.need_whitespace,
                path: Some(source.label.clone()),
                index: Some(index),
                ..Default::default()
            });
        }
        log::debug!("{}: {} lines so far", source.label, lines.len());
    }

    let mut units: Vec<TranslationUnit> = names.iter().map(TranslationUnit::name).collect();
    log::info!(
        "extracted {} names and {} lines from {} scripts",
        units.len(),
        lines.len(),
        scripts.len()
    );
    units.append(&mut lines);
    Ok(units)
}
