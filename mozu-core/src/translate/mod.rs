//! Translation extraction and merge over disassembled scripts.

pub mod extract;
pub mod merge;
pub mod names;
pub mod plan;
pub mod unit;

use std::path::Path;

use crate::error::Result;
use crate::format::charset::{CharTableBuilder, GeneratedTable};
use crate::nls::Decoder;
use crate::script::Script;
use crate::util::collect_files;

pub use extract::extract;
pub use merge::merge;
pub use names::NameTable;
pub use plan::{plan_script, LinePlan, ScriptPlan};
pub use unit::{load_units, save_units, TranslationUnit};

/// A script and its path relative to the corpus root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceScript {
    pub label: String,
    pub script: Script,
}

/// Load every `*.json` listing under `root`, in container order.
pub fn load_corpus(root: impl AsRef<Path>) -> Result<Vec<SourceScript>> {
    let root = root.as_ref();
    collect_files(root, Some("json"))?
        .into_iter()
        .map(|rel| {
            let script = Script::load(root.join(&rel))?;
            Ok(SourceScript {
                label: rel.to_string_lossy().replace('\\', "/"),
                script,
            })
        })
        .collect()
}

/// Write scripts under `root`, mirroring their labels.
pub fn save_corpus(root: impl AsRef<Path>, scripts: &[SourceScript]) -> Result<()> {
    let root = root.as_ref();
    for source in scripts {
        source.script.save(root.join(&source.label))?;
        log::info!("wrote {}", source.label);
    }
    Ok(())
}

/// Generate a character table covering every speaker and message of `units`.
pub fn table_from_units(units: &[TranslationUnit], nls: Decoder) -> Result<GeneratedTable> {
    let mut builder = CharTableBuilder::new(nls);
    for (pos, unit) in units.iter().enumerate() {
        for text in unit.name.iter().chain(std::iter::once(&unit.message)) {
            builder.feed(text).inspect_err(|_| {
                log::error!("unit {} ({:?}) holds an unsupported glyph", pos, text);
            })?;
        }
    }
    log::info!(
        "{} distinct glyphs in {} units",
        builder.distinct(),
        units.len()
    );
    builder.build()
}
