use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

fn is_false(v: &bool) -> bool {
    !*v
}

/// One translatable string with the context a translator needs.
///
/// A unit list is positional: units are matched back to scripts by order,
/// names first, then lines in traversal order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationUnit {
    pub message: String,

    #[serde(default, skip_serializing_if = "is_false")]
    pub is_name: bool,
    /// Key of a name unit, the speaker name as it appears in the scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,

    /// Speaker of a line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_select: bool,
    /// The line was reflowed from several text instructions.
    #[serde(default, skip_serializing_if = "is_false")]
    pub merged: bool,
    /// The line starts with a full-width space indent.
    #[serde(default, alias = "needs_whitespace", skip_serializing_if = "is_false")]
    pub need_whitespace: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Position among line units, across all scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl TranslationUnit {
    pub fn name(raw: &str) -> Self {
        Self {
            message: raw.to_string(),
            is_name: true,
            raw_name: Some(raw.to_string()),
            ..Default::default()
        }
    }
}

pub fn load_units(path: impl AsRef<Path>) -> Result<Vec<TranslationUnit>> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|e| Error::from(e).in_file(path))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::from(e).in_file(path))
}

pub fn save_units(path: impl AsRef<Path>, units: &[TranslationUnit]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).map_err(|e| Error::from(e).in_file(path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, units)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_flags_are_omitted() {
        let unit = TranslationUnit {
            message: "あ".into(),
            path: Some("Event001.json".into()),
            index: Some(0),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_string(&unit).unwrap(),
            r#"{"message":"あ","path":"Event001.json","index":0}"#
        );
        assert_eq!(
            serde_json::to_string(&TranslationUnit::name("甲")).unwrap(),
            r#"{"message":"甲","is_name":true,"raw_name":"甲"}"#
        );
    }

    #[test]
    fn accepts_needs_whitespace_alias() {
        let unit: TranslationUnit =
            serde_json::from_str(r#"{"message":"　x","needs_whitespace":true}"#).unwrap();
        assert!(unit.need_whitespace);
        assert!(!unit.is_select);
    }
}
