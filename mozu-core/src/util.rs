use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Regular files under `root` as paths relative to it, sorted.
///
/// With `ext`, only files with that extension are returned.
pub fn collect_files(root: impl AsRef<Path>, ext: Option<&str>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut files = vec![];
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::from(std::io::Error::from(e)).in_file(root))?;
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = ext {
            if entry.path().extension().and_then(|e| e.to_str()) != Some(ext) {
                continue;
            }
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| entry.path().to_path_buf());
        files.push(rel);
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn walks_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("b.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "{}").unwrap();
        fs::write(dir.path().join("sub/c.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let all = collect_files(dir.path(), None).unwrap();
        assert_eq!(all.len(), 4);

        let json = collect_files(dir.path(), Some("json")).unwrap();
        assert_eq!(
            json,
            vec![
                PathBuf::from("a.json"),
                PathBuf::from("b.json"),
                PathBuf::from("sub/c.json")
            ]
        );
    }
}
