// Locating document files and collection folders on disk.

use crate::error::{ClientError, Result};
use crate::models::Collection;
use glob::Pattern;
use std::fs;
use std::path::{Path, PathBuf};

/// File names produced by the CSV splitter.
pub const DEFAULT_DOCUMENT_PATTERN: &str = "document_*.txt";

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern)
        .map_err(|e| ClientError::InvalidArgument(format!("invalid pattern '{pattern}': {e}")))
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| ClientError::io(dir, e))?;
    let mut paths = Vec::new();
    for entry in entries {
        paths.push(entry.map_err(|e| ClientError::io(dir, e))?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Regular files directly inside `dir` whose name matches `pattern`,
/// sorted by path so zero-padded names upload in sequence order.
pub fn discover_documents(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let pattern = compile(pattern)?;
    Ok(read_dir_sorted(dir)?
        .into_iter()
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| pattern.matches(name))
        })
        .collect())
}

/// Immediate sub-directories of `root`, sorted.
pub fn collection_folders(root: &Path) -> Result<Vec<PathBuf>> {
    Ok(read_dir_sorted(root)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

/// Naming convention shared by folders and collections: lower-case, with
/// underscores and whitespace turned into hyphens.
pub fn normalize_collection_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c == '_' || c.is_whitespace() { '-' } else { c.to_ascii_lowercase() })
        .collect()
}

/// Collection name a folder maps to, e.g. `cie_10_ar` → `cie-10-ar`.
pub fn collection_name_for(folder: &Path, prefix: Option<&str>) -> Option<String> {
    let stem = folder.file_name()?.to_str()?;
    Some(normalize_collection_name(&format!("{}{}", prefix.unwrap_or(""), stem)))
}

/// Find the collection whose normalized name equals `wanted`.
pub fn match_collection<'a>(wanted: &str, collections: &'a [Collection]) -> Option<&'a Collection> {
    let wanted = normalize_collection_name(wanted);
    collections
        .iter()
        .find(|c| normalize_collection_name(&c.name) == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;
    use std::fs;
    use tempfile::TempDir;

    fn collection(uuid: &str, name: &str) -> Collection {
        Collection {
            uuid: uuid.into(),
            name: name.into(),
            metadata: None,
            document_count: None,
            chunk_count: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn discovers_matching_files_in_order() {
        let dir = TempDir::new().unwrap();
        for name in ["document_00002.txt", "document_00001.txt", "notes.md", "document_x.csv"] {
            fs::write(dir.path().join(name), "a,b\n").unwrap();
        }
        fs::create_dir(dir.path().join("document_dir.txt")).unwrap();

        let found = discover_documents(dir.path(), DEFAULT_DOCUMENT_PATTERN).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["document_00001.txt", "document_00002.txt"]);
    }

    #[test]
    fn missing_directory_is_io_error() {
        let dir = TempDir::new().unwrap();
        let err = discover_documents(&dir.path().join("nope"), "*").unwrap_err();
        assert!(matches!(err, ClientError::Io { .. }));
    }

    #[test]
    fn bad_pattern_is_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            discover_documents(dir.path(), "[").unwrap_err(),
            ClientError::InvalidArgument(_)
        ));
    }

    #[test]
    fn folders_map_to_collections() {
        let collections = vec![collection("u1", "cie-10-ar"), collection("u2", "Other Docs")];

        let name = collection_name_for(Path::new("/data/CIE_10_AR"), None).unwrap();
        assert_eq!(name, "cie-10-ar");
        assert_eq!(match_collection(&name, &collections).unwrap().uuid, "u1");

        let name = collection_name_for(Path::new("docs"), Some("other_")).unwrap();
        assert_eq!(match_collection(&name, &collections).unwrap().uuid, "u2");

        assert!(match_collection("missing", &collections).is_none());
    }

    #[test]
    fn lists_only_subfolders() {
        let root = TempDir::new().unwrap();
        fs::create_dir(root.path().join("b")).unwrap();
        fs::create_dir(root.path().join("a")).unwrap();
        fs::write(root.path().join("file.txt"), "x").unwrap();
        let folders = collection_folders(root.path()).unwrap();
        assert_eq!(folders, vec![root.path().join("a"), root.path().join("b")]);
    }
}
