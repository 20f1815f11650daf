use crate::error::{ObligoError, Result};
use serde::de::DeserializeOwned;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Atomically write `data` to `path` using a tempfile in the same directory,
/// so a crashed write never leaves a half-written definition behind.
pub fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(data)?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Create a directory and all parents, idempotent.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)?;
    Ok(())
}

/// Write a file only if it does not already exist. Returns true if written.
pub fn write_if_missing(path: &Path, data: &[u8]) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    atomic_write(path, data)?;
    Ok(true)
}

/// Parse one YAML document, naming the file when it is malformed.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = std::fs::read_to_string(path)?;
    serde_yaml::from_str(&data).map_err(|source| ObligoError::Document {
        path: path.to_path_buf(),
        source,
    })
}

/// A document read from a YAML directory, kept even when it failed to parse.
#[derive(Debug)]
pub struct YamlEntry<T> {
    /// File stem, which is the id the document was saved under.
    pub id: String,
    pub doc: Result<T>,
}

/// Read every `*.yaml` document in `dir`, in file-name order.
///
/// A malformed document does not stop the scan; its error is kept on its
/// entry. Only failing to list `dir` itself is an error.
pub fn read_yaml_entries<T: DeserializeOwned>(dir: &Path) -> Result<Vec<YamlEntry<T>>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "yaml") {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| YamlEntry {
            id: path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default(),
            doc: read_yaml(&path),
        })
        .collect())
}

/// Like [`read_yaml_entries`] but fails on the first malformed document.
pub fn read_yaml_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>> {
    read_yaml_entries(dir)?
        .into_iter()
        .map(|entry| entry.doc)
        .collect()
}
