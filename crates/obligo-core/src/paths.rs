use crate::error::{ObligoError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const OBLIGO_DIR: &str = ".obligo";
pub const OBLIGATIONS_DIR: &str = ".obligo/obligations";
pub const CLIENTS_DIR: &str = ".obligo/clients";

pub const CONFIG_FILE: &str = ".obligo/config.yaml";
pub const DEFAULT_DB_FILE: &str = ".obligo/timelines.db";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn obligo_dir(root: &Path) -> PathBuf {
    root.join(OBLIGO_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn obligations_dir(root: &Path) -> PathBuf {
    root.join(OBLIGATIONS_DIR)
}

pub fn obligation_path(root: &Path, id: &str) -> PathBuf {
    obligations_dir(root).join(format!("{id}.yaml"))
}

pub fn clients_dir(root: &Path) -> PathBuf {
    root.join(CLIENTS_DIR)
}

pub fn client_path(root: &Path, id: &str) -> PathBuf {
    clients_dir(root).join(format!("{id}.yaml"))
}

// ---------------------------------------------------------------------------
// Id validation
// ---------------------------------------------------------------------------

static ID_RE: OnceLock<Regex> = OnceLock::new();

fn id_re() -> &'static Regex {
    ID_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9_\-]*$").unwrap())
}

/// Ids become file names and timeline key segments.
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > 64 || !id_re().is_match(id) {
        return Err(ObligoError::InvalidId(id.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
