use obligo_core::paths::OBLIGO_DIR;
use std::path::{Path, PathBuf};

/// Resolve the project root.
///
/// `--root` / `OBLIGO_ROOT` wins; otherwise the nearest ancestor of the
/// working directory holding `.obligo/`; otherwise the working directory
/// itself, which is where `obligo init` will create it.
pub fn resolve_root(explicit: Option<&Path>) -> PathBuf {
    if let Some(p) = explicit {
        return p.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project(&cwd).unwrap_or(cwd)
}

fn find_project(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(OBLIGO_DIR).is_dir())
        .map(Path::to_path_buf)
}
