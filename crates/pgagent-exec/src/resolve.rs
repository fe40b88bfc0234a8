//! Resolves a bare tool name to an absolute executable path.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Looks the tool up in the registry's binaries map first; falls back to a
/// manual `PATH` search if the registry has no entry for it.
pub fn resolve_tool_path(tool_name: &str, binaries: &BTreeMap<String, String>) -> Option<String> {
    if let Some(path) = binaries.get(tool_name) {
        return Some(path.clone());
    }

    search_path(tool_name)
}

fn search_path(tool_name: &str) -> Option<String> {
    let path_var = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path_var) {
        let candidate: PathBuf = dir.join(tool_name);
        if is_executable(&candidate) {
            return Some(candidate.to_string_lossy().to_string());
        }
    }
    None
}

fn is_executable(path: &std::path::Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        path.is_file() && std::fs::metadata(path).map(|m| m.permissions().mode() & 0o111 != 0).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        path.is_file()
    }
}
