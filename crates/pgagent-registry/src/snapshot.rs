//! Persistence of the registry snapshot to a JSON file, and the
//! resolve-or-scan entry point used by the rest of the agent.

use crate::discovery::discover_binaries;
use pgagent_core::{Error, RegistrySnapshot, Result};
use std::collections::HashSet;
use std::path::Path;

/// Forces a fresh scan and writes the result to `path`, atomically (write to
/// a temp file in the same directory, then rename).
pub fn refresh_registry(path: impl AsRef<Path>, allowed: &HashSet<String>) -> Result<RegistrySnapshot> {
    let snapshot = discover_binaries(allowed);
    write_atomic(path, &snapshot)?;
    Ok(snapshot)
}

fn write_atomic(path: impl AsRef<Path>, snapshot: &RegistrySnapshot) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("json.tmp");
    let body = serde_json::to_string_pretty(snapshot)?;
    std::fs::write(&tmp_path, body)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Loads the snapshot from `path` if present, otherwise performs a scan and
/// persists it.
pub fn get_registry(path: impl AsRef<Path>, allowed: &HashSet<String>) -> Result<RegistrySnapshot> {
    let path = path.as_ref();
    if !path.exists() {
        return refresh_registry(path, allowed);
    }

    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents).map_err(Error::from)
}

/// Looks up a binary's absolute path from a snapshot, honoring versioned
/// aliases (`psql-16`) as ordinary keys.
pub fn get_binary_path<'a>(snapshot: &'a RegistrySnapshot, tool_name: &str) -> Option<&'a str> {
    snapshot.binaries.get(tool_name).map(|s| s.as_str())
}
