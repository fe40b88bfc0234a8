//! Allowlist admission: is the leading tool name of a command permitted to run?
//!
//! Reloaded from disk on every check rather than cached, so operators can edit
//! the declaration without restarting the process.

use pgagent_core::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Deserialize)]
struct AllowlistFile {
    #[serde(default)]
    allowed_tools: Vec<String>,
}

fn default_allowed() -> HashSet<String> {
    ["psql", "pg_dump", "pg_isready", "patronictl"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Extract the leading tool name from a command string: take the first
/// whitespace-delimited token, then strip any directory component.
///
/// `/tmp/evil/psql -c ...` -> `psql`. This base-name semantics is intentional:
/// the *actual* executed path always comes from the registry (see the exec
/// crate's resolution step), never from the caller-supplied string, so an
/// adversarial absolute path gains nothing by smuggling a different basename.
pub fn extract_tool_name(command_or_path: &str) -> String {
    let first = command_or_path.trim().split_whitespace().next().unwrap_or("");
    Path::new(first)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Loaded, checkable set of permitted tool base-names.
#[derive(Clone, Debug)]
pub struct Allowlist {
    path: PathBuf,
}

impl Allowlist {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads the declaration file fresh. Missing or unparsable files fall back
    /// to a minimal built-in set rather than failing admission outright.
    fn load(&self) -> HashSet<String> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(_) => {
                tracing::warn!(
                    "allowlist file {} not found, using default minimal set",
                    self.path.display()
                );
                return default_allowed();
            }
        };

        match serde_json::from_str::<AllowlistFile>(&contents) {
            Ok(f) => f.allowed_tools.into_iter().collect(),
            Err(e) => {
                tracing::error!("error loading allowlist: {e}");
                HashSet::new()
            }
        }
    }

    /// True if the command's leading tool name is in the current allowlist.
    pub fn is_tool_allowed(&self, command: &str) -> bool {
        let current = self.load();
        let tool_name = extract_tool_name(command);
        let allowed = current.contains(&tool_name);
        if !allowed {
            tracing::warn!("SECURITY REJECTED: tool='{tool_name}' not in allowlist");
        }
        allowed
    }

    /// Same check, returning the spec's canonical rejection reason on failure.
    pub fn check(&self, command: &str) -> Result<(), Error> {
        if self.is_tool_allowed(command) {
            Ok(())
        } else {
            let tool_name = extract_tool_name(command);
            Err(Error::NotAllowed(tool_name))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_allowlist(dir: &tempfile::TempDir, tools: &[&str]) -> PathBuf {
        let path = dir.path().join("allowed_tools.json");
        let body = serde_json::json!({ "allowed_tools": tools });
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{}", body).unwrap();
        path
    }

    #[test]
    fn extract_tool_name_strips_directory() {
        assert_eq!(extract_tool_name("/tmp/evil/psql -c 'x'"), "psql");
        assert_eq!(extract_tool_name("psql --version"), "psql");
        assert_eq!(extract_tool_name(""), "");
    }

    #[test]
    fn allows_listed_tool() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_allowlist(&dir, &["psql", "pg_isready"]);
        let allowlist = Allowlist::new(path);
        assert!(allowlist.is_tool_allowed("psql --version"));
        assert!(!allowlist.is_tool_allowed("rm -rf /"));
    }

    #[test]
    fn adversarial_absolute_path_checked_by_basename_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_allowlist(&dir, &["psql"]);
        let allowlist = Allowlist::new(path);
        // basename resolution means this is allowed at the allowlist stage;
        // the exec crate's resolution step is what prevents the caller's
        // path from actually being used.
        assert!(allowlist.is_tool_allowed("/tmp/evil/psql -c 'SELECT 1'"));
    }

    #[test]
    fn missing_file_falls_back_to_default_set() {
        let allowlist = Allowlist::new("/nonexistent/allowed_tools.json");
        assert!(allowlist.is_tool_allowed("psql --version"));
        assert!(!allowlist.is_tool_allowed("nc -lvp 4444"));
    }

    #[test]
    fn check_returns_not_allowed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_allowlist(&dir, &["psql"]);
        let allowlist = Allowlist::new(path);
        assert!(allowlist.check("psql --version").is_ok());
        assert!(matches!(allowlist.check("rm -rf /"), Err(Error::NotAllowed(_))));
    }
}
